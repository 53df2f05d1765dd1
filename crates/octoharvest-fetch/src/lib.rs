//! Rate-limit-aware harvesting engine for octoharvest.
//!
//! This crate provides the data harvesting pipeline:
//!
//! - [`CredentialPool`] - Credential rotation and quota observation
//! - [`ApiClient`] - HTTP transport with bounded retry and backoff
//! - [`PageFetcher`] - Paginated endpoint walking with Link-header hints
//! - [`chunk`] - Date-chunked walks for feeds with no server-side time filter
//! - [`resume`] - `since`-filtered walks for feeds with one
//! - [`Harvester`] - Per-repository orchestration
//! - [`ActivityStore`] - The storage seam the engine persists through

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/octoharvest/octoharvest/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chunk;
mod client;
mod harvest;
mod page;
mod parse;
mod rate;
pub mod resume;
mod store;
#[cfg(test)]
mod testutil;
pub mod url;

pub use client::{ApiClient, ClientConfig, TransportError};
pub use harvest::{EntityOutcome, EntityStats, Harvester, HarvestTask, RepoReport};
pub use page::{EndpointPager, Page, PageFetcher, parse_last_page};
pub use rate::{CredentialPool, RateDecision, RateLimitConfig, RateObservation};
pub use store::{ActivityStore, BatchSink};

/// Policy knobs for the chunked page walks.
#[derive(Debug, Clone, Copy)]
pub struct FetchPolicy {
    /// Maximum span of a single fetch window, in days.
    pub max_window_days: u32,
    /// Consecutive pages with no fresh records before a window walk is
    /// abandoned. Cost bound, not a completeness guarantee.
    pub empty_page_limit: u32,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_window_days: 365,
            empty_page_limit: 5,
        }
    }
}
