//! Core types for the octoharvest GitHub activity harvester.
//!
//! This crate provides the fundamental data structures used throughout
//! octoharvest:
//!
//! - [`RepoId`] - Repository identity (`owner/name`)
//! - [`EntityKind`] - The four harvested activity feeds
//! - [`ForkEvent`], [`StarEvent`], [`IssueRecord`], [`PullRecord`] - Typed
//!   activity records with natural keys
//! - [`DateRange`] - Inclusive date range for a harvest run
//! - [`FetchWindow`] - Bounded sub-range used for chunked page walks

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/octoharvest/octoharvest/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod record;
mod repo;
mod window;

pub use error::{DateRangeError, HarvestError, RepoIdError, Result};
pub use record::{EntityKind, ForkEvent, IssueRecord, PullRecord, StarEvent, Timestamped};
pub use repo::RepoId;
pub use window::{DateRange, FetchWindow, WindowIterator};
