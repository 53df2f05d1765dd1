//! GitHub activity harvesting into SQLite, under a shared rate budget.
//!
//! This is a facade crate that re-exports functionality from the
//! octoharvest workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```ignore
//! use octoharvest_lib::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::with_defaults(vec![std::env::var("GITHUB_TOKEN")?])?;
//!     let store = SqliteStore::connect(std::path::Path::new("activity.db")).await?;
//!
//!     let range = DateRange::new(
//!         chrono::NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
//!         chrono::NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
//!     )?;
//!     let harvester = Harvester::new(&client, &store, FetchPolicy::default());
//!     let report = harvester
//!         .harvest_repo(&"rust-lang/cargo".parse()?, range)
//!         .await;
//!     println!("stored {} new rows", report.inserted());
//!
//!     Ok(())
//! }
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/octoharvest/octoharvest/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use octoharvest_types::*;

// Re-export the harvesting engine
pub use octoharvest_fetch::{
    ActivityStore, ApiClient, ClientConfig, EntityOutcome, EntityStats, FetchPolicy, Harvester,
    HarvestTask, RepoReport, TransportError,
};

// Re-export storage
pub use octoharvest_store::{SqliteStore, StoreError};

/// Prelude module for convenient imports.
///
/// ```
/// use octoharvest_lib::prelude::*;
/// ```
pub mod prelude {
    pub use octoharvest_types::{
        DateRange, DateRangeError, EntityKind, FetchWindow, ForkEvent, HarvestError, IssueRecord,
        PullRecord, RepoId, Result, StarEvent,
    };

    pub use octoharvest_fetch::{
        ActivityStore, ApiClient, ClientConfig, FetchPolicy, Harvester, HarvestTask, RepoReport,
    };

    pub use octoharvest_store::SqliteStore;
}
