//! SQLite persistence for octoharvest.
//!
//! Implements the engine's `ActivityStore` seam with insert-if-absent
//! semantics: a record's natural key is unique in storage and re-inserting
//! it is a no-op, so page walks can safely re-cover ranges after partial
//! failures.

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/octoharvest/octoharvest/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod schema;
mod sqlite;

pub use sqlite::{SqliteStore, StoreError};
