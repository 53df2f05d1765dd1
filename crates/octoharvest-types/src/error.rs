//! Error types for octoharvest.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type alias for octoharvest operations.
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Errors that can occur while harvesting activity data.
#[derive(Error, Debug)]
pub enum HarvestError {
    /// HTTP transport failed after retries.
    #[error("transport error: {0}")]
    Transport(String),

    /// Upstream returned a non-success status for a page.
    #[error("upstream returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Rate budget exhausted with no reset information to wait on.
    #[error("rate limit exhausted and no reset time supplied")]
    RateExhausted,

    /// Response body could not be interpreted.
    #[error("malformed response: {0}")]
    Parse(String),

    /// Invalid date range.
    #[error(transparent)]
    DateRange(#[from] DateRangeError),

    /// Persistence failed.
    #[error("store error: {0}")]
    Store(String),

    /// No usable credential was supplied at startup.
    #[error("no credentials configured")]
    NoCredentials,
}

/// Error for invalid date ranges.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateRangeError {
    /// Start date is after end date.
    #[error("invalid date range: {start} > {end}")]
    InvalidRange {
        /// The start date.
        start: NaiveDate,
        /// The end date.
        end: NaiveDate,
    },
}

/// Error for a malformed `owner/name` repository id.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid repository id {input:?}, expected owner/name")]
pub struct RepoIdError {
    /// The rejected input.
    pub input: String,
}
