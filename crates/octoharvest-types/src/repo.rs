//! Repository identity.

use std::str::FromStr;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::RepoIdError;

/// Identifies a repository as `owner/name`.
///
/// This is the leading component of every natural key in storage, and the
/// unit the orchestrator sequences over.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[display("{owner}/{name}")]
pub struct RepoId {
    /// Account or organization owning the repository.
    pub owner: String,
    /// Repository name within the owner's namespace.
    pub name: String,
}

impl RepoId {
    /// Creates a new repository id.
    #[must_use]
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl FromStr for RepoId {
    type Err = RepoIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self::new(owner, name))
            }
            _ => Err(RepoIdError {
                input: s.to_string(),
            }),
        }
    }
}
