//! Config loading: store path, fetch policy, repository list, credentials.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use octoharvest_lib::prelude::*;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory.
pub(crate) const DEFAULT_CONFIG_PATH: &str = "octoharvest.toml";

#[derive(Debug, Deserialize)]
pub(crate) struct Config {
    #[serde(default)]
    pub(crate) store: StoreConfig,
    #[serde(default)]
    pub(crate) fetch: FetchConfig,
    /// API tokens, in rotation order. Falls back to GITHUB_TOKENS /
    /// GITHUB_TOKEN when empty.
    #[serde(default)]
    pub(crate) tokens: Vec<String>,
    #[serde(default)]
    pub(crate) repos: Vec<RepoConfig>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub(crate) path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    directories::ProjectDirs::from("io", "octoharvest", "octoharvest")
        .map(|dirs| dirs.data_dir().join("activity.db"))
        .unwrap_or_else(|| PathBuf::from("activity.db"))
}

#[derive(Debug, Deserialize)]
pub(crate) struct FetchConfig {
    #[serde(default = "default_max_window_days")]
    pub(crate) max_window_days: u32,
    #[serde(default = "default_empty_page_limit")]
    pub(crate) empty_page_limit: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_window_days: default_max_window_days(),
            empty_page_limit: default_empty_page_limit(),
        }
    }
}

fn default_max_window_days() -> u32 {
    365
}

fn default_empty_page_limit() -> u32 {
    5
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepoConfig {
    pub(crate) owner: String,
    pub(crate) name: String,
    pub(crate) start_date: NaiveDate,
    pub(crate) end_date: Option<NaiveDate>,
    #[serde(default = "default_enabled")]
    pub(crate) enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl RepoConfig {
    pub(crate) fn id(&self) -> RepoId {
        RepoId::new(self.owner.clone(), self.name.clone())
    }
}

impl Config {
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub(crate) fn policy(&self) -> FetchPolicy {
        FetchPolicy {
            max_window_days: self.fetch.max_window_days,
            empty_page_limit: self.fetch.empty_page_limit,
        }
    }

    /// Tokens from config, else GITHUB_TOKENS (comma separated), else
    /// GITHUB_TOKEN.
    pub(crate) fn resolve_tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self
            .tokens
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        if tokens.is_empty() {
            if let Ok(multi) = std::env::var("GITHUB_TOKENS") {
                tokens = multi
                    .split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
            }
        }
        if tokens.is_empty() {
            if let Ok(single) = std::env::var("GITHUB_TOKEN") {
                if !single.trim().is_empty() {
                    tokens.push(single.trim().to_string());
                }
            }
        }
        tokens
    }

    /// Harvest tasks for the enabled repositories, optionally filtered to
    /// one repository. A missing end date means today.
    pub(crate) fn tasks(&self, only: Option<&str>) -> Result<Vec<HarvestTask>> {
        let today = chrono::Utc::now().date_naive();
        let mut tasks = Vec::new();

        for repo in self.repos.iter().filter(|r| r.enabled) {
            let id = repo.id();
            if let Some(only) = only {
                if id.to_string() != only {
                    continue;
                }
            }
            let end = repo.end_date.unwrap_or(today);
            let range = DateRange::new(repo.start_date, end).with_context(|| {
                format!("Invalid date range for {id}: {} > {end}", repo.start_date)
            })?;
            tasks.push(HarvestTask { repo: id, range });
        }

        if let Some(only) = only {
            if tasks.is_empty() {
                bail!("Repository {only} is not in the configured (enabled) repo list");
            }
        }
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let raw = r#"
            tokens = ["tok-a", "tok-b"]

            [store]
            path = "data/activity.db"

            [fetch]
            max_window_days = 180
            empty_page_limit = 3

            [[repos]]
            owner = "rust-lang"
            name = "cargo"
            start_date = "2023-01-01"

            [[repos]]
            owner = "octo"
            name = "old"
            start_date = "2020-01-01"
            end_date = "2020-12-31"
            enabled = false
        "#;
        let config: Config = toml::from_str(raw).unwrap();

        assert_eq!(config.tokens.len(), 2);
        assert_eq!(config.store.path, PathBuf::from("data/activity.db"));
        assert_eq!(config.fetch.max_window_days, 180);
        assert_eq!(config.policy().empty_page_limit, 3);
        assert_eq!(config.repos.len(), 2);
        assert!(config.repos[0].enabled);
        assert!(!config.repos[1].enabled);
    }

    #[test]
    fn test_disabled_repos_are_skipped() {
        let raw = r#"
            [[repos]]
            owner = "a"
            name = "live"
            start_date = "2023-01-01"

            [[repos]]
            owner = "a"
            name = "dead"
            start_date = "2023-01-01"
            enabled = false
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        let tasks = config.tasks(None).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].repo.to_string(), "a/live");
    }

    #[test]
    fn test_task_filter_rejects_unknown_repo() {
        let raw = r#"
            [[repos]]
            owner = "a"
            name = "live"
            start_date = "2023-01-01"
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert!(config.tasks(Some("a/missing")).is_err());
    }

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.fetch.max_window_days, 365);
        assert_eq!(config.fetch.empty_page_limit, 5);
        assert!(config.repos.is_empty());
    }
}
