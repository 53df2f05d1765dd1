//! Repos command: list the configured repositories.

use anyhow::Result;

use crate::config::Config;

pub(crate) fn run(config: &Config) -> Result<()> {
    if config.repos.is_empty() {
        println!("No repositories configured.");
        return Ok(());
    }

    for repo in &config.repos {
        let end = repo
            .end_date
            .map_or_else(|| "now".to_string(), |d| d.to_string());
        let state = if repo.enabled { "" } else { "  (disabled)" };
        println!("{:<40} {} -> {}{}", repo.id().to_string(), repo.start_date, end, state);
    }
    Ok(())
}
