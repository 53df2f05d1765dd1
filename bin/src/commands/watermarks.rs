//! Watermarks command: show per-repository resume points and row counts.

use anyhow::{Context, Result};
use octoharvest_lib::prelude::*;

use crate::config::Config;

pub(crate) async fn run(config: &Config) -> Result<()> {
    let store = SqliteStore::connect(&config.store.path)
        .await
        .with_context(|| format!("Failed to open store at {}", config.store.path.display()))?;

    if config.repos.is_empty() {
        println!("No repositories configured.");
        return Ok(());
    }

    println!("{:<40} {:<7} {:>10}  watermark", "repository", "entity", "rows");
    for repo in config.repos.iter().filter(|r| r.enabled) {
        let id = repo.id();
        for kind in EntityKind::ALL {
            let count = store.count(&id, kind).await?;
            let watermark = store
                .watermark(&id, kind)
                .await?
                .map_or_else(|| "-".to_string(), |ts| ts.to_rfc3339());
            println!("{:<40} {:<7} {count:>10}  {watermark}", id.to_string(), kind.to_string());
        }
    }
    Ok(())
}
