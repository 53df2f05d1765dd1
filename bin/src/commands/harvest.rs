//! Harvest command implementation.

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use octoharvest_lib::prelude::*;

use crate::config::Config;

pub(crate) async fn run(config: &Config, only: Option<&str>, quiet: bool) -> Result<()> {
    let tasks = config.tasks(only)?;
    if tasks.is_empty() {
        bail!("No enabled repositories configured; nothing to harvest");
    }

    let tokens = config.resolve_tokens();
    if tokens.is_empty() {
        bail!("No credentials found: set [tokens] in the config, or GITHUB_TOKENS / GITHUB_TOKEN");
    }

    let client = ApiClient::with_defaults(tokens).context("Failed to create API client")?;
    let store = SqliteStore::connect(&config.store.path)
        .await
        .with_context(|| format!("Failed to open store at {}", config.store.path.display()))?;

    let harvester = Harvester::new(&client, &store, config.policy());

    // One bar tick per repository; page-level detail goes to the log.
    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(tasks.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} repos {msg}")
                .expect("Invalid progress template")
                .progress_chars("=>-"),
        );
        pb
    };

    let mut total_inserted = 0u64;
    let mut failures = 0usize;
    for task in &tasks {
        progress.set_message(task.repo.to_string());
        let report = harvester.harvest_repo(&task.repo, task.range).await;
        total_inserted += report.inserted();
        failures += report.failed_kinds().len();
        print_report(&report, quiet);
        progress.inc(1);
    }

    let finish_msg = if failures > 0 {
        format!("Stored {total_inserted} new rows ({failures} entity fetches aborted)")
    } else {
        format!("Stored {total_inserted} new rows")
    };
    progress.finish_with_message(finish_msg);

    Ok(())
}

fn print_report(report: &RepoReport, quiet: bool) {
    if quiet {
        return;
    }
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(stats) => println!(
                "{:<40} {:<7} {:>6} pages  {:>8} new",
                report.repo.to_string(),
                outcome.kind.to_string(),
                stats.pages,
                stats.inserted
            ),
            Err(e) => println!(
                "{:<40} {:<7} aborted: {e}",
                report.repo.to_string(),
                outcome.kind.to_string()
            ),
        }
    }
}
