//! Sync command handler

use anyhow::Context;
use std::path::Path;

use crate::clients::ChromeDriver;
use crate::config::Config;
use crate::db::Store;
use crate::services::SyncDriver;

pub async fn cmd_sync(config: &Config, catalog: &Path, budget: Option<usize>) -> anyhow::Result<()> {
    let store = Store::new(catalog);

    let mut driver = ChromeDriver::launch(&config.browser)
        .await
        .context("Failed to start browser session")?;

    let mut sync = SyncDriver::new(config, &store);
    if let Some(budget) = budget {
        sync = sync.with_budget(budget);
    }

    let result = sync.run(&mut driver).await;
    driver.close().await;
    let report = result.context("Sync run failed")?;

    let stats = report.stats;
    println!("Sync complete");
    println!("{:-<60}", "");
    println!(
        "Shows:    {} listed, {} synced, {} up to date, {} deferred, {} failed",
        report.listed, report.visited, report.up_to_date, report.deferred, report.failed
    );
    println!("Episodes: {} attempted this run", report.episodes_attempted);
    println!(
        "Catalog:  {}/{} episodes captured ({:.1}%), {} successful ({:.1}%)",
        stats.captured,
        stats.expected,
        stats.progress_percent(),
        stats.successes,
        stats.success_rate()
    );
    println!("Saved to {}", store.path().display());

    Ok(())
}
