//! List shows command handler

use std::path::Path;

use crate::db::Store;
use crate::services::CatalogStats;
use crate::services::catalog::needs_update;

pub async fn cmd_list_shows(catalog: &Path) -> anyhow::Result<()> {
    let store = Store::new(catalog);
    let shows = store.load().await?;

    if shows.is_empty() {
        println!("Catalog is empty.");
        println!();
        println!("Fill it with: streamdex sync");
        return Ok(());
    }

    println!("Catalog ({} shows)", shows.len());
    println!("{:-<70}", "");

    for (position, show) in shows.iter().enumerate() {
        let status_indicator = if needs_update(Some(show)) { "…" } else { "✓" };
        let stats = CatalogStats::of(std::slice::from_ref(show));

        println!(
            "{:>3}. {} {} [{}/{} eps, {} ok]",
            position + 1,
            status_indicator,
            show.title,
            stats.captured,
            show.total_episode_count,
            stats.successes
        );
        println!(
            "     Progress: {:.1}% | Success: {:.1}% | Synced: {}",
            stats.progress_percent(),
            stats.success_rate(),
            show.last_synced_at.format("%Y-%m-%d %H:%M")
        );
    }

    let totals = CatalogStats::of(&shows);
    println!();
    println!(
        "Total: {}/{} complete | {}/{} episodes ({:.1}%) | success rate {:.1}%",
        totals.complete_shows,
        totals.shows,
        totals.captured,
        totals.expected,
        totals.progress_percent(),
        totals.success_rate()
    );
    println!("Legend: ✓ Complete | … Needs another run");

    Ok(())
}
