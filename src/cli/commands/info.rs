use std::path::Path;

use crate::db::Store;
use crate::models::{EpisodeStatus, ShowRecord};

fn find_show<'a>(shows: &'a [ShowRecord], id: &str) -> Option<&'a ShowRecord> {
    if let Some(show) = shows.iter().find(|s| s.id.as_str() == id) {
        return Some(show);
    }
    id.parse::<usize>()
        .ok()
        .and_then(|position| position.checked_sub(1))
        .and_then(|index| shows.get(index))
}

pub async fn cmd_show_info(catalog: &Path, id: &str) -> anyhow::Result<()> {
    let shows = Store::new(catalog).load().await?;

    let Some(show) = find_show(&shows, id) else {
        println!("Show {id} not found in catalog.");
        println!("Use 'streamdex list' to see entries");
        return Ok(());
    };

    println!("Show Info");
    println!("{:-<60}", "");
    println!("Title:    {}", show.title);
    println!("URL:      {}", show.id);
    if let Some(poster) = &show.poster_locator {
        println!("Poster:   {poster}");
    }
    if !show.genres.is_empty() {
        println!("Genres:   {}", show.genres.join(", "));
    }
    if !show.metadata.is_empty() {
        println!("Details:  {}", show.metadata.join(" | "));
    }
    if !show.available_variants.is_empty() {
        println!("Variants: {}", show.available_variants.join(", "));
    }
    println!(
        "Episodes: {} of {} captured, {} successful",
        show.attempted_count(),
        show.total_episode_count,
        show.success_count()
    );
    println!("Synced:   {}", show.last_synced_at.format("%Y-%m-%d %H:%M:%S UTC"));

    if !show.synopsis.is_empty() {
        println!();
        println!("{}", show.synopsis);
    }

    if show.episodes.is_empty() {
        return Ok(());
    }

    println!();
    println!("Episodes");
    println!("{:-<60}", "");
    for episode in &show.episodes {
        let marker = match episode.status {
            EpisodeStatus::Success => "✓",
            EpisodeStatus::Error => "✗",
            EpisodeStatus::Pending => "·",
        };
        match (&episode.variant_used, &episode.primary_resource_locator) {
            (Some(variant), Some(locator)) => {
                println!("{marker} {:<10} [{variant}] {locator}", episode.display_label);
            }
            _ => println!("{marker} {:<10} {}", episode.display_label, episode.status),
        }
    }

    Ok(())
}
