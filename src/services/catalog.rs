//! Catalog Merger: decides which stored shows still need a visit and folds a
//! run's results back into the stored catalog.
//!
//! Merging only ever adds information. A stored `Success` episode survives any
//! fresh record, stored episodes past the end of a fresh list are kept, and
//! shows missing from this run's listing are carried through untouched.

use std::collections::HashMap;

use crate::domain::ShowId;
use crate::models::{EpisodeStatus, ShowRecord};

/// Whether `existing` needs another synchronization pass.
#[must_use]
pub fn needs_update(existing: Option<&ShowRecord>) -> bool {
    let Some(show) = existing else {
        return true;
    };

    let captured = show
        .episodes
        .iter()
        .filter(|ep| matches!(ep.status, EpisodeStatus::Success | EpisodeStatus::Pending))
        .count();

    captured < show.total_episode_count || show.has_errors()
}

/// Folds a freshly synced record into the stored one.
#[must_use]
pub fn merge(existing: Option<ShowRecord>, fresh: ShowRecord) -> ShowRecord {
    let Some(existing) = existing else {
        return fresh;
    };

    let mut merged = fresh;

    for (index, stored) in existing.episodes.iter().enumerate() {
        match merged.episodes.get_mut(index) {
            Some(episode) if stored.is_success() && !episode.is_success() => {
                *episode = stored.clone();
            }
            Some(_) => {}
            None => merged.episodes.push(stored.clone()),
        }
    }

    if merged.title.trim().is_empty() {
        merged.title = existing.title;
    }
    if merged.synopsis.trim().is_empty() {
        merged.synopsis = existing.synopsis;
    }
    if merged.genres.is_empty() {
        merged.genres = existing.genres;
    }
    if merged.metadata.is_empty() {
        merged.metadata = existing.metadata;
    }
    if merged.poster_locator.is_none() {
        merged.poster_locator = existing.poster_locator;
    }

    let mut variants = existing.available_variants;
    for variant in merged.available_variants {
        if !variants.contains(&variant) {
            variants.push(variant);
        }
    }
    merged.available_variants = variants;

    merged.total_episode_count = merged.total_episode_count.max(merged.episodes.len());
    merged
}

/// Stored shows in their stored order with visited ones replaced, followed by
/// shows seen for the first time. Nothing is ever dropped.
#[must_use]
pub fn reconcile(existing: Vec<ShowRecord>, visited: Vec<ShowRecord>) -> Vec<ShowRecord> {
    let mut fresh: HashMap<ShowId, ShowRecord> = HashMap::with_capacity(visited.len());
    let mut new_order = Vec::new();
    for show in visited {
        if !fresh.contains_key(&show.id) {
            new_order.push(show.id.clone());
        }
        fresh.insert(show.id.clone(), show);
    }

    let mut catalog = Vec::with_capacity(existing.len() + new_order.len());
    for show in existing {
        match fresh.remove(&show.id) {
            Some(updated) => catalog.push(updated),
            None => catalog.push(show),
        }
    }
    for id in new_order {
        if let Some(show) = fresh.remove(&id) {
            catalog.push(show);
        }
    }
    catalog
}

/// Totals over a catalog, as printed after a run and by `list`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogStats {
    pub shows: usize,
    pub complete_shows: usize,
    /// Episodes attempted at least once.
    pub captured: usize,
    pub expected: usize,
    pub successes: usize,
    pub errors: usize,
}

impl CatalogStats {
    #[must_use]
    pub fn of(shows: &[ShowRecord]) -> Self {
        shows.iter().fold(Self::default(), |mut stats, show| {
            stats.shows += 1;
            if !needs_update(Some(show)) {
                stats.complete_shows += 1;
            }
            stats.captured += show.attempted_count();
            stats.expected += show.total_episode_count;
            stats.successes += show.success_count();
            stats.errors += show.count_with_status(EpisodeStatus::Error);
            stats
        })
    }

    /// Share of expected episodes attempted so far, in percent.
    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        percent(self.captured, self.expected)
    }

    /// Share of attempted episodes that succeeded, in percent.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        percent(self.successes, self.captured)
    }
}

#[allow(clippy::cast_precision_loss)]
fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 * 100.0 / whole as f64
}
