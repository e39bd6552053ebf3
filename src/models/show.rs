use crate::domain::ShowId;
use crate::models::episode::{EpisodeRecord, EpisodeStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One show in the persisted catalog.
///
/// `episodes[i]` always holds global episode index `i`; unvisited indices are
/// `Pending` placeholders, never gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowRecord {
    pub id: ShowId,
    pub title: String,
    #[serde(default)]
    pub synopsis: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub metadata: Vec<String>,
    #[serde(default)]
    pub poster_locator: Option<String>,
    #[serde(default)]
    pub total_episode_count: usize,
    #[serde(default)]
    pub episodes: Vec<EpisodeRecord>,
    #[serde(default)]
    pub available_variants: Vec<String>,
    pub last_synced_at: DateTime<Utc>,
}

impl ShowRecord {
    #[must_use]
    pub fn count_with_status(&self, status: EpisodeStatus) -> usize {
        self.episodes.iter().filter(|ep| ep.status == status).count()
    }

    #[must_use]
    pub fn success_count(&self) -> usize {
        self.count_with_status(EpisodeStatus::Success)
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.episodes
            .iter()
            .any(|ep| ep.status == EpisodeStatus::Error)
    }

    /// Episodes that have been attempted at least once.
    #[must_use]
    pub fn attempted_count(&self) -> usize {
        self.episodes
            .iter()
            .filter(|ep| ep.status != EpisodeStatus::Pending)
            .count()
    }
}

/// Descriptive fields read from a show's detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowDetails {
    pub title: String,
    pub synopsis: String,
    pub genres: Vec<String>,
    pub metadata: Vec<String>,
    pub first_episode_url: Option<String>,
}

/// A show entry found on the listing page, before any navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowLink {
    pub id: ShowId,
    pub poster_locator: Option<String>,
}
