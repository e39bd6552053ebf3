//! Sync Driver: one synchronization pass over the listing.
//!
//! Loads the stored catalog, visits every listed show that still needs work
//! while the run budget lasts, merges what it found, and writes the catalog
//! back. Failures inside one show keep that show's stored state; only a lost
//! session or an unwritable catalog ends the run, and even then the catalog
//! accumulated so far is written first, including the episodes a show
//! finished before the session died.

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::Config;
use crate::db::{Store, StoreError};
use crate::domain::RunBudget;
use crate::driver::{DriverError, PageDriver};
use crate::models::{EpisodeStatus, ShowLink, ShowRecord};
use crate::services::catalog::{self, CatalogStats};
use crate::services::pagination::PaginationMapper;
use crate::services::scheduler::EpisodeScheduler;
use crate::services::show_scraper::ShowScraper;
use crate::services::validator::ResourceValidator;
use crate::services::variants::VariantPriority;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Navigation did not settle: {0}")]
    Navigation(String),

    #[error("Expected element is missing: {0}")]
    ElementNotFound(String),

    #[error("Variant could not be activated: {0}")]
    VariantSwitch(String),

    #[error("Resource failed validation: {0}")]
    ResourceInvalid(String),

    #[error("Failed to persist catalog: {0}")]
    Persistence(#[from] StoreError),

    #[error("Automation session failed: {0}")]
    Session(String),

    #[error("Invalid base URL: {0}")]
    BaseUrl(#[from] url::ParseError),
}

impl SyncError {
    /// Errors that end the run instead of just the current show.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Session(_) | Self::BaseUrl(_))
    }
}

impl From<DriverError> for SyncError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Timeout(_) => Self::Navigation(err.to_string()),
            DriverError::NotFound(selector) => Self::ElementNotFound(selector),
            DriverError::Session(msg) => Self::Session(msg),
            DriverError::StaleHandle | DriverError::Protocol(_) => {
                Self::Navigation(err.to_string())
            }
        }
    }
}

/// What a run did.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub listed: usize,
    pub visited: usize,
    /// Listed shows that were already complete.
    pub up_to_date: usize,
    /// Listed shows left for a later run because the budget ran out.
    pub deferred: usize,
    pub failed: usize,
    pub episodes_attempted: usize,
    pub stats: CatalogStats,
}

/// A visited show, plus the session error that cut it short, if any.
struct ShowSync {
    record: ShowRecord,
    aborted: Option<SyncError>,
}

pub struct SyncDriver<'a> {
    config: &'a Config,
    store: &'a Store,
    validator: ResourceValidator,
    priority: VariantPriority,
    budget_limit: usize,
}

impl<'a> SyncDriver<'a> {
    #[must_use]
    pub fn new(config: &'a Config, store: &'a Store) -> Self {
        Self {
            config,
            store,
            validator: ResourceValidator::new(&config.validator),
            priority: VariantPriority::new(&config.variants.priority_patterns),
            budget_limit: config.sync.episode_budget,
        }
    }

    /// Overrides the configured per-run episode budget.
    #[must_use]
    pub const fn with_budget(mut self, limit: usize) -> Self {
        self.budget_limit = limit;
        self
    }

    /// Runs one pass and persists the result.
    pub async fn run(&self, driver: &mut dyn PageDriver) -> Result<SyncReport, SyncError> {
        let existing = self.store.load().await?;
        let mut budget = RunBudget::new(self.budget_limit);
        let mut report = SyncReport::default();
        let mut visited = Vec::new();

        info!(
            shows = existing.len(),
            budget = budget.limit(),
            "Starting sync"
        );

        let outcome = self
            .crawl(driver, &existing, &mut budget, &mut visited, &mut report)
            .await;
        if let Err(e) = &outcome {
            error!(error = %e, "Sync aborted, saving progress so far");
        }

        let catalog = catalog::reconcile(existing, visited);
        self.store.save(&catalog).await?;

        report.episodes_attempted = budget.consumed();
        report.stats = CatalogStats::of(&catalog);
        log_report(&report);

        outcome.map(|()| report)
    }

    async fn crawl(
        &self,
        driver: &mut dyn PageDriver,
        existing: &[ShowRecord],
        budget: &mut RunBudget,
        visited: &mut Vec<ShowRecord>,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let base = Url::parse(&self.config.site.base_url)?;
        let scraper = ShowScraper::new(self.config, &base);

        let links = scraper.discover(driver).await?;
        report.listed = links.len();

        for (position, link) in links.iter().enumerate() {
            let stored = existing.iter().find(|s| s.id == link.id);

            if !catalog::needs_update(stored) {
                debug!(show = %link.id, "Up to date, skipping");
                report.up_to_date += 1;
                continue;
            }
            if budget.is_exhausted() {
                debug!(show = %link.id, "Budget exhausted, deferring");
                report.deferred += 1;
                continue;
            }

            info!(
                show = %link.id,
                position = position + 1,
                of = links.len(),
                remaining_budget = budget.remaining(),
                "Syncing show"
            );

            match self.sync_show(driver, &scraper, link, stored, budget).await {
                Ok(ShowSync { record, aborted }) => {
                    let merged = catalog::merge(stored.cloned(), record);
                    log_show(&merged);
                    visited.push(merged);
                    report.visited += 1;
                    if let Some(e) = aborted {
                        return Err(e);
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(show = %link.id, error = %e, "Show failed, keeping stored state");
                    report.failed += 1;
                }
            }
        }

        Ok(())
    }

    async fn sync_show(
        &self,
        driver: &mut dyn PageDriver,
        scraper: &ShowScraper<'_>,
        link: &ShowLink,
        stored: Option<&ShowRecord>,
        budget: &mut RunBudget,
    ) -> Result<ShowSync, SyncError> {
        let details = scraper.scrape_details(driver, &link.id).await?;
        let Some(first_episode) = details.first_episode_url.as_deref() else {
            return Err(SyncError::ElementNotFound(
                self.config.selectors.watch_button.clone(),
            ));
        };

        driver.navigate(first_episode).await?;
        driver
            .wait_for(
                &self.config.selectors.player_container,
                self.config.sync.element_timeout(),
            )
            .await?;

        let layout = PaginationMapper::new(&self.config.selectors, &self.config.sync)
            .map(driver)
            .await;

        let episodes = stored.map(|s| s.episodes.clone()).unwrap_or_default();
        let hint = stored.and_then(|s| {
            s.episodes
                .iter()
                .rev()
                .filter(|ep| ep.is_success())
                .find_map(|ep| ep.variant_used.clone())
        });

        let mut show_budget = budget.for_show(self.config.sync.per_show_limit);
        let scheduler = EpisodeScheduler::new(self.config, &self.validator, &self.priority);
        let outcome = scheduler
            .run(driver, &layout, episodes, hint, &mut show_budget)
            .await;
        budget.absorb(&show_budget);
        debug!(show = %link.id, attempted = ?outcome.attempted, "Episodes attempted");

        let record = ShowRecord {
            id: link.id.clone(),
            title: details.title,
            synopsis: details.synopsis,
            genres: details.genres,
            metadata: details.metadata,
            poster_locator: link.poster_locator.clone(),
            total_episode_count: layout.total_episode_count,
            episodes: outcome.episodes,
            available_variants: outcome.observed_variants,
            last_synced_at: Utc::now(),
        };
        Ok(ShowSync {
            record,
            aborted: outcome.aborted.map(SyncError::from),
        })
    }
}

fn log_show(show: &ShowRecord) {
    info!(
        show = %show.id,
        title = %show.title,
        successes = show.success_count(),
        errors = show.count_with_status(EpisodeStatus::Error),
        attempted = show.attempted_count(),
        total = show.total_episode_count,
        "Show synced"
    );
}

fn log_report(report: &SyncReport) {
    let stats = &report.stats;
    info!(
        listed = report.listed,
        visited = report.visited,
        up_to_date = report.up_to_date,
        deferred = report.deferred,
        failed = report.failed,
        episodes_attempted = report.episodes_attempted,
        "Sync finished"
    );
    info!(
        shows = stats.shows,
        complete = stats.complete_shows,
        captured = stats.captured,
        expected = stats.expected,
        successes = stats.successes,
        progress = %format!("{:.1}%", stats.progress_percent()),
        success_rate = %format!("{:.1}%", stats.success_rate()),
        "Catalog totals"
    );
}
