//! Episode Scheduler: decides which global episode indices of one show get
//! work this run and walks the listing page by page to do it.
//!
//! The "needs work" predicate is recomputed from the stored episodes every
//! time, which is what lets a run stop anywhere and the next one resume.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::{Config, DropdownSelectors, SelectorConfig, SyncConfig};
use crate::domain::RunBudget;
use crate::driver::dropdown::{self, DropdownTiming};
use crate::driver::{DriverError, PageDriver};
use crate::models::episode::default_label;
use crate::models::EpisodeRecord;
use crate::parser::PageToken;
use crate::services::pagination::PageLayout;
use crate::services::retry::{Attempt, Operation, RetryPolicy, with_retry};
use crate::services::validator::ResourceValidator;
use crate::services::variants::{VariantPriority, VariantResolver};

/// True if global index `index` has never been attempted or did not succeed.
#[must_use]
pub fn needs_work(episodes: &[EpisodeRecord], index: usize) -> bool {
    episodes
        .get(index)
        .is_none_or(|episode| episode.status.needs_work())
}

/// The indices of one page that need work, in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePlan {
    pub token: PageToken,
    pub indices: Vec<usize>,
}

/// Pages in ascending order, each with its pending indices. Pages with nothing
/// to do are left out.
#[must_use]
pub fn plan(tokens: &[PageToken], total: usize, episodes: &[EpisodeRecord]) -> Vec<PagePlan> {
    let mut tokens: Vec<&PageToken> = tokens.iter().collect();
    tokens.sort_by_key(|t| t.start);

    tokens
        .into_iter()
        .filter_map(|token| {
            let range = token.global_range();
            let indices: Vec<usize> = (range.start..range.end.min(total))
                .filter(|&i| needs_work(episodes, i))
                .collect();
            (!indices.is_empty()).then(|| PagePlan {
                token: token.clone(),
                indices,
            })
        })
        .collect()
}

/// Writes `record` at global `index`, padding with pending placeholders.
pub fn place(episodes: &mut Vec<EpisodeRecord>, index: usize, record: EpisodeRecord) {
    while episodes.len() < index {
        let next = episodes.len();
        episodes.push(EpisodeRecord::pending(next));
    }
    if index < episodes.len() {
        episodes[index] = record;
    } else {
        episodes.push(record);
    }
}

/// What one scheduling pass over a show produced.
#[derive(Debug, Default)]
pub struct ScheduleOutcome {
    pub episodes: Vec<EpisodeRecord>,
    /// Global indices attempted this pass, in the order they were attempted.
    pub attempted: Vec<usize>,
    /// Variant labels offered or tried on any episode this pass.
    pub observed_variants: Vec<String>,
    /// The variant that produced the last successful episode.
    pub preferred_variant: Option<String>,
    /// Session error that cut the pass short.
    pub aborted: Option<DriverError>,
}

struct SwitchPage<'a> {
    selectors: &'a DropdownSelectors,
    label: &'a str,
    timing: DropdownTiming,
    sync: &'a SyncConfig,
}

#[async_trait]
impl<'a> Operation for SwitchPage<'a> {
    type Output = ();

    fn describe(&self) -> String {
        format!("switch page to '{}'", self.label)
    }

    async fn attempt(&mut self, driver: &mut dyn PageDriver) -> Attempt<()> {
        if let Err(e) = dropdown::select(driver, self.selectors, self.label, self.timing).await {
            return Attempt::from_result(Err(e));
        }
        driver.settle(self.sync.page_switch_settle()).await;

        match dropdown::active_label(driver, self.selectors).await {
            Ok(Some(active)) if active == self.label => Attempt::Done(()),
            Ok(_) => Attempt::Retry(DriverError::NotFound(format!("page '{}'", self.label))),
            Err(e) => Attempt::from_result(Err(e)),
        }
    }
}

/// Clicks the slot at `local` and checks that the episode actually opened.
/// Slots are looked up again on every attempt.
struct OpenEpisode<'a> {
    selectors: &'a SelectorConfig,
    sync: &'a SyncConfig,
    local: usize,
}

#[async_trait]
impl<'a> Operation for OpenEpisode<'a> {
    type Output = ();

    fn describe(&self) -> String {
        format!("open episode slot {}", self.local + 1)
    }

    async fn attempt(&mut self, driver: &mut dyn PageDriver) -> Attempt<()> {
        let slots = match driver.find_all(&self.selectors.episode_item).await {
            Ok(slots) => slots,
            Err(e) => return Attempt::from_result(Err(e)),
        };
        let Some(&slot) = slots.get(self.local) else {
            return Attempt::Retry(DriverError::NotFound(self.selectors.episode_item.clone()));
        };

        if let Err(e) = driver.click(slot).await {
            return Attempt::from_result(Err(e));
        }
        driver.settle(self.sync.episode_settle()).await;

        match driver.current_url().await {
            Ok(url) if url.contains(&self.sync.episode_url_marker) => Attempt::Done(()),
            Ok(url) => Attempt::Retry(DriverError::NotFound(format!(
                "episode page (landed on {url})"
            ))),
            Err(e) => Attempt::from_result(Err(e)),
        }
    }
}

pub struct EpisodeScheduler<'a> {
    selectors: &'a SelectorConfig,
    sync: &'a SyncConfig,
    resolver: VariantResolver<'a>,
    policy: RetryPolicy,
}

impl<'a> EpisodeScheduler<'a> {
    #[must_use]
    pub fn new(
        config: &'a Config,
        validator: &'a ResourceValidator,
        priority: &'a VariantPriority,
    ) -> Self {
        Self {
            selectors: &config.selectors,
            sync: &config.sync,
            resolver: VariantResolver::new(config, validator, priority),
            policy: RetryPolicy::new(&config.sync.retry),
        }
    }

    fn timing(&self) -> DropdownTiming {
        DropdownTiming {
            open: self.sync.dropdown_settle(),
            dismiss: self.sync.dismiss_settle(),
        }
    }

    /// Runs one pass over the show whose episode listing is open in `driver`.
    ///
    /// `episodes` is the stored list; it comes back with attempted indices
    /// overwritten and nothing else touched. Every attempted episode consumes
    /// one unit of `budget`. A lost session stops the pass and is reported in
    /// [`ScheduleOutcome::aborted`] next to the episodes finished before it.
    pub async fn run(
        &self,
        driver: &mut dyn PageDriver,
        layout: &PageLayout,
        episodes: Vec<EpisodeRecord>,
        hint: Option<String>,
        budget: &mut RunBudget,
    ) -> ScheduleOutcome {
        let pages = plan(&layout.tokens, layout.total_episode_count, &episodes);
        let mut outcome = ScheduleOutcome {
            episodes,
            preferred_variant: hint,
            ..ScheduleOutcome::default()
        };

        if pages.is_empty() {
            debug!("Nothing to schedule");
            return outcome;
        }

        if let Err(e) = self.walk(driver, layout, pages, &mut outcome, budget).await {
            warn!(
                error = %e,
                attempted = outcome.attempted.len(),
                "Session lost mid-show, keeping finished episodes"
            );
            outcome.aborted = Some(e);
        }
        outcome
    }

    async fn walk(
        &self,
        driver: &mut dyn PageDriver,
        layout: &PageLayout,
        pages: Vec<PagePlan>,
        outcome: &mut ScheduleOutcome,
        budget: &mut RunBudget,
    ) -> Result<(), DriverError> {
        let mut current_page = layout.active_page.clone();

        'pages: for page in pages {
            if budget.is_exhausted() {
                break;
            }

            if layout.is_multi_page() && current_page.as_deref() != Some(page.token.label.as_str())
            {
                let op = SwitchPage {
                    selectors: &self.selectors.page_dropdown,
                    label: &page.token.label,
                    timing: self.timing(),
                    sync: self.sync,
                };
                match with_retry(&self.policy, driver, op).await {
                    Ok(()) => {
                        info!(page = %page.token.label, "Switched page");
                        current_page = Some(page.token.label.clone());
                    }
                    Err(e) if e.is_session_fatal() => return Err(e),
                    Err(e) => {
                        warn!(page = %page.token.label, error = %e, "Failed to switch page, skipping it");
                        continue;
                    }
                }
            }

            if let Err(e) = driver
                .wait_for(&self.selectors.episode_item, self.sync.episode_list_timeout())
                .await
            {
                if e.is_session_fatal() {
                    return Err(e);
                }
                warn!(page = %page.token.label, error = %e, "Episode slots did not appear");
                continue;
            }

            debug!(
                page = %page.token.label,
                pending = page.indices.len(),
                "Scheduling page"
            );

            for index in page.indices {
                if budget.is_exhausted() {
                    info!(remaining = 0, "Episode budget exhausted");
                    break 'pages;
                }
                let Some(local) = page.token.global_to_local(index) else {
                    continue;
                };

                let Some(label) = self.slot_label(driver, local, index).await? else {
                    debug!(episode = index + 1, "Slot missing from listing, skipping");
                    continue;
                };

                let (record, offered) = self
                    .attempt_episode(driver, local, &label, outcome.preferred_variant.as_deref())
                    .await?;

                if let Some(variant) = &record.variant_used {
                    outcome.preferred_variant = Some(variant.clone());
                }
                for variant in offered.iter().chain(record.variant_resource_map.keys()) {
                    if !outcome.observed_variants.contains(variant) {
                        outcome.observed_variants.push(variant.clone());
                    }
                }

                info!(
                    episode = index + 1,
                    label = %record.display_label,
                    status = %record.status,
                    "Episode attempted"
                );
                place(&mut outcome.episodes, index, record);
                outcome.attempted.push(index);
                budget.consume();
            }
        }

        Ok(())
    }

    /// Label of the slot at `local`, `None` if the listing has no such slot.
    async fn slot_label(
        &self,
        driver: &mut dyn PageDriver,
        local: usize,
        index: usize,
    ) -> Result<Option<String>, DriverError> {
        let slots = match driver.find_all(&self.selectors.episode_item).await {
            Ok(slots) => slots,
            Err(e) if e.is_session_fatal() => return Err(e),
            Err(e) => {
                warn!(error = %e, "Failed to read episode slots");
                return Ok(None);
            }
        };
        let Some(&slot) = slots.get(local) else {
            return Ok(None);
        };

        let badge = match driver.find_within(slot, &self.selectors.episode_badge).await {
            Ok(badge) => badge,
            Err(e) if e.is_session_fatal() => return Err(e),
            Err(_) => None,
        };
        let text = match badge {
            Some(badge) => match driver.read_text(badge).await {
                Ok(text) => text.trim().to_string(),
                Err(e) if e.is_session_fatal() => return Err(e),
                Err(_) => String::new(),
            },
            None => String::new(),
        };

        Ok(Some(if text.is_empty() {
            default_label(index)
        } else {
            text
        }))
    }

    async fn attempt_episode(
        &self,
        driver: &mut dyn PageDriver,
        local: usize,
        label: &str,
        hint: Option<&str>,
    ) -> Result<(EpisodeRecord, Vec<String>), DriverError> {
        let op = OpenEpisode {
            selectors: self.selectors,
            sync: self.sync,
            local,
        };
        match with_retry(&self.policy, driver, op).await {
            Ok(()) => {}
            Err(e) if e.is_session_fatal() => return Err(e),
            Err(e) => {
                warn!(label = %label, error = %e, "Failed to open episode");
                return Ok((EpisodeRecord::failed(label), Vec::new()));
            }
        }

        if let Err(e) = driver
            .wait_for(&self.selectors.player_container, self.sync.element_timeout())
            .await
        {
            if e.is_session_fatal() {
                return Err(e);
            }
            warn!(label = %label, error = %e, "Player did not appear");
            return Ok((EpisodeRecord::failed(label), Vec::new()));
        }

        let resolution = self.resolver.resolve(driver, hint).await?;
        if let Some(reason) = resolution.failure() {
            warn!(label = %label, error = %reason, "No playable variant");
        }
        let record = EpisodeRecord {
            display_label: label.to_string(),
            status: resolution.status,
            primary_resource_locator: resolution.primary_resource_locator,
            variant_used: resolution.variant_used,
            variant_resource_map: resolution.variant_resource_map,
        };
        Ok((record, resolution.offered))
    }
}

/// Number of episodes in `episodes` that `plan` would still schedule.
#[must_use]
pub fn pending_count(total: usize, episodes: &[EpisodeRecord]) -> usize {
    (0..total.max(episodes.len()))
        .filter(|&i| needs_work(episodes, i))
        .count()
}
