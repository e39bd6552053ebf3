//! Pagination Mapper: turns the episode listing's page selector into
//! [`PageToken`]s and a total episode count.
//!
//! Page tokens win when the selector yields at least two strict `start-end`
//! options. Otherwise (no selector, one page, or a selector whose options are
//! not ranges) the slots visible right now are counted instead. Nothing in
//! here fails the show: lookup errors degrade to the direct count.

use tracing::{debug, warn};

use crate::config::{SelectorConfig, SyncConfig};
use crate::driver::dropdown::{self, DropdownTiming};
use crate::driver::{DriverError, PageDriver};
use crate::parser::{PageToken, collect_tokens};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLayout {
    pub tokens: Vec<PageToken>,
    pub total_episode_count: usize,
    /// Label of the page the listing currently shows.
    pub active_page: Option<String>,
}

impl PageLayout {
    /// Layout for a listing without usable pagination.
    #[must_use]
    pub fn single(count: usize) -> Self {
        if count == 0 {
            return Self {
                tokens: Vec::new(),
                total_episode_count: 0,
                active_page: None,
            };
        }
        let token = PageToken::synthetic(count);
        Self {
            active_page: Some(token.label.clone()),
            tokens: vec![token],
            total_episode_count: count,
        }
    }

    /// Layout built from page selector tokens, `None` if they are not enough
    /// to trust over a direct count.
    #[must_use]
    pub fn from_tokens(tokens: Vec<PageToken>, active_page: Option<String>) -> Option<Self> {
        if tokens.len() < 2 {
            return None;
        }
        let total_episode_count = tokens.last().map_or(0, |t| t.end);
        Some(Self {
            tokens,
            total_episode_count,
            active_page,
        })
    }

    #[must_use]
    pub fn is_multi_page(&self) -> bool {
        self.tokens.len() > 1
    }
}

pub struct PaginationMapper<'a> {
    selectors: &'a SelectorConfig,
    sync: &'a SyncConfig,
}

impl<'a> PaginationMapper<'a> {
    #[must_use]
    pub const fn new(selectors: &'a SelectorConfig, sync: &'a SyncConfig) -> Self {
        Self { selectors, sync }
    }

    fn timing(&self) -> DropdownTiming {
        DropdownTiming {
            open: self.sync.dropdown_settle(),
            dismiss: self.sync.dismiss_settle(),
        }
    }

    /// Reads the page layout of an already opened episode listing.
    pub async fn map(&self, driver: &mut dyn PageDriver) -> PageLayout {
        match self.read_tokens(driver).await {
            Ok(Some(layout)) => {
                debug!(
                    pages = layout.tokens.len(),
                    total = layout.total_episode_count,
                    "Using page selector"
                );
                return layout;
            }
            Ok(None) => debug!("No multi-page selector, counting slots"),
            Err(e) => warn!(error = %e, "Failed to read page selector, counting slots"),
        }

        let count = self.count_visible_slots(driver).await;
        debug!(total = count, "Counted visible episode slots");
        PageLayout::single(count)
    }

    async fn read_tokens(
        &self,
        driver: &mut dyn PageDriver,
    ) -> Result<Option<PageLayout>, DriverError> {
        let page_dropdown = &self.selectors.page_dropdown;
        if dropdown::locate(driver, page_dropdown).await?.is_none() {
            return Ok(None);
        }

        let active = dropdown::active_label(driver, page_dropdown).await?;
        let options = dropdown::read_options(driver, page_dropdown, self.timing()).await?;
        let tokens = collect_tokens(options.iter().map(String::as_str));

        if tokens.is_empty() && !options.is_empty() {
            warn!(options = ?options, "Page selector offered no episode ranges");
        }

        Ok(PageLayout::from_tokens(tokens, active))
    }

    async fn count_visible_slots(&self, driver: &mut dyn PageDriver) -> usize {
        let selector = &self.selectors.episode_item;
        if let Err(e) = driver
            .wait_for(selector, self.sync.episode_list_timeout())
            .await
        {
            warn!(error = %e, "Episode slots did not appear");
        }

        match driver.find_all(selector).await {
            Ok(slots) => slots.len(),
            Err(e) => {
                warn!(error = %e, "Failed to count episode slots");
                0
            }
        }
    }
}
