//! Listing discovery and detail-page scraping.

use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{Config, SelectorConfig, SiteConfig, SyncConfig};
use crate::constants::{intervals, limits};
use crate::domain::ShowId;
use crate::driver::{DriverError, ElementRef, PageDriver};
use crate::models::{ShowDetails, ShowLink};
use crate::parser::url::{resolve, style_background_url};
use crate::services::sync::SyncError;

/// Chips that describe the release, not the genre (`2024`, `24 min`).
fn release_chip_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:\d{4}|\d+\s*min)$").expect("Invalid regex pattern defined in code")
    })
}

/// Genre chips minus configured tags, years, durations and episode counters.
#[must_use]
pub fn clean_genres(chips: &[String], ignored: &[String]) -> Vec<String> {
    let mut genres: Vec<String> = Vec::new();
    for chip in chips {
        let chip = chip.trim();
        if chip.is_empty()
            || ignored.iter().any(|tag| tag.eq_ignore_ascii_case(chip))
            || release_chip_regex().is_match(chip)
            || chip.starts_with("EP")
        {
            continue;
        }
        if !genres.iter().any(|g| g == chip) {
            genres.push(chip.to_string());
        }
    }
    genres
}

/// Trimmed metadata texts without blanks and separator glyphs.
#[must_use]
pub fn clean_metadata(texts: &[String], separator: &str) -> Vec<String> {
    texts
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty() && *t != separator.trim())
        .map(str::to_string)
        .collect()
}

pub struct ShowScraper<'a> {
    site: &'a SiteConfig,
    selectors: &'a SelectorConfig,
    sync: &'a SyncConfig,
    base: &'a Url,
}

impl<'a> ShowScraper<'a> {
    #[must_use]
    pub const fn new(config: &'a Config, base: &'a Url) -> Self {
        Self {
            site: &config.site,
            selectors: &config.selectors,
            sync: &config.sync,
            base,
        }
    }

    /// Opens the listing and reads every entry before leaving it.
    pub async fn discover(&self, driver: &mut dyn PageDriver) -> Result<Vec<ShowLink>, SyncError> {
        driver.navigate(self.base.as_str()).await?;
        driver
            .wait_for(&self.selectors.show_item, self.sync.element_timeout())
            .await?;

        let items = driver.find_all(&self.selectors.show_item).await?;
        info!(found = items.len(), limit = self.site.max_shows, "Listing loaded");

        let mut links: Vec<ShowLink> = Vec::new();
        for (position, item) in items.into_iter().take(self.site.max_shows).enumerate() {
            let Some(id) = self.read_link(driver, item).await? else {
                warn!(position = position + 1, "Listing entry has no detail link, skipping");
                continue;
            };
            if links.iter().any(|l| l.id == id) {
                continue;
            }

            let poster_locator = self.read_poster(driver, item).await?;
            debug!(show = %id, poster = ?poster_locator, "Listing entry");
            links.push(ShowLink { id, poster_locator });
        }

        Ok(links)
    }

    async fn read_link(
        &self,
        driver: &mut dyn PageDriver,
        item: ElementRef,
    ) -> Result<Option<ShowId>, DriverError> {
        let Some(anchor) = driver.find_within(item, &self.selectors.show_link).await? else {
            return Ok(None);
        };
        let href = driver.read_attribute(anchor, "href").await?;
        Ok(href
            .and_then(|href| resolve(self.base, &href))
            .map(ShowId::from))
    }

    /// Posters load lazily, so an empty style is read again a few times.
    async fn read_poster(
        &self,
        driver: &mut dyn PageDriver,
        item: ElementRef,
    ) -> Result<Option<String>, DriverError> {
        for attempt in 1..=limits::POSTER_ATTEMPTS {
            if let Some(cover) = driver.find_within(item, &self.selectors.show_poster).await? {
                let style = driver.read_attribute(cover, "style").await?;
                if let Some(path) = style.as_deref().and_then(style_background_url) {
                    return Ok(resolve(self.base, path));
                }
            }
            if attempt < limits::POSTER_ATTEMPTS {
                driver.settle(intervals::POSTER_RETRY).await;
            }
        }
        Ok(None)
    }

    /// Navigates to the show's detail page and reads its descriptive fields.
    pub async fn scrape_details(
        &self,
        driver: &mut dyn PageDriver,
        id: &ShowId,
    ) -> Result<ShowDetails, SyncError> {
        driver.navigate(id.as_str()).await?;
        driver
            .wait_for(&self.selectors.info_card, self.sync.element_timeout())
            .await?;

        let title = match driver.find_one(&self.selectors.title).await? {
            Some(el) => driver.read_text(el).await?.trim().to_string(),
            None => String::new(),
        };

        let synopsis = self.read_synopsis(driver).await?;

        let chips = self.read_texts(driver, &self.selectors.genre_chip).await?;
        let genres = clean_genres(&chips, &self.site.ignored_tags);

        let metadata = match driver.find_one(&self.selectors.metadata_container).await? {
            Some(container) => {
                let mut texts = Vec::new();
                for el in driver
                    .find_all_within(container, &self.selectors.metadata_item)
                    .await?
                {
                    texts.push(driver.read_text(el).await?);
                }
                clean_metadata(&texts, &self.site.metadata_separator)
            }
            None => Vec::new(),
        };

        let first_episode_url = match driver.find_one(&self.selectors.watch_button).await? {
            Some(button) => driver
                .read_attribute(button, "href")
                .await?
                .and_then(|href| resolve(self.base, &href)),
            None => None,
        };

        debug!(
            show = %id,
            title = %title,
            genres = genres.len(),
            first_episode = ?first_episode_url,
            "Scraped details"
        );

        Ok(ShowDetails {
            title,
            synopsis,
            genres,
            metadata,
            first_episode_url,
        })
    }

    /// Body of the card whose heading mentions the synopsis heading text.
    async fn read_synopsis(&self, driver: &mut dyn PageDriver) -> Result<String, DriverError> {
        for card in driver.find_all(&self.selectors.card).await? {
            let Some(heading) = driver.find_within(card, &self.selectors.card_heading).await? else {
                continue;
            };
            let heading = driver.read_text(heading).await?;
            if !heading.contains(&self.selectors.synopsis_heading_text) {
                continue;
            }
            if let Some(body) = driver.find_within(card, &self.selectors.synopsis_body).await? {
                return Ok(driver.read_text(body).await?.trim().to_string());
            }
        }
        Ok(String::new())
    }

    async fn read_texts(
        &self,
        driver: &mut dyn PageDriver,
        selector: &str,
    ) -> Result<Vec<String>, DriverError> {
        let mut texts = Vec::new();
        for el in driver.find_all(selector).await? {
            texts.push(driver.read_text(el).await?);
        }
        Ok(texts)
    }
}
