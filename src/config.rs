use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::constants::{limits, variants};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub site: SiteConfig,

    pub browser: BrowserConfig,

    pub sync: SyncConfig,

    pub variants: VariantConfig,

    pub validator: ValidatorConfig,

    pub selectors: SelectorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// JSON catalog read at start and rewritten at the end of every run.
    pub catalog_path: String,

    pub log_level: String,

    /// "pretty" or "json"
    pub log_format: String,

    /// Number of tokio worker threads (default: 1)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            catalog_path: "anime_data.json".to_string(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            worker_threads: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Listing page the run starts from; relative links resolve against it.
    pub base_url: String,

    /// Listing entries considered per run.
    pub max_shows: usize,

    /// Chips shown next to genres that are not genres (format, rating, audio).
    pub ignored_tags: Vec<String>,

    /// Decorative separator rendered between metadata entries.
    pub metadata_separator: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://kickass-anime.ru/".to_string(),
            max_shows: limits::DEFAULT_MAX_SHOWS,
            ignored_tags: ["TV", "PG-13", "R", "Airing", "Completed", "SUB", "DUB", "ONA", "OVA"]
                .into_iter()
                .map(String::from)
                .collect(),
            metadata_separator: "•".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,

    /// Chromium binary; autodetected when unset.
    pub executable: Option<String>,

    pub user_agent: String,

    pub window_width: u32,

    pub window_height: u32,

    /// Upper bound for a single navigation to settle (default: 90)
    pub navigation_timeout_seconds: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36".to_string(),
            window_width: 1920,
            window_height: 1080,
            navigation_timeout_seconds: 90,
        }
    }
}

impl BrowserConfig {
    #[must_use]
    pub const fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Episodes a single run may attempt across all shows.
    pub episode_budget: usize,

    /// Optional cap on episodes attempted for one show in one run.
    pub per_show_limit: Option<usize>,

    pub element_timeout_seconds: u64,

    pub episode_list_timeout_seconds: u64,

    pub dropdown_settle_ms: u64,

    pub dismiss_settle_ms: u64,

    pub page_switch_settle_ms: u64,

    pub episode_settle_ms: u64,

    pub variant_settle_ms: u64,

    /// Substring the URL must contain once an episode slot has been opened.
    pub episode_url_marker: String,

    pub retry: RetryConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            episode_budget: limits::DEFAULT_EPISODE_BUDGET,
            per_show_limit: None,
            element_timeout_seconds: 30,
            episode_list_timeout_seconds: 15,
            dropdown_settle_ms: 1000,
            dismiss_settle_ms: 500,
            page_switch_settle_ms: 3000,
            episode_settle_ms: 3000,
            variant_settle_ms: 2000,
            episode_url_marker: "/ep-".to_string(),
            retry: RetryConfig::default(),
        }
    }
}

impl SyncConfig {
    #[must_use]
    pub const fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_seconds)
    }

    #[must_use]
    pub const fn episode_list_timeout(&self) -> Duration {
        Duration::from_secs(self.episode_list_timeout_seconds)
    }

    #[must_use]
    pub const fn dropdown_settle(&self) -> Duration {
        Duration::from_millis(self.dropdown_settle_ms)
    }

    #[must_use]
    pub const fn dismiss_settle(&self) -> Duration {
        Duration::from_millis(self.dismiss_settle_ms)
    }

    #[must_use]
    pub const fn page_switch_settle(&self) -> Duration {
        Duration::from_millis(self.page_switch_settle_ms)
    }

    #[must_use]
    pub const fn episode_settle(&self) -> Duration {
        Duration::from_millis(self.episode_settle_ms)
    }

    #[must_use]
    pub const fn variant_settle(&self) -> Duration {
        Duration::from_millis(self.variant_settle_ms)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    /// Percentage-based jitter to spread out retries.
    pub jitter_ratio: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 1000,
            backoff_max_ms: 5000,
            jitter_ratio: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantConfig {
    /// Case-insensitive patterns. When any offered variant matches one, only
    /// matching variants are tried.
    pub priority_patterns: Vec<String>,

    pub fallback_variant: String,
}

impl Default for VariantConfig {
    fn default() -> Self {
        Self {
            priority_patterns: Vec::new(),
            fallback_variant: variants::FALLBACK_LABEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Host, path or query fragments that mark a locator as a playable stream.
    pub allow_list: Vec<String>,

    /// Values the player reports when nothing is loaded.
    pub sentinels: Vec<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            allow_list: ["/player", "/embed", "/e/", "player.php", ".m3u8", ".mp4"]
                .into_iter()
                .map(String::from)
                .collect(),
            sentinels: ["about:blank", "not found", "not available", "null", "undefined"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// A dropdown control identified by the caption it carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropdownSelectors {
    pub container: String,
    pub label: String,
    /// Caption text (substring) telling this dropdown apart from its siblings.
    pub label_text: String,
    pub selection: String,
    pub option: String,
}

impl DropdownSelectors {
    fn vuetify(label_text: &str) -> Self {
        Self {
            container: ".v-select".to_string(),
            label: ".v-label".to_string(),
            label_text: label_text.to_string(),
            selection: ".v-select__selection".to_string(),
            option: ".v-list-item .v-list-item__title".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub show_item: String,
    pub show_link: String,
    pub show_poster: String,

    pub info_card: String,
    pub title: String,
    pub card: String,
    pub card_heading: String,
    pub synopsis_heading_text: String,
    pub synopsis_body: String,
    pub genre_chip: String,
    pub metadata_container: String,
    pub metadata_item: String,
    pub watch_button: String,

    pub player_container: String,
    pub episode_item: String,
    pub episode_badge: String,
    pub resource: String,
    pub resource_attribute: String,

    pub page_dropdown: DropdownSelectors,
    pub variant_dropdown: DropdownSelectors,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            show_item: ".latest-update .row.mt-0 .show-item".to_string(),
            show_link: "h2.show-title a".to_string(),
            show_poster: ".v-image__image--cover".to_string(),
            info_card: ".anime-info-card".to_string(),
            title: ".anime-info-card .v-card__title span".to_string(),
            card: ".v-card".to_string(),
            card_heading: ".v-card__title".to_string(),
            synopsis_heading_text: "Synopsis".to_string(),
            synopsis_body: ".text-caption".to_string(),
            genre_chip: ".anime-info-card .v-chip--outlined .v-chip__content".to_string(),
            metadata_container:
                ".anime-info-card .d-flex.mb-3, .anime-info-card .d-flex.mt-2.mb-3".to_string(),
            metadata_item: ".text-subtitle-2".to_string(),
            watch_button: "a.v-btn[href*=\"/ep-\"]".to_string(),
            player_container: ".player-container".to_string(),
            episode_item: ".episode-item".to_string(),
            episode_badge: ".episode-badge .v-chip__content".to_string(),
            resource: "iframe.player".to_string(),
            resource_attribute: "src".to_string(),
            page_dropdown: DropdownSelectors::vuetify("Page"),
            variant_dropdown: DropdownSelectors::vuetify("Sub/Dub"),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("streamdex").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".streamdex").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.site.base_url.trim().is_empty() {
            anyhow::bail!("site.base_url cannot be empty");
        }

        url::Url::parse(&self.site.base_url)
            .with_context(|| format!("site.base_url is not a URL: {}", self.site.base_url))?;

        if self.sync.episode_budget == 0 {
            anyhow::bail!("sync.episode_budget must be > 0");
        }

        if self.sync.per_show_limit == Some(0) {
            anyhow::bail!("sync.per_show_limit must be > 0 when set");
        }

        if self.sync.retry.max_attempts == 0 {
            anyhow::bail!("sync.retry.max_attempts must be > 0");
        }

        for pattern in &self.variants.priority_patterns {
            regex::RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .with_context(|| format!("Invalid variant priority pattern: {pattern}"))?;
        }

        Ok(())
    }
}
