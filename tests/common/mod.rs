//! Scripted in-memory site for integration tests.
//!
//! Mirrors the markup the default selectors expect: a listing of show items,
//! a detail page with an info card, and episode pages carrying an episode
//! list, a page dropdown, a variant dropdown and a player frame. Every
//! navigation, click or key press starts a new handle generation, exactly
//! like the real driver.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use streamdex::config::{Config, SelectorConfig};
use streamdex::driver::{DriverError, ElementRef, HandleTable, PageDriver};

pub const BASE: &str = "https://site.test/";
pub const JAPANESE: &str = "Japanese (SUB)";
pub const ENGLISH: &str = "English (DUB)";

/// Config with zero pauses, pointed at [`BASE`].
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.site.base_url = BASE.to_string();
    config.sync.retry.backoff_base_ms = 0;
    config.sync.retry.backoff_max_ms = 0;
    config.sync.retry.jitter_ratio = 0.0;
    config.sync.dropdown_settle_ms = 0;
    config.sync.dismiss_settle_ms = 0;
    config.sync.page_switch_settle_ms = 0;
    config.sync.episode_settle_ms = 0;
    config.sync.variant_settle_ms = 0;
    config
}

pub fn temp_catalog() -> PathBuf {
    std::env::temp_dir().join(format!("streamdex-test-{}.json", uuid::Uuid::new_v4()))
}

pub fn player_url(slug: &str, number: usize, variant: &str) -> String {
    let variant = variant.split_whitespace().next().unwrap_or("x").to_lowercase();
    format!("https://cdn.test/player?id={slug}-{number}-{variant}")
}

#[derive(Debug, Clone)]
pub struct FakeEpisode {
    pub label: Option<String>,
    /// Resource shown for each variant; missing ones render `about:blank`.
    pub resources: BTreeMap<String, String>,
    /// When false, clicking the slot never reaches the episode page.
    pub opens: bool,
}

#[derive(Debug, Clone)]
pub struct FakeShow {
    pub slug: String,
    pub title: String,
    pub synopsis: String,
    pub genres: Vec<String>,
    pub metadata: Vec<String>,
    pub poster: Option<String>,
    pub watch_button: bool,
    pub page_size: Option<usize>,
    /// Page selector options rendered verbatim instead of ranges.
    pub page_options: Option<Vec<String>>,
    pub variants: Vec<String>,
    pub episodes: Vec<FakeEpisode>,
}

impl FakeShow {
    /// A show whose episodes all play in both default variants.
    pub fn new(slug: &str, episode_count: usize) -> Self {
        let variants = vec![JAPANESE.to_string(), ENGLISH.to_string()];
        let episodes = (1..=episode_count)
            .map(|n| FakeEpisode {
                label: Some(format!("EP {n}")),
                resources: variants
                    .iter()
                    .map(|v| (v.clone(), player_url(slug, n, v)))
                    .collect(),
                opens: true,
            })
            .collect();

        Self {
            slug: slug.to_string(),
            title: format!("Show {slug}"),
            synopsis: format!("Synopsis of {slug}"),
            genres: vec!["TV".into(), "2025".into(), "Action".into(), "24 min".into()],
            metadata: vec!["Fall 2025".into(), "•".into(), "Studio".into()],
            poster: Some(format!("/posters/{slug}.webp")),
            watch_button: true,
            page_size: None,
            page_options: None,
            variants,
            episodes,
        }
    }

    pub fn paged(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn with_page_options(mut self, options: &[&str]) -> Self {
        self.page_options = Some(options.iter().map(|o| (*o).to_string()).collect());
        self
    }

    pub fn without_watch_button(mut self) -> Self {
        self.watch_button = false;
        self
    }

    pub fn with_variants(mut self, variants: &[&str]) -> Self {
        self.variants = variants.iter().map(|v| (*v).to_string()).collect();
        let slug = self.slug.clone();
        for (i, episode) in self.episodes.iter_mut().enumerate() {
            episode.resources = self
                .variants
                .iter()
                .map(|v| (v.clone(), player_url(&slug, i + 1, v)))
                .collect();
        }
        self
    }

    pub fn id(&self) -> String {
        format!("{BASE}{}", self.slug)
    }

    fn episode_url(&self, index: usize) -> String {
        format!("{BASE}{}/ep-{}", self.slug, index + 1)
    }

    fn page_labels(&self) -> Vec<String> {
        if let Some(options) = &self.page_options {
            return options.clone();
        }
        let Some(size) = self.page_size else {
            return Vec::new();
        };
        let total = self.episodes.len();
        (0..total.div_ceil(size))
            .map(|p| format!("{:02}-{:02}", p * size + 1, ((p + 1) * size).min(total)))
            .collect()
    }

    fn page_of(&self, index: usize) -> usize {
        self.page_size.map_or(0, |size| index / size)
    }

    fn page_slots(&self, page: usize) -> std::ops::Range<usize> {
        match self.page_size {
            Some(size) => (page * size)..((page + 1) * size).min(self.episodes.len()),
            None => 0..self.episodes.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Page,
    Variant,
}

#[derive(Debug, Clone, Copy)]
enum Node {
    Body,
    ShowItem(usize),
    ShowLink(usize),
    ShowPoster(usize),
    InfoCard,
    Title,
    Card(usize),
    CardHeading(usize),
    SynopsisBody,
    GenreChip(usize),
    MetadataContainer,
    MetadataItem(usize),
    WatchButton,
    PlayerContainer,
    EpisodeItem(usize),
    EpisodeBadge(usize),
    Resource,
    Dropdown(Control),
    DropdownLabel(Control),
    DropdownSelection(Control),
    DropdownOption(Control, usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Blank,
    Listing,
    Detail(usize),
    Episode { show: usize, episode: usize },
}

pub struct FakeSite {
    selectors: SelectorConfig,
    pub shows: Vec<FakeShow>,
    location: Location,
    url: String,
    page: usize,
    variant: String,
    open: Option<Control>,
    handles: HandleTable<Node>,
    lost: bool,
    /// Every URL navigated to, in order.
    pub navigations: Vec<String>,
    /// `(slug, global index)` of every episode page reached by a click.
    pub opened_episodes: Vec<(String, usize)>,
    /// Variants whose option click is silently ignored.
    pub broken_variants: Vec<String>,
    /// Navigations allowed before the session dies.
    pub session_lost_after: Option<usize>,
    /// Episode pages reached by clicking before the session dies.
    pub session_lost_after_episodes: Option<usize>,
    /// Hides the variant selector's current selection.
    pub hidden_variant_selection: bool,
}

impl FakeSite {
    pub fn new(shows: Vec<FakeShow>) -> Self {
        Self {
            selectors: SelectorConfig::default(),
            shows,
            location: Location::Blank,
            url: "about:blank".to_string(),
            page: 0,
            variant: String::new(),
            open: None,
            handles: HandleTable::new(),
            lost: false,
            navigations: Vec::new(),
            opened_episodes: Vec::new(),
            broken_variants: Vec::new(),
            session_lost_after: None,
            session_lost_after_episodes: None,
            hidden_variant_selection: false,
        }
    }

    pub fn current_variant(&self) -> &str {
        &self.variant
    }

    pub fn visited(&self, url: &str) -> bool {
        self.navigations.iter().any(|u| u == url)
    }

    /// Episode indices of `slug` reached by clicking, in order.
    pub fn opened(&self, slug: &str) -> Vec<usize> {
        self.opened_episodes
            .iter()
            .filter(|(s, _)| s == slug)
            .map(|(_, i)| *i)
            .collect()
    }

    fn check(&self) -> Result<(), DriverError> {
        if self.lost {
            return Err(DriverError::Session("browser closed".to_string()));
        }
        Ok(())
    }

    fn show(&self) -> Option<&FakeShow> {
        match self.location {
            Location::Detail(show) | Location::Episode { show, .. } => self.shows.get(show),
            _ => None,
        }
    }

    fn options(&self, control: Control) -> Vec<String> {
        let Some(show) = self.show() else {
            return Vec::new();
        };
        match control {
            Control::Page => show.page_labels(),
            Control::Variant => show.variants.clone(),
        }
    }

    fn controls(&self) -> Vec<Node> {
        let Some(show) = self.show() else {
            return Vec::new();
        };
        if !matches!(self.location, Location::Episode { .. }) {
            return Vec::new();
        }
        let mut controls = Vec::new();
        if show.page_size.is_some() || show.page_options.is_some() {
            controls.push(Node::Dropdown(Control::Page));
        }
        if !show.variants.is_empty() {
            controls.push(Node::Dropdown(Control::Variant));
        }
        controls
    }

    fn query(&self, selector: &str) -> Vec<Node> {
        let s = &self.selectors;
        match self.location {
            Location::Listing if selector == s.show_item => {
                (0..self.shows.len()).map(Node::ShowItem).collect()
            }
            Location::Detail(show) => {
                let show = &self.shows[show];
                if selector == s.info_card {
                    vec![Node::InfoCard]
                } else if selector == s.title {
                    vec![Node::Title]
                } else if selector == s.card {
                    vec![Node::Card(0), Node::Card(1)]
                } else if selector == s.genre_chip {
                    (0..show.genres.len()).map(Node::GenreChip).collect()
                } else if selector == s.metadata_container {
                    vec![Node::MetadataContainer]
                } else if selector == s.watch_button && show.watch_button {
                    vec![Node::WatchButton]
                } else {
                    self.common(selector)
                }
            }
            Location::Episode { show, .. } => {
                let show = &self.shows[show];
                if selector == s.player_container || selector == s.resource {
                    vec![if selector == s.resource {
                        Node::Resource
                    } else {
                        Node::PlayerContainer
                    }]
                } else if selector == s.episode_item {
                    (0..show.page_slots(self.page).len())
                        .map(Node::EpisodeItem)
                        .collect()
                } else if selector == s.variant_dropdown.container {
                    self.controls()
                } else if selector == s.variant_dropdown.option {
                    self.open
                        .map(|c| {
                            (0..self.options(c).len())
                                .map(|i| Node::DropdownOption(c, i))
                                .collect()
                        })
                        .unwrap_or_default()
                } else {
                    self.common(selector)
                }
            }
            _ => self.common(selector),
        }
    }

    fn common(&self, selector: &str) -> Vec<Node> {
        if selector == "body" {
            vec![Node::Body]
        } else {
            Vec::new()
        }
    }

    fn query_within(&self, parent: Node, selector: &str) -> Vec<Node> {
        let s = &self.selectors;
        match parent {
            Node::ShowItem(i) if selector == s.show_link => vec![Node::ShowLink(i)],
            Node::ShowItem(i) if selector == s.show_poster => vec![Node::ShowPoster(i)],
            Node::Card(k) if selector == s.card_heading => vec![Node::CardHeading(k)],
            Node::Card(1) if selector == s.synopsis_body => vec![Node::SynopsisBody],
            Node::MetadataContainer if selector == s.metadata_item => self
                .show()
                .map(|show| (0..show.metadata.len()).map(Node::MetadataItem).collect())
                .unwrap_or_default(),
            Node::EpisodeItem(local) if selector == s.episode_badge => {
                let has_label = self
                    .global_index(local)
                    .and_then(|g| self.show().and_then(|show| show.episodes.get(g)))
                    .is_some_and(|ep| ep.label.is_some());
                if has_label {
                    vec![Node::EpisodeBadge(local)]
                } else {
                    Vec::new()
                }
            }
            Node::Dropdown(c) if selector == s.variant_dropdown.label => {
                vec![Node::DropdownLabel(c)]
            }
            Node::Dropdown(Control::Variant)
                if selector == s.variant_dropdown.selection && self.hidden_variant_selection =>
            {
                Vec::new()
            }
            Node::Dropdown(c) if selector == s.variant_dropdown.selection => {
                vec![Node::DropdownSelection(c)]
            }
            _ => Vec::new(),
        }
    }

    fn global_index(&self, local: usize) -> Option<usize> {
        let show = self.show()?;
        let slots = show.page_slots(self.page);
        let global = slots.start + local;
        slots.contains(&global).then_some(global)
    }

    fn register(&mut self, nodes: Vec<Node>) -> Vec<ElementRef> {
        nodes.into_iter().map(|n| self.handles.insert(n)).collect()
    }

    fn text_of(&self, node: Node) -> String {
        let show = self.show();
        match node {
            Node::Title => show.map(|s| s.title.clone()).unwrap_or_default(),
            Node::CardHeading(0) => show.map(|s| s.title.clone()).unwrap_or_default(),
            Node::CardHeading(_) => "Synopsis".to_string(),
            Node::SynopsisBody => show.map(|s| s.synopsis.clone()).unwrap_or_default(),
            Node::GenreChip(j) => show.and_then(|s| s.genres.get(j).cloned()).unwrap_or_default(),
            Node::MetadataItem(j) => show
                .and_then(|s| s.metadata.get(j).cloned())
                .unwrap_or_default(),
            Node::EpisodeBadge(local) => self
                .global_index(local)
                .and_then(|g| show.and_then(|s| s.episodes.get(g)))
                .and_then(|ep| ep.label.clone())
                .unwrap_or_default(),
            Node::DropdownLabel(Control::Page) => "Page".to_string(),
            Node::DropdownLabel(Control::Variant) => "Sub/Dub".to_string(),
            Node::DropdownSelection(Control::Page) => self
                .options(Control::Page)
                .get(self.page)
                .cloned()
                .unwrap_or_default(),
            Node::DropdownSelection(Control::Variant) => self.variant.clone(),
            Node::DropdownOption(c, j) => self.options(c).get(j).cloned().unwrap_or_default(),
            _ => String::new(),
        }
    }

    fn attribute_of(&self, node: Node, name: &str) -> Option<String> {
        match (node, name) {
            (Node::ShowLink(i), "href") => Some(format!("/{}", self.shows[i].slug)),
            (Node::ShowPoster(i), "style") => self.shows[i]
                .poster
                .as_ref()
                .map(|p| format!("background-image: url(\"{p}\"); background-size: cover")),
            (Node::WatchButton, "href") => self.show().map(|s| format!("/{}/ep-1", s.slug)),
            (Node::Resource, "src") => {
                let Location::Episode { show, episode } = self.location else {
                    return None;
                };
                Some(
                    self.shows[show].episodes[episode]
                        .resources
                        .get(&self.variant)
                        .cloned()
                        .unwrap_or_else(|| "about:blank".to_string()),
                )
            }
            _ => None,
        }
    }

    fn activate(&mut self, node: Node) {
        match node {
            Node::Dropdown(c) => self.open = Some(c),
            Node::DropdownOption(c, j) => {
                let label = self.options(c).get(j).cloned().unwrap_or_default();
                match c {
                    Control::Page => self.page = j,
                    Control::Variant if self.broken_variants.contains(&label) => {}
                    Control::Variant => self.variant = label,
                }
                self.open = None;
            }
            Node::EpisodeItem(local) => {
                let (Some(global), Location::Episode { show, .. }) =
                    (self.global_index(local), self.location)
                else {
                    return;
                };
                let fake = &self.shows[show];
                if fake.episodes[global].opens {
                    self.url = fake.episode_url(global);
                    self.opened_episodes.push((fake.slug.clone(), global));
                    self.location = Location::Episode {
                        show,
                        episode: global,
                    };
                } else {
                    self.url = format!("{BASE}{}/loading", fake.slug);
                }
            }
            _ => {}
        }
    }
}

#[async_trait]
impl PageDriver for FakeSite {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.check()?;
        self.handles.invalidate();
        self.open = None;

        if let Some(limit) = self.session_lost_after {
            if self.navigations.len() >= limit {
                self.lost = true;
                return self.check();
            }
        }
        self.navigations.push(url.to_string());

        let Some(path) = url.strip_prefix(BASE) else {
            return Err(DriverError::Timeout(Duration::from_secs(90)));
        };

        if path.is_empty() {
            self.location = Location::Listing;
        } else {
            let (slug, episode) = match path.split_once("/ep-") {
                Some((slug, n)) => (slug, n.parse::<usize>().ok()),
                None => (path, None),
            };
            let Some(show) = self.shows.iter().position(|s| s.slug == slug) else {
                return Err(DriverError::Timeout(Duration::from_secs(90)));
            };
            match episode {
                Some(n) if n >= 1 && n <= self.shows[show].episodes.len() => {
                    let fake = &self.shows[show];
                    self.page = fake.page_of(n - 1);
                    self.variant = fake.variants.first().cloned().unwrap_or_default();
                    self.location = Location::Episode {
                        show,
                        episode: n - 1,
                    };
                }
                Some(_) => return Err(DriverError::Timeout(Duration::from_secs(90))),
                None => self.location = Location::Detail(show),
            }
        }

        self.url = url.to_string();
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        self.check()?;
        Ok(self.url.clone())
    }

    async fn find_one(&mut self, selector: &str) -> Result<Option<ElementRef>, DriverError> {
        Ok(self.find_all(selector).await?.into_iter().next())
    }

    async fn find_all(&mut self, selector: &str) -> Result<Vec<ElementRef>, DriverError> {
        self.check()?;
        let nodes = self.query(selector);
        Ok(self.register(nodes))
    }

    async fn find_within(
        &mut self,
        parent: ElementRef,
        selector: &str,
    ) -> Result<Option<ElementRef>, DriverError> {
        Ok(self
            .find_all_within(parent, selector)
            .await?
            .into_iter()
            .next())
    }

    async fn find_all_within(
        &mut self,
        parent: ElementRef,
        selector: &str,
    ) -> Result<Vec<ElementRef>, DriverError> {
        self.check()?;
        let parent = *self.handles.get(parent)?;
        let nodes = self.query_within(parent, selector);
        Ok(self.register(nodes))
    }

    async fn click(&mut self, element: ElementRef) -> Result<(), DriverError> {
        self.check()?;
        let node = *self.handles.get(element)?;
        if matches!(node, Node::EpisodeItem(_))
            && self
                .session_lost_after_episodes
                .is_some_and(|limit| self.opened_episodes.len() >= limit)
        {
            self.lost = true;
            return self.check();
        }
        self.handles.invalidate();
        self.activate(node);
        Ok(())
    }

    async fn read_attribute(
        &mut self,
        element: ElementRef,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        self.check()?;
        let node = *self.handles.get(element)?;
        Ok(self.attribute_of(node, name))
    }

    async fn read_text(&mut self, element: ElementRef) -> Result<String, DriverError> {
        self.check()?;
        let node = *self.handles.get(element)?;
        Ok(self.text_of(node))
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        self.check()?;
        if self.query(selector).is_empty() {
            return Err(DriverError::Timeout(timeout));
        }
        Ok(())
    }

    async fn press_key(&mut self, key: &str) -> Result<(), DriverError> {
        self.check()?;
        self.handles.invalidate();
        if key == "Escape" {
            self.open = None;
        }
        Ok(())
    }

    async fn settle(&mut self, _duration: Duration) {}
}
