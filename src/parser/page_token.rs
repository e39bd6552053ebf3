use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

/// One entry of a listing's page selector: a contiguous range of episodes.
///
/// Bounds are 1-based and inclusive, as the listing prints them; `label` is the
/// literal option text needed to select the page again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageToken {
    pub start: usize,
    pub end: usize,
    pub label: String,
}

fn range_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?P<start>\d+)\s*-\s*(?P<end>\d+)\s*$")
            .expect("Invalid regex pattern defined in code")
    })
}

impl PageToken {
    /// Parses a page option label such as `01-100`.
    ///
    /// Anything that is not a strict numeric range is rejected, so options
    /// belonging to an unrelated control never turn into pages.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        let caps = range_regex().captures(label)?;
        let start: usize = caps.name("start")?.as_str().parse().ok()?;
        let end: usize = caps.name("end")?.as_str().parse().ok()?;

        if start == 0 || end < start {
            return None;
        }

        Some(Self {
            start,
            end,
            label: label.trim().to_string(),
        })
    }

    /// A token covering `1..=count`, for listings without a page selector.
    #[must_use]
    pub fn synthetic(count: usize) -> Self {
        Self {
            start: 1,
            end: count,
            label: format!("1-{count}"),
        }
    }

    /// Global (0-based) episode indices covered by this page.
    #[must_use]
    pub const fn global_range(&self) -> Range<usize> {
        (self.start - 1)..self.end
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.end + 1 - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end < self.start
    }

    #[must_use]
    pub const fn contains(&self, global_index: usize) -> bool {
        global_index + 1 >= self.start && global_index < self.end
    }

    /// Maps a slot position in the live listing to its global episode index.
    #[must_use]
    pub const fn local_to_global(&self, local_index: usize) -> usize {
        self.start - 1 + local_index
    }

    /// Inverse of [`Self::local_to_global`], `None` outside this page.
    #[must_use]
    pub const fn global_to_local(&self, global_index: usize) -> Option<usize> {
        if self.contains(global_index) {
            Some(global_index + 1 - self.start)
        } else {
            None
        }
    }
}

/// Keeps the options that are page ranges, ordered by their first episode.
#[must_use]
pub fn collect_tokens<'a>(labels: impl IntoIterator<Item = &'a str>) -> Vec<PageToken> {
    let mut tokens: Vec<PageToken> = labels.into_iter().filter_map(PageToken::parse).collect();
    tokens.sort_by_key(|t| (t.start, t.end));
    tokens.dedup_by(|a, b| a.start == b.start && a.end == b.end);
    tokens
}
