//! Domain primitives for the show catalog.
//!
//! Newtypes here keep show identifiers apart from ordinary strings and make the
//! per-run work budget an explicit value instead of a loose counter.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical identifier of a show: its absolute detail-page URL.
///
/// This is the join key between the persisted catalog and a fresh crawl, so it
/// must be built the same way on every run (see [`crate::parser::url::resolve`]).
///
/// # Examples
///
/// ```rust
/// use streamdex::domain::ShowId;
///
/// let id = ShowId::new("https://example.org/frieren-1234");
/// assert_eq!(id.as_str(), "https://example.org/frieren-1234");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShowId(String);

impl ShowId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ShowId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ShowId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Number of episodes one process invocation may still attempt.
///
/// Consumption happens at episode boundaries only; once exhausted, the run
/// winds down and persists what it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunBudget {
    limit: usize,
    consumed: usize,
}

impl RunBudget {
    #[must_use]
    pub const fn new(limit: usize) -> Self {
        Self { limit, consumed: 0 }
    }

    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    #[must_use]
    pub const fn consumed(&self) -> usize {
        self.consumed
    }

    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.consumed)
    }

    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Records one attempted episode. Returns `false` if nothing was left.
    pub fn consume(&mut self) -> bool {
        if self.is_exhausted() {
            return false;
        }
        self.consumed += 1;
        true
    }

    /// Carves a budget for a single show out of what is left for the run.
    #[must_use]
    pub fn for_show(&self, per_show_limit: Option<usize>) -> Self {
        let remaining = self.remaining();
        Self::new(per_show_limit.map_or(remaining, |cap| cap.min(remaining)))
    }

    /// Charges episodes spent by a per-show budget back to the run.
    pub fn absorb(&mut self, spent: &Self) {
        self.consumed = (self.consumed + spent.consumed).min(self.limit);
    }
}
