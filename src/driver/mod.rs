//! Page automation capability the sync engine is written against.
//!
//! The engine never sees a browser. It sees a [`PageDriver`]: a single,
//! exclusively borrowed page session offering navigation, element lookup,
//! clicks, and attribute/text reads. Selector strings come from configuration.
//!
//! Element handles are only valid until the document next changes. Every
//! operation that can mutate the page (navigation, click, key press) starts a
//! new handle generation, and a handle from an older generation is rejected
//! with [`DriverError::StaleHandle`] instead of silently pointing at a
//! re-rendered node. Callers re-query after each such operation.

pub mod dropdown;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Element not found: {0}")]
    NotFound(String),

    #[error("Element handle is stale (document changed since it was read)")]
    StaleHandle,

    #[error("Automation session lost: {0}")]
    Session(String),

    #[error("Automation protocol error: {0}")]
    Protocol(String),
}

impl DriverError {
    /// True when the session itself is unusable, not just one operation.
    #[must_use]
    pub const fn is_session_fatal(&self) -> bool {
        matches!(self, Self::Session(_))
    }
}

/// Opaque handle to an element read in a given document generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementRef {
    generation: u64,
    slot: usize,
}

/// Generation-checked storage for driver-specific element objects.
#[derive(Debug)]
pub struct HandleTable<T> {
    generation: u64,
    entries: Vec<T>,
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self {
            generation: 0,
            entries: Vec::new(),
        }
    }
}

impl<T> HandleTable<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: T) -> ElementRef {
        self.entries.push(entry);
        ElementRef {
            generation: self.generation,
            slot: self.entries.len() - 1,
        }
    }

    pub fn get(&self, handle: ElementRef) -> Result<&T, DriverError> {
        if handle.generation != self.generation {
            return Err(DriverError::StaleHandle);
        }
        self.entries.get(handle.slot).ok_or(DriverError::StaleHandle)
    }

    /// Drops every handle handed out so far.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.entries.clear();
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// A single page session. `&mut self` everywhere: one caller at a time.
#[async_trait]
pub trait PageDriver: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    async fn current_url(&mut self) -> Result<String, DriverError>;

    async fn find_one(&mut self, selector: &str) -> Result<Option<ElementRef>, DriverError>;

    async fn find_all(&mut self, selector: &str) -> Result<Vec<ElementRef>, DriverError>;

    /// Lookup scoped to the subtree of `parent`.
    async fn find_within(
        &mut self,
        parent: ElementRef,
        selector: &str,
    ) -> Result<Option<ElementRef>, DriverError>;

    async fn find_all_within(
        &mut self,
        parent: ElementRef,
        selector: &str,
    ) -> Result<Vec<ElementRef>, DriverError>;

    async fn click(&mut self, element: ElementRef) -> Result<(), DriverError>;

    async fn read_attribute(
        &mut self,
        element: ElementRef,
        name: &str,
    ) -> Result<Option<String>, DriverError>;

    async fn read_text(&mut self, element: ElementRef) -> Result<String, DriverError>;

    /// Waits until `selector` matches at least one element.
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), DriverError>;

    async fn press_key(&mut self, key: &str) -> Result<(), DriverError>;

    /// Lets the page settle after a state change.
    async fn settle(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
