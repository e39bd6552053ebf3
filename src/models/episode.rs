use crate::constants::markers;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeStatus {
    Success,
    Error,
    Pending,
}

impl EpisodeStatus {
    /// Whether the scheduler still has to visit an episode in this state.
    #[must_use]
    pub const fn needs_work(self) -> bool {
        matches!(self, Self::Error | Self::Pending)
    }
}

impl fmt::Display for EpisodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Pending => "pending",
        };
        f.write_str(s)
    }
}

/// What trying one variant produced.
///
/// Persisted as a plain string: the locator itself when one was read and
/// accepted, otherwise one of the [`markers`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VariantOutcome {
    Resource(String),
    Invalid,
    Unreachable,
    SwitchFailed,
}

impl VariantOutcome {
    #[must_use]
    pub fn locator(&self) -> Option<&str> {
        match self {
            Self::Resource(url) => Some(url),
            _ => None,
        }
    }
}

impl From<String> for VariantOutcome {
    fn from(value: String) -> Self {
        match value.as_str() {
            markers::INVALID => Self::Invalid,
            markers::UNREACHABLE => Self::Unreachable,
            markers::SWITCH_FAILED => Self::SwitchFailed,
            _ => Self::Resource(value),
        }
    }
}

impl From<VariantOutcome> for String {
    fn from(outcome: VariantOutcome) -> Self {
        match outcome {
            VariantOutcome::Resource(url) => url,
            VariantOutcome::Invalid => markers::INVALID.to_string(),
            VariantOutcome::Unreachable => markers::UNREACHABLE.to_string(),
            VariantOutcome::SwitchFailed => markers::SWITCH_FAILED.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRecord {
    pub display_label: String,
    pub status: EpisodeStatus,
    #[serde(default)]
    pub primary_resource_locator: Option<String>,
    #[serde(default)]
    pub variant_used: Option<String>,
    #[serde(default)]
    pub variant_resource_map: BTreeMap<String, VariantOutcome>,
}

impl EpisodeRecord {
    /// Placeholder for a global index nobody has visited yet.
    #[must_use]
    pub fn pending(index: usize) -> Self {
        Self {
            display_label: default_label(index),
            status: EpisodeStatus::Pending,
            primary_resource_locator: None,
            variant_used: None,
            variant_resource_map: BTreeMap::new(),
        }
    }

    /// An attempt that failed before any variant could be tried.
    #[must_use]
    pub fn failed(display_label: impl Into<String>) -> Self {
        Self {
            display_label: display_label.into(),
            status: EpisodeStatus::Error,
            primary_resource_locator: None,
            variant_used: None,
            variant_resource_map: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, EpisodeStatus::Success)
    }
}

/// Label used when the listing does not expose one for a slot.
#[must_use]
pub fn default_label(index: usize) -> String {
    format!("EP {}", index + 1)
}
