use crate::config::ValidatorConfig;

/// Decides whether a locator read from the player points at playable content.
///
/// Pure: a locator is valid iff it is present, is not a known "nothing loaded"
/// value, and contains at least one allow-listed fragment. Wrong answers are
/// fixed by editing the allow-list, not this logic.
#[derive(Debug, Clone)]
pub struct ResourceValidator {
    allow_list: Vec<String>,
    sentinels: Vec<String>,
}

impl ResourceValidator {
    #[must_use]
    pub fn new(config: &ValidatorConfig) -> Self {
        Self {
            allow_list: config
                .allow_list
                .iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            sentinels: config
                .sentinels
                .iter()
                .map(|s| s.trim().to_lowercase())
                .collect(),
        }
    }

    #[must_use]
    pub fn is_valid(&self, locator: Option<&str>) -> bool {
        let Some(locator) = locator else {
            return false;
        };

        let normalized = locator.trim().to_lowercase();
        if normalized.is_empty() || self.sentinels.iter().any(|s| *s == normalized) {
            return false;
        }

        self.allow_list
            .iter()
            .any(|fragment| normalized.contains(fragment.as_str()))
    }
}

impl Default for ResourceValidator {
    fn default() -> Self {
        Self::new(&ValidatorConfig::default())
    }
}
