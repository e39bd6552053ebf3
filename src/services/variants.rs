//! Variant Resolver: finds a playable resource for the episode that is open
//! right now by walking its sub/dub variants in priority order.
//!
//! Every variant tried leaves an entry in the variant map, valid or not. The
//! first valid locator wins. When more than one variant was tried, the
//! originally active one is selected again before returning, so the next
//! episode on the page starts from the same state.

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::config::{Config, DropdownSelectors, SelectorConfig, SyncConfig};
use crate::driver::dropdown::{self, DropdownTiming};
use crate::driver::{DriverError, PageDriver};
use crate::models::{EpisodeStatus, VariantOutcome};
use crate::services::retry::{Attempt, Operation, RetryPolicy, with_retry};
use crate::services::sync::SyncError;
use crate::services::validator::ResourceValidator;

/// Result of resolving one episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub status: EpisodeStatus,
    pub primary_resource_locator: Option<String>,
    pub variant_used: Option<String>,
    pub variant_resource_map: BTreeMap<String, VariantOutcome>,
    /// Every variant label the episode offered.
    pub offered: Vec<String>,
}

impl Resolution {
    /// Why no variant produced a resource, `None` when one did.
    #[must_use]
    pub fn failure(&self) -> Option<SyncError> {
        if self.status == EpisodeStatus::Success {
            return None;
        }
        let invalid = self.variants_with(&VariantOutcome::Invalid);
        if !invalid.is_empty() {
            return Some(SyncError::ResourceInvalid(invalid.join(", ")));
        }
        let switch_failed = self.variants_with(&VariantOutcome::SwitchFailed);
        if !switch_failed.is_empty() {
            return Some(SyncError::VariantSwitch(switch_failed.join(", ")));
        }
        Some(SyncError::ElementNotFound("player resource".to_string()))
    }

    fn variants_with(&self, wanted: &VariantOutcome) -> Vec<String> {
        self.variant_resource_map
            .iter()
            .filter(|&(_, outcome)| outcome == wanted)
            .map(|(label, _)| label.clone())
            .collect()
    }
}

/// The configured "priority class" of variants.
#[derive(Debug, Clone, Default)]
pub struct VariantPriority {
    patterns: Vec<Regex>,
}

impl VariantPriority {
    #[must_use]
    pub fn new(patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| warn!(pattern = %p, error = %e, "Ignoring variant pattern"))
                    .ok()
            })
            .collect();
        Self { patterns }
    }

    #[must_use]
    pub fn matches(&self, label: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(label))
    }
}

/// Orders the variants to try.
///
/// If any offered label is in the priority class, only those are kept.
/// Within the kept set the show's preferred variant goes first, then the
/// active one (it needs no switch), then the rest in the order offered.
#[must_use]
pub fn order_candidates(
    offered: &[String],
    active: Option<&str>,
    hint: Option<&str>,
    priority: &VariantPriority,
) -> Vec<String> {
    let mut pool: Vec<&str> = Vec::with_capacity(offered.len() + 1);
    if let Some(active) = active {
        if !offered.iter().any(|o| o == active) {
            pool.push(active);
        }
    }
    for label in offered {
        if !pool.contains(&label.as_str()) {
            pool.push(label);
        }
    }

    if pool.iter().any(|l| priority.matches(l)) {
        pool.retain(|l| priority.matches(l));
    }

    let mut ordered: Vec<String> = Vec::with_capacity(pool.len());
    for first in [hint, active].into_iter().flatten() {
        if pool.contains(&first) && !ordered.iter().any(|o| o == first) {
            ordered.push(first.to_string());
        }
    }
    for label in pool {
        if !ordered.iter().any(|o| o == label) {
            ordered.push(label.to_string());
        }
    }
    ordered
}

struct SwitchVariant<'a> {
    selectors: &'a DropdownSelectors,
    label: &'a str,
    timing: DropdownTiming,
    sync: &'a SyncConfig,
}

#[async_trait]
impl<'a> Operation for SwitchVariant<'a> {
    type Output = ();

    fn describe(&self) -> String {
        format!("switch variant to '{}'", self.label)
    }

    async fn attempt(&mut self, driver: &mut dyn PageDriver) -> Attempt<()> {
        if let Err(e) = dropdown::select(driver, self.selectors, self.label, self.timing).await {
            return Attempt::from_result(Err(e));
        }
        driver.settle(self.sync.variant_settle()).await;

        match dropdown::active_label(driver, self.selectors).await {
            Ok(Some(active)) if active == self.label => Attempt::Done(()),
            // nothing to verify against
            Ok(None) => Attempt::Done(()),
            Ok(Some(_)) => Attempt::Retry(DriverError::NotFound(format!(
                "active variant '{}'",
                self.label
            ))),
            Err(e) => Attempt::from_result(Err(e)),
        }
    }
}

struct ReadResource<'a> {
    selectors: &'a SelectorConfig,
    validator: &'a ResourceValidator,
    last_seen: &'a mut Option<String>,
}

#[async_trait]
impl<'a> Operation for ReadResource<'a> {
    type Output = String;

    fn describe(&self) -> String {
        format!("read resource '{}'", self.selectors.resource)
    }

    async fn attempt(&mut self, driver: &mut dyn PageDriver) -> Attempt<String> {
        let element = match driver.find_one(&self.selectors.resource).await {
            Ok(Some(element)) => element,
            Ok(None) => {
                return Attempt::Retry(DriverError::NotFound(self.selectors.resource.clone()));
            }
            Err(e) => return Attempt::from_result(Err(e)),
        };

        let value = match driver
            .read_attribute(element, &self.selectors.resource_attribute)
            .await
        {
            Ok(value) => value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()),
            Err(e) => return Attempt::from_result(Err(e)),
        };

        match value {
            Some(locator) if self.validator.is_valid(Some(&locator)) => Attempt::Done(locator),
            Some(locator) => {
                *self.last_seen = Some(locator);
                Attempt::Retry(DriverError::NotFound("playable resource".to_string()))
            }
            None => Attempt::Retry(DriverError::NotFound(format!(
                "{}[{}]",
                self.selectors.resource, self.selectors.resource_attribute
            ))),
        }
    }
}

pub struct VariantResolver<'a> {
    selectors: &'a SelectorConfig,
    sync: &'a SyncConfig,
    validator: &'a ResourceValidator,
    priority: &'a VariantPriority,
    policy: RetryPolicy,
    fallback_label: &'a str,
}

impl<'a> VariantResolver<'a> {
    #[must_use]
    pub fn new(
        config: &'a Config,
        validator: &'a ResourceValidator,
        priority: &'a VariantPriority,
    ) -> Self {
        Self {
            selectors: &config.selectors,
            sync: &config.sync,
            validator,
            priority,
            policy: RetryPolicy::new(&config.sync.retry),
            fallback_label: &config.variants.fallback_variant,
        }
    }

    fn timing(&self) -> DropdownTiming {
        DropdownTiming {
            open: self.sync.dropdown_settle(),
            dismiss: self.sync.dismiss_settle(),
        }
    }

    /// Reads the active variant and the offered ones.
    ///
    /// The fallback label stands in for the active variant only when the
    /// control offers nothing; with options readable but no readable
    /// selection the active variant is left unknown.
    async fn discover(&self, driver: &mut dyn PageDriver) -> (Option<String>, Vec<String>) {
        let selectors = &self.selectors.variant_dropdown;

        let active = match dropdown::active_label(driver, selectors).await {
            Ok(active) => active,
            Err(e) => {
                warn!(error = %e, "Failed to read active variant");
                None
            }
        };

        let offered = match dropdown::read_options(driver, selectors, self.timing()).await {
            Ok(offered) => offered,
            Err(DriverError::NotFound(_)) => {
                debug!("No variant selector, using the active variant only");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "Failed to read variant options");
                Vec::new()
            }
        };

        if offered.is_empty() {
            let active = active.unwrap_or_else(|| self.fallback_label.to_string());
            return (Some(active.clone()), vec![active]);
        }
        if active.is_none() {
            debug!(offered = ?offered, "Active variant unreadable, switching explicitly");
        }
        (active, offered)
    }

    async fn switch_to(&self, driver: &mut dyn PageDriver, label: &str) -> Result<(), DriverError> {
        let op = SwitchVariant {
            selectors: &self.selectors.variant_dropdown,
            label,
            timing: self.timing(),
            sync: self.sync,
        };
        with_retry(&self.policy, driver, op).await
    }

    /// Only a lost session is an error; everything else is an outcome.
    async fn read_outcome(
        &self,
        driver: &mut dyn PageDriver,
    ) -> Result<VariantOutcome, DriverError> {
        let mut last_seen = None;
        let op = ReadResource {
            selectors: self.selectors,
            validator: self.validator,
            last_seen: &mut last_seen,
        };

        match with_retry(&self.policy, driver, op).await {
            Ok(locator) => Ok(VariantOutcome::Resource(locator)),
            Err(e) if e.is_session_fatal() => Err(e),
            Err(_) if last_seen.is_some() => Ok(VariantOutcome::Invalid),
            Err(_) => Ok(VariantOutcome::Unreachable),
        }
    }

    /// Resolves the episode currently open in `driver`.
    ///
    /// `hint` is the variant that worked for the previous episode of the same
    /// show, if any. Failing variants are recorded, not returned; the only
    /// error is a lost automation session.
    pub async fn resolve(
        &self,
        driver: &mut dyn PageDriver,
        hint: Option<&str>,
    ) -> Result<Resolution, DriverError> {
        let (original, offered) = self.discover(driver).await;
        let candidates = order_candidates(&offered, original.as_deref(), hint, self.priority);
        debug!(candidates = ?candidates, active = ?original, "Variant candidates");

        let mut current = original.clone();
        let mut map = BTreeMap::new();
        let mut winner = None;
        let mut tried = 0usize;

        for candidate in &candidates {
            tried += 1;

            if current.as_deref() != Some(candidate.as_str()) {
                if let Err(e) = self.switch_to(driver, candidate).await {
                    warn!(variant = %candidate, error = %e, "Variant switch failed");
                    if e.is_session_fatal() {
                        return Err(e);
                    }
                    map.insert(candidate.clone(), VariantOutcome::SwitchFailed);
                    continue;
                }
                current = Some(candidate.clone());
            }

            let outcome = self.read_outcome(driver).await?;
            debug!(variant = %candidate, outcome = ?outcome, "Variant tried");
            let locator = outcome.locator().map(str::to_string);
            map.insert(candidate.clone(), outcome);

            if let Some(locator) = locator {
                winner = Some((candidate.clone(), locator));
                break;
            }
        }

        if let Some(original) = original.as_deref() {
            if tried > 1 && current.as_deref() != Some(original) {
                match self.switch_to(driver, original).await {
                    Ok(()) => debug!(variant = %original, "Restored original variant"),
                    Err(e) => warn!(variant = %original, error = %e, "Failed to restore variant"),
                }
            }
        }

        Ok(match winner {
            Some((variant, locator)) => {
                info!(variant = %variant, "Resolved playable resource");
                Resolution {
                    status: EpisodeStatus::Success,
                    primary_resource_locator: Some(locator),
                    variant_used: Some(variant),
                    variant_resource_map: map,
                    offered,
                }
            }
            None => Resolution {
                status: EpisodeStatus::Error,
                primary_resource_locator: None,
                variant_used: None,
                variant_resource_map: map,
                offered,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_failure_prefers_invalid_over_switch() {
        let mut resolution = Resolution {
            status: EpisodeStatus::Error,
            primary_resource_locator: None,
            variant_used: None,
            variant_resource_map: BTreeMap::from([
                ("English (DUB)".to_string(), VariantOutcome::SwitchFailed),
                ("Japanese (SUB)".to_string(), VariantOutcome::Invalid),
            ]),
            offered: labels(&["Japanese (SUB)", "English (DUB)"]),
        };
        assert!(matches!(
            resolution.failure(),
            Some(SyncError::ResourceInvalid(v)) if v == "Japanese (SUB)"
        ));

        resolution.variant_resource_map.remove("Japanese (SUB)");
        assert!(matches!(resolution.failure(), Some(SyncError::VariantSwitch(_))));

        resolution.status = EpisodeStatus::Success;
        assert!(resolution.failure().is_none());
    }

    #[test]
    fn test_priority_class_restricts_candidates() {
        let offered = labels(&["English (DUB)", "Mandarin (SUB)"]);
        let priority = VariantPriority::new(&labels(&["mandarin"]));
        let ordered = order_candidates(&offered, Some("English (DUB)"), None, &priority);
        assert_eq!(ordered, ["Mandarin (SUB)"]);
    }

    #[test]
    fn test_active_variant_goes_first_without_priority_match() {
        let offered = labels(&["Japanese (SUB)", "English (DUB)", "Spanish (DUB)"]);
        let priority = VariantPriority::new(&labels(&["mandarin"]));
        let ordered = order_candidates(&offered, Some("English (DUB)"), None, &priority);
        assert_eq!(ordered, ["English (DUB)", "Japanese (SUB)", "Spanish (DUB)"]);
    }

    #[test]
    fn test_hint_precedes_active() {
        let offered = labels(&["Japanese (SUB)", "English (DUB)"]);
        let ordered = order_candidates(
            &offered,
            Some("Japanese (SUB)"),
            Some("English (DUB)"),
            &VariantPriority::default(),
        );
        assert_eq!(ordered, ["English (DUB)", "Japanese (SUB)"]);
    }

    #[test]
    fn test_hint_outside_priority_class_is_ignored() {
        let offered = labels(&["English (DUB)", "Mandarin (SUB)", "Mandarin (DUB)"]);
        let priority = VariantPriority::new(&labels(&["^mandarin"]));
        let ordered = order_candidates(
            &offered,
            Some("English (DUB)"),
            Some("English (DUB)"),
            &priority,
        );
        assert_eq!(ordered, ["Mandarin (SUB)", "Mandarin (DUB)"]);
    }

    #[test]
    fn test_unknown_active_keeps_offered_order() {
        let offered = labels(&["English (DUB)", "Mandarin (SUB)"]);
        let ordered = order_candidates(&offered, None, None, &VariantPriority::default());
        assert_eq!(ordered, ["English (DUB)", "Mandarin (SUB)"]);
    }

    #[test]
    fn test_active_not_offered_is_still_tried() {
        let ordered = order_candidates(&[], Some("Japanese (SUB)"), None, &VariantPriority::default());
        assert_eq!(ordered, ["Japanese (SUB)"]);
    }
}
