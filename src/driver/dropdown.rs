//! Captioned dropdown controls (page selector, variant selector).
//!
//! Both controls share one markup shape: a container holding a caption and the
//! current selection; clicking it opens a floating option list. The caption
//! text is what tells the page selector from the variant selector. Every
//! function here re-locates the control, since any click invalidates handles.

use super::{DriverError, ElementRef, PageDriver};
use crate::config::DropdownSelectors;
use std::time::Duration;
use tracing::debug;

/// Pauses applied after opening and after dismissing the option list.
#[derive(Debug, Clone, Copy)]
pub struct DropdownTiming {
    pub open: Duration,
    pub dismiss: Duration,
}

/// Finds the container whose caption contains `label_text`.
pub async fn locate(
    driver: &mut dyn PageDriver,
    selectors: &DropdownSelectors,
) -> Result<Option<ElementRef>, DriverError> {
    let containers = driver.find_all(&selectors.container).await?;

    for container in containers {
        let Some(caption) = driver.find_within(container, &selectors.label).await? else {
            continue;
        };
        let text = driver.read_text(caption).await?;
        if text.contains(&selectors.label_text) {
            return Ok(Some(container));
        }
    }

    Ok(None)
}

/// Text of the currently selected option, if the control shows one.
pub async fn active_label(
    driver: &mut dyn PageDriver,
    selectors: &DropdownSelectors,
) -> Result<Option<String>, DriverError> {
    let Some(control) = locate(driver, selectors).await? else {
        return Ok(None);
    };
    let Some(selection) = driver.find_within(control, &selectors.selection).await? else {
        return Ok(None);
    };

    let text = driver.read_text(selection).await?;
    let text = text.trim();
    Ok((!text.is_empty()).then(|| text.to_string()))
}

/// Opens the control, reads every option label, and closes it again.
pub async fn read_options(
    driver: &mut dyn PageDriver,
    selectors: &DropdownSelectors,
    timing: DropdownTiming,
) -> Result<Vec<String>, DriverError> {
    let control = locate(driver, selectors)
        .await?
        .ok_or_else(|| DriverError::NotFound(selectors.container.clone()))?;

    driver.click(control).await?;
    driver.settle(timing.open).await;

    let mut labels = Vec::new();
    for option in driver.find_all(&selectors.option).await? {
        let text = driver.read_text(option).await?;
        let text = text.trim();
        if !text.is_empty() && !labels.iter().any(|l: &String| l == text) {
            labels.push(text.to_string());
        }
    }

    driver.press_key("Escape").await?;
    driver.settle(timing.dismiss).await;

    debug!(caption = %selectors.label_text, options = ?labels, "Read dropdown options");
    Ok(labels)
}

/// Opens the control and clicks the option whose text equals `label`.
pub async fn select(
    driver: &mut dyn PageDriver,
    selectors: &DropdownSelectors,
    label: &str,
    timing: DropdownTiming,
) -> Result<(), DriverError> {
    let control = locate(driver, selectors)
        .await?
        .ok_or_else(|| DriverError::NotFound(selectors.container.clone()))?;

    driver.click(control).await?;
    driver.settle(timing.open).await;

    let mut target = None;
    for option in driver.find_all(&selectors.option).await? {
        if driver.read_text(option).await?.trim() == label {
            target = Some(option);
            break;
        }
    }

    let Some(option) = target else {
        driver.press_key("Escape").await?;
        driver.settle(timing.dismiss).await;
        return Err(DriverError::NotFound(format!(
            "{} option '{label}'",
            selectors.label_text
        )));
    };

    driver.click(option).await
}
