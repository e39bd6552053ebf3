mod common;

use common::{FakeShow, FakeSite, JAPANESE, test_config};
use streamdex::driver::{DriverError, PageDriver};
use streamdex::services::PaginationMapper;

#[tokio::test]
async fn test_page_selector_drives_layout() {
    let config = test_config();
    let mut site = FakeSite::new(vec![FakeShow::new("long", 30).paged(12)]);
    site.navigate("https://site.test/long/ep-1").await.unwrap();

    let layout = PaginationMapper::new(&config.selectors, &config.sync)
        .map(&mut site)
        .await;

    assert_eq!(layout.total_episode_count, 30);
    let labels: Vec<&str> = layout.tokens.iter().map(|t| t.label.as_str()).collect();
    assert_eq!(labels, ["01-12", "13-24", "25-30"]);
    assert_eq!(layout.active_page.as_deref(), Some("01-12"));
    assert!(layout.is_multi_page());
}

#[tokio::test]
async fn test_unpaged_listing_counts_slots() {
    let config = test_config();
    let mut site = FakeSite::new(vec![FakeShow::new("short", 7)]);
    site.navigate("https://site.test/short/ep-1").await.unwrap();

    let layout = PaginationMapper::new(&config.selectors, &config.sync)
        .map(&mut site)
        .await;

    assert_eq!(layout.total_episode_count, 7);
    assert_eq!(layout.tokens.len(), 1);
    assert_eq!(layout.tokens[0].label, "1-7");
    assert!(!layout.is_multi_page());
}

#[tokio::test]
async fn test_single_page_selector_falls_back_to_count() {
    let config = test_config();
    let mut site = FakeSite::new(vec![FakeShow::new("tiny", 4).paged(10)]);
    site.navigate("https://site.test/tiny/ep-1").await.unwrap();

    let layout = PaginationMapper::new(&config.selectors, &config.sync)
        .map(&mut site)
        .await;

    assert_eq!(layout.total_episode_count, 4);
    assert_eq!(layout.tokens[0].label, "1-4");
}

#[tokio::test]
async fn test_page_selector_without_ranges_falls_back_to_count() {
    let config = test_config();
    let show = FakeShow::new("odd", 6).with_page_options(&["Next", "All"]);
    let mut site = FakeSite::new(vec![show]);
    site.navigate("https://site.test/odd/ep-1").await.unwrap();

    let layout = PaginationMapper::new(&config.selectors, &config.sync)
        .map(&mut site)
        .await;

    assert_eq!(layout.total_episode_count, 6);
    assert_eq!(layout.tokens.len(), 1);
    assert_eq!(layout.tokens[0].label, "1-6");
    assert_eq!(layout.active_page.as_deref(), Some("1-6"));
}

#[tokio::test]
async fn test_handles_go_stale_after_click() {
    let config = test_config();
    let mut site = FakeSite::new(vec![FakeShow::new("stale", 3)]);
    site.navigate("https://site.test/stale/ep-1").await.unwrap();

    let slots = site.find_all(&config.selectors.episode_item).await.unwrap();
    assert_eq!(slots.len(), 3);

    site.click(slots[1]).await.unwrap();
    assert_eq!(site.current_url().await.unwrap(), "https://site.test/stale/ep-2");

    let err = site.click(slots[2]).await.unwrap_err();
    assert!(matches!(err, DriverError::StaleHandle));
    assert!(!err.is_session_fatal());

    let fresh = site.find_all(&config.selectors.episode_item).await.unwrap();
    site.click(fresh[2]).await.unwrap();
    assert_eq!(site.opened("stale"), vec![1, 2]);
}

#[tokio::test]
async fn test_navigation_resets_variant() {
    let config = test_config();
    let mut site = FakeSite::new(vec![FakeShow::new("reset", 1)]);
    site.navigate("https://site.test/reset/ep-1").await.unwrap();
    assert_eq!(site.current_variant(), JAPANESE);

    let missing = site.find_one(&config.selectors.watch_button).await.unwrap();
    assert!(missing.is_none());

    let err = site.navigate("https://elsewhere.test/").await.unwrap_err();
    assert!(matches!(err, DriverError::Timeout(_)));
}
