use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig as CdpConfig, Element, Page};
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::BrowserConfig;
use crate::constants::intervals;
use crate::driver::{DriverError, ElementRef, HandleTable, PageDriver};

/// [`PageDriver`] backed by one tab of a headless Chromium.
pub struct ChromeDriver {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    handles: HandleTable<Element>,
    navigation_timeout: Duration,
}

impl ChromeDriver {
    /// Starts the browser and opens the single page the run works in.
    pub async fn launch(config: &BrowserConfig) -> Result<Self, DriverError> {
        let mut builder = CdpConfig::builder()
            .window_size(config.window_width, config.window_height)
            .request_timeout(config.navigation_timeout())
            .arg(format!("--user-agent={}", config.user_agent))
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-notifications");

        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &config.executable {
            builder = builder.chrome_executable(executable);
        }

        let cdp_config = builder.build().map_err(DriverError::Session)?;
        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| DriverError::Session(format!("Failed to launch browser: {e}")))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {e}");
                }
            }
            debug!("Browser handler task ended");
        });

        let page = browser.new_page("about:blank").await.map_err(map_cdp)?;
        info!(headless = config.headless, "Browser session started");

        Ok(Self {
            browser,
            page,
            handler_task,
            handles: HandleTable::new(),
            navigation_timeout: config.navigation_timeout(),
        })
    }

    /// Closes the browser and waits briefly for its event loop to wind down.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser cleanly: {e}");
        }
        if tokio::time::timeout(intervals::SESSION_SHUTDOWN, &mut self.handler_task)
            .await
            .is_err()
        {
            self.handler_task.abort();
        }
        info!("Browser session closed");
    }

    fn element(&self, handle: ElementRef) -> Result<&Element, DriverError> {
        self.handles.get(handle)
    }

    fn register(&mut self, elements: Vec<Element>) -> Vec<ElementRef> {
        elements
            .into_iter()
            .map(|el| self.handles.insert(el))
            .collect()
    }
}

fn map_cdp(err: CdpError) -> DriverError {
    match err {
        CdpError::NotFound => DriverError::NotFound("element".to_string()),
        CdpError::Timeout => DriverError::Protocol("request timed out".to_string()),
        CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse => {
            DriverError::Session(err.to_string())
        }
        other => DriverError::Protocol(other.to_string()),
    }
}

/// Zero matches is an answer, not an error.
fn none_if_missing(result: Result<Vec<Element>, CdpError>) -> Result<Vec<Element>, DriverError> {
    match result {
        Ok(elements) => Ok(elements),
        Err(CdpError::NotFound) => Ok(Vec::new()),
        Err(e) => Err(map_cdp(e)),
    }
}

#[async_trait]
impl PageDriver for ChromeDriver {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.handles.invalidate();
        debug!(url, "Navigating");
        match tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(map_cdp(e)),
            Err(_) => Err(DriverError::Timeout(self.navigation_timeout)),
        }
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        let url = self.page.url().await.map_err(map_cdp)?;
        Ok(url.unwrap_or_default())
    }

    async fn find_one(&mut self, selector: &str) -> Result<Option<ElementRef>, DriverError> {
        Ok(self.find_all(selector).await?.into_iter().next())
    }

    async fn find_all(&mut self, selector: &str) -> Result<Vec<ElementRef>, DriverError> {
        let elements = none_if_missing(self.page.find_elements(selector).await)?;
        Ok(self.register(elements))
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
        let found = self.element(parent)?.find_elements(selector).await;
        let elements = none_if_missing(found)?;
        Ok(self.register(elements))
    }

    async fn click(&mut self, element: ElementRef) -> Result<(), DriverError> {
        self.element(element)?.click().await.map_err(map_cdp)?;
        self.handles.invalidate();
        Ok(())
    }

    async fn read_attribute(
        &mut self,
        element: ElementRef,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        self.element(element)?.attribute(name).await.map_err(map_cdp)
    }

    async fn read_text(&mut self, element: ElementRef) -> Result<String, DriverError> {
        let text = self.element(element)?.inner_text().await.map_err(map_cdp)?;
        Ok(text.unwrap_or_default())
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let found = none_if_missing(self.page.find_elements(selector).await)?;
            if !found.is_empty() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(DriverError::Timeout(timeout));
            }
            tokio::time::sleep(intervals::ELEMENT_POLL).await;
        }
    }

    async fn press_key(&mut self, key: &str) -> Result<(), DriverError> {
        let body = self.page.find_element("body").await.map_err(map_cdp)?;
        body.press_key(key).await.map_err(map_cdp)?;
        self.handles.invalidate();
        Ok(())
    }
}
