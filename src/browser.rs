//! Browser seam. A `PageSource` opens one browser per URL; the returned
//! session owns that browser and closes it when dropped.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use headless_chrome::{Browser, LaunchOptions, Tab};
use log::{debug, info};

use crate::config::ScrapingConfig;

pub trait PageSession {
    /// The DOM as currently rendered. May not contain any events yet.
    fn rendered_html(&self) -> anyhow::Result<String>;
}

pub trait PageSource: Send + Sync + 'static {
    type Session: PageSession;

    fn open(&self, url: &str) -> anyhow::Result<Self::Session>;
}

/// Launches a fresh Chrome for every page it opens.
pub struct ChromeSource {
    headless: bool,
    page_load_timeout: Duration,
    event_selector: String,
    element_wait: Duration,
}

impl ChromeSource {
    pub fn new(config: &ScrapingConfig) -> Self {
        Self {
            headless: config.browser_headless,
            page_load_timeout: config.page_load_timeout(),
            event_selector: config.event_selector.clone(),
            element_wait: config.element_wait(),
        }
    }
}

pub struct ChromeSession {
    // Dropping the browser kills the Chrome process, so keep it beside the tab.
    _browser: Browser,
    tab: Arc<Tab>,
    event_selector: String,
    element_wait: Duration,
}

impl PageSource for ChromeSource {
    type Session = ChromeSession;

    fn open(&self, url: &str) -> anyhow::Result<ChromeSession> {
        let options = LaunchOptions::default_builder()
            .headless(self.headless)
            .idle_browser_timeout(self.page_load_timeout * 4)
            .build()
            .map_err(|e| anyhow!("invalid browser launch options: {e}"))?;
        let browser = Browser::new(options).context("failed to launch chrome")?;
        let tab = browser.new_tab().context("failed to open a tab")?;
        tab.set_default_timeout(self.page_load_timeout);

        info!("Loading {url}");
        tab.navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .with_context(|| format!("failed to load {url}"))?;

        Ok(ChromeSession {
            _browser: browser,
            tab,
            event_selector: self.event_selector.clone(),
            element_wait: self.element_wait,
        })
    }
}

impl PageSession for ChromeSession {
    fn rendered_html(&self) -> anyhow::Result<String> {
        // The odds widget renders client side; a miss here just means the
        // caller polls again.
        if let Err(e) = self
            .tab
            .wait_for_element_with_custom_timeout(&self.event_selector, self.element_wait)
        {
            debug!("{} not rendered yet: {e}", self.event_selector);
        }
        self.tab.get_content().context("failed to read page content")
    }
}
