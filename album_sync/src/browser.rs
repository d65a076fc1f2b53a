//! Browser automation for the live albums page.
//!
//! A [`BrowserSession`] owns one Chromium process and one tab. Call
//! [`BrowserSession::close`] when done; if the session is dropped without it
//! (early return, panic) its [`ProcessGuard`] still kills the process.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::retry::{retry_within, RETRY_INTERVAL};
use crate::{Error, Result};

/// One step of driving the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserAction {
    Navigate { url: String },
    /// Wait until `selector` matches, e.g. for the user to finish logging in.
    AwaitElement { selector: String, timeout: Duration },
    Click { selector: String },
}

/// A child process that can be shut down gracefully or killed outright.
#[async_trait]
pub trait ChildProcess: Send + 'static {
    async fn shutdown(&mut self);
    async fn terminate(&mut self);
}

#[async_trait]
impl ChildProcess for Browser {
    async fn shutdown(&mut self) {
        if let Err(e) = self.close().await {
            warn!("Browser did not close cleanly: {}", e);
        }
        if let Err(e) = self.wait().await {
            warn!("Waiting for browser exit failed: {}", e);
        }
    }

    async fn terminate(&mut self) {
        if let Some(Err(e)) = self.kill().await {
            warn!("Killing browser failed: {}", e);
        }
    }
}

/// Owns a child process until it is released. Releasing happens at most
/// once; a guard dropped unreleased terminates the process on `runtime`.
pub struct ProcessGuard<P: ChildProcess> {
    process: Option<P>,
    runtime: Handle,
}

impl<P: ChildProcess> ProcessGuard<P> {
    /// Must be called inside a tokio runtime.
    pub fn new(process: P) -> Self {
        Self {
            process: Some(process),
            runtime: Handle::current(),
        }
    }

    /// Shuts the process down. Returns false if it was already released.
    pub async fn release(&mut self) -> bool {
        match self.process.take() {
            Some(mut process) => {
                process.shutdown().await;
                true
            }
            None => false,
        }
    }
}

impl<P: ChildProcess> Drop for ProcessGuard<P> {
    fn drop(&mut self) {
        if let Some(mut process) = self.process.take() {
            warn!("Process dropped without release, terminating it");
            self.runtime.spawn(async move {
                process.terminate().await;
            });
        }
    }
}

pub struct BrowserSession {
    page: Page,
    handler: JoinHandle<()>,
    browser: ProcessGuard<Browser>,
    query_budget: Duration,
}

impl BrowserSession {
    /// Starts a headed browser, retrying within the startup budget.
    pub async fn launch(settings: &Settings) -> Result<Self> {
        info!("Starting browser");
        let (mut browser, mut events) = retry_within(
            "browser startup",
            settings.retry_budget,
            RETRY_INTERVAL,
            || async move {
                let config = browser_config(settings)?;
                let launched = Browser::launch(config).await.map_err(|e| e.to_string())?;
                Ok::<_, String>(launched)
            },
        )
        .await
        .map_err(|e| Error::transient("browser startup", e))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(e) = event {
                    debug!("Browser event loop ended: {}", e);
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                browser.shutdown().await;
                handler.abort();
                return Err(Error::transient("opening a tab", e));
            }
        };

        Ok(Self {
            page,
            handler,
            browser: ProcessGuard::new(browser),
            query_budget: settings.query_budget,
        })
    }

    pub async fn perform(&self, action: &BrowserAction) -> Result<()> {
        match action {
            BrowserAction::Navigate { url } => {
                info!("Navigating to {}", url);
                self.page
                    .goto(url.as_str())
                    .await
                    .map_err(|e| Error::transient("navigation", e))?;
            }
            BrowserAction::AwaitElement { selector, timeout } => {
                info!("Waiting up to {}s for {}", timeout.as_secs(), selector);
                self.find(selector, *timeout).await?;
            }
            BrowserAction::Click { selector } => {
                self.find(selector, self.query_budget)
                    .await?
                    .click()
                    .await
                    .map_err(|e| Error::transient("click", e))?;
            }
        }
        Ok(())
    }

    pub async fn perform_all(&self, actions: &[BrowserAction]) -> Result<()> {
        for action in actions {
            self.perform(action).await?;
        }
        Ok(())
    }

    /// Current markup of the tab.
    pub async fn content(&self) -> Result<String> {
        retry_within("reading page content", self.query_budget, RETRY_INTERVAL, || {
            self.page.content()
        })
        .await
        .map_err(|e| Error::transient("reading page content", e))
    }

    /// Scrolls the last element matching `selector` into view, which makes the
    /// page load more entries. Returns false when nothing matched.
    pub async fn scroll_to_last(&self, selector: &str) -> Result<bool> {
        let elements = retry_within("querying album entries", self.query_budget, RETRY_INTERVAL, || {
            self.page.find_elements(selector)
        })
        .await
        .map_err(|e| Error::transient("querying album entries", e))?;

        match elements.last() {
            Some(last) => {
                last.scroll_into_view()
                    .await
                    .map_err(|e| Error::transient("scrolling", e))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find(&self, selector: &str, budget: Duration) -> Result<Element> {
        retry_within(selector, budget, RETRY_INTERVAL, || self.page.find_element(selector))
            .await
            .map_err(|e| Error::transient(&format!("waiting for {}", selector), e))
    }

    /// Closes the browser and waits for the process to exit.
    pub async fn close(mut self) {
        if self.browser.release().await {
            info!("Browser closed");
        }
        self.handler.abort();
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // The guard field kills an unreleased browser after this runs.
        self.handler.abort();
    }
}

fn browser_config(settings: &Settings) -> std::result::Result<BrowserConfig, String> {
    let mut builder = BrowserConfig::builder().with_head();
    if let Some(dir) = &settings.browser_profile_dir {
        builder = builder.user_data_dir(dir);
    }
    builder.build()
}

/// Steps that bring the tab to a logged-in albums page.
///
/// Without a persistent profile the user has to type a password, so wait for
/// that field first; the first album entry marks a finished login either way.
pub fn login_actions(settings: &Settings, entry_selector: &str) -> Vec<BrowserAction> {
    let mut actions = vec![BrowserAction::Navigate {
        url: settings.albums_page_url.clone(),
    }];
    if settings.browser_profile_dir.is_none() {
        actions.push(BrowserAction::AwaitElement {
            selector: "input[type='password']".to_string(),
            timeout: settings.login_timeout,
        });
    }
    actions.push(BrowserAction::AwaitElement {
        selector: entry_selector.to_string(),
        timeout: settings.login_timeout,
    });
    actions
}
