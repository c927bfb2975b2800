//! Shared browser instance for the rendered extractor
//!
//! One browser serves every rendered extraction. It is launched eagerly by
//! [`BrowserManager::init`] at startup, relaunched lazily if that failed or
//! the process crashed, and closed by [`BrowserManager::shutdown`].
//!
//! Uses `tokio::sync::Mutex`: the guard is held across CDP calls, so a sync
//! lock would block the runtime.

use chromiumoxide::page::Page;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::BrowserConfig;
use crate::browser::{BrowserError, BrowserResult, BrowserWrapper, launch_browser, open_blank_page};

pub struct BrowserManager {
    config: BrowserConfig,
    browser: Arc<Mutex<Option<BrowserWrapper>>>,
}

impl BrowserManager {
    /// Manager for a browser launched with `config`; nothing starts until
    /// [`init`](Self::init) or the first page request
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            browser: Arc::new(Mutex::new(None)),
        }
    }

    /// Launch the browser now instead of on first use
    pub async fn init(&self) -> BrowserResult<()> {
        self.get_or_launch().await.map(|_| ())
    }

    /// Get or launch the shared browser with health checking
    ///
    /// An existing browser is probed with a `version()` CDP call; a failed
    /// probe tears it down and launches a replacement.
    pub async fn get_or_launch(&self) -> BrowserResult<Arc<Mutex<Option<BrowserWrapper>>>> {
        let mut guard = self.browser.lock().await;

        if let Some(wrapper) = guard.as_ref() {
            match wrapper.browser().version().await {
                Ok(_) => {
                    debug!("Browser health check passed, reusing existing browser");
                    drop(guard);
                    return Ok(self.browser.clone());
                }
                Err(e) => {
                    warn!("Browser health check failed: {}. Triggering recovery...", e);
                    if let Some(mut crashed) = guard.take() {
                        // Process may already be gone
                        let _ = crashed.browser_mut().close().await;
                        let _ = crashed.browser_mut().wait().await;
                        crashed.cleanup_temp_dir();
                    }
                }
            }
        }

        info!("Launching browser (first time or after recovery)");
        let (browser, handler, user_data_dir) = launch_browser(&self.config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(format!("{e:#}")))?;
        *guard = Some(BrowserWrapper::new(browser, handler, user_data_dir));
        drop(guard);

        Ok(self.browser.clone())
    }

    /// Open a new blank tab on the shared browser
    ///
    /// The lock is held only while the tab is created; callers own the page
    /// and must close it.
    pub async fn new_page(&self) -> BrowserResult<Page> {
        let browser_arc = self.get_or_launch().await?;
        let guard = browser_arc.lock().await;
        let wrapper = guard
            .as_ref()
            .ok_or_else(|| BrowserError::PageCreationFailed("Browser not available".into()))?;

        open_blank_page(wrapper)
            .await
            .map_err(|e| BrowserError::PageCreationFailed(format!("{e:#}")))
    }

    /// Close the browser if running; repeated calls are no-ops
    ///
    /// Both `close()` and `wait()` are required: dropping the wrapper only
    /// aborts the handler and would leave a zombie Chrome process.
    pub async fn shutdown(&self) {
        let mut guard = self.browser.lock().await;

        if let Some(mut wrapper) = guard.take() {
            info!("Shutting down browser");

            if let Err(e) = wrapper.browser_mut().close().await {
                warn!("Failed to close browser cleanly: {}", e);
            }
            if let Err(e) = wrapper.browser_mut().wait().await {
                warn!("Failed to wait for browser exit: {}", e);
            }

            wrapper.cleanup_temp_dir();
        }
    }

    pub async fn is_browser_running(&self) -> bool {
        self.browser.lock().await.is_some()
    }
}

impl Drop for BrowserManager {
    fn drop(&mut self) {
        // Not a clean shutdown: only the handler is aborted. Call shutdown() first.
        debug!("BrowserManager dropping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_manager_does_not_launch() {
        let manager = BrowserManager::new(BrowserConfig::default());
        assert!(!manager.is_browser_running().await);
    }

    #[tokio::test]
    async fn shutdown_without_browser_is_noop() {
        let manager = BrowserManager::new(BrowserConfig::default());
        manager.shutdown().await;
        manager.shutdown().await;
        assert!(!manager.is_browser_running().await);
    }
}
