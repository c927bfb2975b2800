//! Owned browser process plus its CDP handler task

use anyhow::{Context, Result};
use chromiumoxide::browser::Browser;
use chromiumoxide::page::Page;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::BrowserConfig;

/// Wrapper for Browser and its event handler task
///
/// Handler MUST be aborted once the browser is gone or it keeps polling a
/// dead websocket; `Drop` takes care of that.
pub struct BrowserWrapper {
    browser: Browser,
    handler: JoinHandle<()>,
    user_data_dir: Option<PathBuf>,
}

impl BrowserWrapper {
    pub(crate) fn new(browser: Browser, handler: JoinHandle<()>, user_data_dir: PathBuf) -> Self {
        Self {
            browser,
            handler,
            user_data_dir: Some(user_data_dir),
        }
    }

    pub(crate) fn browser(&self) -> &Browser {
        &self.browser
    }

    pub(crate) fn browser_mut(&mut self) -> &mut Browser {
        &mut self.browser
    }

    /// Remove the profile directory
    ///
    /// Call only after `browser.wait()` so Chrome has released its file
    /// handles. Blocking on purpose: also reachable from `Drop`.
    pub fn cleanup_temp_dir(&mut self) {
        if let Some(path) = self.user_data_dir.take() {
            info!("Cleaning up temp directory: {}", path.display());
            if let Err(e) = std::fs::remove_dir_all(&path) {
                warn!(
                    "Failed to clean up temp directory {}: {}. Manual cleanup may be required.",
                    path.display(),
                    e
                );
            }
        }
    }
}

impl Drop for BrowserWrapper {
    fn drop(&mut self) {
        info!("Dropping BrowserWrapper - aborting handler task");
        self.handler.abort();

        if let Some(path) = self.user_data_dir.as_ref() {
            warn!(
                "BrowserWrapper dropped without explicit cleanup. Temp directory will be orphaned: {}. \
                 Call BrowserManager::shutdown() before dropping.",
                path.display()
            );
        }
    }
}

/// Launch a browser with an isolated per-process profile
///
/// Returns the browser, its handler task and the profile directory that must
/// be removed after the browser exits.
pub async fn launch_browser(config: &BrowserConfig) -> Result<(Browser, JoinHandle<()>, PathBuf)> {
    info!("Launching render browser");

    let user_data_dir =
        std::env::temp_dir().join(format!("kodegen_link_preview_{}", std::process::id()));

    let (browser, handler) =
        crate::browser_setup::launch_browser(config, user_data_dir.clone()).await?;

    Ok((browser, handler, user_data_dir))
}

/// Open a fresh `about:blank` tab
///
/// Interception and the user agent have to be in place before the real
/// navigation, so pages always start blank.
pub async fn open_blank_page(wrapper: &BrowserWrapper) -> Result<Page> {
    wrapper
        .browser()
        .new_page("about:blank")
        .await
        .context("Failed to create blank page")
}
