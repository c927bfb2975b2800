//! Rendered extractor: reads metadata from a live page in the shared browser
//!
//! Per request: open a blank tab, set the unfurl-bot user agent, intercept
//! requests to drop images and fonts, navigate, wait for
//! `DOMContentLoaded`, then answer every resolution probe in one in-page
//! evaluation. The tab is closed on every exit path by `PageGuard`.

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide_cdp::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide_cdp::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams as FetchEnableParams, EventRequestPaused,
    FailRequestParams,
};
use chromiumoxide_cdp::cdp::browser_protocol::network::{ErrorReason, ResourceType};
use chromiumoxide_cdp::cdp::browser_protocol::page::{EventDomContentEventFired, NavigateParams};
use futures::StreamExt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::MetadataSource;
use super::page_guard::PageGuard;
use crate::RenderConfig;
use crate::browser::{BrowserError, BrowserResult};
use crate::dom::{Probe, SnapshotDom, probe_script};
use crate::manager::BrowserManager;
use crate::metadata::PageMetadata;
use crate::resolve::{all_probes, resolve};
use crate::url_shape::NormalizedUrl;
use crate::utils::errors::UnfurlResult;

/// Browser operations the rendered extractor needs
///
/// `open_page` hands out a page that the caller must pass back to
/// `close_page` exactly once; the extractor's page guard enforces that.
#[async_trait]
pub trait RenderBackend: Send + Sync + 'static {
    type Page: Send + 'static;

    async fn open_page(&self) -> BrowserResult<Self::Page>;

    /// Prepare the page, navigate to `url` and answer `probes` in order
    async fn load_and_probe(
        &self,
        page: &mut Self::Page,
        url: &NormalizedUrl,
        config: &RenderConfig,
        probes: &[Probe],
    ) -> BrowserResult<Vec<Option<String>>>;

    /// Release the page; failures are logged, never returned
    async fn close_page(&self, page: Self::Page);
}

pub struct RenderedExtractor<B: RenderBackend = BrowserManager> {
    backend: Arc<B>,
    config: RenderConfig,
}

impl<B: RenderBackend> RenderedExtractor<B> {
    pub fn new(backend: Arc<B>, config: RenderConfig) -> Self {
        Self { backend, config }
    }

    async fn render(&self, url: &NormalizedUrl) -> BrowserResult<PageMetadata> {
        let page = self.backend.open_page().await?;
        let mut guard = PageGuard::new(Arc::clone(&self.backend), page, url.to_string());

        let probes = all_probes();
        let result = guard.load_and_probe(url, &self.config, &probes).await;
        guard.close().await;

        let dom = SnapshotDom::from_values(&probes, result?);
        Ok(resolve(&dom, url))
    }
}

#[async_trait]
impl<B: RenderBackend> MetadataSource for RenderedExtractor<B> {
    async fn extract(&self, url: &NormalizedUrl) -> UnfurlResult<PageMetadata> {
        Ok(self.render(url).await?)
    }

    fn name(&self) -> &'static str {
        "rendered"
    }
}

/// A tab on the shared browser plus its request interceptor
pub struct LivePage {
    page: Page,
    interceptor: Option<JoinHandle<()>>,
}

#[async_trait]
impl RenderBackend for BrowserManager {
    type Page = LivePage;

    async fn open_page(&self) -> BrowserResult<LivePage> {
        Ok(LivePage {
            page: self.new_page().await?,
            interceptor: None,
        })
    }

    async fn load_and_probe(
        &self,
        live: &mut LivePage,
        url: &NormalizedUrl,
        config: &RenderConfig,
        probes: &[Probe],
    ) -> BrowserResult<Vec<Option<String>>> {
        live.page
            .execute(SetUserAgentOverrideParams::new(config.user_agent.clone()))
            .await
            .map_err(|e| BrowserError::PageCreationFailed(format!("set user agent: {e}")))?;

        let blocked = blocked_resources(config);
        if !blocked.is_empty() {
            let interceptor = spawn_interceptor(&live.page, blocked).await?;
            if let Some(previous) = live.interceptor.replace(interceptor) {
                previous.abort();
            }
        }

        navigate(&live.page, url).await?;

        let script = probe_script(probes)
            .map_err(|e| BrowserError::EvaluationFailed(format!("probe script: {e}")))?;
        live.page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::EvaluationFailed(e.to_string()))?
            .into_value()
            .map_err(|e| BrowserError::EvaluationFailed(format!("unexpected probe result: {e}")))
    }

    async fn close_page(&self, live: LivePage) {
        if let Some(task) = live.interceptor {
            task.abort();
        }
        if let Err(e) = live.page.close().await {
            warn!("Failed to close page: {}", e);
        }
    }
}

/// Resource types aborted during load
pub(crate) fn blocked_resources(config: &RenderConfig) -> Vec<ResourceType> {
    let mut blocked = Vec::with_capacity(2);
    if config.block_images {
        blocked.push(ResourceType::Image);
    }
    if config.block_fonts {
        blocked.push(ResourceType::Font);
    }
    blocked
}

/// Pause every request and fail the blocked types with `BlockedByClient`
///
/// The listener is registered before `Fetch.enable` so no paused request is
/// missed (a missed one would hang the navigation).
async fn spawn_interceptor(
    page: &Page,
    blocked: Vec<ResourceType>,
) -> BrowserResult<JoinHandle<()>> {
    let mut paused = page
        .event_listener::<EventRequestPaused>()
        .await
        .map_err(|e| BrowserError::PageCreationFailed(format!("request listener: {e}")))?;

    page.execute(FetchEnableParams::default())
        .await
        .map_err(|e| BrowserError::PageCreationFailed(format!("enable interception: {e}")))?;

    let page = page.clone();
    Ok(tokio::spawn(async move {
        while let Some(event) = paused.next().await {
            let outcome = if blocked.contains(&event.resource_type) {
                trace!("Blocking {:?} request {}", event.resource_type, event.request.url);
                page.execute(FailRequestParams::new(
                    event.request_id.clone(),
                    ErrorReason::BlockedByClient,
                ))
                .await
                .map(|_| ())
            } else {
                page.execute(ContinueRequestParams::new(event.request_id.clone()))
                    .await
                    .map(|_| ())
            };

            // Requests die with their page; nothing to recover
            if let Err(e) = outcome {
                trace!("Interception reply failed: {}", e);
            }
        }
    }))
}

/// Navigate and wait for `DOMContentLoaded`, not network idle
async fn navigate(page: &Page, url: &NormalizedUrl) -> BrowserResult<()> {
    let mut dom_ready = page
        .event_listener::<EventDomContentEventFired>()
        .await
        .map_err(|e| BrowserError::NavigationFailed(format!("load listener: {e}")))?;

    let response = page
        .execute(NavigateParams::new(url.as_str()))
        .await
        .map_err(|e| BrowserError::NavigationFailed(format!("{url}: {e}")))?;

    if let Some(error_text) = response.result.error_text.as_deref() {
        return Err(BrowserError::NavigationFailed(format!("{url}: {error_text}")));
    }

    match dom_ready.next().await {
        Some(_) => {
            debug!("DOMContentLoaded for {}", url);
            Ok(())
        }
        None => Err(BrowserError::NavigationFailed(format!(
            "{url}: page closed before DOMContentLoaded"
        ))),
    }
}
