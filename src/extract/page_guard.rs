use std::sync::Arc;
use tracing::{debug, trace};

use super::rendered::RenderBackend;
use crate::RenderConfig;
use crate::browser::{BrowserError, BrowserResult};
use crate::dom::Probe;
use crate::url_shape::NormalizedUrl;

/// RAII guard that closes a rendered page on every exit path
///
/// Prefer [`close`](Self::close). If the guard is dropped instead (error,
/// timeout, cancelled future) the close is spawned on the runtime.
pub(crate) struct PageGuard<B: RenderBackend> {
    backend: Arc<B>,
    page: Option<B::Page>,
    url: String,
    runtime_handle: tokio::runtime::Handle,
}

impl<B: RenderBackend> PageGuard<B> {
    pub(crate) fn new(backend: Arc<B>, page: B::Page, url: String) -> Self {
        Self {
            backend,
            page: Some(page),
            url,
            runtime_handle: tokio::runtime::Handle::current(),
        }
    }

    pub(crate) async fn load_and_probe(
        &mut self,
        url: &NormalizedUrl,
        config: &RenderConfig,
        probes: &[Probe],
    ) -> BrowserResult<Vec<Option<String>>> {
        let page = self
            .page
            .as_mut()
            .ok_or_else(|| BrowserError::PageCreationFailed(format!("page for {url} already closed")))?;
        self.backend.load_and_probe(page, url, config, probes).await
    }

    pub(crate) async fn close(mut self) {
        if let Some(page) = self.page.take() {
            self.backend.close_page(page).await;
            debug!("Page closed for {}", self.url);
        }
    }
}

impl<B: RenderBackend> Drop for PageGuard<B> {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            let backend = Arc::clone(&self.backend);
            let url = std::mem::take(&mut self.url);
            self.runtime_handle.spawn(async move {
                backend.close_page(page).await;
                trace!("PageGuard drop cleanup finished for {}", url);
            });
        }
    }
}
