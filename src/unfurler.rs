//! Per-request orchestration
//!
//! normalize → cache → static (complete? cache + return) → rendered (cache +
//! return) → failure. The rendered result is accepted whatever its
//! completeness; nothing is cached on failure.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::Config;
use crate::cache::ResultCache;
use crate::extract::{MetadataSource, RenderedExtractor, StaticExtractor};
use crate::manager::BrowserManager;
use crate::metadata::PageMetadata;
use crate::url_shape::{NormalizedUrl, normalize};
use crate::utils::errors::{UnfurlError, UnfurlResult};
use crate::utils::timeout::validate_deadline;

pub struct Unfurler {
    cache: ResultCache,
    static_source: Arc<dyn MetadataSource>,
    rendered_source: Arc<dyn MetadataSource>,
    static_deadline: Duration,
    render_deadline: Duration,
}

impl Unfurler {
    pub fn new(
        cache: ResultCache,
        static_source: Arc<dyn MetadataSource>,
        rendered_source: Arc<dyn MetadataSource>,
        static_deadline: Duration,
        render_deadline: Duration,
    ) -> Self {
        Self {
            cache,
            static_source,
            rendered_source,
            static_deadline,
            render_deadline,
        }
    }

    /// Wire the production pipeline from config around a shared browser
    pub fn from_config(
        config: &Config,
        cache: ResultCache,
        manager: Arc<BrowserManager>,
    ) -> UnfurlResult<Self> {
        let static_deadline = validate_deadline("fetch.timeout_ms", config.fetch.timeout_ms)?;
        let render_deadline = validate_deadline("render.timeout_ms", config.render.timeout_ms)?;

        Ok(Self::new(
            cache,
            Arc::new(StaticExtractor::new(&config.fetch)?),
            Arc::new(RenderedExtractor::new(manager, config.render.clone())),
            static_deadline,
            render_deadline,
        ))
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Resolve preview metadata for a raw, user-supplied URL
    ///
    /// # Errors
    ///
    /// - `InvalidUrl` when the input fails normalization (no fetch happens)
    /// - `Unresolved` when the rendered attempt fails
    pub async fn unfurl(&self, raw: &str) -> UnfurlResult<PageMetadata> {
        let url = normalize(raw)?;

        if let Some(cached) = self.cache.get(&url).await {
            info!("cache hit for {}", url);
            return Ok(cached);
        }
        debug!("cache miss for {}, trying static fetch", url);

        let static_attempt = self
            .attempt(&*self.static_source, &url, self.static_deadline, UnfurlError::Fetch)
            .await;
        match static_attempt {
            Ok(metadata) if metadata.is_complete() => {
                info!("static complete for {}", url);
                self.store(&url, &metadata).await;
                return Ok(metadata);
            }
            Ok(metadata) => debug!(
                "static result for {} missing {:?}, escalating to rendered",
                url,
                metadata.missing_fields()
            ),
            Err(e) => debug!("static fetch failed for {}: {}, escalating to rendered", url, e),
        }

        let rendered_attempt = self
            .attempt(&*self.rendered_source, &url, self.render_deadline, UnfurlError::Render)
            .await;
        match rendered_attempt {
            Ok(metadata) => {
                info!("rendered {}", url);
                self.store(&url, &metadata).await;
                Ok(metadata)
            }
            Err(e) => {
                info!("failed to unfurl {}: {}", url, e);
                Err(UnfurlError::Unresolved(url.to_string()))
            }
        }
    }

    async fn attempt(
        &self,
        source: &dyn MetadataSource,
        url: &NormalizedUrl,
        deadline: Duration,
        timed_out: fn(String) -> UnfurlError,
    ) -> UnfurlResult<PageMetadata> {
        debug!("{} attempt for {}", source.name(), url);
        with_deadline(deadline, source.extract(url), || {
            timed_out(format!(
                "{} extraction of {} timed out after {:?}",
                source.name(),
                url,
                deadline
            ))
        })
        .await
    }

    /// A failed write only costs a future cache miss
    async fn store(&self, url: &NormalizedUrl, metadata: &PageMetadata) {
        if let Err(e) = self.cache.put(url, metadata).await {
            warn!("Failed to cache metadata for {}: {}", url, e);
        }
    }
}

async fn with_deadline<F, E>(
    deadline: Duration,
    future: F,
    on_elapsed: E,
) -> UnfurlResult<PageMetadata>
where
    F: Future<Output = UnfurlResult<PageMetadata>>,
    E: FnOnce() -> UnfurlError,
{
    match timeout(deadline, future).await {
        Ok(result) => result,
        Err(_) => Err(on_elapsed()),
    }
}
