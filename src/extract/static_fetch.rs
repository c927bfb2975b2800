//! Static extractor: one plain GET, parsed without running scripts

use async_trait::async_trait;
use reqwest::Client;
use reqwest::redirect::Policy;
use std::time::Duration;
use tracing::debug;

use super::MetadataSource;
use crate::FetchConfig;
use crate::dom::StaticDom;
use crate::metadata::PageMetadata;
use crate::resolve::resolve;
use crate::url_shape::NormalizedUrl;
use crate::utils::errors::{UnfurlError, UnfurlResult};

pub struct StaticExtractor {
    client: Client,
}

impl StaticExtractor {
    /// Build the HTTP client from fetch settings
    pub fn new(config: &FetchConfig) -> UnfurlResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| UnfurlError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client))
    }

    /// Use a preconfigured client (proxies, custom DNS, shared pools)
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn fetch_html(&self, url: &NormalizedUrl) -> UnfurlResult<String> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| UnfurlError::Fetch(format!("GET {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UnfurlError::Fetch(format!("GET {url} returned {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| UnfurlError::Fetch(format!("Failed to read body of {url}: {e}")))
    }
}

/// Parsed documents are not `Send`; keep parsing out of the async body
fn resolve_html(html: &str, url: &NormalizedUrl) -> PageMetadata {
    let dom = StaticDom::parse(html);
    resolve(&dom, url)
}

#[async_trait]
impl MetadataSource for StaticExtractor {
    async fn extract(&self, url: &NormalizedUrl) -> UnfurlResult<PageMetadata> {
        let html = self.fetch_html(url).await?;
        debug!("Fetched {} bytes from {}", html.len(), url);
        Ok(resolve_html(&html, url))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
