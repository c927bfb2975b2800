//! Extraction backends
//!
//! Both backends feed the same resolution engine and differ only in how the
//! document is obtained: a plain HTTP GET, or a live page in the shared
//! browser after scripts ran.

mod page_guard;
pub mod rendered;
pub mod static_fetch;

use async_trait::async_trait;

use crate::metadata::PageMetadata;
use crate::url_shape::NormalizedUrl;
use crate::utils::errors::UnfurlResult;

pub use rendered::{LivePage, RenderBackend, RenderedExtractor};
pub use static_fetch::StaticExtractor;

/// A way of turning a URL into resolved metadata
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn extract(&self, url: &NormalizedUrl) -> UnfurlResult<PageMetadata>;

    /// Short label for logs
    fn name(&self) -> &'static str;
}
