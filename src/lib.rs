//! Link preview metadata extraction
//!
//! Resolves title, description, image, domain, favicon and site name for a
//! URL. A cheap static fetch runs first; pages whose metadata is incomplete
//! are re-read in a shared headless browser via chromiumoxide.

mod browser;
pub mod browser_setup;
pub mod cache;
pub mod dom;
pub mod extract;
mod manager;
pub mod metadata;
pub mod resolve;
pub mod response;
pub mod unfurler;
pub mod url_shape;
mod utils;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::constants::{
    DEFAULT_CACHE_TTL_SECS, DEFAULT_FETCH_TIMEOUT_MS, DEFAULT_MAX_REDIRECTS,
    DEFAULT_RENDER_TIMEOUT_MS, DEFAULT_SWEEP_INTERVAL_SECS, FETCH_USER_AGENT,
    UNFURL_BOT_USER_AGENT,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub browser: BrowserConfig,
}

/// Result cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry lifetime in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Interval between background purges of expired entries (0 disables)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

/// Static fetch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_fetch_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

/// Rendered extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_render_timeout_ms")]
    pub timeout_ms: u64,

    /// Agent set on every rendered page
    #[serde(default = "default_render_user_agent")]
    pub user_agent: String,

    /// Abort image requests during page load
    #[serde(default = "default_true")]
    pub block_images: bool,

    /// Abort font requests during page load
    #[serde(default = "default_true")]
    pub block_fonts: bool,
}

/// Browser security and launch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Disable web security features (Same-Origin Policy, etc.)
    /// WARNING: Only enable for trusted content
    #[serde(default = "default_disable_security")]
    pub disable_security: bool,

    /// Window dimensions
    #[serde(default)]
    pub window: WindowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_width")]
    pub width: u32,

    #[serde(default = "default_window_height")]
    pub height: u32,
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}
fn default_sweep_interval_secs() -> u64 {
    DEFAULT_SWEEP_INTERVAL_SECS
}
fn default_fetch_timeout_ms() -> u64 {
    DEFAULT_FETCH_TIMEOUT_MS
}
fn default_fetch_user_agent() -> String {
    FETCH_USER_AGENT.to_string()
}
fn default_max_redirects() -> usize {
    DEFAULT_MAX_REDIRECTS
}
fn default_render_timeout_ms() -> u64 {
    DEFAULT_RENDER_TIMEOUT_MS
}
fn default_render_user_agent() -> String {
    UNFURL_BOT_USER_AGENT.to_string()
}

fn default_true() -> bool {
    true
}

fn default_disable_security() -> bool {
    false  // SECURE BY DEFAULT
}

fn default_window_width() -> u32 {
    1280
}

fn default_window_height() -> u32 {
    720
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            fetch: FetchConfig::default(),
            render: RenderConfig::default(),
            browser: BrowserConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_fetch_timeout_ms(),
            user_agent: default_fetch_user_agent(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_render_timeout_ms(),
            user_agent: default_render_user_agent(),
            block_images: default_true(),
            block_fonts: default_true(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_true(),
            disable_security: default_disable_security(),
            window: WindowConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_window_width(),
            height: default_window_height(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Config {
    /// Check values that cannot be expressed through serde defaults
    pub fn validate(&self) -> UnfurlResult<()> {
        validate_deadline("fetch.timeout_ms", self.fetch.timeout_ms)?;
        validate_deadline("render.timeout_ms", self.render.timeout_ms)?;
        if self.cache.ttl_secs == 0 {
            return Err(UnfurlError::Config("cache.ttl_secs must be greater than 0".into()));
        }
        Ok(())
    }
}

/// Load config from config.yaml in package root
pub fn load_yaml_config() -> UnfurlResult<Config> {
    let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config.yaml");

    if config_path.exists() {
        load_yaml_config_from(&config_path)
    } else {
        Ok(Config::default())
    }
}

/// Load and validate config from an explicit YAML file
pub fn load_yaml_config_from(path: &Path) -> UnfurlResult<Config> {
    let contents = fs::read_to_string(path)?;
    let config: Config = serde_yaml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

pub use browser::{
    BrowserError, BrowserResult, BrowserWrapper, download_managed_browser,
    find_browser_executable, launch_browser,
};
pub use cache::{CacheStore, MemoryStore, ResultCache, stop_sweeper};
pub use extract::{MetadataSource, RenderBackend, RenderedExtractor, StaticExtractor};
pub use manager::BrowserManager;
pub use metadata::PageMetadata;
pub use response::PreviewResponse;
pub use unfurler::Unfurler;
pub use url_shape::{NormalizedUrl, is_web_url, normalize};
pub use utils::errors::{UnfurlError, UnfurlResult};
pub use utils::timeout::validate_deadline;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let yaml = "render:\n  timeout_ms: 5000\nbrowser:\n  headless: false\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.render.timeout_ms, 5000);
        assert_eq!(config.render.user_agent, UNFURL_BOT_USER_AGENT);
        assert!(config.render.block_images);
        assert!(!config.browser.headless);
        assert_eq!(config.cache.ttl(), Duration::from_secs(7 * 24 * 60 * 60));
        assert_eq!(config.fetch.max_redirects, 5);
    }

    #[test]
    fn load_from_file_rejects_oversized_deadline() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "fetch:\n  timeout_ms: 900000").unwrap();

        let err = load_yaml_config_from(file.path()).unwrap_err();
        assert!(matches!(err, UnfurlError::Config(_)));
    }

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }
}
