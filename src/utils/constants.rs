//! Shared configuration constants for link preview extraction
//!
//! This module contains default values and configuration constants used
//! throughout the codebase to ensure consistency and avoid magic numbers.

/// Chrome user agent string used when launching the shared browser
///
/// Updated: 2025-01-29 to Chrome 132 (current stable)
///
/// Reference: https://chromiumdash.appspot.com/schedule
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

/// Generic identifying agent for the plain HTTP fetch
pub const FETCH_USER_AGENT: &str = "Mozilla/5.0 (compatible; KodegenLinkPreview/0.2; +https://kodegen.ai)";

/// Facebook's link unfurler agent, set on every rendered page
///
/// Many sites serve their richest OpenGraph markup only to known
/// unfurling bots, so the rendered path identifies as one.
pub const UNFURL_BOT_USER_AGENT: &str =
    "facebookexternalhit/1.1 (+http://www.facebook.com/externalhit_uatext.php)";

/// Default cache entry lifetime (7 days)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Default interval between background sweeps of expired cache entries
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60 * 60;

/// Default deadline for the static fetch
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;

/// Default deadline for one rendered attempt (page open to evaluation)
pub const DEFAULT_RENDER_TIMEOUT_MS: u64 = 30_000;

/// Redirect hops followed by the static fetch
pub const DEFAULT_MAX_REDIRECTS: usize = 5;
