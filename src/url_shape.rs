//! URL normalization and shape validation
//!
//! The shape check is a heuristic, not RFC 3986: it accepts anything that
//! looks like `scheme://[www.]host.tld[tail]` and is reused to vet image
//! candidates pulled out of page markup.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::utils::errors::{UnfurlError, UnfurlResult};

/// Anchored at the start only; the tail is deliberately left open so that
/// real-world URLs with unusual path characters still pass.
static WEB_URL_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?i:https?)://(?:www\.)?[-a-zA-Z0-9@:%._+~#=]{2,256}\.(?i:[a-z]{2,6})\b[-a-zA-Z0-9@:%_+.~#?&/=]*",
    )
    .expect("URL shape pattern is valid")
});

/// Returns true when `candidate` passes the web URL shape heuristic
///
/// Protocol-relative (`//cdn.example.com/a.png`) and path-only values fail.
pub fn is_web_url(candidate: &str) -> bool {
    WEB_URL_SHAPE.is_match(candidate)
}

/// A user-supplied URL that passed normalization and the shape check
///
/// Also parsed with `url::Url` so origin and hostname are always available.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NormalizedUrl {
    raw: String,
    parsed: Url,
}

impl NormalizedUrl {
    /// The normalized string, used verbatim as the cache key and fetch target
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn url(&self) -> &Url {
        &self.parsed
    }

    /// Serialized origin, e.g. `https://example.com:8443`
    pub fn origin(&self) -> String {
        self.parsed.origin().ascii_serialization()
    }

    /// Hostname with a leading literal `www.` removed
    pub fn bare_host(&self) -> String {
        self.parsed
            .host_str()
            .map(strip_www)
            .unwrap_or_default()
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl TryFrom<String> for NormalizedUrl {
    type Error = UnfurlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        normalize(&value)
    }
}

impl From<NormalizedUrl> for String {
    fn from(value: NormalizedUrl) -> Self {
        value.raw
    }
}

/// Canonicalize and validate raw user input
///
/// Prepends `http://` when no `://` separator is present, then applies the
/// shape check. No network access happens here.
pub fn normalize(raw: &str) -> UnfurlResult<NormalizedUrl> {
    if raw.is_empty() {
        return Err(UnfurlError::InvalidUrl("URL must not be empty".to_string()));
    }

    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };

    if !is_web_url(&candidate) {
        return Err(UnfurlError::InvalidUrl(format!(
            "'{raw}' does not look like a web URL"
        )));
    }

    let parsed = Url::parse(&candidate)
        .map_err(|e| UnfurlError::InvalidUrl(format!("'{raw}' could not be parsed: {e}")))?;

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(UnfurlError::InvalidUrl(format!("'{raw}' has no host")));
    }

    Ok(NormalizedUrl {
        raw: candidate,
        parsed,
    })
}

pub(crate) fn strip_www(host: &str) -> String {
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepends_http_when_scheme_missing() {
        let url = normalize("example.com/page").unwrap();
        assert_eq!(url.as_str(), "http://example.com/page");
    }

    #[test]
    fn leaves_input_with_scheme_untouched() {
        let url = normalize("https://www.example.com/a?b=c#d").unwrap();
        assert_eq!(url.as_str(), "https://www.example.com/a?b=c#d");
        assert_eq!(url.bare_host(), "example.com");
        assert_eq!(url.origin(), "https://www.example.com");
    }

    #[test]
    fn rejects_plain_words_before_any_fetch() {
        assert!(matches!(normalize("not a url"), Err(UnfurlError::InvalidUrl(_))));
        assert!(matches!(normalize(""), Err(UnfurlError::InvalidUrl(_))));
        assert!(matches!(normalize("localhost"), Err(UnfurlError::InvalidUrl(_))));
    }

    #[test]
    fn rejects_non_web_schemes() {
        assert!(normalize("ftp://files.example.com/a").is_err());
        assert!(normalize("javascript://alert.com").is_err());
    }

    #[test]
    fn shape_check_rejects_protocol_relative_and_paths() {
        assert!(!is_web_url("//cdn.example.com/logo.png"));
        assert!(!is_web_url("/static/logo.png"));
        assert!(!is_web_url("logo.png"));
        assert!(is_web_url("https://cdn.example.com/logo.png"));
        assert!(is_web_url("HTTP://EXAMPLE.com/x"));
    }

    #[test]
    fn shape_check_tolerates_ports_and_odd_tails() {
        assert!(is_web_url("https://example.com:8443/a(b)"));
        assert!(is_web_url("http://sub.domain.co.uk/path_with-stuff~1"));
    }

    #[test]
    fn host_and_tld_case_is_ignored() {
        let url = normalize("Example.Com/page").unwrap();
        assert_eq!(url.as_str(), "http://Example.Com/page");
        assert_eq!(url.bare_host(), "example.com");

        assert!(normalize("EXAMPLE.COM").is_ok());
        assert!(is_web_url("HTTPS://CDN.EXAMPLE.ORG/A.PNG"));
    }

    #[test]
    fn strip_www_only_removes_prefix() {
        assert_eq!(strip_www("www.example.com"), "example.com");
        assert_eq!(strip_www("example.www.com"), "example.www.com");
    }

    #[test]
    fn normalized_url_serializes_as_string() {
        let url = normalize("example.org").unwrap();
        let json = serde_json::to_string(&url).unwrap();
        assert_eq!(json, "\"http://example.org\"");
        let back: NormalizedUrl = serde_json::from_str(&json).unwrap();
        assert_eq!(back, url);
    }
}
