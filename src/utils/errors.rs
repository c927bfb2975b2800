use thiserror::Error;

use crate::browser::BrowserError;

/// Errors surfaced by the link preview pipeline
///
/// `Fetch` never reaches callers of the orchestrator: a failed static fetch
/// falls through to the rendered path.
#[derive(Error, Debug)]
pub enum UnfurlError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Static fetch failed: {0}")]
    Fetch(String),

    #[error("Render failed: {0}")]
    Render(String),

    #[error("Unable to resolve metadata for {0}")]
    Unresolved(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Config error: {0}")]
    Config(String),
}

pub type UnfurlResult<T> = Result<T, UnfurlError>;

impl UnfurlError {
    /// True for errors caused by the caller's input rather than by the pipeline
    pub fn is_client_error(&self) -> bool {
        matches!(self, UnfurlError::InvalidUrl(_))
    }
}

/// Browser failures only ever happen on the rendered path
impl From<BrowserError> for UnfurlError {
    fn from(err: BrowserError) -> Self {
        UnfurlError::Render(err.to_string())
    }
}

impl From<serde_json::Error> for UnfurlError {
    fn from(err: serde_json::Error) -> Self {
        UnfurlError::Cache(err.to_string())
    }
}

impl From<serde_yaml::Error> for UnfurlError {
    fn from(err: serde_yaml::Error) -> Self {
        UnfurlError::Config(err.to_string())
    }
}

impl From<std::io::Error> for UnfurlError {
    fn from(err: std::io::Error) -> Self {
        UnfurlError::Config(err.to_string())
    }
}
