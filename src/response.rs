//! Inbound boundary rendering
//!
//! Turns an orchestrator outcome into status + headers + JSON body. Internal
//! failure details are logged upstream and never leave the process.

use serde::Serialize;
use serde_json::{Value, json};

use crate::metadata::PageMetadata;
use crate::utils::errors::{UnfurlError, UnfurlResult};

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewResponse {
    pub status: u16,
    #[serde(skip)]
    pub headers: Vec<(&'static str, String)>,
    pub body: Value,
}

impl PreviewResponse {
    pub fn from_result(result: &UnfurlResult<PageMetadata>) -> Self {
        let (status, body) = match result {
            Ok(metadata) => (200, json!({ "metadata": metadata })),
            Err(UnfurlError::InvalidUrl(_)) => (400, json!({ "error": "Invalid URL" })),
            Err(_) => (500, json!({ "error": INTERNAL_ERROR_MESSAGE })),
        };

        Self {
            status,
            headers: vec![("Access-Control-Allow-Origin", "*".to_string())],
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl From<UnfurlResult<PageMetadata>> for PreviewResponse {
    fn from(result: UnfurlResult<PageMetadata>) -> Self {
        Self::from_result(&result)
    }
}
