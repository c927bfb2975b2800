//! Browser infrastructure for launching and managing the render browser

mod wrapper;

pub use crate::browser_setup::{download_managed_browser, find_browser_executable};
pub use wrapper::{BrowserWrapper, launch_browser, open_blank_page};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to create page: {0}")]
    PageCreationFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Page evaluation failed: {0}")]
    EvaluationFailed(String),
}

pub type BrowserResult<T> = Result<T, BrowserError>;
