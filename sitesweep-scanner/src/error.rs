use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("{action} timed out after {timeout:?}")]
    Timeout { action: String, timeout: Duration },

    #[error("No element matched {0}")]
    ElementNotFound(String),

    /// The root page could not be loaded, so no discovery result exists.
    #[error("Crawl of {url} aborted: {reason}")]
    CrawlAborted { url: String, reason: String },

    #[error("Not supported by this browser provider: {0}")]
    Unsupported(String),
}

impl ScanError {
    /// Misses that the prober and extractor treat as "not found" rather than failures.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ScanError::Timeout { .. } | ScanError::ElementNotFound(_) | ScanError::Unsupported(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
