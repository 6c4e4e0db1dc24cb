use reqwest::StatusCode;
use thiserror::Error;

use crate::application::retry::Transient;

/// Errors that can occur when talking to the Strapi API.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("Backend returned {status} for {url}: {body}")]
    Status {
        status: StatusCode,
        url: String,
        body: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl Transient for BackendError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_errors_are_not_transient() {
        let error = BackendError::Status {
            status: StatusCode::BAD_GATEWAY,
            url: "http://localhost:1337/api/products".to_string(),
            body: "upstream down".to_string(),
        };
        assert!(!error.is_transient());
        assert!(error.to_string().contains("502"));
        assert!(!BackendError::NotFound("products/9".to_string()).is_transient());
    }
}
