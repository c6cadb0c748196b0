//! Error handling for Magline

use thiserror::Error;

/// Main error type for Magline
#[derive(Debug, Error)]
pub enum MaglineError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Backend reported failure: {0}")]
    Backend(String),

    #[error("Not logged in to PikPak")]
    NotLoggedIn,

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl MaglineError {
    /// HTTP status associated with this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            MaglineError::Status(code) => Some(*code),
            MaglineError::Network(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Rate-limited responses are retried with backoff by the request queue
    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }

    /// Not-found is a valid outcome, not a transient failure
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(MaglineError::Status(429).is_rate_limited());
        assert!(!MaglineError::Status(429).is_not_found());
        assert!(MaglineError::Status(404).is_not_found());
        assert!(!MaglineError::Status(500).is_rate_limited());
        assert_eq!(MaglineError::Backend("x".into()).status(), None);
    }
}
