//! Application configuration

use crate::queue::{QueueConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Backend base URL
    pub base_url: String,

    /// Maximum concurrent queued requests
    pub max_concurrent: usize,

    /// Minimum spacing between dispatches in milliseconds; absent disables pacing
    pub min_interval_ms: Option<u64>,

    /// Retry attempts per request
    pub retry_attempts: usize,

    /// Base backoff delay in milliseconds
    pub base_retry_delay_ms: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            max_concurrent: 5,
            min_interval_ms: Some(1000),
            retry_attempts: 3,
            base_retry_delay_ms: 3000,
        }
    }
}

impl AppSettings {
    /// Queue configuration derived from these settings
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            max_concurrent: self.max_concurrent.max(1),
            base_retry_delay: Duration::from_millis(self.base_retry_delay_ms),
            max_retries: self.retry_attempts,
            min_interval: self.min_interval_ms.map(Duration::from_millis),
        }
    }

    /// Retry policy derived from these settings
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry_attempts,
            base_delay: Duration::from_millis(self.base_retry_delay_ms),
        }
    }

    /// Settings file location under the user config directory
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("magline")
            .join("settings.json")
    }

    /// Load settings; a missing or unreadable file falls back to defaults
    pub async fn load(path: &std::path::Path) -> Self {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(settings) => settings,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "invalid settings file, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Persist settings as pretty JSON
    pub async fn save(&self, path: &std::path::Path) -> Result<(), crate::utils::error::MaglineError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_sane() {
        let settings = AppSettings::default();
        assert!(settings.max_concurrent > 0);
        assert!(settings.retry_attempts > 0);
        assert!(settings.base_retry_delay_ms > 0);
    }

    #[test]
    fn zero_concurrency_is_clamped_in_queue_config() {
        let settings = AppSettings {
            max_concurrent: 0,
            ..Default::default()
        };
        assert_eq!(settings.queue_config().max_concurrent, 1);
    }

    #[test]
    fn pacing_can_be_disabled() {
        let settings = AppSettings {
            min_interval_ms: None,
            ..Default::default()
        };
        assert!(settings.queue_config().min_interval.is_none());
    }

    #[tokio::test]
    async fn settings_round_trip() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("magline").join("settings.json");

        let settings = AppSettings {
            base_url: "http://backend:9000".to_string(),
            max_concurrent: 2,
            min_interval_ms: None,
            retry_attempts: 5,
            base_retry_delay_ms: 100,
        };
        settings.save(&path).await.expect("save");

        let loaded = AppSettings::load(&path).await;
        assert_eq!(loaded.base_url, "http://backend:9000");
        assert_eq!(loaded.max_concurrent, 2);
        assert_eq!(loaded.min_interval_ms, None);
        assert_eq!(loaded.retry_attempts, 5);
    }

    #[tokio::test]
    async fn missing_settings_fall_back_to_defaults() {
        let temp = TempDir::new().expect("temp dir");
        let loaded = AppSettings::load(&temp.path().join("nope.json")).await;
        assert_eq!(loaded.base_url, AppSettings::default().base_url);
    }
}
