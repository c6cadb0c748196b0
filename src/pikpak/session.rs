//! PikPak session and bulk-download orchestration
//!
//! Authentication itself happens backend-side; this module keeps the
//! credentials between runs (JSON under the user config dir) and drives the
//! check-skip-resolve-push flow for bulk downloads. Per-movie lookups go
//! through the client's shared request queue, so a large batch cannot flood
//! the backend.

use crate::api::models::{pick_best_magnet, MagnetQuery};
use crate::api::ApiClient;
use crate::utils::error::MaglineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// PikPak account credentials, forwarded to the backend on each call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    #[serde(default = "Utc::now")]
    pub saved_at: DateTime<Utc>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            saved_at: Utc::now(),
        }
    }
}

/// Result of a bulk download run
#[derive(Debug, Clone, Default)]
pub struct DownloadOutcome {
    /// Movies whose best magnet was pushed to PikPak
    pub queued: Vec<String>,
    /// Movies already present in the download history
    pub skipped: Vec<String>,
    /// Movies with no record or no usable magnet
    pub missing: Vec<String>,
    /// Backend acknowledgement message, if any
    pub message: Option<String>,
}

/// Persisted login state for the PikPak driver
pub struct Session {
    path: PathBuf,
    credentials: Option<Credentials>,
}

impl Session {
    /// Default session file location under the user config directory
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("magline")
            .join("pikpak.json")
    }

    /// Load a session; a missing or unreadable file just means logged out
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let credentials = match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<Credentials>(&content) {
                Ok(credentials) => {
                    debug!(username = %credentials.username, "restored PikPak session");
                    Some(credentials)
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "ignoring corrupt session file");
                    None
                }
            },
            Err(_) => None,
        };
        Self { path, credentials }
    }

    pub fn is_logged_in(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Verify credentials against the backend and persist them on success
    pub async fn login(
        &mut self,
        api: &ApiClient,
        username: &str,
        password: &str,
    ) -> Result<(), MaglineError> {
        let credentials = Credentials::new(username, password);
        let response = api.pikpak_login(&credentials).await?;
        if !response.success {
            return Err(MaglineError::Backend(
                response.message.unwrap_or_else(|| "login rejected".to_string()),
            ));
        }

        info!(username, "PikPak login verified");
        self.credentials = Some(credentials);
        self.save().await
    }

    /// Drop the stored credentials and remove the session file
    pub async fn logout(&mut self) -> Result<(), MaglineError> {
        self.credentials = None;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Resolve the best magnet per movie and push the batch to PikPak.
    ///
    /// Movies already in the download history are skipped; movies without a
    /// record or without any usable magnet are reported back, they never fail
    /// the whole batch.
    pub async fn download_movies(
        &self,
        api: &ApiClient,
        movie_ids: &[String],
        has_subtitle: Option<bool>,
    ) -> Result<DownloadOutcome, MaglineError> {
        let credentials = self.credentials.as_ref().ok_or(MaglineError::NotLoggedIn)?;

        let mut outcome = DownloadOutcome::default();
        let mut links = Vec::new();

        for movie_id in movie_ids {
            if api.check_downloaded(movie_id).await? {
                debug!(%movie_id, "already downloaded, skipping");
                outcome.skipped.push(movie_id.clone());
                continue;
            }

            let detail = match api.get_movie(movie_id).await? {
                Some(detail) => detail,
                None => {
                    warn!(%movie_id, "movie not found");
                    outcome.missing.push(movie_id.clone());
                    continue;
                }
            };

            let mut query = MagnetQuery::largest_first(&detail);
            query.has_subtitle = has_subtitle;
            let magnets = api.get_magnets(movie_id, &query).await?;

            match pick_best_magnet(&magnets) {
                Some(best) => {
                    links.push(best.link.clone());
                    outcome.queued.push(movie_id.clone());
                }
                None => {
                    warn!(%movie_id, "no usable magnet");
                    outcome.missing.push(movie_id.clone());
                }
            }
        }

        if links.is_empty() {
            info!("nothing to download");
            return Ok(outcome);
        }

        let response = api
            .pikpak_download(credentials, &links, &outcome.queued)
            .await?;
        if !response.success {
            return Err(MaglineError::Backend(
                response
                    .message
                    .unwrap_or_else(|| "download request rejected".to_string()),
            ));
        }

        info!(
            queued = outcome.queued.len(),
            skipped = outcome.skipped.len(),
            missing = outcome.missing.len(),
            "batch pushed to PikPak"
        );
        outcome.message = response.message;
        Ok(outcome)
    }

    async fn save(&self) -> Result<(), MaglineError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        if let Some(credentials) = &self.credentials {
            let json = serde_json::to_string_pretty(credentials)?;
            tokio::fs::write(&self.path, json).await?;
        }
        Ok(())
    }
}
