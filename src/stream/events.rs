//! Events carried by the streaming batch endpoint

use crate::api::models::MagnetRef;
use serde::{Deserialize, Serialize};

/// One decoded record from the batch magnet stream.
///
/// A well-formed stream is exactly: one `start`, at most `total` `progress`
/// records, then one `complete`. A dropped connection may end the stream
/// without `complete`, which callers must treat as a terminal failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BatchEvent {
    Start {
        total: usize,
    },
    Progress {
        movie_id: String,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        best_magnet: Option<MagnetRef>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_downloaded: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Complete,
}

impl BatchEvent {
    pub fn is_complete(&self) -> bool {
        matches!(self, BatchEvent::Complete)
    }
}
