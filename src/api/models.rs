//! Typed payloads exchanged with the catalog backend
//!
//! The backend proxies a scraping service, so most payloads are tolerated
//! loosely: unknown fields are ignored and optional fields default.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One magnet link attached to a movie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagnetRef {
    pub link: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub size: Option<String>,
    /// Size in bytes when the backend provides it
    #[serde(default, rename = "numberSize")]
    pub number_size: Option<u64>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, rename = "hasSubtitle")]
    pub has_subtitle: bool,
}

/// Movie summary as returned in listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub img: Option<String>,
}

/// Full movie record; `gid` and `uc` are required to look up magnets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetail {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub gid: String,
    pub uc: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub img: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(rename = "currentPage")]
    pub current_page: u32,
    #[serde(default)]
    pub pages: Vec<u32>,
    #[serde(default, rename = "hasNextPage")]
    pub has_next_page: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterInfo {
    #[serde(rename = "type")]
    pub filter_type: String,
    pub name: String,
}

/// One page of the movie catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieListing {
    #[serde(default)]
    pub movies: Vec<Movie>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
    #[serde(default)]
    pub filter: Option<FilterInfo>,
}

/// Per-movie result of a non-streaming batch lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchMovieResult {
    pub movie_id: String,
    pub success: bool,
    #[serde(default)]
    pub best_magnet: Option<MagnetRef>,
    #[serde(default)]
    pub is_downloaded: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchMoviesResponse {
    pub success: bool,
    #[serde(default)]
    pub results: Vec<BatchMovieResult>,
}

/// Download-history record kept by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub movie_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub downloaded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadedCheck {
    #[serde(default)]
    pub is_downloaded: bool,
}

/// Backend acknowledgement for PikPak operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Query parameters for a magnet lookup
#[derive(Debug, Clone, Default)]
pub struct MagnetQuery {
    pub gid: String,
    pub uc: String,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub has_subtitle: Option<bool>,
}

impl MagnetQuery {
    /// Lookup sorted by size descending, the way the bulk flow asks for it
    pub fn largest_first(detail: &MovieDetail) -> Self {
        Self {
            gid: detail.gid.clone(),
            uc: detail.uc.clone(),
            sort_by: Some("size".to_string()),
            sort_order: Some("desc".to_string()),
            has_subtitle: None,
        }
    }
}

/// Query parameters for a catalog listing
#[derive(Debug, Clone, Default)]
pub struct MovieQuery {
    pub page: Option<u32>,
    pub filter_type: Option<String>,
    pub filter_value: Option<String>,
    /// "exist" restricts the listing to movies with magnet links
    pub magnet: Option<String>,
    pub movie_type: Option<String>,
    pub actor_count_filter: Option<String>,
    /// Use the uncached "/api/movies/all" endpoint
    pub all: bool,
}

/// Pick the most desirable magnet: subtitled first, then largest
pub fn pick_best_magnet(magnets: &[MagnetRef]) -> Option<&MagnetRef> {
    magnets
        .iter()
        .max_by_key(|m| (m.has_subtitle, m.number_size.unwrap_or(0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn magnet(link: &str, subtitled: bool, bytes: Option<u64>) -> MagnetRef {
        MagnetRef {
            link: link.to_string(),
            title: String::new(),
            size: None,
            number_size: bytes,
            date: None,
            has_subtitle: subtitled,
        }
    }

    #[test]
    fn best_magnet_prefers_subtitles_then_size() {
        let magnets = vec![
            magnet("a", false, Some(9_000_000_000)),
            magnet("b", true, Some(4_000_000_000)),
            magnet("c", true, Some(5_000_000_000)),
        ];
        assert_eq!(pick_best_magnet(&magnets).map(|m| m.link.as_str()), Some("c"));
    }

    #[test]
    fn best_magnet_of_empty_is_none() {
        assert!(pick_best_magnet(&[]).is_none());
    }

    #[test]
    fn magnet_tolerates_sparse_payload() {
        let magnet: MagnetRef =
            serde_json::from_str(r#"{"link":"magnet:?xt=urn:btih:abc","size":"4.2GB"}"#).unwrap();
        assert_eq!(magnet.link, "magnet:?xt=urn:btih:abc");
        assert_eq!(magnet.size.as_deref(), Some("4.2GB"));
        assert!(!magnet.has_subtitle);
    }
}
