//! HTTP client for the catalog/download-assistant backend
//!
//! Every single-item lookup routes through one shared [`RequestQueue`]
//! instance wrapped in the general retry policy, which mirrors how the
//! backend expects to be driven: bounded concurrency, paced dispatches, and
//! backoff instead of hammering on 429. Bulk per-movie magnet resolution goes
//! through the streaming batch endpoint instead of N queued round trips.

use crate::api::models::{
    BatchMoviesResponse, DownloadedCheck, HistoryEntry, MagnetQuery, MagnetRef, MovieDetail,
    MovieListing, MovieQuery, ProviderResponse,
};
use crate::pikpak::Credentials;
use crate::queue::{retry_with_backoff, RequestQueue, RetryPolicy};
use crate::stream::{BatchEvent, StreamConsumer, StreamRequest};
use crate::utils::config::AppSettings;
use crate::utils::error::MaglineError;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Backend client holding the shared admission-control queue
pub struct ApiClient {
    base_url: String,
    http: Client,
    queue: Arc<RequestQueue<Option<Value>>>,
    retry: RetryPolicy,
    consumer: StreamConsumer,
}

impl ApiClient {
    /// Build a client from settings; the queue configuration comes from the
    /// settings so concurrency and pacing are explicit, not ambient globals.
    pub fn new(settings: &AppSettings) -> Result<Self, MaglineError> {
        // no total timeout: the batch stream stays open for the whole batch
        let http = Client::builder()
            .user_agent(concat!("magline/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            consumer: StreamConsumer::new(http.clone()),
            queue: RequestQueue::new(settings.queue_config()),
            retry: settings.retry_policy(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Search the catalog by keyword or movie id
    pub async fn search_movies(&self, keyword: &str) -> Result<Option<MovieDetail>, MaglineError> {
        self.get_movie(keyword).await
    }

    /// Fetch one movie record, including the `gid`/`uc` pair magnet lookups need
    pub async fn get_movie(&self, movie_id: &str) -> Result<Option<MovieDetail>, MaglineError> {
        let url = self.endpoint(&format!("/api/movies/{movie_id}"), &[])?;
        decode(self.request_json(url, None).await?)
    }

    /// Fetch the magnet links for a movie; a 404 resolves to an empty list
    pub async fn get_magnets(
        &self,
        movie_id: &str,
        query: &MagnetQuery,
    ) -> Result<Vec<MagnetRef>, MaglineError> {
        let mut params = vec![
            ("gid", query.gid.clone()),
            ("uc", query.uc.clone()),
        ];
        if let Some(sort_by) = &query.sort_by {
            params.push(("sortBy", sort_by.clone()));
        }
        if let Some(sort_order) = &query.sort_order {
            params.push(("sortOrder", sort_order.clone()));
        }
        if let Some(has_subtitle) = query.has_subtitle {
            params.push(("hasSubtitle", has_subtitle.to_string()));
        }

        let url = self.endpoint(&format!("/api/magnets/{movie_id}"), &params)?;
        Ok(decode::<Vec<MagnetRef>>(self.request_json(url, None).await?)?.unwrap_or_default())
    }

    /// Fetch one page of the catalog listing
    pub async fn list_movies(&self, query: &MovieQuery) -> Result<Option<MovieListing>, MaglineError> {
        let mut params = Vec::new();
        if let Some(page) = query.page {
            params.push(("page", page.to_string()));
        }
        if let (Some(filter_type), Some(filter_value)) = (&query.filter_type, &query.filter_value) {
            params.push(("filterType", filter_type.clone()));
            params.push(("filterValue", filter_value.clone()));
        }
        if let Some(magnet) = &query.magnet {
            params.push(("magnet", magnet.clone()));
        }
        if let Some(movie_type) = &query.movie_type {
            params.push(("type", movie_type.clone()));
        }
        if let Some(actor_count) = &query.actor_count_filter {
            params.push(("actorCountFilter", actor_count.clone()));
        }

        let path = if query.all { "/api/movies/all" } else { "/api/movies" };
        let url = self.endpoint(path, &params)?;
        decode(self.request_json(url, None).await?)
    }

    /// Fetch the server-side download history
    pub async fn get_history(&self) -> Result<Vec<HistoryEntry>, MaglineError> {
        let url = self.endpoint("/api/history", &[])?;
        Ok(decode::<Vec<HistoryEntry>>(self.request_json(url, None).await?)?.unwrap_or_default())
    }

    /// Whether a movie is already in the download history
    pub async fn check_downloaded(&self, movie_id: &str) -> Result<bool, MaglineError> {
        let url = self.endpoint(&format!("/api/downloaded-movies/{movie_id}"), &[])?;
        Ok(decode::<DownloadedCheck>(self.request_json(url, None).await?)?
            .map(|check| check.is_downloaded)
            .unwrap_or(false))
    }

    /// Non-streaming batch lookup of best magnets per movie
    pub async fn batch_movies(
        &self,
        movie_ids: &[String],
    ) -> Result<BatchMoviesResponse, MaglineError> {
        let url = self.endpoint("/api/movies/batch", &[])?;
        let body = serde_json::to_value(movie_ids)?;
        Ok(decode::<BatchMoviesResponse>(self.request_json(url, Some(body)).await?)?
            .unwrap_or_default())
    }

    /// Streaming batch lookup: one connection, one `on_event` call per record.
    ///
    /// Bypasses the request queue on purpose, the server paces itself and
    /// flushes per-movie results as they resolve.
    pub async fn batch_magnets<F>(
        &self,
        movie_ids: &[String],
        has_subtitle: Option<bool>,
        on_event: F,
    ) -> Result<(), MaglineError>
    where
        F: FnMut(BatchEvent),
    {
        let url = self.endpoint("/api/magnets/batch", &[])?;
        let mut body = json!({ "movie_ids": movie_ids });
        if let Some(has_subtitle) = has_subtitle {
            body["hasSubtitle"] = json!(has_subtitle);
        }

        info!(movies = movie_ids.len(), "opening batch magnet stream");
        self.consumer.consume(StreamRequest { url, body }, on_event).await
    }

    /// Authenticate the PikPak account through the backend
    pub async fn pikpak_login(
        &self,
        credentials: &Credentials,
    ) -> Result<ProviderResponse, MaglineError> {
        let url = self.endpoint("/api/pikpak/login", &[])?;
        let body = json!({
            "username": credentials.username,
            "password": credentials.password,
        });
        self.post_direct(&url, &body).await
    }

    /// Push magnet links into the PikPak account and record them as downloaded
    pub async fn pikpak_download(
        &self,
        credentials: &Credentials,
        magnet_links: &[String],
        movie_ids: &[String],
    ) -> Result<ProviderResponse, MaglineError> {
        let url = self.endpoint("/api/pikpak/download", &[])?;
        let body = json!({
            "magnet_links": magnet_links,
            "movie_ids": movie_ids,
            "username": credentials.username,
            "password": credentials.password,
        });
        self.post_direct(&url, &body).await
    }

    /// One queued, retried JSON request; `Ok(None)` means the backend said 404
    async fn request_json(
        &self,
        url: String,
        body: Option<Value>,
    ) -> Result<Option<Value>, MaglineError> {
        debug!(%url, "queueing backend request");
        let http = self.http.clone();
        let retry = self.retry.clone();
        self.queue
            .add(move || {
                let http = http.clone();
                let url = url.clone();
                let body = body.clone();
                let retry = retry.clone();
                async move { retry_with_backoff(&retry, || send_json(&http, &url, body.as_ref())).await }
            })
            .await
    }

    /// Direct POST outside the queue, used by the PikPak driver endpoints
    async fn post_direct<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &Value,
    ) -> Result<T, MaglineError> {
        let response = self.http.post(url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MaglineError::Status(status.as_u16()));
        }
        Ok(response.json().await?)
    }

    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> Result<String, MaglineError> {
        let mut url = reqwest::Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|err| MaglineError::InvalidUrl(format!("{}{}: {}", self.base_url, path, err)))?;
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url.into())
    }
}

/// One raw attempt: non-2xx statuses become errors carrying the status code
/// so the retry layers can classify 404 and 429
async fn send_json(http: &Client, url: &str, body: Option<&Value>) -> Result<Value, MaglineError> {
    let request = match body {
        Some(body) => http.post(url).json(body),
        None => http.get(url),
    };
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(MaglineError::Status(status.as_u16()));
    }
    Ok(response.json().await?)
}

fn decode<T: DeserializeOwned>(value: Option<Value>) -> Result<Option<T>, MaglineError> {
    value
        .map(serde_json::from_value)
        .transpose()
        .map_err(Into::into)
}
