//! Recent-activity extraction.
//!
//! Network and HTTP failures are absorbed: they are logged and the run sees
//! an empty batch. Only a missing credential is propagated.

use crate::config::MAX_FETCH_LIMIT;
use crate::credentials::TokenStore;
use crate::error::EtlError;
use crate::http::build_client;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Artist credit on a track.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawArtist {
    pub name: String,
}

/// Track metadata embedded in a play.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTrack {
    pub name: String,
    pub artists: Vec<RawArtist>,
}

/// One playback as the provider reports it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPlayEvent {
    /// ISO-8601 UTC, e.g. `2024-01-01T23:30:00.000000Z`
    pub played_at: String,
    pub track: RawTrack,
}

/// Body of `GET /me/player/recently-played`
#[derive(Debug, Deserialize)]
struct RecentlyPlayedResponse {
    items: Vec<RawPlayEvent>,
}

/// Why a fetch produced nothing
#[derive(Debug)]
enum FetchFailure {
    Transport(reqwest::Error),
    Status(StatusCode, String),
    Body(String),
}

/// What one fetch produced
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub events: Vec<RawPlayEvent>,
    /// Set when the batch is empty because the provider call failed
    pub upstream_error: Option<String>,
}

/// HTTP client for the recent-activity endpoint.
pub struct Extractor {
    token_store: Arc<dyn TokenStore>,
    http_client: Client,
    endpoint: String,
}

impl Extractor {
    /// `timeout` bounds each request, connect through body.
    pub fn new(
        token_store: Arc<dyn TokenStore>,
        endpoint: String,
        timeout: Duration,
    ) -> Result<Self, EtlError> {
        Ok(Self {
            token_store,
            http_client: build_client(timeout)?,
            endpoint,
        })
    }

    /// Fetch up to `limit` recent plays.
    ///
    /// # Returns
    /// * `Ok(events)` - Possibly empty; upstream trouble yields `Ok(vec![])`
    /// * `Err(NoCredential)` - Nothing stored yet
    pub async fn fetch(&self, limit: u32) -> Result<Vec<RawPlayEvent>, EtlError> {
        Ok(self.fetch_outcome(limit).await?.events)
    }

    /// Like [`fetch`](Self::fetch), but keeps the reason an upstream failure
    /// was absorbed.
    pub async fn fetch_outcome(&self, limit: u32) -> Result<FetchOutcome, EtlError> {
        let credential = self.token_store.get()?;

        if credential.is_expired_at(Utc::now()) {
            warn!(
                expires_at = ?credential.expires_at,
                "Stored credential has expired; re-run the authorization flow"
            );
        }

        let limit = limit.clamp(1, MAX_FETCH_LIMIT);

        let reason = match self.request(&credential.value, limit).await {
            Ok(events) => {
                debug!(count = events.len(), "Fetched recent plays");
                return Ok(FetchOutcome {
                    events,
                    upstream_error: None,
                });
            }
            Err(FetchFailure::Status(StatusCode::UNAUTHORIZED, body)) => {
                error!(body = %body, "Recent-activity request rejected: credential expired or revoked");
                "credential rejected (401)".to_string()
            }
            Err(FetchFailure::Status(status, body)) => {
                error!(status = %status, body = %body, "Recent-activity request failed");
                format!("HTTP {}", status)
            }
            Err(FetchFailure::Transport(e)) => {
                error!(error = %e, "Error fetching data from recent-activity endpoint");
                if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    format!("transport error: {}", e)
                }
            }
            Err(FetchFailure::Body(reason)) => {
                warn!(reason = %reason, "No valid data received from recent-activity endpoint");
                reason
            }
        };

        Ok(FetchOutcome {
            events: Vec::new(),
            upstream_error: Some(reason),
        })
    }

    async fn request(&self, token: &str, limit: u32) -> Result<Vec<RawPlayEvent>, FetchFailure> {
        let response = self
            .http_client
            .get(&self.endpoint)
            .bearer_auth(token)
            .query(&[("limit", limit)])
            .send()
            .await
            .map_err(FetchFailure::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(FetchFailure::Transport)?;

        if !status.is_success() {
            return Err(FetchFailure::Status(status, body));
        }

        parse_recently_played(&body).map_err(FetchFailure::Body)
    }
}

/// Decodes a recent-activity body; any shape mismatch is reported as a reason.
fn parse_recently_played(body: &str) -> Result<Vec<RawPlayEvent>, String> {
    let response: RecentlyPlayedResponse =
        serde_json::from_str(body).map_err(|e| format!("unexpected response shape: {}", e))?;
    Ok(response.items)
}

#[cfg(test)]
mod tests;
