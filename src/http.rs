//! Outbound HTTP client construction.

use crate::error::EtlError;
use reqwest::Client;
use std::time::Duration;

/// Default deadline for one request, connect through body
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Client with a request deadline so a stalled upstream cannot park a run.
pub(crate) fn build_client(timeout: Duration) -> Result<Client, EtlError> {
    Client::builder()
        .user_agent(concat!("spotify-etl/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(|e| EtlError::Configuration(format!("Failed to build HTTP client: {}", e)))
}
