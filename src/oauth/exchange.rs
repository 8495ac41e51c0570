//! OAuth token exchange logic.
//!
//! Turns a single-use authorization code into a bearer credential. Codes
//! expire within seconds, so a failed exchange is reported and never retried.

use crate::config::OAuthConfig;
use crate::credentials::Credential;
use crate::error::EtlError;
use crate::http::build_client;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{Duration, Utc};
use serde::Deserialize;

/// OAuth token response (standard OAuth 2.0)
#[derive(Deserialize, Debug)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
}

/// Exchanges authorization codes at the provider's token endpoint.
pub struct OAuthExchanger {
    http_client: reqwest::Client,
    token_url: String,
    redirect_uri: String,
    authorization: String,
}

impl OAuthExchanger {
    /// Builds an exchanger from already-validated OAuth configuration.
    pub fn new(config: &OAuthConfig) -> Result<Self, EtlError> {
        let timeout = std::time::Duration::from_secs(config.request_timeout_seconds);
        Ok(Self {
            http_client: build_client(timeout)?,
            token_url: config.token_url.clone(),
            redirect_uri: config.redirect_uri.clone(),
            authorization: basic_auth_header(&config.client_id, &config.client_secret),
        })
    }

    /// Exchange authorization code for a credential
    ///
    /// # Returns
    /// * `Ok(Credential)` - Fresh bearer credential; the caller stores it
    /// * `Err(UpstreamAuth)` - Token endpoint returned a non-2xx status
    /// * `Err(MalformedResponse)` - 2xx without an `access_token`
    /// * `Err(Network)` - Token endpoint unreachable
    pub async fn exchange(&self, authorization_code: &str) -> Result<Credential, EtlError> {
        if authorization_code.trim().is_empty() {
            return Err(EtlError::Configuration(
                "authorization code must not be empty".to_string(),
            ));
        }

        let form_data = [
            ("grant_type", "authorization_code"),
            ("code", authorization_code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        tracing::debug!("Exchanging authorization code for token at {}", self.token_url);

        let response = self
            .http_client
            .post(&self.token_url)
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form_data)
            .send()
            .await
            .map_err(|e| EtlError::Network(format!("Failed to send token exchange request: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        if !status.is_success() {
            return Err(EtlError::UpstreamAuth {
                status: status.as_u16(),
                body,
            });
        }

        let obtained_at = Utc::now();
        let token_response: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| EtlError::MalformedResponse(format!("Failed to parse token response: {}", e)))?;

        let value = token_response
            .access_token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                EtlError::MalformedResponse("response has no access_token field".to_string())
            })?;

        tracing::debug!(
            token_type = ?token_response.token_type,
            expires_in = ?token_response.expires_in,
            "Token exchange successful"
        );

        Ok(Credential {
            value,
            obtained_at,
            expires_at: token_response
                .expires_in
                .map(|seconds| obtained_at + Duration::seconds(seconds)),
        })
    }
}

/// `Basic base64(client_id:client_secret)`
pub fn basic_auth_header(client_id: &str, client_secret: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("{}:{}", client_id, client_secret)))
}
