pub mod env;

use crate::error::EtlError;
use crate::http::DEFAULT_TIMEOUT_SECONDS;
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::PathBuf;

/// Largest page the recent-activity endpoint accepts
pub const MAX_FETCH_LIMIT: u32 = 50;

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EtlConfig {
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// OAuth client registration and provider endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_redirect_uri() -> String {
    "http://localhost:8080/callback".to_string()
}

fn default_auth_url() -> String {
    "https://accounts.spotify.com/authorize".to_string()
}

fn default_token_url() -> String {
    "https://accounts.spotify.com/api/token".to_string()
}

fn default_scopes() -> Vec<String> {
    vec!["user-read-recently-played".to_string()]
}

fn default_request_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: default_redirect_uri(),
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            scopes: default_scopes(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

/// Recent-activity endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyConfig {
    #[serde(default = "default_recently_played_url")]
    pub recently_played_url: String,
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: u32,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_recently_played_url() -> String {
    "https://api.spotify.com/v1/me/player/recently-played".to_string()
}

fn default_fetch_limit() -> u32 {
    MAX_FETCH_LIMIT
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            recently_played_url: default_recently_played_url(),
            fetch_limit: default_fetch_limit(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

/// Normalization settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransformConfig {
    /// IANA zone name, e.g. "Asia/Bangkok". Required for ETL runs.
    #[serde(default)]
    pub target_timezone: String,
}

/// Credential file and play-history database locations
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default = "default_table_name")]
    pub table_name: String,
}

fn default_token_path() -> PathBuf {
    PathBuf::from("access_token.txt")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("spotify_data.db")
}

fn default_table_name() -> String {
    "spotify_recent_tracks".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            token_path: default_token_path(),
            database_path: default_database_path(),
            table_name: default_table_name(),
        }
    }
}

/// Authorization redirect endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// How long a `/login` state parameter stays valid (seconds)
    #[serde(default = "default_state_expiry")]
    pub state_expiry_seconds: i64,
}

fn default_port() -> u16 {
    8080
}

fn default_state_expiry() -> i64 {
    600
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            state_expiry_seconds: default_state_expiry(),
        }
    }
}

impl EtlConfig {
    /// Checks everything the OAuth exchanger needs.
    pub fn validate_oauth(&self) -> Result<(), EtlError> {
        let required = [
            ("client_id", &self.oauth.client_id),
            ("client_secret", &self.oauth.client_secret),
            ("redirect_uri", &self.oauth.redirect_uri),
            ("token_url", &self.oauth.token_url),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(EtlError::Configuration(format!("{} must not be empty", name)));
            }
        }
        if self.oauth.request_timeout_seconds == 0 {
            return Err(EtlError::Configuration(
                "oauth.request_timeout_seconds must be positive".to_string(),
            ));
        }
        if self.oauth.scopes.iter().all(|s| s.trim().is_empty()) {
            return Err(EtlError::Configuration(
                "at least one OAuth scope is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Checks everything an ETL run needs.
    pub fn validate_etl(&self) -> Result<(), EtlError> {
        self.target_timezone()?;
        validate_table_name(&self.store.table_name)?;
        if self.spotify.fetch_limit == 0 || self.spotify.fetch_limit > MAX_FETCH_LIMIT {
            return Err(EtlError::Configuration(format!(
                "fetch_limit must be between 1 and {}, got {}",
                MAX_FETCH_LIMIT, self.spotify.fetch_limit
            )));
        }
        if self.spotify.request_timeout_seconds == 0 {
            return Err(EtlError::Configuration(
                "spotify.request_timeout_seconds must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Parses the configured target zone.
    pub fn target_timezone(&self) -> Result<Tz, EtlError> {
        let name = self.transform.target_timezone.trim();
        if name.is_empty() {
            return Err(EtlError::Configuration(
                "target_timezone must not be empty".to_string(),
            ));
        }
        name.parse::<Tz>().map_err(|_| {
            EtlError::Configuration(format!("unknown target_timezone '{}'", name))
        })
    }
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
pub fn validate_table_name(name: &str) -> Result<(), EtlError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(EtlError::Configuration(format!("invalid table_name '{}'", name)))
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> anyhow::Result<EtlConfig> {
    use anyhow::Context;

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    let config: EtlConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path))?;
    Ok(config)
}
