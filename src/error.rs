//! Error taxonomy shared by the OAuth and ETL stages.

use std::fmt;

/// Errors surfaced by the pipeline components.
///
/// Soft failures during extraction never appear here; the extractor absorbs
/// them into an empty result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EtlError {
    /// Missing or invalid configuration (fatal at startup)
    Configuration(String),
    /// Token endpoint answered with a non-2xx status
    UpstreamAuth { status: u16, body: String },
    /// Token endpoint answered 2xx without a usable `access_token`
    MalformedResponse(String),
    /// ETL attempted before any successful exchange
    NoCredential(String),
    /// `played_at` did not match the provider's timestamp format
    Parse { value: String },
    /// Token endpoint could not be reached
    Network(String),
    /// Credential file or database failure
    Storage(String),
}

impl EtlError {
    /// Configuration errors mean the process must not start at all.
    pub fn is_fatal_to_process(&self) -> bool {
        matches!(self, EtlError::Configuration(_))
    }

    pub(crate) fn storage<E: fmt::Display>(action: &'static str) -> impl FnOnce(E) -> EtlError {
        move |e| EtlError::Storage(format!("{}: {}", action, e))
    }
}

impl fmt::Display for EtlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EtlError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            EtlError::UpstreamAuth { status, body } => {
                write!(f, "Token exchange failed with status {}: {}", status, body)
            }
            EtlError::MalformedResponse(msg) => write!(f, "Malformed token response: {}", msg),
            EtlError::NoCredential(location) => {
                write!(f, "No credential stored at {} (run the authorization flow first)", location)
            }
            EtlError::Parse { value } => write!(
                f,
                "Unexpected played_at format '{}' (expected YYYY-MM-DDTHH:MM:SS.ffffffZ)",
                value
            ),
            EtlError::Network(msg) => write!(f, "Network error: {}", msg),
            EtlError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for EtlError {}
