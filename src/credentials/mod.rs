//! Durable holder of the current bearer credential.
//!
//! Exactly one credential is kept; every successful OAuth exchange overwrites
//! it and every ETL run reads it.
//!
//! # Usage
//!
//! ```no_run
//! use spotify_etl::credentials::{Credential, FileTokenStore, TokenStore};
//!
//! # fn main() -> Result<(), spotify_etl::error::EtlError> {
//! let store = FileTokenStore::new("access_token.txt");
//! store.put(&Credential::new("BQC4...".to_string()))?;
//!
//! let current = store.get()?;
//! println!("Token obtained at {}", current.obtained_at);
//! # Ok(())
//! # }
//! ```

use crate::error::EtlError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod storage;

pub use storage::FileTokenStore;

/// Bearer credential for the provider API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Opaque bearer token
    pub value: String,

    /// When the exchange produced this token (UTC)
    pub obtained_at: DateTime<Utc>,

    /// When the provider says the token stops working, if it said
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(value: String) -> Self {
        Self {
            value,
            obtained_at: Utc::now(),
            expires_at: None,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

/// Capability for persisting the single current credential.
///
/// Implementations must never let a reader observe a half-written value.
pub trait TokenStore: Send + Sync {
    /// Replaces the stored credential.
    fn put(&self, credential: &Credential) -> Result<(), EtlError>;

    /// Returns the stored credential, or [`EtlError::NoCredential`] if none.
    fn get(&self) -> Result<Credential, EtlError>;
}
