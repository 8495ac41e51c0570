//! OAuth 2.0 Authorization-Code flow.
//!
//! 1. User opens the provider's authorize URL (`/login` or `authorize-url`)
//! 2. Provider redirects back with `?code=...`
//! 3. [`OAuthExchanger`] trades the code for a bearer credential
//! 4. The caller hands the credential to a [`TokenStore`](crate::credentials::TokenStore)

mod exchange;
mod provider;
mod state_manager;

pub use exchange::{basic_auth_header, OAuthExchanger};
pub use provider::OAuthProvider;
pub use state_manager::StateManager;
