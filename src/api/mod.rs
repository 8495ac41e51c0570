//! Authorization redirect endpoint.
//!
//! - `GET /login` redirects to the provider's authorize page
//! - `GET /callback?code=...` exchanges the code and stores the credential

use crate::credentials::TokenStore;
use crate::error::EtlError;
use crate::oauth::{OAuthExchanger, OAuthProvider, StateManager};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Application error types for the redirect endpoint
enum AppError {
    BadRequest(String),
    Unauthorized(String),
    ServerError(String),
    BadGateway(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::ServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(ErrorResponse {
            error: error_message,
        });

        (status, body).into_response()
    }
}

impl From<EtlError> for AppError {
    fn from(e: EtlError) -> Self {
        match e {
            EtlError::UpstreamAuth { .. } | EtlError::MalformedResponse(_) | EtlError::Network(_) => {
                AppError::BadGateway(format!("Failed to exchange authorization code: {}", e))
            }
            other => AppError::ServerError(other.to_string()),
        }
    }
}

/// Shared state for the redirect endpoint
#[derive(Clone)]
pub struct AuthAppState {
    pub exchanger: Arc<OAuthExchanger>,
    pub provider: OAuthProvider,
    pub token_store: Arc<dyn TokenStore>,
    pub state_manager: StateManager,
}

/// OAuth callback query parameters
#[derive(Deserialize)]
pub struct OAuthCallback {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Callback success body
#[derive(Serialize)]
pub struct AuthSuccessResponse {
    success: bool,
    message: String,
}

pub fn create_auth_router(state: AuthAppState) -> Router {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .with_state(Arc::new(state))
}

/// GET /login
async fn login(State(state): State<Arc<AuthAppState>>) -> Redirect {
    let csrf_state = state.state_manager.create_state();
    debug!("Redirecting to provider authorize page");
    Redirect::temporary(&state.provider.authorize_url(Some(&csrf_state)))
}

/// GET /callback
///
/// `state` is optional so a bare `?code=` works; when present it must be one
/// issued by `/login` and not yet used.
async fn callback(
    State(state): State<Arc<AuthAppState>>,
    Query(callback): Query<OAuthCallback>,
) -> Result<Json<AuthSuccessResponse>, AppError> {
    if let Some(reason) = callback.error {
        warn!(error = %reason, "Authorization denied by provider");
        return Err(AppError::BadRequest(format!("Authorization failed: {}", reason)));
    }

    let code = callback
        .code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing 'code' parameter".to_string()))?;

    if let Some(csrf_state) = callback.state {
        if !state.state_manager.validate_and_consume(&csrf_state) {
            warn!(state = %csrf_state, "Invalid or expired OAuth state");
            return Err(AppError::Unauthorized(
                "Invalid or expired OAuth state".to_string(),
            ));
        }
    }

    let credential = state.exchanger.exchange(&code).await.map_err(|e| {
        error!(error = %e, "Token exchange failed");
        AppError::from(e)
    })?;

    state.token_store.put(&credential).map_err(|e| {
        error!(error = %e, "Failed to store credential");
        AppError::from(e)
    })?;

    info!(expires_at = ?credential.expires_at, "Authorization completed, credential stored");

    Ok(Json(AuthSuccessResponse {
        success: true,
        message: "Access token stored".to_string(),
    }))
}
