//! Drive authorization endpoints.
//!
//! One-time consent flow: GET /auth leads to the provider consent page, the
//! provider calls back on GET /oauth2callback with an authorization code, and
//! the exchanged token pair is persisted for subsequent uploads.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::drive::CredentialStore;
use crate::errors::AppError;
use crate::AppState;

/// GET /auth - Start the Drive consent flow.
///
/// Redirects to the consent URL, or returns it as plain text in dev mode.
pub async fn auth_start(State(state): State<AppState>) -> Result<Response, AppError> {
    let credentials = require_credentials(&state)?;
    let url = credentials.authorization_url()?;

    if state.config.auth_redirect {
        Ok(Redirect::temporary(&url).into_response())
    } else {
        Ok(url.into_response())
    }
}

/// Query parameters of the provider callback.
#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: String,
}

/// GET /oauth2callback - Exchange the authorization code and persist tokens.
pub async fn oauth_callback(
    State(state): State<AppState>,
    Query(query): Query<OAuthCallbackQuery>,
) -> Result<String, AppError> {
    let credentials = require_credentials(&state)?;
    credentials.exchange_code(&query.code).await?;

    tracing::info!("Drive authorization complete, token pair persisted");
    Ok("Drive authorization complete. The backend can now upload report photos.".to_string())
}

fn require_credentials(state: &AppState) -> Result<&CredentialStore, AppError> {
    state
        .credentials
        .as_deref()
        .ok_or_else(|| AppError::Auth("Drive integration is not configured".to_string()))
}
