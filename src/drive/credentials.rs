//! OAuth credential store for the Drive integration.
//!
//! Owns the client configuration and the persisted access/refresh token pair.
//! All token state lives behind one async lock, so a refresh (read, exchange,
//! persist, replace) is a single-writer operation; request tasks share the
//! store through an `Arc` and never see a half-written pair.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::errors::AppError;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

/// Refresh this long before the recorded expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

/// OAuth2 client configuration.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
}

impl OAuthConfig {
    /// Configuration pointing at Google's endpoints.
    pub fn google(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }
}

/// Persisted access/refresh token pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expiry: DateTime<Utc>,
}

impl TokenPair {
    /// True when the access token is still usable (skew applied).
    fn is_fresh(&self) -> bool {
        Utc::now() + chrono::Duration::seconds(EXPIRY_SKEW_SECS) < self.expiry
    }
}

/// Token endpoint response body.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
}

impl TokenResponse {
    /// Convert to a [`TokenPair`], keeping a previously-known refresh token
    /// when the response omits one (Google issues it only on first consent).
    fn into_pair(self, previous_refresh: Option<String>) -> TokenPair {
        TokenPair {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            expiry: Utc::now() + chrono::Duration::seconds(self.expires_in),
        }
    }
}

/// Holder of OAuth token state used to authenticate with Drive.
pub struct CredentialStore {
    config: OAuthConfig,
    token_path: PathBuf,
    http: reqwest::Client,
    tokens: Mutex<Option<TokenPair>>,
}

impl CredentialStore {
    pub fn new(config: OAuthConfig, token_path: PathBuf) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            config,
            token_path,
            http,
            tokens: Mutex::new(None),
        }
    }

    /// Load a previously persisted token pair, if present.
    ///
    /// Returns whether a pair was found.
    pub async fn load(&self) -> Result<bool, AppError> {
        let bytes = match tokio::fs::read(&self.token_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        let pair: TokenPair = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::Auth(format!("Malformed token file: {}", e)))?;

        *self.tokens.lock().await = Some(pair);
        Ok(true)
    }

    /// Build the provider consent URL requesting offline, Drive-scoped access.
    pub fn authorization_url(&self) -> Result<String, AppError> {
        let url = reqwest::Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", DRIVE_SCOPE),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| AppError::Internal(format!("Invalid auth URL: {}", e)))?;

        Ok(url.to_string())
    }

    /// Trade an authorization code for a token pair and persist it.
    pub async fn exchange_code(&self, code: &str) -> Result<(), AppError> {
        let response = self
            .token_request(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .await?;

        let mut guard = self.tokens.lock().await;
        let previous_refresh = guard.as_ref().and_then(|p| p.refresh_token.clone());
        let pair = response.into_pair(previous_refresh);
        self.persist(&pair).await?;
        *guard = Some(pair);
        Ok(())
    }

    /// Current access token, refreshed through the token endpoint when stale.
    ///
    /// Every refresh is persisted before the new token is handed out.
    pub async fn access_token(&self) -> Result<String, AppError> {
        let mut guard = self.tokens.lock().await;
        let pair = guard
            .as_mut()
            .ok_or_else(|| AppError::Auth("No Drive credentials stored; visit /auth".to_string()))?;

        if pair.is_fresh() {
            return Ok(pair.access_token.clone());
        }

        let refresh_token = pair.refresh_token.clone().ok_or_else(|| {
            AppError::Auth("Access token expired and no refresh token is stored".to_string())
        })?;

        let response = self
            .token_request(&[
                ("refresh_token", refresh_token.as_str()),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .await?;

        let refreshed = response.into_pair(Some(refresh_token));
        self.persist(&refreshed).await?;
        *pair = refreshed;
        Ok(pair.access_token.clone())
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AppError> {
        let resp = self
            .http
            .post(&self.config.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| AppError::Auth(format!("Token request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(AppError::Auth(format!(
                "Token endpoint returned {}",
                resp.status()
            )));
        }

        resp.json::<TokenResponse>()
            .await
            .map_err(|e| AppError::Auth(format!("Malformed token response: {}", e)))
    }

    async fn persist(&self, pair: &TokenPair) -> Result<(), AppError> {
        let json = serde_json::to_vec_pretty(pair)
            .map_err(|e| AppError::Internal(format!("Token serialization failed: {}", e)))?;
        tokio::fs::write(&self.token_path, json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_token_retained_when_response_omits_one() {
        let response = TokenResponse {
            access_token: "new-access".to_string(),
            refresh_token: None,
            expires_in: 3600,
        };

        let pair = response.into_pair(Some("old-refresh".to_string()));
        assert_eq!(pair.access_token, "new-access");
        assert_eq!(pair.refresh_token.as_deref(), Some("old-refresh"));
    }

    #[test]
    fn refresh_token_replaced_when_response_carries_one() {
        let response = TokenResponse {
            access_token: "new-access".to_string(),
            refresh_token: Some("new-refresh".to_string()),
            expires_in: 3600,
        };

        let pair = response.into_pair(Some("old-refresh".to_string()));
        assert_eq!(pair.refresh_token.as_deref(), Some("new-refresh"));
    }

    #[tokio::test]
    async fn persist_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let token_path = dir.path().join("drive_token.json");

        let store = CredentialStore::new(
            OAuthConfig::google("id".into(), "secret".into(), "http://localhost/cb".into()),
            token_path.clone(),
        );

        let pair = TokenPair {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            expiry: Utc::now() + chrono::Duration::seconds(3600),
        };
        store.persist(&pair).await.expect("persist");

        let reloaded = CredentialStore::new(
            OAuthConfig::google("id".into(), "secret".into(), "http://localhost/cb".into()),
            token_path,
        );
        assert!(reloaded.load().await.expect("load"));
        assert_eq!(*reloaded.tokens.lock().await, Some(pair));
    }

    #[tokio::test]
    async fn load_without_token_file_reports_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CredentialStore::new(
            OAuthConfig::google("id".into(), "secret".into(), "http://localhost/cb".into()),
            dir.path().join("missing.json"),
        );
        assert!(!store.load().await.expect("load"));
    }
}
