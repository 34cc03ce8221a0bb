//! MANP Monitoring Backend
//!
//! Accepts field-collected incident reports, persists them to SQLite, and
//! optionally uploads attached photos to Google Drive.

mod api;
mod config;
mod db;
mod drive;
mod errors;
mod models;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use drive::{CredentialStore, DriveUploader, OAuthConfig};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub credentials: Option<Arc<CredentialStore>>,
    pub uploader: Option<Arc<DriveUploader>>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting MANP Monitoring Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Uploads directory: {:?}", config.uploads_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Initialize the Drive credential store and uploader, if configured
    let credentials = build_credential_store(&config);
    match &credentials {
        Some(store) => {
            if store.load().await? {
                tracing::info!("Loaded persisted Drive token pair");
            } else {
                tracing::warn!("No persisted Drive token found. Visit /auth to authorize uploads");
            }
        }
        None => {
            tracing::warn!("Drive upload disabled (MANP_DRIVE_CLIENT_ID/SECRET/REDIRECT_URI not set)");
        }
    }

    let uploader = match (&credentials, &config.drive_root_folder) {
        (Some(store), Some(root)) => {
            Some(Arc::new(DriveUploader::new(store.clone(), root.clone())))
        }
        (Some(_), None) => {
            tracing::warn!("MANP_DRIVE_ROOT_FOLDER not set, photos will be kept locally only");
            None
        }
        _ => None,
    };

    // Create application state
    let state = AppState {
        repo,
        credentials,
        uploader,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the credential store when all OAuth client settings are present.
fn build_credential_store(config: &Config) -> Option<Arc<CredentialStore>> {
    match (
        &config.drive_client_id,
        &config.drive_client_secret,
        &config.drive_redirect_uri,
    ) {
        (Some(id), Some(secret), Some(redirect)) => Some(Arc::new(CredentialStore::new(
            OAuthConfig::google(id.clone(), secret.clone(), redirect.clone()),
            config.drive_token_path.clone(),
        ))),
        _ => None,
    }
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(liveness))
        .route("/sync", post(api::sync_reports))
        .route("/reports/{user_id}", get(api::list_reports))
        .route(
            "/upload-report",
            post(api::upload_report).layer(DefaultBodyLimit::max(api::MAX_UPLOAD_BODY_SIZE)),
        )
        .route("/auth", get(api::auth_start))
        .route("/oauth2callback", get(api::oauth_callback))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness endpoint.
async fn liveness() -> &'static str {
    "MANP Monitoring service API is live."
}
