//! Configuration module for the MANP backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Directory for the local staging copy of uploaded files
    pub uploads_dir: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Google OAuth client id (Drive upload is disabled when absent)
    pub drive_client_id: Option<String>,
    /// Google OAuth client secret
    pub drive_client_secret: Option<String>,
    /// OAuth redirect URI registered for this backend
    pub drive_redirect_uri: Option<String>,
    /// Drive folder id under which per-user folders are created
    pub drive_root_folder: Option<String>,
    /// Path to the persisted OAuth token pair
    pub drive_token_path: PathBuf,
    /// Whether GET /auth redirects to the consent page. When false the URL is
    /// returned as plain text for copy/paste (dev mode).
    pub auth_redirect: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("MANP_DB_PATH")
            .unwrap_or_else(|_| "./data/reports.sqlite".to_string())
            .into();

        let uploads_dir = env::var("MANP_UPLOADS_DIR")
            .unwrap_or_else(|_| "./uploads".to_string())
            .into();

        let bind_addr = env::var("MANP_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .expect("Invalid MANP_BIND_ADDR format");

        let log_level = env::var("MANP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let drive_client_id = env::var("MANP_DRIVE_CLIENT_ID").ok();
        let drive_client_secret = env::var("MANP_DRIVE_CLIENT_SECRET").ok();
        let drive_redirect_uri = env::var("MANP_DRIVE_REDIRECT_URI").ok();
        let drive_root_folder = env::var("MANP_DRIVE_ROOT_FOLDER").ok();

        let drive_token_path = env::var("MANP_DRIVE_TOKEN_PATH")
            .unwrap_or_else(|_| "./drive_token.json".to_string())
            .into();

        let auth_redirect = env::var("MANP_AUTH_REDIRECT")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        Self {
            db_path,
            uploads_dir,
            bind_addr,
            log_level,
            drive_client_id,
            drive_client_secret,
            drive_redirect_uri,
            drive_root_folder,
            drive_token_path,
            auth_redirect,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("MANP_DB_PATH");
        env::remove_var("MANP_UPLOADS_DIR");
        env::remove_var("MANP_BIND_ADDR");
        env::remove_var("MANP_LOG_LEVEL");
        env::remove_var("MANP_DRIVE_CLIENT_ID");
        env::remove_var("MANP_DRIVE_CLIENT_SECRET");
        env::remove_var("MANP_DRIVE_REDIRECT_URI");
        env::remove_var("MANP_DRIVE_ROOT_FOLDER");
        env::remove_var("MANP_DRIVE_TOKEN_PATH");
        env::remove_var("MANP_AUTH_REDIRECT");

        let config = Config::from_env();

        assert_eq!(config.db_path, PathBuf::from("./data/reports.sqlite"));
        assert_eq!(config.uploads_dir, PathBuf::from("./uploads"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:3000");
        assert_eq!(config.log_level, "info");
        assert!(config.drive_client_id.is_none());
        assert!(config.drive_root_folder.is_none());
        assert_eq!(config.drive_token_path, PathBuf::from("./drive_token.json"));
        assert!(config.auth_redirect);
    }
}
