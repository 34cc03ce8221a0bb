//! Google Drive upload module.
//!
//! Places attachment files in a two-level folder path
//! (`root/<user_id>/<sanitized timestamp>/`), creating folders on demand, and
//! records the Drive file id and shareable link for each upload.

mod credentials;

pub use credentials::*;

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;

use crate::errors::AppError;

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

const MULTIPART_BOUNDARY: &str = "manp_drive_upload";

/// A file or folder as returned by the Drive API.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveFile {
    pub id: String,
    #[serde(default, rename = "webViewLink")]
    pub web_view_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// Client for pushing attachment files to Drive.
pub struct DriveUploader {
    http: reqwest::Client,
    credentials: Arc<CredentialStore>,
    root_folder_id: String,
    api_base: String,
    upload_base: String,
    /// Serializes find-or-create sequences so concurrent uploads in this
    /// process cannot mint duplicate folders for the same name.
    folder_lock: Mutex<()>,
}

impl DriveUploader {
    pub fn new(credentials: Arc<CredentialStore>, root_folder_id: String) -> Self {
        Self::with_endpoints(
            credentials,
            root_folder_id,
            DRIVE_API_BASE.to_string(),
            DRIVE_UPLOAD_BASE.to_string(),
        )
    }

    pub fn with_endpoints(
        credentials: Arc<CredentialStore>,
        root_folder_id: String,
        api_base: String,
        upload_base: String,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            http,
            credentials,
            root_folder_id,
            api_base,
            upload_base,
            folder_lock: Mutex::new(()),
        }
    }

    /// Upload one file into `root/<user_id>/<timestamp>/`.
    pub async fn upload(
        &self,
        user_id: &str,
        timestamp: &str,
        filename: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> Result<DriveFile, AppError> {
        let folder_id = self.ensure_folder_path(user_id, timestamp).await?;
        self.upload_into(&folder_id, filename, mime_type, bytes).await
    }

    /// Ensure the `user → timestamp` folder pair exists, returning the leaf id.
    async fn ensure_folder_path(&self, user_id: &str, timestamp: &str) -> Result<String, AppError> {
        let _guard = self.folder_lock.lock().await;
        let user_folder = self
            .find_or_create_folder(user_id, &self.root_folder_id)
            .await?;
        self.find_or_create_folder(timestamp, &user_folder).await
    }

    /// Return the id of the first folder named `name` under `parent`,
    /// creating it when no match exists.
    async fn find_or_create_folder(&self, name: &str, parent: &str) -> Result<String, AppError> {
        let token = self.credentials.access_token().await?;

        let query = format!(
            "name = '{}' and '{}' in parents and mimeType = '{}' and trashed = false",
            escape_drive_query(name),
            escape_drive_query(parent),
            FOLDER_MIME_TYPE
        );
        let resp = self
            .http
            .get(format!("{}/files", self.api_base))
            .bearer_auth(&token)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id, name)"),
                ("pageSize", "1"),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AppError::Storage(format!(
                "Drive folder lookup returned {}",
                resp.status()
            )));
        }

        let list: FileList = resp.json().await?;
        if let Some(existing) = list.files.into_iter().next() {
            return Ok(existing.id);
        }

        let resp = self
            .http
            .post(format!("{}/files", self.api_base))
            .bearer_auth(&token)
            .json(&json!({
                "name": name,
                "mimeType": FOLDER_MIME_TYPE,
                "parents": [parent],
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AppError::Storage(format!(
                "Drive folder create returned {}",
                resp.status()
            )));
        }

        let created: DriveFile = resp.json().await?;
        tracing::debug!("Created Drive folder {} ({})", name, created.id);
        Ok(created.id)
    }

    /// Upload file bytes into an existing folder via `uploadType=multipart`.
    async fn upload_into(
        &self,
        folder_id: &str,
        filename: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> Result<DriveFile, AppError> {
        let token = self.credentials.access_token().await?;

        let metadata = json!({
            "name": filename,
            "parents": [folder_id],
        });
        let body = multipart_related_body(MULTIPART_BOUNDARY, &metadata, mime_type, bytes);

        let resp = self
            .http
            .post(format!("{}/files", self.upload_base))
            .bearer_auth(&token)
            .query(&[("uploadType", "multipart"), ("fields", "id, webViewLink")])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", MULTIPART_BOUNDARY),
            )
            .body(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AppError::Storage(format!(
                "Drive upload returned {}",
                resp.status()
            )));
        }

        let file: DriveFile = resp.json().await?;
        Ok(file)
    }
}

/// Build a `multipart/related` body: JSON metadata part + media part.
fn multipart_related_body(
    boundary: &str,
    metadata: &serde_json::Value,
    mime_type: &str,
    bytes: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + 512);
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("--{boundary}\r\nContent-Type: {mime_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

/// Escape a value for interpolation into a Drive `q` query string.
fn escape_drive_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Replace characters Drive folder names and local directories cannot carry.
///
/// Report timestamps are RFC 3339 strings, so colons are the usual offender.
pub fn sanitize_folder_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ':' | '/' | '\\' | '?' | '*' | '"' | '<' | '>' | '|' => '-',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_timestamp_colons() {
        assert_eq!(
            sanitize_folder_name("2024-01-01T10:00:00Z"),
            "2024-01-01T10-00-00Z"
        );
    }

    #[test]
    fn sanitize_replaces_path_separators() {
        assert_eq!(sanitize_folder_name("a/b\\c:d"), "a-b-c-d");
    }

    #[test]
    fn escape_handles_quotes_and_backslashes() {
        assert_eq!(escape_drive_query("o'brien\\x"), "o\\'brien\\\\x");
    }

    #[test]
    fn multipart_body_has_metadata_and_media_parts() {
        let metadata = json!({"name": "photo.jpg", "parents": ["f1"]});
        let body = multipart_related_body("b", &metadata, "image/jpeg", b"JPEGDATA");
        let text = String::from_utf8(body).expect("utf8 body");

        assert!(text.starts_with("--b\r\nContent-Type: application/json"));
        assert!(text.contains("\"name\":\"photo.jpg\""));
        assert!(text.contains("Content-Type: image/jpeg\r\n\r\nJPEGDATA"));
        assert!(text.ends_with("--b--\r\n"));
    }
}
