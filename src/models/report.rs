//! Report model matching the field-app contract.
//!
//! Wire field names are snake_case exactly as the mobile client sends them.

use serde::{Deserialize, Serialize};

/// One photo attached to a report.
///
/// `remote_id`/`remote_link` are filled when the file reached Drive; a file
/// that only exists in the local staging tree keeps them empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhotoAttachment {
    pub filename: String,
    pub local_path: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_link: Option<String>,
}

/// One incident report submitted by a field user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub user_id: String,
    pub denr_personnels: Vec<String>,
    #[serde(default)]
    pub other_agency_personnels: Option<Vec<String>>,
    pub activity_date_start: String,
    #[serde(default)]
    pub activity_date_end: Option<String>,
    pub location: String,
    pub persons_involved: String,
    pub complaint_description: String,
    pub action_taken: String,
    pub recommendation: String,
    #[serde(default)]
    pub photos: Option<Vec<PhotoAttachment>>,
    /// Always 1 once the record reaches the store.
    #[serde(default)]
    pub synced: i64,
    pub created_at: String,
    /// Equal to `created_at`; no update path exists.
    #[serde(default)]
    pub updated_at: String,
}

/// Report metadata carried in the `report` field of a multipart upload.
///
/// `id`, `photos` and `synced` are server-assigned on this path.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadReportRequest {
    pub user_id: String,
    pub denr_personnels: Vec<String>,
    #[serde(default)]
    pub other_agency_personnels: Option<Vec<String>>,
    pub activity_date_start: String,
    #[serde(default)]
    pub activity_date_end: Option<String>,
    pub location: String,
    pub persons_involved: String,
    pub complaint_description: String,
    pub action_taken: String,
    pub recommendation: String,
    pub created_at: String,
}

/// Request body for POST /sync.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncRequest {
    pub reports: Vec<Report>,
}

/// Response body for POST /sync.
#[derive(Debug, Clone, Serialize)]
pub struct SyncResponse {
    pub success: bool,
    /// Number of reports received. Duplicates absorbed by the store still
    /// count: the client treats this as "everything I sent is now stored".
    pub count: usize,
}

/// Response body for GET /reports/{user_id}.
#[derive(Debug, Clone, Serialize)]
pub struct ReportsResponse {
    pub success: bool,
    pub reports: Vec<Report>,
}

/// Response body for POST /upload-report.
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub report_id: String,
    pub saved_photos: usize,
    /// Shareable links of the files that reached Drive, in part order.
    pub photo_urls: Vec<String>,
}
