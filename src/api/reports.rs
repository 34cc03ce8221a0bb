//! Report API endpoints: bulk sync, per-user listing, multipart upload.

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use chrono::Utc;

use crate::drive::sanitize_folder_name;
use crate::errors::AppError;
use crate::models::{
    PhotoAttachment, Report, ReportsResponse, SyncRequest, SyncResponse, UploadReportRequest,
    UploadResponse,
};
use crate::AppState;

/// Maximum request body size for multipart uploads (25 MiB).
///
/// Sized for a report plus a handful of phone-camera photos. If running
/// behind a reverse proxy, its body limit must be >= this value.
pub const MAX_UPLOAD_BODY_SIZE: usize = 25 * 1024 * 1024;

/// POST /sync - Bulk-insert previously validated reports.
///
/// Rows are inserted sequentially in the order the client sent them; a
/// duplicate id is a silent no-op. `count` acknowledges every report
/// received, duplicates included.
pub async fn sync_reports(
    State(state): State<AppState>,
    Json(request): Json<SyncRequest>,
) -> Result<Json<SyncResponse>, AppError> {
    tracing::info!("Syncing {} reports", request.reports.len());

    for report in &request.reports {
        let inserted = state.repo.insert_report(report).await?;
        if !inserted {
            tracing::debug!("Report {} already stored, skipping", report.id);
        }
    }

    Ok(Json(SyncResponse {
        success: true,
        count: request.reports.len(),
    }))
}

/// GET /reports/{user_id} - List one user's reports, newest first.
pub async fn list_reports(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ReportsResponse>, AppError> {
    let reports = state.repo.list_reports_for_user(&user_id).await?;

    Ok(Json(ReportsResponse {
        success: true,
        reports,
    }))
}

/// POST /upload-report - Accept a single report with photo attachments.
///
/// The multipart stream carries one `report` text field (JSON-encoded
/// metadata) and zero or more file parts. Every file is staged locally;
/// when Drive is configured each is also pushed remotely, and a remote
/// failure for one file degrades that file to local-only metadata without
/// aborting its siblings.
pub async fn upload_report(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut request: Option<UploadReportRequest> = None;
    let mut files: Vec<(String, String, Vec<u8>)> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart stream: {}", e)))?
    {
        if field.name() == Some("report") {
            let text = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(format!("Unreadable report field: {}", e)))?;
            request = Some(serde_json::from_str(&text)?);
        } else if let Some(filename) = field.file_name() {
            let filename = sanitize_filename(filename);
            let mime_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Unreadable file part: {}", e)))?;
            files.push((filename, mime_type, bytes.to_vec()));
        }
    }

    let request =
        request.ok_or_else(|| AppError::Validation("Missing report field".to_string()))?;
    if request.user_id.trim().is_empty() {
        return Err(AppError::Validation("user_id is required".to_string()));
    }
    if request.created_at.trim().is_empty() {
        return Err(AppError::Validation("created_at is required".to_string()));
    }

    let report_id = format!("{}-{}", request.user_id, Utc::now().timestamp_millis());
    let folder_name = sanitize_folder_name(&request.created_at);
    tracing::info!(
        "Uploading report {} with {} files",
        report_id,
        files.len()
    );

    let local_dir = state
        .config
        .uploads_dir
        .join(&request.user_id)
        .join(&folder_name);
    tokio::fs::create_dir_all(&local_dir).await?;

    let mut photos: Vec<PhotoAttachment> = Vec::new();
    let mut photo_urls: Vec<String> = Vec::new();

    for (filename, mime_type, bytes) in files {
        let local_path = local_dir.join(&filename);
        tokio::fs::write(&local_path, &bytes).await?;

        let mut photo = PhotoAttachment {
            filename,
            local_path: local_path.display().to_string(),
            mime_type,
            remote_id: None,
            remote_link: None,
        };

        if let Some(uploader) = &state.uploader {
            match uploader
                .upload(
                    &request.user_id,
                    &folder_name,
                    &photo.filename,
                    &photo.mime_type,
                    &bytes,
                )
                .await
            {
                Ok(file) => {
                    photo.remote_id = Some(file.id);
                    if let Some(link) = file.web_view_link {
                        photo_urls.push(link.clone());
                        photo.remote_link = Some(link);
                    }
                }
                Err(e) => {
                    tracing::warn!("Drive upload failed for {}: {}", photo.filename, e);
                }
            }
        }

        photos.push(photo);
    }

    let saved_photos = photos.len();
    let report = Report {
        id: report_id.clone(),
        user_id: request.user_id,
        denr_personnels: request.denr_personnels,
        other_agency_personnels: request.other_agency_personnels,
        activity_date_start: request.activity_date_start,
        activity_date_end: request.activity_date_end,
        location: request.location,
        persons_involved: request.persons_involved,
        complaint_description: request.complaint_description,
        action_taken: request.action_taken,
        recommendation: request.recommendation,
        photos: if photos.is_empty() { None } else { Some(photos) },
        synced: 1,
        created_at: request.created_at.clone(),
        updated_at: request.created_at,
    };
    state.repo.insert_report(&report).await?;

    Ok(Json(UploadResponse {
        success: true,
        report_id,
        saved_photos,
        photo_urls,
    }))
}

/// Strip directory components and unusable characters from a client filename.
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| match c {
            ':' | '?' | '*' | '"' | '<' | '>' | '|' => '-',
            _ => c,
        })
        .collect();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "unnamed".to_string()
    } else {
        cleaned
    }
}
