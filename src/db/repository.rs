//! Database repository for report persistence.
//!
//! Uses prepared statements for every write; the only conflict rule is
//! `INSERT ... ON CONFLICT(id) DO NOTHING` (first write wins, no field merge).

use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{PhotoAttachment, Report};

/// Database repository for all report operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a report, ignoring duplicates by primary key.
    ///
    /// Returns whether a row was actually written. A retried or re-synced
    /// report with a known `id` keeps the first-written version untouched.
    pub async fn insert_report(&self, report: &Report) -> Result<bool, AppError> {
        let denr_json = serde_json::to_string(&report.denr_personnels).unwrap_or_default();
        let other_json = report
            .other_agency_personnels
            .as_ref()
            .map(|p| serde_json::to_string(p).unwrap_or_default());
        let photos_json = report
            .photos
            .as_ref()
            .map(|p| serde_json::to_string(p).unwrap_or_default());
        // Clients send "" for an unset end date; store NULL
        let activity_date_end = report
            .activity_date_end
            .as_deref()
            .filter(|s| !s.is_empty());

        let result = sqlx::query(
            r#"INSERT INTO reports (
                id, user_id, denr_personnels, other_agency_personnels,
                activity_date_start, activity_date_end, location,
                persons_involved, complaint_description, action_taken,
                recommendation, photos, synced, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
            ON CONFLICT(id) DO NOTHING"#,
        )
        .bind(&report.id)
        .bind(&report.user_id)
        .bind(&denr_json)
        .bind(&other_json)
        .bind(&report.activity_date_start)
        .bind(activity_date_end)
        .bind(&report.location)
        .bind(&report.persons_involved)
        .bind(&report.complaint_description)
        .bind(&report.action_taken)
        .bind(&report.recommendation)
        .bind(&photos_json)
        .bind(&report.created_at)
        .bind(&report.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List all reports for one user, newest first.
    pub async fn list_reports_for_user(&self, user_id: &str) -> Result<Vec<Report>, AppError> {
        let rows = sqlx::query(
            r#"SELECT id, user_id, denr_personnels, other_agency_personnels,
                      activity_date_start, activity_date_end, location,
                      persons_involved, complaint_description, action_taken,
                      recommendation, photos, synced, created_at, updated_at
               FROM reports
               WHERE user_id = ?
               ORDER BY created_at DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(report_from_row).collect())
    }
}

// Helper functions for row conversion

fn report_from_row(row: &sqlx::sqlite::SqliteRow) -> Report {
    let denr_str: String = row.get("denr_personnels");
    let other_str: Option<String> = row.get("other_agency_personnels");
    let photos_str: Option<String> = row.get("photos");

    Report {
        id: row.get("id"),
        user_id: row.get("user_id"),
        denr_personnels: parse_json_array(&denr_str),
        other_agency_personnels: other_str.map(|s| parse_json_array(&s)),
        activity_date_start: row.get("activity_date_start"),
        activity_date_end: row.get("activity_date_end"),
        location: row.get("location"),
        persons_involved: row.get("persons_involved"),
        complaint_description: row.get("complaint_description"),
        action_taken: row.get("action_taken"),
        recommendation: row.get("recommendation"),
        photos: photos_str.map(|s| parse_photos(&s)),
        synced: row.get("synced"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn parse_json_array(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}

fn parse_photos(s: &str) -> Vec<PhotoAttachment> {
    serde_json::from_str(s).unwrap_or_default()
}
