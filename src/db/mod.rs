//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for all report data.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            denr_personnels TEXT NOT NULL,
            other_agency_personnels TEXT,
            activity_date_start TEXT NOT NULL,
            activity_date_end TEXT,
            location TEXT NOT NULL,
            persons_involved TEXT NOT NULL,
            complaint_description TEXT NOT NULL,
            action_taken TEXT NOT NULL,
            recommendation TEXT NOT NULL,
            photos TEXT,
            synced INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Covers the per-user listing query and its sort
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_reports_user_created
            ON reports(user_id, created_at);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
