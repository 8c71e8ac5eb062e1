//! Database access for retune-ap
//!
//! Job records live in `retune.db` in the root folder.

pub mod jobs;

pub use jobs::SqliteMetadataStore;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "retune.db";

/// Initialize database connection pool
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the `audio_jobs` table if it doesn't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audio_jobs (
            job_id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            status TEXT NOT NULL,
            detected_key TEXT,
            detected_tempo REAL,
            processed_audio_url TEXT,
            transcription_url TEXT,
            error_message TEXT,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_audio_jobs_owner ON audio_jobs(owner_id)")
        .execute(pool)
        .await?;

    tracing::info!("Database tables initialized (audio_jobs)");

    Ok(())
}
