//! Job record persistence
//!
//! Each job has one row in `audio_jobs`, upserted on every write so the row
//! always reflects the latest outcome.

use crate::models::{JobRecord, JobStatus};
use crate::types::{MetadataError, MetadataStore};
use crate::utils::db_retry::{retry_on_lock, DEFAULT_MAX_LOCK_WAIT_MS};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use retune_common::Result;
use sqlx::{Row, SqlitePool};

/// Save a job record, replacing any previous row for the same job
///
/// Uses retry_on_lock to ride out transient lock contention
pub async fn save_record(pool: &SqlitePool, record: &JobRecord) -> Result<()> {
    let updated_at = record.updated_at.to_rfc3339();
    let status = record.status.as_str();

    retry_on_lock("save_job_record", DEFAULT_MAX_LOCK_WAIT_MS, || async {
        sqlx::query(
            r#"
            INSERT INTO audio_jobs (
                job_id, owner_id, status, detected_key, detected_tempo,
                processed_audio_url, transcription_url, error_message, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(job_id) DO UPDATE SET
                owner_id = excluded.owner_id,
                status = excluded.status,
                detected_key = excluded.detected_key,
                detected_tempo = excluded.detected_tempo,
                processed_audio_url = excluded.processed_audio_url,
                transcription_url = excluded.transcription_url,
                error_message = excluded.error_message,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&record.job_id)
        .bind(&record.owner_id)
        .bind(status)
        .bind(&record.detected_key)
        .bind(record.detected_tempo)
        .bind(&record.processed_audio_url)
        .bind(&record.transcription_url)
        .bind(&record.error_message)
        .bind(&updated_at)
        .execute(pool)
        .await
        .map_err(retune_common::Error::Database)?;

        Ok(())
    })
    .await
}

/// Load the record for `job_id`
pub async fn load_record(
    pool: &SqlitePool,
    job_id: &str,
) -> std::result::Result<Option<JobRecord>, MetadataError> {
    let row = sqlx::query(
        r#"
        SELECT job_id, owner_id, status, detected_key, detected_tempo,
               processed_audio_url, transcription_url, error_message, updated_at
        FROM audio_jobs
        WHERE job_id = ?
        "#,
    )
    .bind(job_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| MetadataError::Database(e.to_string()))?;

    let Some(row) = row else {
        return Ok(None);
    };

    let corrupt = |msg: String| MetadataError::Corrupt(job_id.to_string(), msg);

    let status_text: String = row.try_get("status").map_err(|e| corrupt(e.to_string()))?;
    let status = JobStatus::parse(&status_text)
        .ok_or_else(|| corrupt(format!("unknown status '{}'", status_text)))?;

    let updated_text: String = row
        .try_get("updated_at")
        .map_err(|e| corrupt(e.to_string()))?;
    let updated_at = DateTime::parse_from_rfc3339(&updated_text)
        .map_err(|e| corrupt(format!("bad timestamp: {}", e)))?
        .with_timezone(&Utc);

    Ok(Some(JobRecord {
        job_id: row.try_get("job_id").map_err(|e| corrupt(e.to_string()))?,
        owner_id: row.try_get("owner_id").map_err(|e| corrupt(e.to_string()))?,
        status,
        detected_key: row.try_get("detected_key").map_err(|e| corrupt(e.to_string()))?,
        detected_tempo: row
            .try_get("detected_tempo")
            .map_err(|e| corrupt(e.to_string()))?,
        processed_audio_url: row
            .try_get("processed_audio_url")
            .map_err(|e| corrupt(e.to_string()))?,
        transcription_url: row
            .try_get("transcription_url")
            .map_err(|e| corrupt(e.to_string()))?,
        error_message: row
            .try_get("error_message")
            .map_err(|e| corrupt(e.to_string()))?,
        updated_at,
    }))
}

/// [`MetadataStore`] backed by the local SQLite database
#[derive(Clone)]
pub struct SqliteMetadataStore {
    pool: SqlitePool,
}

impl SqliteMetadataStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn update_record(&self, record: &JobRecord) -> std::result::Result<(), MetadataError> {
        save_record(&self.pool, record).await?;
        tracing::debug!(job_id = %record.job_id, status = record.status.as_str(), "Job record saved");
        Ok(())
    }

    async fn get_record(
        &self,
        job_id: &str,
    ) -> std::result::Result<Option<JobRecord>, MetadataError> {
        load_record(&self.pool, job_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_store() -> SqliteMetadataStore {
        // Single connection: every connection to sqlite::memory: is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::init_tables(&pool).await.unwrap();
        SqliteMetadataStore::new(pool)
    }

    fn record(job_id: &str, status: JobStatus) -> JobRecord {
        JobRecord {
            job_id: job_id.to_string(),
            owner_id: "owner-1".to_string(),
            status,
            detected_key: Some("C Major".to_string()),
            detected_tempo: Some(120.0),
            processed_audio_url: None,
            transcription_url: Some("https://cdn/x.mid".to_string()),
            error_message: None,
            updated_at: DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    #[tokio::test]
    async fn test_unknown_job_is_none() {
        let store = memory_store().await;
        assert!(store.get_record("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let store = memory_store().await;
        let rec = record("job-1", JobStatus::Success);
        store.update_record(&rec).await.unwrap();
        assert_eq!(store.get_record("job-1").await.unwrap(), Some(rec));
    }

    #[tokio::test]
    async fn test_upsert_replaces_previous_row() {
        let store = memory_store().await;
        store
            .update_record(&record("job-2", JobStatus::Success))
            .await
            .unwrap();

        let mut failed = record("job-2", JobStatus::Partial);
        failed.error_message = Some("transform: boom".to_string());
        failed.detected_tempo = None;
        store.update_record(&failed).await.unwrap();

        let loaded = store.get_record("job-2").await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Partial);
        assert_eq!(loaded.detected_tempo, None);
        assert_eq!(loaded.error_message.as_deref(), Some("transform: boom"));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audio_jobs")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_unknown_status_is_corrupt() {
        let store = memory_store().await;
        sqlx::query(
            "INSERT INTO audio_jobs (job_id, owner_id, status, updated_at) VALUES ('j', 'o', 'exploded', '2026-01-01T00:00:00Z')",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        let err = store.get_record("j").await.unwrap_err();
        assert!(matches!(err, MetadataError::Corrupt(_, _)));
    }
}
