use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::{
    core::{
        errors::{AppError, AppResult},
        types::{ClaimedJob, JobRecord, JobStatus, ProgressSummary},
    },
    db::repositories::parse_optional_timestamp,
};

pub async fn enqueue_job(pool: &SqlitePool, id: &str, catalog_id: &str) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO parser_jobs (id, catalog_id, status, progress_label)
        VALUES (?1, ?2, 'queued', 'queued')
        "#,
    )
    .bind(id)
    .bind(catalog_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Queues a parse of `catalog_id` under a fresh job id and returns that id.
pub async fn enqueue_catalog_parse(pool: &SqlitePool, catalog_id: &str) -> AppResult<String> {
    let id = Uuid::new_v4().to_string();
    enqueue_job(pool, &id, catalog_id).await?;
    Ok(id)
}

/// Moves the oldest queued job to `processing` and returns it.
///
/// The status check and the update are one statement, so two workers can never
/// claim the same job.
pub async fn claim_next_job(pool: &SqlitePool) -> AppResult<Option<ClaimedJob>> {
    let row = sqlx::query(
        r#"
        UPDATE parser_jobs
        SET status = 'processing',
            attempts = attempts + 1,
            started_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
            finished_at = NULL,
            error_log = NULL,
            raw_candidates = 0,
            total_items = 0,
            reused_items = 0,
            queued_items = 0,
            processed_items = 0,
            failed_items = 0,
            progress_percent = 0,
            progress_label = 'queued',
            parsed_pages = 0,
            total_pages = 0
        WHERE id = (
            SELECT id FROM parser_jobs
            WHERE status = 'queued'
            ORDER BY created_at ASC, rowid ASC
            LIMIT 1
        )
        AND status = 'queued'
        RETURNING id, catalog_id, attempts
        "#,
    )
    .fetch_optional(pool)
    .await?;

    row.map(|row| -> AppResult<ClaimedJob> {
        Ok(ClaimedJob {
            id: row.try_get("id")?,
            catalog_id: row.try_get("catalog_id")?,
            attempts: row.try_get("attempts")?,
        })
    })
    .transpose()
}

pub async fn update_progress(
    pool: &SqlitePool,
    job_id: &str,
    progress: &ProgressSummary,
    progress_label: &str,
) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE parser_jobs
        SET total_items = ?2,
            reused_items = ?3,
            queued_items = ?4,
            processed_items = ?5,
            failed_items = ?6,
            progress_percent = ?7,
            progress_label = ?8,
            parsed_pages = ?9,
            total_pages = ?10,
            raw_candidates = ?11
        WHERE id = ?1
        "#,
    )
    .bind(job_id)
    .bind(progress.total_items)
    .bind(progress.reused_items)
    .bind(progress.queued_items)
    .bind(progress.processed_items)
    .bind(progress.failed_items)
    .bind(progress.progress_percent)
    .bind(progress_label)
    .bind(progress.parsed_pages)
    .bind(progress.total_pages)
    .bind(progress.raw_candidates)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn complete_job(pool: &SqlitePool, job_id: &str, progress: &ProgressSummary) -> AppResult<()> {
    update_progress(pool, job_id, progress, "complete").await?;
    sqlx::query(
        r#"
        UPDATE parser_jobs
        SET status = ?2,
            error_log = NULL,
            finished_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?1
        "#,
    )
    .bind(job_id)
    .bind(JobStatus::Success.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn fail_job(pool: &SqlitePool, job_id: &str, error: &AppError) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE parser_jobs
        SET status = ?2,
            error_log = ?3,
            progress_label = 'failed',
            finished_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?1
        "#,
    )
    .bind(job_id)
    .bind(JobStatus::Failed.as_str())
    .bind(error.truncated_message())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_job(pool: &SqlitePool, job_id: &str) -> AppResult<JobRecord> {
    let row = sqlx::query(
        r#"
        SELECT id, catalog_id, status, attempts, error_log, raw_candidates, total_items, reused_items,
               queued_items, processed_items, failed_items, progress_percent, progress_label,
               parsed_pages, total_pages, started_at, finished_at
        FROM parser_jobs
        WHERE id = ?1
        "#,
    )
    .bind(job_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("parser job {job_id}")))?;

    let status: String = row.try_get("status")?;
    let total_items: i64 = row.try_get("total_items")?;
    Ok(JobRecord {
        id: row.try_get("id")?,
        catalog_id: row.try_get("catalog_id")?,
        status: JobStatus::from_db(&status)?,
        attempts: row.try_get("attempts")?,
        error_log: row.try_get("error_log")?,
        progress: ProgressSummary {
            raw_candidates: row.try_get("raw_candidates")?,
            unique_skus: total_items,
            total_items,
            reused_items: row.try_get("reused_items")?,
            queued_items: row.try_get("queued_items")?,
            processed_items: row.try_get("processed_items")?,
            failed_items: row.try_get("failed_items")?,
            parsed_pages: row.try_get("parsed_pages")?,
            total_pages: row.try_get("total_pages")?,
            progress_percent: row.try_get("progress_percent")?,
        },
        progress_label: row.try_get("progress_label")?,
        started_at: parse_optional_timestamp(row.try_get("started_at")?)?,
        finished_at: parse_optional_timestamp(row.try_get("finished_at")?)?,
    })
}
