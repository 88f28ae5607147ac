use sqlx::{Row, SqlitePool};

use crate::{
    core::{
        errors::{AppError, AppResult},
        types::{JobItemRecord, JobItemStatus},
    },
    sidecar::types::BBox,
};

/// Replaces the job's item rows with `items`, stamping terminal rows as finished.
pub async fn replace_job_items(pool: &SqlitePool, job_id: &str, items: &[JobItemRecord]) -> AppResult<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM parser_job_items WHERE parser_job_id = ?1")
        .bind(job_id)
        .execute(&mut *tx)
        .await?;

    for item in items {
        let image_bbox = item
            .image_bbox
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        sqlx::query(
            r#"
            INSERT INTO parser_job_items (
              parser_job_id, catalog_id, sku, quick_fingerprint, page_no, sku_bbox, image_bbox,
              status, error_log, attempts, finished_at
            )
            VALUES (
              ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
              CASE WHEN ?11 THEN strftime('%Y-%m-%dT%H:%M:%fZ', 'now') ELSE NULL END
            )
            "#,
        )
        .bind(job_id)
        .bind(&item.catalog_id)
        .bind(&item.sku)
        .bind(&item.quick_fingerprint)
        .bind(item.page_no)
        .bind(serde_json::to_string(&item.sku_bbox)?)
        .bind(image_bbox)
        .bind(item.status.as_str())
        .bind(&item.error_log)
        .bind(item.attempts)
        .bind(item.status.is_terminal())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

pub async fn start_item(pool: &SqlitePool, job_id: &str, sku: &str) -> AppResult<()> {
    let affected = sqlx::query(
        r#"
        UPDATE parser_job_items
        SET status = ?3,
            attempts = attempts + 1,
            started_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE parser_job_id = ?1 AND sku = ?2
        "#,
    )
    .bind(job_id)
    .bind(sku)
    .bind(JobItemStatus::Processing.as_str())
    .execute(pool)
    .await?
    .rows_affected();

    if affected == 0 {
        return Err(AppError::NotFound(format!("job item {job_id}/{sku}")));
    }
    Ok(())
}

pub async fn finish_item(
    pool: &SqlitePool,
    job_id: &str,
    sku: &str,
    status: JobItemStatus,
    error_log: Option<&str>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE parser_job_items
        SET status = ?3,
            error_log = ?4,
            finished_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE parser_job_id = ?1 AND sku = ?2
        "#,
    )
    .bind(job_id)
    .bind(sku)
    .bind(status.as_str())
    .bind(error_log)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_job_items(pool: &SqlitePool, job_id: &str) -> AppResult<Vec<JobItemRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT parser_job_id, catalog_id, sku, quick_fingerprint, page_no, sku_bbox, image_bbox,
               status, error_log, attempts
        FROM parser_job_items
        WHERE parser_job_id = ?1
        ORDER BY rowid
        "#,
    )
    .bind(job_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(map_job_item).collect()
}

fn map_job_item(row: sqlx::sqlite::SqliteRow) -> AppResult<JobItemRecord> {
    let status: String = row.try_get("status")?;
    let sku_bbox: String = row.try_get("sku_bbox")?;
    let image_bbox: Option<String> = row.try_get("image_bbox")?;
    Ok(JobItemRecord {
        parser_job_id: row.try_get("parser_job_id")?,
        catalog_id: row.try_get("catalog_id")?,
        sku: row.try_get("sku")?,
        quick_fingerprint: row.try_get("quick_fingerprint")?,
        page_no: row.try_get("page_no")?,
        sku_bbox: serde_json::from_str::<BBox>(&sku_bbox)?,
        image_bbox: image_bbox
            .as_deref()
            .map(serde_json::from_str::<BBox>)
            .transpose()?,
        status: JobItemStatus::from_db(&status)?,
        error_log: row.try_get("error_log")?,
        attempts: row.try_get("attempts")?,
    })
}
