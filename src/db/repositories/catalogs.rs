use serde_json::Value;
use sqlx::{Row, SqlitePool};

use crate::{
    core::{
        errors::{AppError, AppResult},
        types::{CatalogParseSummary, CatalogRecord, CatalogStatus, ParseStatus},
    },
    db::repositories::{parse_optional_timestamp, parse_timestamp},
};

const CATALOG_COLUMNS: &str = "id, pdf_storage_path, status, parse_status, parse_summary, baseline_catalog_id, pdf_sha256, published_at, deleted_at, created_at";

pub async fn create_catalog(pool: &SqlitePool, id: &str, pdf_storage_path: &str) -> AppResult<CatalogRecord> {
    sqlx::query(
        r#"
        INSERT INTO catalogs (id, pdf_storage_path, status)
        VALUES (?1, ?2, 'draft')
        "#,
    )
    .bind(id)
    .bind(pdf_storage_path)
    .execute(pool)
    .await?;
    get_catalog(pool, id).await
}

pub async fn get_catalog(pool: &SqlitePool, id: &str) -> AppResult<CatalogRecord> {
    let sql = format!("SELECT {CATALOG_COLUMNS} FROM catalogs WHERE id = ?1");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("catalog {id}")))?;

    map_catalog(row)
}

/// Most recently published, non-archived catalog other than `catalog_id`.
pub async fn find_baseline_catalog_id(pool: &SqlitePool, catalog_id: &str) -> AppResult<Option<String>> {
    let row = sqlx::query(
        r#"
        SELECT id
        FROM catalogs
        WHERE status = 'published' AND deleted_at IS NULL AND id != ?1
        ORDER BY published_at DESC, created_at DESC
        LIMIT 1
        "#,
    )
    .bind(catalog_id)
    .fetch_optional(pool)
    .await?;

    row.map(|row| row.try_get("id")).transpose().map_err(AppError::from)
}

pub async fn mark_processing(pool: &SqlitePool, id: &str, summary: &Value) -> AppResult<()> {
    sqlx::query("UPDATE catalogs SET parse_status = ?2, parse_summary = ?3 WHERE id = ?1")
        .bind(id)
        .bind(ParseStatus::Processing.as_str())
        .bind(summary.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_needs_review(pool: &SqlitePool, id: &str, summary: &CatalogParseSummary) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE catalogs
        SET parse_status = ?2,
            status = ?3,
            parse_summary = ?4,
            baseline_catalog_id = ?5,
            pdf_sha256 = ?6
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(ParseStatus::NeedsReview.as_str())
    .bind(CatalogStatus::Draft.as_str())
    .bind(serde_json::to_string(summary)?)
    .bind(&summary.baseline_catalog_id)
    .bind(&summary.pdf_sha256)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_failed(pool: &SqlitePool, id: &str, error: &AppError) -> AppResult<()> {
    let summary = serde_json::json!({
        "error": error.truncated_message(),
        "code": error.code(),
    });
    sqlx::query("UPDATE catalogs SET parse_status = ?2, parse_summary = ?3 WHERE id = ?1")
        .bind(id)
        .bind(ParseStatus::Failed.as_str())
        .bind(summary.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn archive_catalog(pool: &SqlitePool, id: &str) -> AppResult<bool> {
    let affected = sqlx::query(
        r#"
        UPDATE catalogs
        SET deleted_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?1 AND deleted_at IS NULL
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?
    .rows_affected();
    Ok(affected > 0)
}

/// Publishes a reviewed catalog, making it the next run's baseline.
///
/// Refused while parsing is unfinished or failed, when the run reported failed
/// items, or while any item is unapproved or has no stored image.
pub async fn publish_catalog(pool: &SqlitePool, id: &str) -> AppResult<CatalogRecord> {
    let catalog = get_catalog(pool, id).await?;
    if catalog.deleted_at.is_some() {
        return Err(AppError::InvalidInput(format!("catalog {id} is archived and cannot be published")));
    }
    match catalog.parse_status {
        Some(ParseStatus::NeedsReview) => {}
        Some(ParseStatus::Failed) => {
            return Err(AppError::InvalidInput(format!(
                "catalog {id} cannot be published because parsing failed"
            )))
        }
        Some(ParseStatus::Processing) | None => {
            return Err(AppError::InvalidInput(format!(
                "catalog {id} cannot be published while parsing is still in progress"
            )))
        }
    }

    let failed_items = catalog
        .parse_summary
        .get("failed_items")
        .and_then(Value::as_i64)
        .unwrap_or(0);
    if failed_items > 0 {
        return Err(AppError::InvalidInput(format!(
            "catalog {id} cannot be published because {failed_items} items failed parsing"
        )));
    }

    let pending: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM catalog_items
        WHERE catalog_id = ?1 AND (approved = 0 OR image_storage_path = '')
        "#,
    )
    .bind(id)
    .fetch_one(pool)
    .await?;
    if pending > 0 {
        return Err(AppError::InvalidInput(format!(
            "catalog {id} has {pending} items that are unapproved or missing images"
        )));
    }

    sqlx::query(
        r#"
        UPDATE catalogs
        SET status = ?2,
            published_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(CatalogStatus::Published.as_str())
    .execute(pool)
    .await?;

    get_catalog(pool, id).await
}

fn map_catalog(row: sqlx::sqlite::SqliteRow) -> AppResult<CatalogRecord> {
    let status: String = row.try_get("status")?;
    let parse_status: Option<String> = row.try_get("parse_status")?;
    let parse_summary: String = row.try_get("parse_summary")?;
    let created_at: String = row.try_get("created_at")?;
    Ok(CatalogRecord {
        id: row.try_get("id")?,
        pdf_storage_path: row.try_get("pdf_storage_path")?,
        status: CatalogStatus::from_db(&status)?,
        parse_status: parse_status.as_deref().map(ParseStatus::from_db).transpose()?,
        parse_summary: serde_json::from_str(&parse_summary)
            .map_err(|err| AppError::Database(format!("invalid parse_summary for catalog: {err}")))?,
        baseline_catalog_id: row.try_get("baseline_catalog_id")?,
        pdf_sha256: row.try_get("pdf_sha256")?,
        published_at: parse_optional_timestamp(row.try_get("published_at")?)?,
        deleted_at: parse_optional_timestamp(row.try_get("deleted_at")?)?,
        created_at: parse_timestamp(created_at)?,
    })
}
