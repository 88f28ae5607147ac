use std::collections::HashMap;

use sqlx::{Row, SqlitePool};

use crate::core::{
    errors::{AppError, AppResult},
    types::{BaselineItem, CatalogItemRecord, ChangeType, ParseIssue},
};

pub async fn clear_catalog_items(pool: &SqlitePool, catalog_id: &str) -> AppResult<u64> {
    let removed = sqlx::query("DELETE FROM catalog_items WHERE catalog_id = ?1")
        .bind(catalog_id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(removed)
}

/// Writes all rows in one transaction; existing `(catalog_id, sku)` rows are overwritten.
pub async fn upsert_items(pool: &SqlitePool, items: &[CatalogItemRecord]) -> AppResult<()> {
    let mut tx = pool.begin().await?;
    for item in items {
        sqlx::query(
            r#"
            INSERT INTO catalog_items (
              catalog_id, sku, name, upc, pack, category, image_storage_path,
              parse_issues, approved, signature, quick_fingerprint, change_type
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(catalog_id, sku) DO UPDATE SET
              name = excluded.name,
              upc = excluded.upc,
              pack = excluded.pack,
              category = excluded.category,
              image_storage_path = excluded.image_storage_path,
              parse_issues = excluded.parse_issues,
              approved = excluded.approved,
              signature = excluded.signature,
              quick_fingerprint = excluded.quick_fingerprint,
              change_type = excluded.change_type,
              updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            "#,
        )
        .bind(&item.catalog_id)
        .bind(&item.sku)
        .bind(&item.name)
        .bind(&item.upc)
        .bind(&item.pack)
        .bind(&item.category)
        .bind(&item.image_storage_path)
        .bind(serde_json::to_string(&item.parse_issues)?)
        .bind(item.approved)
        .bind(&item.signature)
        .bind(&item.quick_fingerprint)
        .bind(item.change_type.as_str())
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn list_items(pool: &SqlitePool, catalog_id: &str) -> AppResult<Vec<CatalogItemRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT catalog_id, sku, name, upc, pack, category, image_storage_path,
               parse_issues, approved, signature, quick_fingerprint, change_type
        FROM catalog_items
        WHERE catalog_id = ?1
        ORDER BY sku
        "#,
    )
    .bind(catalog_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(map_item).collect()
}

/// Baseline rows keyed by SKU; empty when there is no baseline catalog.
pub async fn load_baseline_items(
    pool: &SqlitePool,
    baseline_catalog_id: Option<&str>,
) -> AppResult<HashMap<String, BaselineItem>> {
    let Some(baseline_catalog_id) = baseline_catalog_id else {
        return Ok(HashMap::new());
    };
    let rows = sqlx::query(
        r#"
        SELECT sku, signature, name, upc, pack, category
        FROM catalog_items
        WHERE catalog_id = ?1
        "#,
    )
    .bind(baseline_catalog_id)
    .fetch_all(pool)
    .await?;

    let mut items = HashMap::with_capacity(rows.len());
    for row in rows {
        let item = BaselineItem {
            sku: row.try_get("sku")?,
            signature: row.try_get("signature")?,
            name: row.try_get("name")?,
            upc: row.try_get("upc")?,
            pack: row.try_get("pack")?,
            category: row.try_get("category")?,
        };
        items.insert(item.sku.clone(), item);
    }
    Ok(items)
}

/// Approves every pending item of a catalog and returns how many changed.
pub async fn approve_all_items(pool: &SqlitePool, catalog_id: &str) -> AppResult<u64> {
    let updated = sqlx::query(
        r#"
        UPDATE catalog_items
        SET approved = 1,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE catalog_id = ?1 AND approved = 0
        "#,
    )
    .bind(catalog_id)
    .execute(pool)
    .await?
    .rows_affected();
    Ok(updated)
}

fn map_item(row: sqlx::sqlite::SqliteRow) -> AppResult<CatalogItemRecord> {
    let parse_issues: String = row.try_get("parse_issues")?;
    let change_type: String = row.try_get("change_type")?;
    let parse_issues: Vec<ParseIssue> = serde_json::from_str(&parse_issues)
        .map_err(|err| AppError::Database(format!("invalid parse_issues for catalog item: {err}")))?;
    Ok(CatalogItemRecord {
        catalog_id: row.try_get("catalog_id")?,
        sku: row.try_get("sku")?,
        name: row.try_get("name")?,
        upc: row.try_get("upc")?,
        pack: row.try_get("pack")?,
        category: row.try_get("category")?,
        image_storage_path: row.try_get("image_storage_path")?,
        parse_issues,
        approved: row.try_get("approved")?,
        signature: row.try_get("signature")?,
        quick_fingerprint: row.try_get("quick_fingerprint")?,
        change_type: ChangeType::from_db(&change_type)?,
    })
}
