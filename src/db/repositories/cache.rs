//! Parse cache keyed by `(sku, quick_fingerprint)`. Rows are only ever overwritten.

use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::core::{errors::AppResult, types::CacheEntry};

const LOOKUP_CHUNK: usize = 500;

/// Every cached row for the given SKUs, whatever their quick fingerprint.
pub async fn find_entries(pool: &SqlitePool, skus: &[String]) -> AppResult<Vec<CacheEntry>> {
    let mut entries = Vec::new();
    for chunk in skus.chunks(LOOKUP_CHUNK) {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT sku, quick_fingerprint, strong_fingerprint, name, upc, pack, category, image_storage_path FROM item_parse_cache WHERE sku IN (",
        );
        let mut separated = query.separated(", ");
        for sku in chunk {
            separated.push_bind(sku);
        }
        query.push(")");

        let rows = query.build().fetch_all(pool).await?;
        for row in rows {
            entries.push(map_entry(row)?);
        }
    }
    Ok(entries)
}

pub async fn upsert_entry(pool: &SqlitePool, entry: &CacheEntry) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO item_parse_cache (
          sku, quick_fingerprint, strong_fingerprint, name, upc, pack, category, image_storage_path
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(sku, quick_fingerprint) DO UPDATE SET
          strong_fingerprint = excluded.strong_fingerprint,
          name = excluded.name,
          upc = excluded.upc,
          pack = excluded.pack,
          category = excluded.category,
          image_storage_path = excluded.image_storage_path,
          updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        "#,
    )
    .bind(&entry.sku)
    .bind(&entry.quick_fingerprint)
    .bind(&entry.strong_fingerprint)
    .bind(&entry.name)
    .bind(&entry.upc)
    .bind(&entry.pack)
    .bind(&entry.category)
    .bind(&entry.image_storage_path)
    .execute(pool)
    .await?;
    Ok(())
}

fn map_entry(row: sqlx::sqlite::SqliteRow) -> AppResult<CacheEntry> {
    Ok(CacheEntry {
        sku: row.try_get("sku")?,
        quick_fingerprint: row.try_get("quick_fingerprint")?,
        strong_fingerprint: row.try_get("strong_fingerprint")?,
        name: row.try_get("name")?,
        upc: row.try_get("upc")?,
        pack: row.try_get("pack")?,
        category: row.try_get("category")?,
        image_storage_path: row.try_get("image_storage_path")?,
    })
}
