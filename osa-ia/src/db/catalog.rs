//! Persistent SKU catalog
//!
//! The catalog is small (tens of entries), so persistence is whole-table
//! replacement inside a transaction rather than per-row updates. Row order
//! is the catalog order via the `position` column.

use osa_common::Result;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tracing::info;

use crate::models::{SkuCatalog, SkuEntry};

/// Load the catalog in stored order
pub async fn load_catalog(pool: &SqlitePool) -> Result<SkuCatalog> {
    let rows = sqlx::query(
        "SELECT name, code, facing_touching, shelf_no FROM sku_items ORDER BY position",
    )
    .fetch_all(pool)
    .await?;

    let entries: Vec<SkuEntry> = rows
        .iter()
        .map(|row| SkuEntry {
            name: row.get("name"),
            code: row.get("code"),
            facing_touching: row.get("facing_touching"),
            shelf_no: row.get("shelf_no"),
        })
        .collect();

    // Stored rows satisfy the duplicate invariant already; from_entries
    // re-establishes it in case the file was edited by hand
    let (catalog, _) = SkuCatalog::from_entries(entries);
    Ok(catalog)
}

/// Replace the stored catalog with `catalog`
pub async fn replace_catalog(pool: &SqlitePool, catalog: &SkuCatalog) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM sku_items").execute(&mut *tx).await?;

    for (position, entry) in catalog.entries().iter().enumerate() {
        sqlx::query(
            "INSERT INTO sku_items (position, name, code, facing_touching, shelf_no)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(position as i64)
        .bind(&entry.name)
        .bind(entry.code.as_deref())
        .bind(entry.facing_touching)
        .bind(entry.shelf_no)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Store the default catalog if the table is empty, as on first launch
///
/// Returns whether seeding happened.
pub async fn seed_defaults_if_empty(pool: &SqlitePool) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) AS count FROM sku_items")
        .fetch_one(pool)
        .await?;
    let count: i64 = row.get("count");
    if count > 0 {
        return Ok(false);
    }

    let defaults = SkuCatalog::with_defaults();
    replace_catalog(pool, &defaults).await?;
    info!(items = defaults.len(), "Seeded default SKU catalog");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::init_tables(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_empty_table_loads_empty_catalog() {
        let pool = test_pool().await;
        let catalog = load_catalog(&pool).await.unwrap();
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn test_replace_and_load_preserves_order_and_fields() {
        let pool = test_pool().await;

        let mut catalog = SkuCatalog::new();
        catalog
            .add(SkuEntry {
                name: "Cola 330ml".to_string(),
                code: Some("C-330".to_string()),
                facing_touching: Some(4),
                shelf_no: Some(2),
            })
            .unwrap();
        catalog.add(SkuEntry::named("Water bottles")).unwrap();
        catalog.add(SkuEntry::named("Apple juice")).unwrap();

        replace_catalog(&pool, &catalog).await.unwrap();
        let loaded = load_catalog(&pool).await.unwrap();
        assert_eq!(loaded, catalog);

        // Replacing again drops the old rows
        let mut smaller = SkuCatalog::new();
        smaller.add(SkuEntry::named("Only one")).unwrap();
        replace_catalog(&pool, &smaller).await.unwrap();
        assert_eq!(load_catalog(&pool).await.unwrap().names(), vec!["Only one"]);
    }

    #[tokio::test]
    async fn test_seed_defaults_only_when_empty() {
        let pool = test_pool().await;

        assert!(seed_defaults_if_empty(&pool).await.unwrap());
        let seeded = load_catalog(&pool).await.unwrap();
        assert_eq!(seeded.len(), crate::models::DEFAULT_SKU_ITEMS.len());

        // Second call must not reseed
        assert!(!seed_defaults_if_empty(&pool).await.unwrap());

        let mut custom = SkuCatalog::new();
        custom.add(SkuEntry::named("Custom item")).unwrap();
        replace_catalog(&pool, &custom).await.unwrap();
        assert!(!seed_defaults_if_empty(&pool).await.unwrap());
        assert_eq!(
            load_catalog(&pool).await.unwrap().names(),
            vec!["Custom item"]
        );
    }
}
