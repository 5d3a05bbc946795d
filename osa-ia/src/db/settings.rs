//! Settings key/value store
//!
//! Holds runtime configuration that survives restarts, most importantly
//! the Google API key once it has been migrated out of the environment or
//! the TOML file.

use osa_common::Result;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

/// Model used when no override has been stored
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-pro";

const KEY_GOOGLE_API_KEY: &str = "google_api_key";
const KEY_GEMINI_MODEL: &str = "gemini_model";

/// Get a setting value by key
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.get("value")))
}

/// Set a setting value, inserting or updating as needed
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_google_api_key(pool: &SqlitePool) -> Result<Option<String>> {
    get_setting(pool, KEY_GOOGLE_API_KEY).await
}

pub async fn set_google_api_key(pool: &SqlitePool, api_key: &str) -> Result<()> {
    set_setting(pool, KEY_GOOGLE_API_KEY, api_key).await
}

/// Configured Gemini model, falling back to the default
pub async fn get_gemini_model(pool: &SqlitePool) -> Result<String> {
    Ok(get_setting(pool, KEY_GEMINI_MODEL)
        .await?
        .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()))
}

pub async fn set_gemini_model(pool: &SqlitePool, model: &str) -> Result<()> {
    set_setting(pool, KEY_GEMINI_MODEL, model).await
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
    async fn test_set_and_get_setting() {
        let pool = test_pool().await;
        assert_eq!(get_setting(&pool, "missing").await.unwrap(), None);

        set_setting(&pool, "some_key", "some_value").await.unwrap();
        assert_eq!(
            get_setting(&pool, "some_key").await.unwrap(),
            Some("some_value".to_string())
        );

        set_setting(&pool, "some_key", "updated").await.unwrap();
        assert_eq!(
            get_setting(&pool, "some_key").await.unwrap(),
            Some("updated".to_string())
        );
    }

    #[tokio::test]
    async fn test_google_api_key_roundtrip() {
        let pool = test_pool().await;
        assert_eq!(get_google_api_key(&pool).await.unwrap(), None);
        set_google_api_key(&pool, "AIzaTestKey123").await.unwrap();
        assert_eq!(
            get_google_api_key(&pool).await.unwrap(),
            Some("AIzaTestKey123".to_string())
        );
    }

    #[tokio::test]
    async fn test_gemini_model_defaults() {
        let pool = test_pool().await;
        assert_eq!(get_gemini_model(&pool).await.unwrap(), DEFAULT_GEMINI_MODEL);
        set_gemini_model(&pool, "gemini-2.5-flash").await.unwrap();
        assert_eq!(get_gemini_model(&pool).await.unwrap(), "gemini-2.5-flash");
    }
}
