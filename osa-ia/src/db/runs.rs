//! Analysis run history
//!
//! Append-only log of scored runs. Rows are written once by `save_run` and
//! never updated; history queries filter by store visit date and display
//! identifier, newest first. List and comparison payloads are stored as
//! JSON in TEXT columns.

use chrono::{DateTime, NaiveDate, Utc};
use osa_common::{Error, Result};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use tracing::info;
use uuid::Uuid;

use crate::models::AnalysisRun;

/// Rows returned by a history query when the caller gives no limit
pub const DEFAULT_FETCH_LIMIT: i64 = 50;

/// Rows scanned when addressing a run by positional index
pub const INDEX_SCAN_LIMIT: i64 = 100;

/// Append one run to the history
pub async fn save_run(pool: &SqlitePool, run: &AnalysisRun) -> Result<()> {
    let ground_truth = to_json(&run.ground_truth_skus)?;
    let predicted = to_json(&run.predicted_skus)?;
    let comparison = to_json(&run.comparison)?;
    let detection = to_json(&run.detection)?;

    sqlx::query(
        "INSERT INTO analysis_runs
         (run_id, date, display_id, ground_truth_skus, predicted_skus,
          accuracy, comparison, detection, image_url, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(run.run_id.to_string())
    .bind(run.date.to_string())
    .bind(&run.display_id)
    .bind(ground_truth)
    .bind(predicted)
    .bind(run.accuracy)
    .bind(comparison)
    .bind(detection)
    .bind(run.image_url.as_deref())
    .bind(run.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    info!(
        run_id = %run.run_id,
        date = %run.date,
        display_id = %run.display_id,
        accuracy = run.accuracy,
        "Saved analysis run"
    );
    Ok(())
}

/// Fetch runs, newest first, optionally filtered by date and display
pub async fn fetch_runs(
    pool: &SqlitePool,
    date: Option<NaiveDate>,
    display_id: Option<&str>,
    limit: i64,
) -> Result<Vec<AnalysisRun>> {
    let rows = sqlx::query(
        "SELECT run_id, date, display_id, ground_truth_skus, predicted_skus,
                accuracy, comparison, detection, image_url, created_at
         FROM analysis_runs
         WHERE (?1 IS NULL OR date = ?1)
           AND (?2 IS NULL OR display_id = ?2)
         ORDER BY created_at DESC
         LIMIT ?3",
    )
    .bind(date.map(|d| d.to_string()))
    .bind(display_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_run).collect()
}

/// Fetch the run at `index` within the newest-first history of one
/// (date, display) pair
///
/// Returns `None` when fewer than `index + 1` runs exist in the first
/// `INDEX_SCAN_LIMIT` rows.
pub async fn fetch_run_by_index(
    pool: &SqlitePool,
    date: NaiveDate,
    display_id: &str,
    index: usize,
) -> Result<Option<AnalysisRun>> {
    let runs = fetch_runs(pool, Some(date), Some(display_id), INDEX_SCAN_LIMIT).await?;
    Ok(runs.into_iter().nth(index))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| Error::Internal(format!("Failed to serialize run field: {e}")))
}

fn from_json<T: serde::de::DeserializeOwned>(raw: &str, field: &str) -> Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| Error::Internal(format!("Failed to parse stored {field}: {e}")))
}

fn row_to_run(row: &SqliteRow) -> Result<AnalysisRun> {
    let run_id: String = row.get("run_id");
    let run_id = Uuid::parse_str(&run_id)
        .map_err(|e| Error::Internal(format!("Invalid run_id in database: {e}")))?;

    let date: String = row.get("date");
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|e| Error::Internal(format!("Invalid date in database: {e}")))?;

    let created_at: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| Error::Internal(format!("Invalid created_at in database: {e}")))?
        .with_timezone(&Utc);

    let ground_truth: String = row.get("ground_truth_skus");
    let predicted: String = row.get("predicted_skus");
    let comparison: String = row.get("comparison");
    let detection: String = row.get("detection");

    Ok(AnalysisRun {
        run_id,
        date,
        display_id: row.get("display_id"),
        ground_truth_skus: from_json(&ground_truth, "ground_truth_skus")?,
        predicted_skus: from_json(&predicted, "predicted_skus")?,
        accuracy: row.get("accuracy"),
        comparison: from_json(&comparison, "comparison")?,
        detection: from_json(&detection, "detection")?,
        image_url: row.get("image_url"),
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComparisonResult, DetectionReport};
    use chrono::TimeZone;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::init_tables(&pool).await.unwrap();
        pool
    }

    fn run_at(date: &str, display_id: &str, hour: u32, accuracy: f64) -> AnalysisRun {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        let mut run = AnalysisRun::new(
            date,
            display_id.to_string(),
            vec!["Cola".to_string(), "Water".to_string()],
            vec!["Cola".to_string()],
            ComparisonResult {
                matched: vec!["Cola".to_string()],
                missed: vec!["Water".to_string()],
                extra: vec![],
                accuracy,
            },
            DetectionReport::sample(),
            None,
        );
        run.created_at = Utc.with_ymd_and_hms(2026, 8, 21, hour, 0, 0).unwrap();
        run
    }

    #[tokio::test]
    async fn test_save_and_fetch_roundtrip() {
        let pool = test_pool().await;
        let mut run = run_at("2026-08-21", "D-001", 10, 0.5);
        run.image_url = Some("https://example.com/shelf.png".to_string());

        save_run(&pool, &run).await.unwrap();
        let fetched = fetch_runs(&pool, None, None, DEFAULT_FETCH_LIMIT)
            .await
            .unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0], run);
    }

    #[tokio::test]
    async fn test_fetch_filters_by_date_and_display() {
        let pool = test_pool().await;
        save_run(&pool, &run_at("2026-08-20", "D-001", 9, 1.0))
            .await
            .unwrap();
        save_run(&pool, &run_at("2026-08-21", "D-001", 10, 0.5))
            .await
            .unwrap();
        save_run(&pool, &run_at("2026-08-21", "D-002", 11, 0.0))
            .await
            .unwrap();

        let all = fetch_runs(&pool, None, None, DEFAULT_FETCH_LIMIT)
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let by_date = fetch_runs(
            &pool,
            Some(NaiveDate::parse_from_str("2026-08-21", "%Y-%m-%d").unwrap()),
            None,
            DEFAULT_FETCH_LIMIT,
        )
        .await
        .unwrap();
        assert_eq!(by_date.len(), 2);

        let by_both = fetch_runs(
            &pool,
            Some(NaiveDate::parse_from_str("2026-08-21", "%Y-%m-%d").unwrap()),
            Some("D-002"),
            DEFAULT_FETCH_LIMIT,
        )
        .await
        .unwrap();
        assert_eq!(by_both.len(), 1);
        assert_eq!(by_both[0].display_id, "D-002");
    }

    #[tokio::test]
    async fn test_fetch_orders_newest_first_and_respects_limit() {
        let pool = test_pool().await;
        save_run(&pool, &run_at("2026-08-21", "D-001", 8, 0.1))
            .await
            .unwrap();
        save_run(&pool, &run_at("2026-08-21", "D-001", 12, 0.9))
            .await
            .unwrap();
        save_run(&pool, &run_at("2026-08-21", "D-001", 10, 0.5))
            .await
            .unwrap();

        let runs = fetch_runs(&pool, None, None, DEFAULT_FETCH_LIMIT)
            .await
            .unwrap();
        let hours: Vec<u32> = runs
            .iter()
            .map(|r| {
                use chrono::Timelike;
                r.created_at.hour()
            })
            .collect();
        assert_eq!(hours, vec![12, 10, 8]);

        let limited = fetch_runs(&pool, None, None, 2).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].accuracy, 0.9);
    }

    #[tokio::test]
    async fn test_fetch_run_by_index() {
        let pool = test_pool().await;
        let date = NaiveDate::parse_from_str("2026-08-21", "%Y-%m-%d").unwrap();
        save_run(&pool, &run_at("2026-08-21", "D-001", 9, 0.1))
            .await
            .unwrap();
        save_run(&pool, &run_at("2026-08-21", "D-001", 11, 0.9))
            .await
            .unwrap();

        // Index 0 is the newest run
        let newest = fetch_run_by_index(&pool, date, "D-001", 0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(newest.accuracy, 0.9);

        let older = fetch_run_by_index(&pool, date, "D-001", 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(older.accuracy, 0.1);

        assert!(fetch_run_by_index(&pool, date, "D-001", 2)
            .await
            .unwrap()
            .is_none());
        assert!(fetch_run_by_index(&pool, date, "D-404", 0)
            .await
            .unwrap()
            .is_none());
    }
}
