//! Run history endpoints

use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::AnalysisRun;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListRunsQuery {
    #[serde(default)]
    pub date: Option<NaiveDate>,

    #[serde(default)]
    pub display_id: Option<String>,

    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RunsResponse {
    pub runs: Vec<AnalysisRun>,
    pub count: usize,
}

/// GET /api/runs?date=&display_id=&limit=
///
/// Newest first. Without a limit the 50 most recent matching runs are
/// returned.
pub async fn list_runs(
    State(state): State<AppState>,
    Query(query): Query<ListRunsQuery>,
) -> ApiResult<Json<RunsResponse>> {
    let limit = query
        .limit
        .unwrap_or(db::runs::DEFAULT_FETCH_LIMIT)
        .clamp(1, 500);
    let runs = db::runs::fetch_runs(
        &state.db,
        query.date,
        query.display_id.as_deref(),
        limit,
    )
    .await?;
    let count = runs.len();
    Ok(Json(RunsResponse { runs, count }))
}

#[derive(Debug, Deserialize)]
pub struct RunByIndexQuery {
    pub date: NaiveDate,
    pub display_id: String,
    pub index: usize,
}

/// GET /api/runs/by-index?date=&display_id=&index=
///
/// Addresses one run by its position in the newest-first history of a
/// (date, display) pair; index 0 is the most recent run.
pub async fn get_run_by_index(
    State(state): State<AppState>,
    Query(query): Query<RunByIndexQuery>,
) -> ApiResult<Json<AnalysisRun>> {
    let run = db::runs::fetch_run_by_index(&state.db, query.date, &query.display_id, query.index)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "No run at index {} for display {} on {}",
                query.index, query.display_id, query.date
            ))
        })?;
    Ok(Json(run))
}
