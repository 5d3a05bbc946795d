//! Standalone accuracy comparison endpoint

use axum::Json;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::models::ComparisonResult;
use crate::services::AccuracyComparator;

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub ground_truth: Vec<String>,
    pub predicted: Vec<String>,
}

/// POST /api/compare
///
/// Scores a prediction list against ground truth without calling the
/// vision model or touching history. Used by the UI shell to re-score
/// hand-edited lists.
pub async fn compare_skus(
    Json(request): Json<CompareRequest>,
) -> ApiResult<Json<ComparisonResult>> {
    let comparator = AccuracyComparator::new();
    let result = comparator.compare(&request.ground_truth, &request.predicted)?;
    Ok(Json(result))
}
