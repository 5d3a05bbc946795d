//! Image analysis endpoint
//!
//! Runs the full pipeline for one shelf photo: decode and validate the
//! image, detect products via Gemini (or the canned sample in demo mode),
//! score the detections against ground truth, estimate request cost, and
//! append the scored run to history.

use axum::extract::State;
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    AnalysisRun, ComparisonResult, DetectionReport, NearMiss, SkuCatalog, SkuEntry,
};
use crate::services::accuracy::normalize_name;
use crate::services::{
    AccuracyComparator, CostBreakdown, CostEstimator, DetectionOutcome, GeminiClient,
    ImageValidator, TokenUsage,
};
use crate::AppState;

fn default_persist() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// Base64-encoded image bytes
    pub image_base64: String,

    /// Original filename; its extension is checked when present
    #[serde(default)]
    pub filename: Option<String>,

    /// Store visit date
    pub date: NaiveDate,

    /// Shelf display identifier within the store
    pub display_id: String,

    /// Ground truth override; the stored catalog is used when absent
    #[serde(default)]
    pub ground_truth: Option<Vec<String>>,

    /// Use the canned sample report instead of calling Gemini
    #[serde(default)]
    pub demo_mode: bool,

    /// Append the run to history (default true)
    #[serde(default = "default_persist")]
    pub persist: bool,

    /// Where the image is stored, recorded with the run
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub run_id: Uuid,
    pub persisted: bool,
    pub detection: DetectionReport,
    pub comparison: ComparisonResult,
    pub near_misses: Vec<NearMiss>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<CostBreakdown>,
}

/// POST /api/analyze
pub async fn analyze_image(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<Json<AnalyzeResponse>> {
    if request.display_id.trim().is_empty() {
        return Err(ApiError::BadRequest("display_id cannot be blank".to_string()));
    }

    let image = BASE64
        .decode(request.image_base64.as_bytes())
        .map_err(|e| ApiError::BadRequest(format!("image_base64 is not valid base64: {e}")))?;

    if let Some(filename) = &request.filename {
        ImageValidator::check_extension(filename)
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    }
    let mime_type = ImageValidator::new()
        .validate(&image)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let catalog = db::catalog::load_catalog(&state.db).await?;
    let ground_truth = match &request.ground_truth {
        Some(list) => list.clone(),
        None => catalog.names(),
    };

    let outcome = if request.demo_mode {
        info!("Demo mode: using sample detection report");
        DetectionOutcome {
            report: DetectionReport::sample(),
            usage: None,
        }
    } else {
        let candidates = prompt_entries(&catalog, &ground_truth);
        detect(&state, &image, mime_type, &candidates).await?
    };

    // The model occasionally emits blank names; drop them rather than
    // fail the whole run on its output
    let mut predicted = outcome.report.predicted_names();
    let raw_count = predicted.len();
    predicted.retain(|name| !normalize_name(name).is_empty());
    if predicted.len() < raw_count {
        warn!(
            dropped = raw_count - predicted.len(),
            "Dropped blank names from detection output"
        );
    }

    let comparator = AccuracyComparator::new();
    let comparison = comparator.compare(&ground_truth, &predicted)?;
    let near_misses = comparator.near_misses(&comparison);
    let cost = outcome
        .usage
        .as_ref()
        .map(|usage| CostEstimator::new().estimate(usage));

    let run = AnalysisRun::new(
        request.date,
        request.display_id.clone(),
        ground_truth,
        predicted,
        comparison.clone(),
        outcome.report,
        request.image_url.clone(),
    );
    if request.persist {
        db::runs::save_run(&state.db, &run).await?;
    }

    info!(
        run_id = %run.run_id,
        display_id = %run.display_id,
        accuracy = comparison.accuracy,
        matched = comparison.matched.len(),
        missed = comparison.missed.len(),
        extra = comparison.extra.len(),
        "Analysis complete"
    );

    Ok(Json(AnalyzeResponse {
        run_id: run.run_id,
        persisted: request.persist,
        detection: run.detection,
        comparison,
        near_misses,
        usage: outcome.usage,
        cost,
    }))
}

/// Candidate list rendered into the detection prompt
///
/// Normally the stored catalog; with an empty catalog the ground-truth
/// names stand in so the prompt always has candidates.
fn prompt_entries(catalog: &SkuCatalog, ground_truth: &[String]) -> Vec<SkuEntry> {
    if catalog.is_empty() {
        ground_truth
            .iter()
            .map(|name| SkuEntry::named(name.as_str()))
            .collect()
    } else {
        catalog.entries().to_vec()
    }
}

async fn detect(
    state: &AppState,
    image: &[u8],
    mime_type: &str,
    candidates: &[SkuEntry],
) -> ApiResult<DetectionOutcome> {
    let api_key = crate::config::resolve_google_api_key(&state.db, &state.toml_config).await?;
    let model = db::settings::get_gemini_model(&state.db).await?;

    let client = GeminiClient::new(api_key, model)
        .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {e}")))?
        .with_rate_limiter(state.gemini_limiter.clone());

    match client.detect_products(image, mime_type, candidates).await {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            let message = err.to_string();
            *state.last_error.write().await = Some(message.clone());
            Err(ApiError::Upstream(message))
        }
    }
}
