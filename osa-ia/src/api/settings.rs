//! Settings endpoints
//!
//! The Google API key is stored in the settings table and mirrored to the
//! TOML config file on update so both configuration paths keep working.
//! The mirror write is best-effort; the database copy is authoritative.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::services::GeminiClient;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub gemini_model: String,
    pub google_api_key_configured: bool,
}

/// GET /api/settings
///
/// The key itself is never returned, only whether one is stored.
pub async fn get_settings(State(state): State<AppState>) -> ApiResult<Json<SettingsResponse>> {
    let gemini_model = db::settings::get_gemini_model(&state.db).await?;
    let google_api_key_configured = db::settings::get_google_api_key(&state.db)
        .await?
        .map(|k| !k.trim().is_empty())
        .unwrap_or(false);
    Ok(Json(SettingsResponse {
        gemini_model,
        google_api_key_configured,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SetApiKeyRequest {
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/settings/google_api_key
pub async fn set_google_api_key(
    State(state): State<AppState>,
    Json(request): Json<SetApiKeyRequest>,
) -> ApiResult<Json<UpdateResponse>> {
    let api_key = request.api_key.trim();
    if api_key.is_empty() {
        return Err(ApiError::BadRequest("api_key cannot be empty".to_string()));
    }

    db::settings::set_google_api_key(&state.db, api_key).await?;
    info!("Google API key updated via settings API");

    if let Err(e) = crate::config::sync_key_to_toml(api_key) {
        warn!("Failed to mirror API key to TOML config: {e}");
    }

    Ok(Json(UpdateResponse {
        success: true,
        message: "Google API key updated".to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct ValidateKeyResponse {
    pub valid: bool,
}

/// POST /api/settings/google_api_key/validate
///
/// Sends a minimal probe request to the Gemini API with the resolved key.
pub async fn validate_google_api_key(
    State(state): State<AppState>,
) -> ApiResult<Json<ValidateKeyResponse>> {
    let api_key = crate::config::resolve_google_api_key(&state.db, &state.toml_config).await?;
    let model = db::settings::get_gemini_model(&state.db).await?;

    let client = GeminiClient::new(api_key, model)
        .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {e}")))?
        .with_rate_limiter(state.gemini_limiter.clone());

    let valid = client.validate_api_key().await;
    Ok(Json(ValidateKeyResponse { valid }))
}

#[derive(Debug, Deserialize)]
pub struct SetModelRequest {
    pub model: String,
}

/// POST /api/settings/gemini_model
pub async fn set_gemini_model(
    State(state): State<AppState>,
    Json(request): Json<SetModelRequest>,
) -> ApiResult<Json<UpdateResponse>> {
    let model = request.model.trim();
    if model.is_empty() {
        return Err(ApiError::BadRequest("model cannot be empty".to_string()));
    }

    db::settings::set_gemini_model(&state.db, model).await?;
    info!(model, "Gemini model updated via settings API");

    Ok(Json(UpdateResponse {
        success: true,
        message: format!("Gemini model set to {model}"),
    }))
}
