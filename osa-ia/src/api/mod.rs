//! HTTP API endpoints
//!
//! Served on the image analysis port (default 8520) for the UI shell.
//! All handlers return `ApiResult`; errors render through `ApiError`.

pub mod analyze;
pub mod catalog;
pub mod compare;
pub mod health;
pub mod runs;
pub mod settings;

use axum::routing::{get, post, put};
use axum::Router;

use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/compare", post(compare::compare_skus))
        .route("/api/analyze", post(analyze::analyze_image))
        .route("/api/runs", get(runs::list_runs))
        .route("/api/runs/by-index", get(runs::get_run_by_index))
        .route(
            "/api/catalog",
            get(catalog::get_catalog).put(catalog::replace_catalog),
        )
        .route("/api/catalog/items", post(catalog::add_item))
        .route(
            "/api/catalog/items/:index",
            put(catalog::edit_item).delete(catalog::delete_item),
        )
        .route("/api/catalog/bulk", post(catalog::bulk_add))
        .route("/api/catalog/reset", post(catalog::reset_catalog))
        .route("/api/catalog/sort", post(catalog::sort_catalog))
        .route("/api/catalog/import", post(catalog::import_catalog))
        .route("/api/catalog/export", get(catalog::export_catalog))
        .route("/api/settings", get(settings::get_settings))
        .route(
            "/api/settings/google_api_key",
            post(settings::set_google_api_key),
        )
        .route(
            "/api/settings/google_api_key/validate",
            post(settings::validate_google_api_key),
        )
        .route("/api/settings/gemini_model", post(settings::set_gemini_model))
        .with_state(state)
}
