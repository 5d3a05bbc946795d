//! Shelf image analysis service
//!
//! HTTP microservice around one pipeline: accept a shelf photo, ask Gemini
//! which catalog SKUs are visible, score the answer against ground truth,
//! and append the scored run to history. The accuracy comparator is also
//! exposed standalone for scoring external predictions.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use osa_common::config::TomlConfig;
use sqlx::sqlite::SqlitePool;
use tokio::sync::RwLock;

pub use error::{ApiError, ApiResult};

use services::gemini_client::{RateLimiter, RATE_LIMIT_MS};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,

    /// TOML config snapshot taken at startup
    pub toml_config: TomlConfig,

    pub startup_time: DateTime<Utc>,

    /// Most recent analysis failure, surfaced via /health
    pub last_error: Arc<RwLock<Option<String>>>,

    /// Request pacing shared by all Gemini clients built per request
    pub gemini_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(db: SqlitePool, toml_config: TomlConfig) -> Self {
        Self {
            db,
            toml_config,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
            gemini_limiter: Arc::new(RateLimiter::new(RATE_LIMIT_MS)),
        }
    }
}

/// Full API router with state applied
pub fn build_router(state: AppState) -> Router {
    api::build_router(state)
}
