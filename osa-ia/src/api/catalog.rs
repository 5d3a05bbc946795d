//! SKU catalog endpoints
//!
//! The catalog is small, so every mutation loads it, applies the change in
//! memory through `SkuCatalog` (which enforces the duplicate invariant),
//! and writes the whole list back. Concurrent edits are last-write-wins.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db;
use crate::error::ApiResult;
use crate::models::{CatalogEntrySpec, CatalogExport, ImportMode, SkuCatalog, SkuEntry};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    /// Case-insensitive substring filter on names
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CatalogItem {
    /// Position in the full catalog, valid for edit and delete
    pub index: usize,
    #[serde(flatten)]
    pub entry: SkuEntry,
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub items: Vec<CatalogItem>,
    /// Size of the full catalog, not of the filtered view
    pub total_items: usize,
}

#[derive(Debug, Serialize)]
pub struct CatalogSizeResponse {
    pub total_items: usize,
}

/// GET /api/catalog?q=
pub async fn get_catalog(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> ApiResult<Json<CatalogResponse>> {
    let catalog = db::catalog::load_catalog(&state.db).await?;
    let total_items = catalog.len();
    let items = catalog
        .search(query.q.as_deref().unwrap_or(""))
        .into_iter()
        .map(|(index, entry)| CatalogItem {
            index,
            entry: entry.clone(),
        })
        .collect();
    Ok(Json(CatalogResponse { items, total_items }))
}

#[derive(Debug, Deserialize)]
pub struct ReplaceCatalogRequest {
    pub items: Vec<CatalogEntrySpec>,
}

#[derive(Debug, Serialize)]
pub struct ReplaceCatalogResponse {
    pub total_items: usize,
    /// Entries dropped because they duplicated an earlier one
    pub duplicates: usize,
}

/// PUT /api/catalog
///
/// Replaces the whole catalog. An empty `items` list clears it.
pub async fn replace_catalog(
    State(state): State<AppState>,
    Json(request): Json<ReplaceCatalogRequest>,
) -> ApiResult<Json<ReplaceCatalogResponse>> {
    let entries = request
        .items
        .into_iter()
        .map(CatalogEntrySpec::into_entry)
        .collect();
    let (catalog, outcome) = SkuCatalog::from_entries(entries);
    db::catalog::replace_catalog(&state.db, &catalog).await?;
    Ok(Json(ReplaceCatalogResponse {
        total_items: catalog.len(),
        duplicates: outcome.duplicates,
    }))
}

#[derive(Debug, Serialize)]
pub struct AddItemResponse {
    pub index: usize,
    pub total_items: usize,
}

/// POST /api/catalog/items
pub async fn add_item(
    State(state): State<AppState>,
    Json(entry): Json<SkuEntry>,
) -> ApiResult<Json<AddItemResponse>> {
    let mut catalog = db::catalog::load_catalog(&state.db).await?;
    catalog.add(entry)?;
    db::catalog::replace_catalog(&state.db, &catalog).await?;
    Ok(Json(AddItemResponse {
        index: catalog.len() - 1,
        total_items: catalog.len(),
    }))
}

/// PUT /api/catalog/items/:index
pub async fn edit_item(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(entry): Json<SkuEntry>,
) -> ApiResult<Json<CatalogSizeResponse>> {
    let mut catalog = db::catalog::load_catalog(&state.db).await?;
    catalog.edit(index, entry)?;
    db::catalog::replace_catalog(&state.db, &catalog).await?;
    Ok(Json(CatalogSizeResponse {
        total_items: catalog.len(),
    }))
}

#[derive(Debug, Serialize)]
pub struct DeleteItemResponse {
    pub removed: SkuEntry,
    pub total_items: usize,
}

/// DELETE /api/catalog/items/:index
pub async fn delete_item(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> ApiResult<Json<DeleteItemResponse>> {
    let mut catalog = db::catalog::load_catalog(&state.db).await?;
    let removed = catalog.remove(index)?;
    db::catalog::replace_catalog(&state.db, &catalog).await?;
    Ok(Json(DeleteItemResponse {
        removed,
        total_items: catalog.len(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct BulkAddRequest {
    /// One SKU name per line; blank lines are skipped
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct BulkAddResponse {
    pub added: usize,
    pub duplicates: usize,
    pub total_items: usize,
}

/// POST /api/catalog/bulk
pub async fn bulk_add(
    State(state): State<AppState>,
    Json(request): Json<BulkAddRequest>,
) -> ApiResult<Json<BulkAddResponse>> {
    let mut catalog = db::catalog::load_catalog(&state.db).await?;
    let outcome = catalog.add_bulk(&request.text);
    db::catalog::replace_catalog(&state.db, &catalog).await?;
    Ok(Json(BulkAddResponse {
        added: outcome.added,
        duplicates: outcome.duplicates,
        total_items: catalog.len(),
    }))
}

/// POST /api/catalog/reset
pub async fn reset_catalog(
    State(state): State<AppState>,
) -> ApiResult<Json<CatalogSizeResponse>> {
    let catalog = SkuCatalog::with_defaults();
    db::catalog::replace_catalog(&state.db, &catalog).await?;
    Ok(Json(CatalogSizeResponse {
        total_items: catalog.len(),
    }))
}

/// POST /api/catalog/sort
pub async fn sort_catalog(
    State(state): State<AppState>,
) -> ApiResult<Json<CatalogSizeResponse>> {
    let mut catalog = db::catalog::load_catalog(&state.db).await?;
    catalog.sort_by_name();
    db::catalog::replace_catalog(&state.db, &catalog).await?;
    Ok(Json(CatalogSizeResponse {
        total_items: catalog.len(),
    }))
}

fn default_import_mode() -> ImportMode {
    ImportMode::Replace
}

#[derive(Debug, Deserialize)]
pub struct ImportCatalogRequest {
    #[serde(default = "default_import_mode")]
    pub mode: ImportMode,
    pub sku_items: Vec<CatalogEntrySpec>,
}

/// POST /api/catalog/import
///
/// Accepts a previously exported document. `mode` selects replace or
/// merge semantics.
pub async fn import_catalog(
    State(state): State<AppState>,
    Json(request): Json<ImportCatalogRequest>,
) -> ApiResult<Json<BulkAddResponse>> {
    let mut catalog = db::catalog::load_catalog(&state.db).await?;
    let outcome = catalog.import(request.mode, request.sku_items);
    db::catalog::replace_catalog(&state.db, &catalog).await?;
    Ok(Json(BulkAddResponse {
        added: outcome.added,
        duplicates: outcome.duplicates,
        total_items: catalog.len(),
    }))
}

/// GET /api/catalog/export
pub async fn export_catalog(
    State(state): State<AppState>,
) -> ApiResult<Json<CatalogExport>> {
    let catalog = db::catalog::load_catalog(&state.db).await?;
    Ok(Json(catalog.export()))
}
