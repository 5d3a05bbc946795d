//! Integration tests for the analysis API
//!
//! Each test builds the full router over an in-memory database and drives
//! it with tower's oneshot, exactly as the service is wired in production
//! minus the listener.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePool;
use tower::ServiceExt;

use osa_common::config::TomlConfig;
use osa_ia::{build_router, AppState};

const PNG_BYTES: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D',
    b'R',
];

async fn test_state() -> AppState {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    osa_ia::db::init_tables(&pool).await.unwrap();
    AppState::new(pool, TomlConfig::default())
}

async fn send(
    state: &AppState,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = match body {
        Some(value) => Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = build_router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn demo_analyze_request(display_id: &str, ground_truth: Value) -> Value {
    json!({
        "image_base64": BASE64.encode(PNG_BYTES),
        "filename": "shelf.png",
        "date": "2026-08-21",
        "display_id": display_id,
        "ground_truth": ground_truth,
        "demo_mode": true,
    })
}

#[tokio::test]
async fn test_health_reports_module_and_uptime() {
    let state = test_state().await;
    let (status, body) = send(&state, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "osa-ia");
    assert!(body["uptime_seconds"].as_i64().unwrap() >= 0);
    assert!(body.get("last_error").is_none());
}

#[tokio::test]
async fn test_compare_returns_exact_contract() {
    let state = test_state().await;
    let (status, body) = send(
        &state,
        "POST",
        "/api/compare",
        Some(json!({
            "ground_truth": ["Coca-Cola bottles", "Pepsi bottles", "Milk cartons"],
            "predicted": ["coca-cola  bottles", "Fanta cans"],
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let keys: Vec<&String> = body.as_object().unwrap().keys().collect();
    assert_eq!(keys.len(), 4);
    for key in ["matched", "missed", "extra", "accuracy"] {
        assert!(body.get(key).is_some(), "missing {key}");
    }

    assert_eq!(body["matched"], json!(["Coca-Cola bottles"]));
    assert_eq!(body["missed"], json!(["Pepsi bottles", "Milk cartons"]));
    assert_eq!(body["extra"], json!(["Fanta cans"]));
    assert!((body["accuracy"].as_f64().unwrap() - 1.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_compare_empty_ground_truth_scores_zero() {
    let state = test_state().await;
    let (status, body) = send(
        &state,
        "POST",
        "/api/compare",
        Some(json!({ "ground_truth": [], "predicted": ["Cola"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accuracy"].as_f64().unwrap(), 0.0);
    assert_eq!(body["extra"], json!(["Cola"]));
}

#[tokio::test]
async fn test_compare_rejects_blank_entries() {
    let state = test_state().await;
    let (status, body) = send(
        &state,
        "POST",
        "/api/compare",
        Some(json!({ "ground_truth": ["Cola", "   "], "predicted": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("blank SKU name"));
    assert!(body["error"]["code"].is_string());
}

#[tokio::test]
async fn test_analyze_demo_mode_scores_and_persists() {
    let state = test_state().await;

    // Sample detection reports Coca-Cola bottles, Water bottles, and
    // Chips/Crisps
    let request = demo_analyze_request(
        "D-001",
        json!(["Coca-Cola bottles", "Water bottles", "Pepsi bottles"]),
    );
    let (status, body) = send(&state, "POST", "/api/analyze", Some(request)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["persisted"], true);
    assert_eq!(body["detection"]["total_items_detected"], 3);
    assert_eq!(
        body["comparison"]["matched"],
        json!(["Coca-Cola bottles", "Water bottles"])
    );
    assert_eq!(body["comparison"]["missed"], json!(["Pepsi bottles"]));
    assert_eq!(body["comparison"]["extra"], json!(["Chips/Crisps"]));
    assert!((body["comparison"]["accuracy"].as_f64().unwrap() - 2.0 / 3.0).abs() < 1e-9);
    // Demo mode has no token usage, so no cost either
    assert!(body.get("usage").is_none());
    assert!(body.get("cost").is_none());

    let run_id = body["run_id"].as_str().unwrap().to_string();

    let (status, listing) = send(
        &state,
        "GET",
        "/api/runs?date=2026-08-21&display_id=D-001",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["count"], 1);
    assert_eq!(listing["runs"][0]["run_id"], run_id.as_str());
    assert_eq!(listing["runs"][0]["display_id"], "D-001");

    let (status, by_index) = send(
        &state,
        "GET",
        "/api/runs/by-index?date=2026-08-21&display_id=D-001&index=0",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_index["run_id"], run_id.as_str());
}

#[tokio::test]
async fn test_analyze_can_skip_persistence() {
    let state = test_state().await;

    let mut request = demo_analyze_request("D-002", json!(["Water bottles"]));
    request["persist"] = json!(false);
    let (status, body) = send(&state, "POST", "/api/analyze", Some(request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["persisted"], false);

    let (_, listing) = send(&state, "GET", "/api/runs?display_id=D-002", None).await;
    assert_eq!(listing["count"], 0);
}

#[tokio::test]
async fn test_analyze_uses_catalog_as_default_ground_truth() {
    let state = test_state().await;
    let (_, _) = send(
        &state,
        "PUT",
        "/api/catalog",
        Some(json!({ "items": ["Coca-Cola bottles", "Chips/Crisps"] })),
    )
    .await;

    let request = json!({
        "image_base64": BASE64.encode(PNG_BYTES),
        "date": "2026-08-21",
        "display_id": "D-003",
        "demo_mode": true,
    });
    let (status, body) = send(&state, "POST", "/api/analyze", Some(request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["comparison"]["matched"],
        json!(["Coca-Cola bottles", "Chips/Crisps"])
    );
    assert_eq!(body["comparison"]["extra"], json!(["Water bottles"]));
    assert_eq!(body["comparison"]["accuracy"].as_f64().unwrap(), 1.0);
}

#[tokio::test]
async fn test_analyze_rejects_bad_input() {
    let state = test_state().await;

    let mut bad_base64 = demo_analyze_request("D-001", json!(["Cola"]));
    bad_base64["image_base64"] = json!("not base64!!!");
    let (status, body) = send(&state, "POST", "/api/analyze", Some(bad_base64)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("base64"));

    let mut not_an_image = demo_analyze_request("D-001", json!(["Cola"]));
    not_an_image["image_base64"] = json!(BASE64.encode(b"plain text, not an image"));
    not_an_image["filename"] = json!("shelf.jpg");
    let (status, _) = send(&state, "POST", "/api/analyze", Some(not_an_image)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut bad_extension = demo_analyze_request("D-001", json!(["Cola"]));
    bad_extension["filename"] = json!("shelf.gif");
    let (status, body) = send(&state, "POST", "/api/analyze", Some(bad_extension)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("extension"));

    let blank_display = demo_analyze_request("   ", json!(["Cola"]));
    let (status, _) = send(&state, "POST", "/api/analyze", Some(blank_display)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_runs_by_index_missing_returns_not_found() {
    let state = test_state().await;
    let (status, body) = send(
        &state,
        "GET",
        "/api/runs/by-index?date=2026-08-21&display_id=D-404&index=0",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_runs_listing_is_newest_first() {
    let state = test_state().await;
    for display in ["D-A", "D-B"] {
        let request = demo_analyze_request(display, json!(["Water bottles"]));
        let (status, _) = send(&state, "POST", "/api/analyze", Some(request)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, listing) = send(&state, "GET", "/api/runs", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["count"], 2);
    assert_eq!(listing["runs"][0]["display_id"], "D-B");
    assert_eq!(listing["runs"][1]["display_id"], "D-A");

    let (_, limited) = send(&state, "GET", "/api/runs?limit=1", None).await;
    assert_eq!(limited["count"], 1);
}

#[tokio::test]
async fn test_catalog_crud_flow() {
    let state = test_state().await;

    let (status, body) = send(&state, "GET", "/api/catalog", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_items"], 0);

    let (status, body) = send(
        &state,
        "PUT",
        "/api/catalog",
        Some(json!({ "items": ["Cola", {"name": "Water bottles", "shelf_no": 2}, "cola"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_items"], 2);
    assert_eq!(body["duplicates"], 1);

    let (status, body) = send(
        &state,
        "POST",
        "/api/catalog/items",
        Some(json!({"name": "Juice boxes", "code": "J-01"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["index"], 2);
    assert_eq!(body["total_items"], 3);

    let (status, body) = send(
        &state,
        "POST",
        "/api/catalog/items",
        Some(json!({"name": "  COLA "})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, _) = send(
        &state,
        "PUT",
        "/api/catalog/items/0",
        Some(json!({"name": "Cola Zero"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&state, "DELETE", "/api/catalog/items/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"]["name"], "Water bottles");
    assert_eq!(body["total_items"], 2);

    let (status, _) = send(&state, "DELETE", "/api/catalog/items/99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&state, "GET", "/api/catalog?q=cola", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["name"], "Cola Zero");
    assert_eq!(body["items"][0]["index"], 0);
    assert_eq!(body["total_items"], 2);
}

#[tokio::test]
async fn test_catalog_bulk_sort_and_reset() {
    let state = test_state().await;

    let (status, body) = send(
        &state,
        "POST",
        "/api/catalog/bulk",
        Some(json!({"text": "banana chips\nApple juice\n\nbanana CHIPS\ncola"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["added"], 3);
    assert_eq!(body["duplicates"], 1);

    let (status, _) = send(&state, "POST", "/api/catalog/sort", None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&state, "GET", "/api/catalog", None).await;
    assert_eq!(body["items"][0]["name"], "Apple juice");
    assert_eq!(body["items"][1]["name"], "banana chips");
    assert_eq!(body["items"][2]["name"], "cola");

    let (status, body) = send(&state, "POST", "/api/catalog/reset", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["total_items"].as_u64().unwrap() as usize,
        osa_ia::models::DEFAULT_SKU_ITEMS.len()
    );
}

#[tokio::test]
async fn test_catalog_import_and_export() {
    let state = test_state().await;
    let (_, _) = send(
        &state,
        "PUT",
        "/api/catalog",
        Some(json!({ "items": ["Cola"] })),
    )
    .await;

    let (status, body) = send(
        &state,
        "POST",
        "/api/catalog/import",
        Some(json!({
            "mode": "merge",
            "sku_items": ["cola", "Water bottles", {"name": "Juice boxes"}],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["added"], 2);
    assert_eq!(body["duplicates"], 1);
    assert_eq!(body["total_items"], 3);

    let (status, body) = send(
        &state,
        "POST",
        "/api/catalog/import",
        Some(json!({ "sku_items": ["Only this"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // Default mode is replace
    assert_eq!(body["total_items"], 1);

    let (status, export) = send(&state, "GET", "/api/catalog/export", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(export["total_items"], 1);
    assert_eq!(export["sku_items"][0]["name"], "Only this");
    assert!(export["export_timestamp"].is_string());
}
