//! Detection response parser
//!
//! Turns raw Gemini reply text into a `DetectionReport`. Model replies
//! arrive in two shapes: the full report object with `detected_items`, or
//! the lean `{"sku_names": [...]}` list the detection prompt asks for.
//! Either may be wrapped in a Markdown code fence. Replies that parse as
//! neither become a fallback report carrying the raw text and an error
//! description, so a bad model reply never aborts the analysis pipeline.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::models::{DetectedItem, DetectionReport};

/// Lenient view of a model reply; unknown fields are ignored
#[derive(Debug, Deserialize)]
struct RawDetection {
    #[serde(default)]
    detected_items: Option<Vec<DetectedItem>>,

    #[serde(default)]
    sku_names: Option<Vec<String>>,

    #[serde(default)]
    analysis_timestamp: Option<String>,
}

/// Strip a surrounding Markdown code fence, if any
///
/// Handles ```` ```json ... ``` ````, plain ```` ``` ... ``` ````, and an
/// opening fence with no closing one. Text without fences is returned
/// trimmed.
pub fn extract_json_block(text: &str) -> &str {
    for fence in ["```json", "```"] {
        if let Some(start) = text.find(fence) {
            let body_start = start + fence.len();
            let body = &text[body_start..];
            return match body.rfind("```") {
                Some(end) => body[..end].trim(),
                None => body.trim(),
            };
        }
    }
    text.trim()
}

/// Parse model reply text into a detection report
///
/// `total_items_detected` is recomputed from the item list; a total the
/// model claims is discarded. Bare `sku_names` entries become items with
/// quantity 1 and no location. This function does not fail: anything
/// unparseable yields `DetectionReport::parse_failure`.
pub fn parse_detection(text: &str) -> DetectionReport {
    let cleaned = extract_json_block(text);
    let raw: RawDetection = match serde_json::from_str(cleaned) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(error = %err, "Failed to parse detection response as JSON");
            return DetectionReport::parse_failure(
                text.to_string(),
                "Failed to parse JSON response",
            );
        }
    };

    let timestamp = parse_timestamp(raw.analysis_timestamp.as_deref());

    if let Some(items) = raw.detected_items {
        return DetectionReport::from_items(items, timestamp);
    }

    if let Some(names) = raw.sku_names {
        let items = names.into_iter().map(DetectedItem::named).collect();
        return DetectionReport::from_items(items, timestamp);
    }

    tracing::warn!("Detection response contained neither detected_items nor sku_names");
    DetectionReport::parse_failure(
        text.to_string(),
        "Response contained no detected_items or sku_names",
    )
}

/// Timestamp from the reply when present and parseable, otherwise now
///
/// Accepts RFC 3339 and timezone-less ISO 8601 (treated as UTC).
fn parse_timestamp(value: Option<&str>) -> DateTime<Utc> {
    if let Some(raw) = value {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return ts.with_timezone(&Utc);
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return naive.and_utc();
        }
    }
    Utc::now()
}
