//! Detection report types
//!
//! The payload contract for a single image analysis: a list of detected
//! items with quantities and shelf locations, a recomputed total, and the
//! analysis timestamp. Reports that could not be parsed from the model
//! reply carry the raw text and an error description instead of items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Detection confidence reported by the vision model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

/// A single product detected in a shelf image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedItem {
    /// Product name as reported by the model
    pub item_name: String,

    /// Facing count; 0 when the model omitted it
    #[serde(default)]
    pub quantity: u32,

    /// Free-text shelf location ("Top shelf, left section")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl DetectedItem {
    /// Item with only a name, as synthesized from a bare name-list reply
    pub fn named(item_name: impl Into<String>) -> Self {
        Self {
            item_name: item_name.into(),
            quantity: 1,
            location: None,
            confidence: None,
            notes: None,
        }
    }
}

/// Full detection report for one analyzed image
///
/// `total_items_detected` is always recomputed from `detected_items`;
/// a total claimed by the model is never trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    pub detected_items: Vec<DetectedItem>,

    pub total_items_detected: usize,

    pub analysis_timestamp: DateTime<Utc>,

    /// Original model text, retained only when parsing failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,

    /// Parse failure description, absent on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DetectionReport {
    /// Report built from a parsed item list
    pub fn from_items(detected_items: Vec<DetectedItem>, analysis_timestamp: DateTime<Utc>) -> Self {
        let total_items_detected = detected_items.len();
        Self {
            detected_items,
            total_items_detected,
            analysis_timestamp,
            raw_response: None,
            error: None,
        }
    }

    /// Fallback report for an unparseable model reply
    pub fn parse_failure(raw_response: String, error: impl Into<String>) -> Self {
        Self {
            detected_items: Vec::new(),
            total_items_detected: 0,
            analysis_timestamp: Utc::now(),
            raw_response: Some(raw_response),
            error: Some(error.into()),
        }
    }

    /// Names of all detected items, in report order
    pub fn predicted_names(&self) -> Vec<String> {
        self.detected_items
            .iter()
            .map(|item| item.item_name.clone())
            .collect()
    }

    /// Canned report used by demo mode when no API key is configured
    pub fn sample() -> Self {
        Self::from_items(
            vec![
                DetectedItem {
                    item_name: "Coca-Cola bottles".to_string(),
                    quantity: 12,
                    location: Some("Top shelf, left section".to_string()),
                    confidence: Some(Confidence::High),
                    notes: Some("Classic red Coca-Cola bottles, clearly visible".to_string()),
                },
                DetectedItem {
                    item_name: "Water bottles".to_string(),
                    quantity: 8,
                    location: Some("Middle shelf, center".to_string()),
                    confidence: Some(Confidence::High),
                    notes: Some("Clear plastic water bottles".to_string()),
                },
                DetectedItem {
                    item_name: "Chips/Crisps".to_string(),
                    quantity: 6,
                    location: Some("Bottom shelf, right section".to_string()),
                    confidence: Some(Confidence::Medium),
                    notes: Some("Various chip bags, partially visible".to_string()),
                },
            ],
            Utc::now(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Confidence::High).unwrap(),
            "\"high\""
        );
        assert_eq!(
            serde_json::from_str::<Confidence>("\"medium\"").unwrap(),
            Confidence::Medium
        );
    }

    #[test]
    fn test_from_items_recomputes_total() {
        let report = DetectionReport::from_items(
            vec![DetectedItem::named("Cola"), DetectedItem::named("Water")],
            Utc::now(),
        );
        assert_eq!(report.total_items_detected, 2);
        assert!(report.error.is_none());
        assert!(report.raw_response.is_none());
    }

    #[test]
    fn test_parse_failure_preserves_raw_text() {
        let report = DetectionReport::parse_failure(
            "not json at all".to_string(),
            "Failed to parse JSON response",
        );
        assert!(report.detected_items.is_empty());
        assert_eq!(report.total_items_detected, 0);
        assert_eq!(report.raw_response.as_deref(), Some("not json at all"));
        assert!(report.error.is_some());
    }

    #[test]
    fn test_item_deserializes_with_missing_optional_fields() {
        let item: DetectedItem =
            serde_json::from_str(r#"{"item_name": "Cola"}"#).unwrap();
        assert_eq!(item.item_name, "Cola");
        assert_eq!(item.quantity, 0);
        assert!(item.location.is_none());
        assert!(item.confidence.is_none());
    }

    #[test]
    fn test_sample_report_shape() {
        let report = DetectionReport::sample();
        assert_eq!(report.total_items_detected, 3);
        assert_eq!(report.predicted_names()[0], "Coca-Cola bottles");
        assert!(report.error.is_none());
    }
}
