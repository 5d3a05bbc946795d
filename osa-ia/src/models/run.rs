//! Analysis run record
//!
//! One append-only history entry per analyzed image, keyed by store visit
//! date plus display identifier. Rows are immutable once written.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::comparison::ComparisonResult;
use super::detection::DetectionReport;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRun {
    pub run_id: Uuid,

    /// Store visit date (YYYY-MM-DD)
    pub date: NaiveDate,

    /// Shelf display identifier within the store
    pub display_id: String,

    /// Ground truth the run was scored against, original spellings
    pub ground_truth_skus: Vec<String>,

    /// Names the model reported, original spellings
    pub predicted_skus: Vec<String>,

    /// Copy of `comparison.accuracy`, denormalized for filtering
    pub accuracy: f64,

    pub comparison: ComparisonResult,

    pub detection: DetectionReport,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl AnalysisRun {
    pub fn new(
        date: NaiveDate,
        display_id: String,
        ground_truth_skus: Vec<String>,
        predicted_skus: Vec<String>,
        comparison: ComparisonResult,
        detection: DetectionReport,
        image_url: Option<String>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            date,
            display_id,
            ground_truth_skus,
            predicted_skus,
            accuracy: comparison.accuracy,
            comparison,
            detection,
            image_url,
            created_at: Utc::now(),
        }
    }
}
