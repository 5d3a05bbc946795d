//! Comparison result types
//!
//! The wire contract for accuracy scoring: three disjoint name buckets plus
//! the accuracy ratio. Produced by `services::accuracy`, serialized back to
//! the UI, and stored verbatim inside run records.

use serde::{Deserialize, Serialize};

/// Result of reconciling predicted SKU names against ground truth
///
/// Wire shape: `{ matched: [string], missed: [string], extra: [string], accuracy: number }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Ground-truth SKUs also present in the predictions (true positives)
    pub matched: Vec<String>,

    /// Ground-truth SKUs absent from the predictions (false negatives)
    pub missed: Vec<String>,

    /// Predicted SKUs absent from ground truth (false positives)
    pub extra: Vec<String>,

    /// |matched| / |ground truth|; 0.0 when ground truth is empty
    pub accuracy: f64,
}

/// A missed/extra pair that nearly matched
///
/// Diagnostic only: similarity is Jaro-Winkler over normalized names.
/// Near misses never move an entry between buckets or change accuracy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearMiss {
    /// Ground-truth spelling of the missed SKU
    pub missed: String,

    /// Prediction spelling of the extra SKU
    pub extra: String,

    /// Jaro-Winkler similarity of the normalized names (0.0-1.0)
    pub similarity: f32,
}
