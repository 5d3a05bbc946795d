//! Accuracy comparison service
//!
//! Scores one detection run against ground truth. Both sides are SKU name
//! lists; matching is exact over normalized names, so case, surrounding
//! whitespace, and internal whitespace runs never affect the outcome.
//!
//! The comparator partitions the two lists into three buckets:
//! - **matched**: ground-truth names found in the predictions
//! - **missed**: ground-truth names absent from the predictions
//! - **extra**: predicted names absent from ground truth
//!
//! Accuracy is `|matched| / |ground truth|` over deduplicated names, with
//! an empty ground truth scoring 0.0. Fuzzy similarity is used only to
//! surface near misses for diagnostics; it never moves a name between
//! buckets.

use std::collections::HashSet;

use thiserror::Error;

use crate::models::{ComparisonResult, NearMiss};

/// Minimum Jaro-Winkler similarity for a missed/extra pair to be reported
/// as a near miss
pub const NEAR_MISS_THRESHOLD: f32 = 0.85;

#[derive(Debug, Error, PartialEq)]
pub enum ComparisonError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Canonical matching key for a SKU name
///
/// Lowercases, trims, and collapses internal whitespace runs to a single
/// space. Two names compare equal exactly when their normalized forms are
/// byte-equal.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Jaro-Winkler similarity over normalized names (0.0 = unrelated,
/// 1.0 = identical)
pub fn fuzzy_similarity(a: &str, b: &str) -> f32 {
    strsim::jaro_winkler(&normalize_name(a), &normalize_name(b)) as f32
}

/// Compares predicted SKU names against ground truth
pub struct AccuracyComparator {
    /// Similarity floor for near-miss reporting
    near_miss_threshold: f32,
}

impl AccuracyComparator {
    pub fn new() -> Self {
        Self {
            near_miss_threshold: NEAR_MISS_THRESHOLD,
        }
    }

    /// Score `predicted` against `ground_truth`
    ///
    /// **Algorithm:**
    /// 1. Normalize both lists and deduplicate each, keeping first
    ///    occurrence order and the first-seen original spelling
    /// 2. Bucket every ground-truth name as matched or missed by key
    ///    membership in the prediction set
    /// 3. Bucket every predicted name absent from the ground-truth set
    ///    as extra
    /// 4. Accuracy = matched / deduplicated ground truth, 0.0 when ground
    ///    truth is empty
    ///
    /// Matched and missed carry ground-truth spellings; extra carries
    /// prediction spellings. Output order follows input order.
    ///
    /// # Errors
    ///
    /// Returns `ComparisonError::InvalidInput` if either list contains a
    /// name that is empty after normalization.
    pub fn compare(
        &self,
        ground_truth: &[String],
        predicted: &[String],
    ) -> Result<ComparisonResult, ComparisonError> {
        let gt = dedup_normalized(ground_truth, "ground truth")?;
        let pred = dedup_normalized(predicted, "prediction")?;

        let gt_keys: HashSet<&str> = gt.iter().map(|(key, _)| key.as_str()).collect();
        let pred_keys: HashSet<&str> = pred.iter().map(|(key, _)| key.as_str()).collect();

        let mut matched = Vec::new();
        let mut missed = Vec::new();
        for (key, original) in &gt {
            if pred_keys.contains(key.as_str()) {
                matched.push(original.clone());
            } else {
                missed.push(original.clone());
            }
        }

        let extra: Vec<String> = pred
            .iter()
            .filter(|(key, _)| !gt_keys.contains(key.as_str()))
            .map(|(_, original)| original.clone())
            .collect();

        let accuracy = if gt.is_empty() {
            0.0
        } else {
            matched.len() as f64 / gt.len() as f64
        };

        Ok(ComparisonResult {
            matched,
            missed,
            extra,
            accuracy,
        })
    }

    /// Missed/extra pairs whose normalized names are nearly identical
    ///
    /// Typically spelling drift between the catalog and the model's output
    /// ("Coca Cola bottle" vs "Coca-Cola bottles"). Sorted most similar
    /// first. Purely diagnostic: the comparison result is not modified.
    pub fn near_misses(&self, result: &ComparisonResult) -> Vec<NearMiss> {
        let mut pairs = Vec::new();
        for missed in &result.missed {
            for extra in &result.extra {
                let similarity = fuzzy_similarity(missed, extra);
                if similarity >= self.near_miss_threshold {
                    pairs.push(NearMiss {
                        missed: missed.clone(),
                        extra: extra.clone(),
                        similarity,
                    });
                }
            }
        }
        pairs.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.missed.cmp(&b.missed))
                .then_with(|| a.extra.cmp(&b.extra))
        });
        pairs
    }
}

impl Default for AccuracyComparator {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize and deduplicate a name list, preserving first-occurrence order
/// and first-seen spellings
fn dedup_normalized(
    names: &[String],
    side: &str,
) -> Result<Vec<(String, String)>, ComparisonError> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for (position, raw) in names.iter().enumerate() {
        let key = normalize_name(raw);
        if key.is_empty() {
            return Err(ComparisonError::InvalidInput(format!(
                "blank SKU name at {side} position {position}"
            )));
        }
        if seen.insert(key.clone()) {
            entries.push((key, raw.clone()));
        }
    }
    Ok(entries)
}
