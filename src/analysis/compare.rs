//! Observed-vs-predicted comparison for a binned distribution.
//!
//! The prediction is an externally supplied label → count table; this module
//! never derives predictions itself. Labels must match the observed buckets
//! exactly in both directions — a missing counterpart is a sync bug in the
//! caller's configuration, not a zero.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::analysis::histogram::Histogram;
use crate::error::ConfigError;

/// Discrepancy for one bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketComparison {
    pub label: String,
    pub observed: u64,
    pub predicted: u64,
    /// predicted / observed; `+∞` when observed is 0 and predicted is not,
    /// `1.0` when both are 0.
    pub ratio: f64,
}

/// Per-bucket discrepancies plus the aggregate view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub buckets: Vec<BucketComparison>,
    pub total_observed: u64,
    pub total_predicted: u64,
    pub overall_ratio: f64,
}

fn ratio(predicted: u64, observed: u64) -> f64 {
    match (observed, predicted) {
        (0, 0) => 1.0,
        (0, _) => f64::INFINITY,
        _ => predicted as f64 / observed as f64,
    }
}

/// Join observed buckets with the predicted table by label and compute
/// per-bucket and aggregate discrepancy ratios.
///
/// Fails with [`ConfigError::UnknownBucket`] when a predicted label has no
/// observed bucket or an observed bucket has no prediction.
pub fn compare(
    observed: &Histogram,
    predicted: &BTreeMap<String, u64>,
) -> Result<ComparisonResult, ConfigError> {
    for label in predicted.keys() {
        if !observed.buckets.iter().any(|b| &b.label == label) {
            return Err(ConfigError::UnknownBucket {
                label: label.clone(),
                missing_in: "observed",
            });
        }
    }

    let mut buckets = Vec::with_capacity(observed.buckets.len());
    let mut total_observed = 0u64;
    let mut total_predicted = 0u64;
    for bucket in &observed.buckets {
        let Some(&expected) = predicted.get(&bucket.label) else {
            return Err(ConfigError::UnknownBucket {
                label: bucket.label.clone(),
                missing_in: "predicted",
            });
        };
        buckets.push(BucketComparison {
            label: bucket.label.clone(),
            observed: bucket.count,
            predicted: expected,
            ratio: ratio(expected, bucket.count),
        });
        total_observed += bucket.count;
        total_predicted += expected;
    }

    Ok(ComparisonResult {
        buckets,
        total_observed,
        total_predicted,
        overall_ratio: ratio(total_predicted, total_observed),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
