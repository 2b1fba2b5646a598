//! Descriptive statistics over a fetched metric sample.

use serde::Serialize;

/// Summary of one observed numeric sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleSummary {
    pub n: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

/// Summarize a sample. Returns `None` for an empty input rather than
/// fabricating zeros.
pub fn summarize(values: &[f64]) -> Option<SampleSummary> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let median = if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    };
    Some(SampleSummary {
        n,
        min: sorted[0],
        max: sorted[n - 1],
        mean: sorted.iter().sum::<f64>() / n as f64,
        median,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
