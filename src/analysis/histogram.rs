//! Histogram construction over a numeric catalog attribute.
//!
//! Two strategies:
//! - **Exact** ([`exact_histogram`]): one range-filtered count query per
//!   bucket, pushed to the service. No sampling bias; costs one request per
//!   bucket.
//! - **Sampled** ([`sampled_histogram`]): fetch the top N items sorted
//!   descending by the target attribute and bucket them locally. Reflects
//!   only the top of the distribution — buckets whose members fall beyond
//!   the sample are undercounted. The result carries
//!   [`Provenance::Sampled`] so it can never pass for an exact count.
//!
//! Both strategies verify the bucket partition (contiguous, non-overlapping,
//! ascending) before any request is sent.

use serde::Serialize;
use tracing::debug;

use crate::client::CatalogClient;
use crate::error::{ConfigError, HistogramError};
use crate::filter::Filter;
use crate::query::fetch::{FetchRequest, SortKey, SortValue};
use crate::transport::{Delay, Wire};

/// Half-open bucket `[lower, upper)`; `upper: None` means unbounded above
/// and is legal only on the final bucket of a partition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketSpec {
    pub lower: f64,
    pub upper: Option<f64>,
    pub label: String,
}

impl BucketSpec {
    pub fn new(lower: f64, upper: Option<f64>, label: impl Into<String>) -> Self {
        Self {
            lower,
            upper,
            label: label.into(),
        }
    }

    fn contains(&self, value: f64) -> bool {
        value >= self.lower && self.upper.is_none_or(|upper| value < upper)
    }
}

/// One counted bucket of the resulting histogram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketCount {
    pub lower: f64,
    pub upper: Option<f64>,
    pub label: String,
    pub count: u64,
}

/// How a histogram's counts were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    /// Service-side counts; exact at observation time.
    Exact,
    /// Locally bucketed from the top `sample_size` items; undercounts
    /// buckets whose members fall beyond the sample.
    Sampled { sample_size: usize },
}

/// A binned distribution over one attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub attr: String,
    pub buckets: Vec<BucketCount>,
    pub provenance: Provenance,
}

impl Histogram {
    pub fn is_sampled(&self) -> bool {
        matches!(self.provenance, Provenance::Sampled { .. })
    }

    pub fn total(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).sum()
    }
}

/// Verify that `buckets` form an ascending, contiguous, non-overlapping
/// partition. Checked before any request is issued.
pub fn validate_partition(buckets: &[BucketSpec]) -> Result<(), ConfigError> {
    if buckets.is_empty() {
        return Err(ConfigError::EmptyPartition);
    }
    for (i, bucket) in buckets.iter().enumerate() {
        if !bucket.lower.is_finite() || bucket.upper.is_some_and(|u| !u.is_finite()) {
            return Err(ConfigError::InvalidBucket {
                label: bucket.label.clone(),
            });
        }
        if let Some(upper) = bucket.upper
            && upper <= bucket.lower
        {
            return Err(ConfigError::InvalidBucket {
                label: bucket.label.clone(),
            });
        }
        if bucket.upper.is_none() && i + 1 != buckets.len() {
            return Err(ConfigError::UnboundedBucketNotLast {
                label: bucket.label.clone(),
            });
        }
    }
    for pair in buckets.windows(2) {
        let (left, right) = (&pair[0], &pair[1]);
        // Unbounded uppers were rejected above for every non-final bucket.
        let Some(upper) = left.upper else { continue };
        if upper < right.lower {
            return Err(ConfigError::GapInBuckets {
                left: left.label.clone(),
                right: right.label.clone(),
            });
        }
        if upper > right.lower {
            return Err(ConfigError::OverlappingBuckets {
                left: left.label.clone(),
                right: right.label.clone(),
            });
        }
    }
    Ok(())
}

/// Render a finite bound as a wire literal, preferring integers so the
/// service sees `10` rather than `10.0` for integral attributes.
fn bound_value(value: f64) -> serde_json::Value {
    if value.fract() == 0.0 && value.abs() <= i64::MAX as f64 {
        serde_json::Value::from(value as i64)
    } else {
        serde_json::Number::from_f64(value)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

fn bucket_filter(attr: &str, bucket: &BucketSpec, base: Option<&Filter>) -> Filter {
    let range = Filter::range(attr, bound_value(bucket.lower), bucket.upper.map(bound_value));
    match base {
        Some(base) => Filter::and(vec![base.clone(), range]),
        None => range,
    }
}

/// Range restriction covering the whole partition, for the sample fetch.
fn partition_filter(attr: &str, buckets: &[BucketSpec], base: Option<&Filter>) -> Filter {
    let lower = bound_value(buckets[0].lower);
    let upper = buckets[buckets.len() - 1].upper.map(bound_value);
    let range = Filter::range(attr, lower, upper);
    match base {
        Some(base) => Filter::and(vec![base.clone(), range]),
        None => range,
    }
}

/// Exact strategy: one service-side count per bucket.
///
/// `base` further restricts every bucket query (e.g. an origin-language
/// filter); bucket ranges are ANDed onto it.
pub fn exact_histogram<W: Wire, D: Delay>(
    client: &CatalogClient<W, D>,
    attr: &str,
    buckets: &[BucketSpec],
    base: Option<&Filter>,
) -> Result<Histogram, HistogramError> {
    validate_partition(buckets)?;
    let mut counted = Vec::with_capacity(buckets.len());
    for bucket in buckets {
        let filter = bucket_filter(attr, bucket, base);
        let count = client.count(&filter).map_err(|cause| HistogramError::BucketQuery {
            label: bucket.label.clone(),
            cause,
        })?;
        debug!(bucket = %bucket.label, count, "exact bucket count");
        counted.push(BucketCount {
            lower: bucket.lower,
            upper: bucket.upper,
            label: bucket.label.clone(),
            count,
        });
    }
    Ok(Histogram {
        attr: attr.to_string(),
        buckets: counted,
        provenance: Provenance::Exact,
    })
}

/// Sampled strategy: fetch up to `sample_size` items sorted descending by
/// `sort` and bucket them locally.
///
/// Only the top of the distribution is observed; buckets whose members rank
/// beyond the sample are undercounted, which is why the result is flagged
/// [`Provenance::Sampled`] with the number of items actually used.
pub fn sampled_histogram<W: Wire, D: Delay>(
    client: &CatalogClient<W, D>,
    sort: SortKey,
    buckets: &[BucketSpec],
    base: Option<&Filter>,
    sample_size: u32,
    page_size: u32,
) -> Result<Histogram, HistogramError> {
    validate_partition(buckets)?;

    let attr = sort.wire_name();
    let mut request = FetchRequest::new(partition_filter(attr, buckets, base), sort);
    request.page_size = page_size.max(1);
    request.max_pages = sample_size.div_ceil(request.page_size);

    let outcome = client.fetch_all(request)?;
    let mut items = outcome.items();
    items.truncate(sample_size as usize);

    let mut counts = vec![0u64; buckets.len()];
    for item in &items {
        let Some(SortValue::Num(value)) = sort.value_of(item) else {
            continue;
        };
        if let Some(slot) = buckets.iter().position(|b| b.contains(value)) {
            counts[slot] += 1;
        }
    }
    debug!(
        sample_size = items.len(),
        complete = outcome.complete,
        "sampled histogram bucketed locally"
    );
    Ok(Histogram {
        attr: attr.to_string(),
        buckets: buckets
            .iter()
            .zip(counts)
            .map(|(bucket, count)| BucketCount {
                lower: bucket.lower,
                upper: bucket.upper,
                label: bucket.label.clone(),
                count,
            })
            .collect(),
        provenance: Provenance::Sampled {
            sample_size: items.len(),
        },
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
