//! Rate-limited paginated sampling and distribution binning for ranked-entity
//! catalog APIs.
//!
//! The crate reconstructs an engagement-metric distribution from a remote
//! catalog and compares it against an externally supplied prediction table:
//!
//! 1. [`CatalogClient`] issues counted filter queries and paginated sorted
//!    fetches through a [`transport::RateLimitedTransport`] that paces
//!    requests and absorbs throttling with bounded exponential backoff.
//! 2. [`merge_pages`] collapses overlapping pages into one ordered,
//!    identity-deduplicated collection.
//! 3. [`exact_histogram`] / [`sampled_histogram`] reduce observations into
//!    counts over a validated bucket partition.
//! 4. [`compare`] reports per-bucket and aggregate discrepancy ratios
//!    against the predicted counts.
//!
//! # Module structure
//!
//! - [`filter`] — predicate trees in the service's nested-array form
//! - [`wire`] — query/response wire types
//! - [`transport`] — pacing, backoff, cancellation, HTTP seam
//! - [`client`] — count / stats / fetch entry points
//! - [`query`] — the lazy page stream and page merging
//! - [`analysis`] — histograms, sample summaries, model comparison
//! - [`error`] — the full error taxonomy
//!
//! # Example
//!
//! ```no_run
//! use catalog_census::{CatalogClient, ClientConfig, BucketSpec, exact_histogram};
//!
//! let client = CatalogClient::http("https://api.example.org/kana", ClientConfig::new("vn"))?;
//! let buckets = vec![
//!     BucketSpec::new(0.0, Some(10.0), "0-10"),
//!     BucketSpec::new(10.0, Some(100.0), "10-100"),
//!     BucketSpec::new(100.0, None, "100+"),
//! ];
//! let histogram = exact_histogram(&client, "votecount", &buckets, None)?;
//! for bucket in &histogram.buckets {
//!     println!("{:>8}: {}", bucket.label, bucket.count);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod analysis;
pub mod client;
pub mod error;
pub mod filter;
pub mod query;
pub mod transport;
pub mod wire;

#[cfg(test)]
pub(crate) mod testing;

// Re-export the most commonly used items at the crate root.
pub use analysis::compare::{BucketComparison, ComparisonResult, compare};
pub use analysis::histogram::{
    BucketCount, BucketSpec, Histogram, Provenance, exact_histogram, sampled_histogram,
    validate_partition,
};
pub use analysis::summary::{SampleSummary, summarize};
pub use client::{CatalogClient, ClientConfig, ServiceLimits};
pub use error::{
    ConfigError, ConsistencyError, FetchError, HistogramError, QueryError, ServiceError,
    TransportError,
};
pub use filter::{Filter, Op};
pub use query::fetch::{FetchOutcome, FetchRequest, PageStream, SortKey, SortValue};
pub use query::merge::merge_pages;
pub use transport::{
    CancelToken, ClockDelay, Delay, HttpWire, RateLimitConfig, RateLimitedTransport, Wire,
    WireReply,
};
pub use wire::{CatalogItem, Page, QueryBody, QueryResponse};
