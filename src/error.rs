//! Error taxonomy for catalog queries and distribution analysis.
//!
//! Each family maps to one layer of the system:
//! - [`TransportError`] — network / HTTP-level failures, including rate-limit
//!   exhaustion after bounded backoff.
//! - [`ServiceError`] — the response arrived but violates the wire contract.
//! - [`ConsistencyError`] — a pagination invariant was broken mid-scan,
//!   signaling that the catalog mutated under us.
//! - [`ConfigError`] — the caller supplied an invalid bucket set, label
//!   mapping, or page budget. Rejected before any request is issued.
//! - [`FetchError`] — a multi-page fetch was truncated; carries every page
//!   collected before the failure so prior work is never lost silently.

use thiserror::Error;

use crate::query::fetch::SortKey;
use crate::wire::Page;

/// Network and HTTP-level failures from a single request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The service refused the connection.
    #[error("connection refused")]
    ConnectionRefused,

    /// Non-2xx status other than the throttling status.
    #[error("service returned HTTP {0}")]
    HttpStatus(u16),

    /// Any other I/O-level failure (DNS, TLS, truncated body, ...).
    #[error("network error: {0}")]
    Network(String),

    /// Throttled on every attempt up to the configured ceiling.
    #[error("rate limit retries exhausted")]
    RateLimitExceeded,

    /// The caller cancelled while a send or backoff wait was in progress.
    #[error("request cancelled")]
    Cancelled,
}

/// The response arrived but its shape violates the expected contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// A pagination invariant was violated between consecutive pages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyError {
    /// Boundary items of two consecutive pages disagree with the declared
    /// sort order. The catalog mutated mid-scan in a way the sort guarantee
    /// cannot absorb, so the scan is unusable.
    #[error("sort order on '{key}' violated at page {page}")]
    SortViolation { page: u32, key: SortKey },
}

/// Caller-supplied configuration is invalid.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("buckets '{left}' and '{right}' overlap")]
    OverlappingBuckets { left: String, right: String },

    #[error("gap between buckets '{left}' and '{right}'")]
    GapInBuckets { left: String, right: String },

    #[error("unbounded bucket '{label}' must be last in the partition")]
    UnboundedBucketNotLast { label: String },

    #[error("bucket '{label}' has an empty or non-finite range")]
    InvalidBucket { label: String },

    #[error("bucket partition is empty")]
    EmptyPartition,

    #[error("page size {page_size} outside service bounds (1..={max_page_size})")]
    PageSizeOutOfRange { page_size: u32, max_page_size: u32 },

    /// The page budget would reach past the deepest offset the service
    /// supports. Reported up front instead of silently truncating the scan.
    #[error("page budget reaches offset {reach} but the service caps pagination at {max_offset}")]
    PaginationDepthExceeded { reach: u64, max_offset: u64 },

    /// Observed and predicted bucket labels are out of sync.
    #[error("bucket label '{label}' has no counterpart in the {missing_in} set")]
    UnknownBucket {
        label: String,
        missing_in: &'static str,
    },
}

/// Failure of a single count query or page fetch, from any layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
}

/// Failure of a multi-page fetch.
///
/// `PartialResult` carries everything collected before the failure, so a
/// truncated scan can never be mistaken for a complete one and prior pages
/// are never dropped on the floor.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The request was rejected before any page was requested.
    #[error("invalid fetch request: {0}")]
    Rejected(#[from] ConfigError),

    #[error("fetch truncated after {} completed page(s): {cause}", .pages.len())]
    PartialResult { pages: Vec<Page>, cause: QueryError },
}

/// Failure while building a histogram.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistogramError {
    /// The bucket partition itself is invalid; nothing was sent.
    #[error("invalid bucket partition: {0}")]
    Config(#[from] ConfigError),

    /// One bucket's count query failed; names the bucket so the caller knows
    /// exactly which range is missing.
    #[error("count query for bucket '{label}' failed: {cause}")]
    BucketQuery { label: String, cause: QueryError },

    /// The sample fetch behind a sampled histogram failed.
    #[error("sample fetch failed: {0}")]
    Sample(#[from] FetchError),
}
