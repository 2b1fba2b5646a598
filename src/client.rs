//! Catalog client: count queries, stats, and paginated fetch entry points.
//!
//! [`CatalogClient`] owns the rate-limited transport and a cancellation
//! handle. All requests issued through one client are sequenced behind the
//! transport's shared pacing state, which is how the service's global rate
//! limit is respected.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{ConfigError, FetchError, QueryError, ServiceError, TransportError};
use crate::filter::Filter;
use crate::query::fetch::{FetchOutcome, FetchRequest, PageStream};
use crate::transport::{
    CancelToken, ClockDelay, Delay, HttpWire, RateLimitConfig, RateLimitedTransport, Wire,
};
use crate::wire::{QueryBody, QueryResponse};

/// Hard limits the catalog service enforces on pagination.
#[derive(Debug, Clone)]
pub struct ServiceLimits {
    /// Largest page size the service accepts.
    pub max_page_size: u32,
    /// Deepest offset (`page_size × page`) the service will serve, when it
    /// does not support deep pagination. `None` means unlimited depth.
    pub max_offset: Option<u64>,
}

impl Default for ServiceLimits {
    fn default() -> Self {
        Self {
            max_page_size: 100,
            max_offset: None,
        }
    }
}

/// Caller-supplied client configuration. Nothing is hardcoded in the core:
/// entity endpoint, rate limits, and service limits all come from here.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Entity endpoint under the base URL (e.g. `vn`).
    pub entity: String,
    pub rate_limit: RateLimitConfig,
    pub limits: ServiceLimits,
}

impl ClientConfig {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            rate_limit: RateLimitConfig::default(),
            limits: ServiceLimits::default(),
        }
    }
}

/// Client for a ranked-entity catalog service.
pub struct CatalogClient<W: Wire, D: Delay> {
    pub(crate) transport: RateLimitedTransport<W, D>,
    pub(crate) entity: String,
    pub(crate) limits: ServiceLimits,
    pub(crate) cancel: CancelToken,
}

impl CatalogClient<HttpWire, ClockDelay> {
    /// Production client over HTTP with the real clock.
    pub fn http(base_url: &str, config: ClientConfig) -> Result<Self, TransportError> {
        let wire = HttpWire::new(base_url)?;
        Ok(Self::new(wire, ClockDelay, config))
    }
}

impl<W: Wire, D: Delay> CatalogClient<W, D> {
    pub fn new(wire: W, delay: D, config: ClientConfig) -> Self {
        Self {
            transport: RateLimitedTransport::new(wire, delay, config.rate_limit),
            entity: config.entity,
            limits: config.limits,
            cancel: CancelToken::new(),
        }
    }

    /// Handle that cancels any in-progress fetch from another thread.
    pub fn cancellation_handle(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Stop issuing further requests. An in-progress multi-page fetch ends
    /// gracefully with the pages already collected.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Total number of entities matching `filter`, without fetching items.
    ///
    /// A pure function of the filter and the live (unobserved) catalog
    /// state — not repeatable across time.
    pub fn count(&self, filter: &Filter) -> Result<u64, QueryError> {
        let body = QueryBody::count_only(filter.clone());
        let raw = self.transport.send(&self.entity, &body, &self.cancel)?;
        let response = QueryResponse::parse(&raw)?;
        let count = response.count.ok_or_else(|| {
            ServiceError::MalformedResponse(format!("count field missing for filter {filter}"))
        })?;
        debug!(%filter, count, "count query");
        Ok(count)
    }

    /// Database-wide aggregate metrics from the service's stats endpoint.
    pub fn stats(&self) -> Result<BTreeMap<String, u64>, QueryError> {
        let raw = self.transport.get("stats", &self.cancel)?;
        serde_json::from_str(&raw)
            .map_err(|e| ServiceError::MalformedResponse(format!("stats response: {e}")).into())
    }

    /// Start a lazy paginated scan. Each call starts a fresh sequence; there
    /// is no cursor reuse across calls.
    pub fn fetch(&self, request: FetchRequest) -> Result<PageStream<'_, W, D>, ConfigError> {
        request.validate(&self.limits)?;
        debug!(
            sort = %request.sort,
            descending = request.descending,
            page_size = request.page_size,
            max_pages = request.max_pages,
            "starting paginated fetch"
        );
        Ok(PageStream::new(self, request))
    }

    /// Drive a paginated scan to completion and collect every page.
    ///
    /// A mid-scan failure becomes [`FetchError::PartialResult`] carrying the
    /// pages already collected. Caller-requested cancellation is not an
    /// error: it yields an `Ok` outcome flagged incomplete.
    pub fn fetch_all(&self, request: FetchRequest) -> Result<FetchOutcome, FetchError> {
        let mut stream = self.fetch(request)?;
        let mut pages = Vec::new();
        for next in &mut stream {
            match next {
                Ok(page) => pages.push(page),
                Err(cause) => {
                    tracing::warn!(
                        pages_completed = pages.len(),
                        error = %cause,
                        "paginated fetch truncated"
                    );
                    return Err(FetchError::PartialResult { pages, cause });
                }
            }
        }
        let complete = !stream.was_cancelled();
        Ok(FetchOutcome { pages, complete })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::filter::{Filter, Op};
    use crate::testing::{InstantDelay, ScriptedWire, ok_reply};
    use serde_json::json;

    fn client(wire: ScriptedWire) -> CatalogClient<ScriptedWire, InstantDelay> {
        CatalogClient::new(wire, InstantDelay::new(), ClientConfig::new("vn"))
    }

    #[test]
    fn count_returns_total() {
        let wire = ScriptedWire::new(vec![Ok(ok_reply(
            r#"{"results": [], "more": false, "count": 58868}"#,
        ))]);
        let client = client(wire);
        let total = client.count(&Filter::cmp("votecount", Op::Gt, -1)).unwrap();
        assert_eq!(total, 58868);
    }

    #[test]
    fn count_sends_count_only_body() {
        let wire = ScriptedWire::new(vec![Ok(ok_reply(r#"{"count": 7}"#))]);
        let client = client(wire);
        client.count(&Filter::cmp("votecount", Op::Gt, 100)).unwrap();
        let bodies = client.transport_wire().bodies();
        assert_eq!(
            bodies[0],
            json!({
                "filters": ["votecount", ">", 100],
                "fields": "id",
                "count": true,
            })
        );
    }

    #[test]
    fn missing_count_field_is_malformed() {
        let wire = ScriptedWire::new(vec![Ok(ok_reply(r#"{"results": [], "more": false}"#))]);
        let client = client(wire);
        let err = client.count(&Filter::cmp("votecount", Op::Gt, 0)).unwrap_err();
        assert!(matches!(
            err,
            QueryError::Service(ServiceError::MalformedResponse(_))
        ));
    }

    #[test]
    fn stats_parses_metric_map() {
        let wire = ScriptedWire::new(vec![Ok(ok_reply(r#"{"vn": 58868, "producers": 21564}"#))]);
        let client = client(wire);
        let stats = client.stats().unwrap();
        assert_eq!(stats.get("vn"), Some(&58868));
        assert_eq!(stats.get("producers"), Some(&21564));
    }

    #[test]
    fn stats_rejects_non_integer_metrics() {
        let wire = ScriptedWire::new(vec![Ok(ok_reply(r#"{"vn": "many"}"#))]);
        let client = client(wire);
        assert!(matches!(
            client.stats().unwrap_err(),
            QueryError::Service(ServiceError::MalformedResponse(_))
        ));
    }

    impl CatalogClient<ScriptedWire, InstantDelay> {
        fn transport_wire(&self) -> &ScriptedWire {
            self.transport.wire_ref()
        }
    }
}
