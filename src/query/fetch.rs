//! Paginated sorted fetch against the catalog service.
//!
//! [`PageStream`] is a lazy, finite, non-restartable sequence of pages under
//! a fixed filter/sort. It stops on its page budget, on a short page
//! (defensive against inconsistent `more` signaling), on caller cancellation
//! (gracefully), or with an error when the declared sort order is violated
//! across a page boundary — the signature of the catalog mutating mid-scan.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::client::{CatalogClient, ServiceLimits};
use crate::error::{ConfigError, ConsistencyError, QueryError, TransportError};
use crate::filter::Filter;
use crate::transport::{Delay, Wire};
use crate::wire::{CatalogItem, Page, QueryBody, QueryResponse};

/// Attribute a scan is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Id,
    Title,
    VoteCount,
    Popularity,
    Rating,
}

impl SortKey {
    pub fn wire_name(self) -> &'static str {
        match self {
            SortKey::Id => "id",
            SortKey::Title => "title",
            SortKey::VoteCount => "votecount",
            SortKey::Popularity => "popularity",
            SortKey::Rating => "rating",
        }
    }

    /// The sort attribute's value on an item, when projected.
    pub fn value_of(self, item: &CatalogItem) -> Option<SortValue> {
        match self {
            SortKey::Id => Some(SortValue::Text(item.id.clone())),
            SortKey::Title => item.title.clone().map(SortValue::Text),
            SortKey::VoteCount => item.votecount.map(|v| SortValue::Num(v as f64)),
            SortKey::Popularity => item.popularity.map(SortValue::Num),
            SortKey::Rating => item.rating.map(SortValue::Num),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Comparable sort-attribute value.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum SortValue {
    Num(f64),
    Text(String),
}

/// One paginated sorted fetch: filter, projection, sort, and budgets.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub filter: Filter,
    /// Attribute projection. `id` is always sent even if omitted here, so
    /// page merging can key on identity.
    pub fields: Vec<String>,
    pub sort: SortKey,
    pub descending: bool,
    pub page_size: u32,
    pub max_pages: u32,
}

impl FetchRequest {
    /// Request with the default projection (`id`, `title`, and the sort
    /// attribute), descending order, and a single full page.
    pub fn new(filter: Filter, sort: SortKey) -> Self {
        let mut fields = vec!["id".to_string(), "title".to_string()];
        if !fields.iter().any(|f| f == sort.wire_name()) {
            fields.push(sort.wire_name().to_string());
        }
        Self {
            filter,
            fields,
            sort,
            descending: true,
            page_size: 100,
            max_pages: 1,
        }
    }

    /// Check budgets against the service's hard limits before anything is
    /// sent. Exceeding the service's maximum offset is reported here rather
    /// than silently truncating the scan at the boundary.
    pub fn validate(&self, limits: &ServiceLimits) -> Result<(), ConfigError> {
        if self.page_size == 0 || self.page_size > limits.max_page_size {
            return Err(ConfigError::PageSizeOutOfRange {
                page_size: self.page_size,
                max_page_size: limits.max_page_size,
            });
        }
        if let Some(max_offset) = limits.max_offset {
            let reach = u64::from(self.page_size) * u64::from(self.max_pages);
            if reach > max_offset {
                return Err(ConfigError::PaginationDepthExceeded { reach, max_offset });
            }
        }
        Ok(())
    }

    fn fields_param(&self) -> String {
        let mut fields: Vec<&str> = Vec::with_capacity(self.fields.len() + 1);
        if !self.fields.iter().any(|f| f == "id") {
            fields.push("id");
        }
        fields.extend(self.fields.iter().map(String::as_str));
        fields.join(", ")
    }

    fn body_for_page(&self, page: u32) -> QueryBody {
        QueryBody {
            filters: self.filter.clone(),
            fields: self.fields_param(),
            sort: Some(self.sort.wire_name().to_string()),
            reverse: self.descending,
            results: Some(self.page_size),
            page: Some(page),
            count: false,
        }
    }
}

/// Lazy sequence of pages. Finite; not restartable; one fresh scan per
/// [`CatalogClient::fetch`] call.
pub struct PageStream<'a, W: Wire, D: Delay> {
    client: &'a CatalogClient<W, D>,
    request: FetchRequest,
    next_page: u32,
    /// Sort value of the last item of the previous page, for the boundary
    /// order check.
    boundary: Option<SortValue>,
    done: bool,
    cancelled: bool,
}

impl<'a, W: Wire, D: Delay> PageStream<'a, W, D> {
    pub(crate) fn new(client: &'a CatalogClient<W, D>, request: FetchRequest) -> Self {
        Self {
            client,
            request,
            next_page: 1,
            boundary: None,
            done: false,
            cancelled: false,
        }
    }

    /// Whether the stream ended because the caller cancelled.
    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    /// `true` when the previous and next boundary values respect the
    /// declared order. Incomparable values (missing projection, mixed types)
    /// are not checkable and pass.
    fn in_order(&self, prev: &SortValue, next: &SortValue) -> bool {
        match prev.partial_cmp(next) {
            Some(Ordering::Less) => !self.request.descending,
            Some(Ordering::Greater) => self.request.descending,
            Some(Ordering::Equal) | None => true,
        }
    }

    fn check_boundary(&self, response: &QueryResponse) -> Result<(), ConsistencyError> {
        let (Some(prev), Some(first)) = (
            self.boundary.as_ref(),
            response
                .results
                .first()
                .and_then(|item| self.request.sort.value_of(item)),
        ) else {
            return Ok(());
        };
        if self.in_order(prev, &first) {
            Ok(())
        } else {
            Err(ConsistencyError::SortViolation {
                page: self.next_page,
                key: self.request.sort,
            })
        }
    }
}

impl<W: Wire, D: Delay> Iterator for PageStream<'_, W, D> {
    type Item = Result<Page, QueryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.next_page > self.request.max_pages {
            self.done = true;
            return None;
        }
        if self.client.cancel.is_cancelled() {
            self.done = true;
            self.cancelled = true;
            return None;
        }

        let index = self.next_page;
        let body = self.request.body_for_page(index);
        let raw = match self.client.transport.send(&self.client.entity, &body, &self.client.cancel)
        {
            Ok(raw) => raw,
            Err(TransportError::Cancelled) => {
                self.done = true;
                self.cancelled = true;
                return None;
            }
            Err(e) => {
                self.done = true;
                return Some(Err(e.into()));
            }
        };
        let response = match QueryResponse::parse(&raw) {
            Ok(response) => response,
            Err(e) => {
                self.done = true;
                return Some(Err(e.into()));
            }
        };

        if let Err(violation) = self.check_boundary(&response) {
            self.done = true;
            return Some(Err(violation.into()));
        }
        if let Some(last) = response
            .results
            .last()
            .and_then(|item| self.request.sort.value_of(item))
        {
            self.boundary = Some(last);
        }

        let short_page = response.results.len() < self.request.page_size as usize;
        if short_page || !response.more {
            // A short page is end-of-data even when the service still claims
            // `more`; trusting the flag there would loop on a lying service.
            self.done = true;
        } else {
            self.next_page += 1;
        }

        debug!(
            page = index,
            items = response.results.len(),
            more = response.more,
            end = self.done,
            "fetched page"
        );
        Some(Ok(Page {
            index,
            items: response.results,
            more: response.more,
            count: response.count,
        }))
    }
}

/// Every page collected by a completed or cancelled scan.
///
/// `complete` is `false` only when the caller cancelled mid-scan; a scan
/// truncated by failure is a [`crate::error::FetchError::PartialResult`]
/// instead, so the three outcomes are never confusable.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub pages: Vec<Page>,
    pub complete: bool,
}

impl FetchOutcome {
    /// Merge and dedup all pages into one ordered collection.
    pub fn items(&self) -> Vec<CatalogItem> {
        super::merge::merge_pages(&self.pages)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
