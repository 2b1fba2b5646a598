//! Paginated fetching and page merging.
//!
//! - [`fetch`] — `FetchRequest` validation, the lazy [`fetch::PageStream`],
//!   and the collected [`fetch::FetchOutcome`].
//! - [`merge`] — identity-keyed dedup of fetched pages into one ordered set.

pub mod fetch;
pub mod merge;
