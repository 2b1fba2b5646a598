//! Distribution binning and model comparison.
//!
//! - [`histogram`] — bucket partitions, exact (service-side) and sampled
//!   (local) counting strategies.
//! - [`summary`] — descriptive statistics over a fetched metric sample.
//! - [`compare`] — observed-vs-predicted discrepancy ratios.

pub mod compare;
pub mod histogram;
pub mod summary;
