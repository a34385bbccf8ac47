//! Repository-level orchestration for fixscope.
//!
//! Ties the scanner and the history provider together: one-shot and
//! resumable aggregation runs, per-method quality metrics, and sourcing of
//! repository checkouts from GitHub.

pub mod aggregate;
pub mod catalog;
pub mod quality;
pub mod sources;
pub mod staged;
pub mod store;

pub use aggregate::{AggregateOptions, AggregateStats, Aggregator, MethodFilter, RepoOutcome};
pub use catalog::{RepoCatalog, Stage};
pub use store::{AggregationStore, JsonDirStore};
