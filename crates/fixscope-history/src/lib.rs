//! Method change histories: retrieval, fix classification, and authorship.
//!
//! Fetches per-method histories from an external provider (CodeShovel by
//! default), classifies each change as a fix or not by keyword matching on its
//! message, and mines method and fix authorship from git history using git2.

pub mod authors;
pub mod classify;
pub mod codeshovel;
pub mod provider;

pub use classify::{classify, ClassifiedSet};
pub use codeshovel::CodeShovelProvider;
pub use provider::{HistoryProvider, HistoryQuery, ProviderError};
