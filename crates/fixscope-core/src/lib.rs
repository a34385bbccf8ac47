//! Core types, configuration, and error handling for fixscope.
//!
//! This crate provides the shared foundation used by all other fixscope crates:
//! - [`FixscopeError`] for unified error handling via `thiserror`
//! - [`FixscopeConfig`] loaded from `.fixscope.toml`
//! - [`FixKeywords`] and [`KeywordSet`] for fix-change detection
//! - Shared types: [`Span`], [`ChangeRecord`], [`AggregatedMethod`], [`OutputFormat`]

mod config;
mod error;
mod keywords;
mod types;

pub use config::{
    AnalysisConfig, FilterConfig, FixscopeConfig, PathsConfig, ReportConfig, SourcesConfig,
    KEYWORDS_ENV,
};
pub use error::FixscopeError;
pub use keywords::{FixKeywords, KeywordSet};
pub use types::{AggregatedMethod, ChangeRecord, OutputFormat, Span};

/// A convenience `Result` type for fixscope operations.
pub type Result<T> = std::result::Result<T, FixscopeError>;
