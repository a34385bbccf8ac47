//! Summary statistics, reports and charts over aggregated methods.
//!
//! [`stats::compute`] reduces a collection of aggregated methods into size
//! tier, distribution, top fix ratio and per-repository figures. The result
//! renders as text (`Display`), Markdown, JSON, or a PNG chart.

pub mod chart;
pub mod render;
pub mod stats;

pub use stats::{compute, SizeTiers, Statistics, Tier};

/// File name of the Markdown report inside the results directory.
pub const REPORT_FILE: &str = "fix_analysis_report.md";

/// File name of the chart inside the results directory.
pub const CHART_FILE: &str = "fix_analysis_visualization.png";
