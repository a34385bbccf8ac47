use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A detected method boundary within a source file.
///
/// Line numbers are 1-based and inclusive on both ends.
///
/// # Examples
///
/// ```
/// use fixscope_core::Span;
///
/// let span = Span::new("run", 10, 14);
/// assert_eq!(span.size(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    /// Method name, or a synthesized `unknown_method_at_line_N`.
    pub name: String,
    /// First line of the method (the signature line).
    pub start_line: u32,
    /// Last line of the method.
    pub end_line: u32,
}

impl Span {
    /// Create a span. `end_line` is clamped so it is never before `start_line`.
    pub fn new(name: impl Into<String>, start_line: u32, end_line: u32) -> Self {
        Self {
            name: name.into(),
            start_line,
            end_line: end_line.max(start_line),
        }
    }

    /// Number of lines covered, always at least 1.
    pub fn size(&self) -> u32 {
        self.end_line - self.start_line + 1
    }
}

/// One historical change of a method, as reported by the history provider.
///
/// `metadata` keeps the provider's full entry so nothing it reports is lost.
///
/// # Examples
///
/// ```
/// use fixscope_core::ChangeRecord;
///
/// let record = ChangeRecord {
///     id: "a1b2c3".into(),
///     message: "Fix NPE in parser".into(),
///     metadata: serde_json::Map::new(),
/// };
/// assert_eq!(record.id, "a1b2c3");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    /// Change identifier (a commit SHA for CodeShovel).
    pub id: String,
    /// Free-text change message.
    pub message: String,
    /// Everything else the provider reported for this change.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Aggregated fix history for one method of one repository.
///
/// Only created for methods with at least one recorded change.
///
/// # Examples
///
/// ```
/// use fixscope_core::AggregatedMethod;
///
/// let method = AggregatedMethod {
///     name: "parse".into(),
///     file_path: "src/main/java/Parser.java".into(),
///     start_line: 12,
///     end_line: 40,
///     size_lines: 29,
///     repository: "guava".into(),
///     commit_count: 8,
///     fix_commit_count: 2,
///     fix_ratio: 0.25,
///     fix_commit_ids: vec![],
/// };
/// assert_eq!(method.fix_ratio, 0.25);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedMethod {
    /// Method name.
    pub name: String,
    /// Path relative to the repository root.
    pub file_path: String,
    /// First line of the method.
    pub start_line: u32,
    /// Last line of the method.
    pub end_line: u32,
    /// `end_line - start_line + 1`.
    pub size_lines: u32,
    /// Repository name.
    pub repository: String,
    /// Number of well-formed historical changes.
    pub commit_count: u32,
    /// Number of changes whose message matched a fix keyword.
    pub fix_commit_count: u32,
    /// `fix_commit_count / commit_count`.
    pub fix_ratio: f64,
    /// Identifiers of the fix changes, in provider order.
    #[serde(default)]
    pub fix_commit_ids: Vec<String>,
}

impl AggregatedMethod {
    /// Ordering key used before persisting a collection.
    pub fn sort_key(&self) -> (&str, &str, u32) {
        (&self.file_path, &self.name, self.start_line)
    }
}

/// Output format for CLI subcommands.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use fixscope_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable tables and summaries.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
