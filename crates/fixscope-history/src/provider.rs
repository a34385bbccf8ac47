use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;

/// Identifies one method whose history should be fetched.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use fixscope_history::provider::HistoryQuery;
///
/// let query = HistoryQuery {
///     repository: "guava".into(),
///     repo_path: PathBuf::from("repos/guava"),
///     file_path: "guava/src/com/google/common/base/Strings.java".into(),
///     method_name: "repeat".into(),
///     start_line: 141,
/// };
/// assert_eq!(query.to_string(), "guava:guava/src/com/google/common/base/Strings.java:repeat@141");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Repository name.
    pub repository: String,
    /// Path to the repository checkout.
    pub repo_path: PathBuf,
    /// File path relative to the checkout, `/`-separated.
    pub file_path: String,
    /// Method name as detected by the scanner.
    pub method_name: String,
    /// First line of the method.
    pub start_line: u32,
}

impl std::fmt::Display for HistoryQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}@{}",
            self.repository, self.file_path, self.method_name, self.start_line
        )
    }
}

/// Why a history lookup produced no usable result.
///
/// None of these stop a run; the method is logged and skipped.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider process could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The provider exited unsuccessfully.
    #[error("provider exited with {}: {stderr}", exit_status(.code))]
    Exit { code: Option<i32>, stderr: String },

    /// The provider did not finish in time and was killed.
    #[error("provider timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The provider succeeded but wrote no output file.
    #[error("output file not found: {}", .0.display())]
    MissingOutput(PathBuf),

    /// The output file was empty or whitespace.
    #[error("output file is empty: {}", .0.display())]
    EmptyOutput(PathBuf),

    /// The output was not valid JSON.
    #[error("malformed provider output: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Reading the output failed.
    #[error("provider I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    /// Short stable label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Spawn { .. } => "spawn",
            ProviderError::Exit { .. } => "exit",
            ProviderError::Timeout(_) => "timeout",
            ProviderError::MissingOutput(_) => "missing-output",
            ProviderError::EmptyOutput(_) => "empty-output",
            ProviderError::Malformed(_) => "malformed",
            ProviderError::Io(_) => "io",
        }
    }
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "signal".to_string(),
    }
}

/// Source of per-method change histories.
///
/// Returns the provider's raw JSON container; interpretation is left to
/// [`crate::classify`]. Implementations are shared across concurrent
/// lookups, so they must be `Send + Sync`.
pub trait HistoryProvider: Send + Sync {
    /// Fetch the change history of one method.
    fn fetch(
        &self,
        query: &HistoryQuery,
    ) -> impl Future<Output = Result<Value, ProviderError>> + Send;
}

/// Parse provider output text, rejecting blank content.
///
/// # Errors
///
/// [`ProviderError::EmptyOutput`] for blank text (reported against `origin`),
/// [`ProviderError::Malformed`] for invalid JSON.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use fixscope_history::provider::{parse_output, ProviderError};
///
/// let value = parse_output("  {\"a\": 1}\n", Path::new("out.json")).unwrap();
/// assert_eq!(value["a"], 1);
/// assert!(matches!(parse_output(" \n", Path::new("out.json")), Err(ProviderError::EmptyOutput(_))));
/// ```
pub fn parse_output(text: &str, origin: &Path) -> Result<Value, ProviderError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ProviderError::EmptyOutput(origin.to_path_buf()));
    }
    Ok(serde_json::from_str(trimmed)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_json_is_reported() {
        let err = parse_output("{not json", Path::new("x.json")).unwrap_err();
        assert_eq!(err.kind(), "malformed");
    }

    #[test]
    fn exit_error_mentions_status() {
        let err = ProviderError::Exit {
            code: Some(2),
            stderr: "no such method".into(),
        };
        assert_eq!(err.to_string(), "provider exited with status 2: no such method");

        let killed = ProviderError::Exit {
            code: None,
            stderr: String::new(),
        };
        assert!(killed.to_string().contains("signal"));
    }

    #[test]
    fn timeout_error_mentions_seconds() {
        let err = ProviderError::Timeout(Duration::from_secs(300));
        assert_eq!(err.to_string(), "provider timed out after 300s");
        assert_eq!(err.kind(), "timeout");
    }
}
