//! Source scanning: repository discovery, method boundaries, and text metrics.
//!
//! Walks repository checkouts with the `ignore` crate, locates method spans
//! with a line-oriented brace-balance heuristic, and computes comment, complexity
//! and identifier metrics over method bodies.

pub mod boundary;
pub mod output;
pub mod quality;
pub mod walker;

use std::path::Path;

use fixscope_core::{FixscopeError, OutputFormat, Span};

/// Read `path` and return its method spans.
///
/// # Errors
///
/// Returns [`FixscopeError`] if the file cannot be read or looks binary.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use fixscope_scan::scan_file;
///
/// let spans = scan_file(Path::new("src/main/java/App.java")).unwrap();
/// for span in &spans {
///     println!("{} {}-{}", span.name, span.start_line, span.end_line);
/// }
/// ```
pub fn scan_file(path: &Path) -> Result<Vec<Span>, FixscopeError> {
    let content = walker::read_source(path)?;
    Ok(boundary::scan_source(&content))
}

/// Scan each path and render the spans in `format`.
///
/// Unreadable files are reported with an empty span list and a warning.
///
/// # Errors
///
/// Returns [`FixscopeError::Serialization`] if JSON rendering fails.
pub fn render_spans(paths: &[&Path], format: OutputFormat) -> Result<String, FixscopeError> {
    let files: Vec<output::ScannedFile> = paths
        .iter()
        .map(|path| {
            let spans = scan_file(path).unwrap_or_else(|e| {
                tracing::warn!(file = %path.display(), error = %e, "failed to scan file");
                Vec::new()
            });
            output::ScannedFile {
                path: path.display().to_string(),
                spans,
            }
        })
        .collect();

    match format {
        OutputFormat::Text => Ok(output::format_tree(&files)),
        OutputFormat::Json => output::format_json(&files),
        OutputFormat::Markdown => Ok(output::format_markdown(&files)),
    }
}
