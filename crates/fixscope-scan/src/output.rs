use std::fmt::Write;

use fixscope_core::{FixscopeError, Span};
use serde::Serialize;

/// The spans detected in one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Path as given by the caller.
    pub path: String,
    /// Spans sorted by `(name, start_line)`.
    pub spans: Vec<Span>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpanOutput<'a> {
    file: &'a str,
    name: &'a str,
    start_line: u32,
    end_line: u32,
    size_lines: u32,
}

/// Render scanned files as an ASCII tree, one branch per span.
///
/// # Examples
///
/// ```
/// use fixscope_core::Span;
/// use fixscope_scan::output::{format_tree, ScannedFile};
///
/// let file = ScannedFile { path: "A.java".into(), spans: vec![Span::new("run", 3, 9)] };
/// let out = format_tree(&[file]);
/// assert!(out.contains("run  L3-9 (7 lines)"));
/// assert!(format_tree(&[]).is_empty());
/// ```
pub fn format_tree(files: &[ScannedFile]) -> String {
    let mut out = String::new();
    let file_count = files.len();

    for (file_idx, file) in files.iter().enumerate() {
        let is_last_file = file_idx + 1 == file_count;
        let file_prefix = if is_last_file {
            "\u{2514}\u{2500}\u{2500} "
        } else {
            "\u{251c}\u{2500}\u{2500} "
        };
        let _ = writeln!(out, "{file_prefix}{}", file.path);

        let child_prefix = if is_last_file { "    " } else { "\u{2502}   " };
        let span_count = file.spans.len();

        for (span_idx, span) in file.spans.iter().enumerate() {
            let span_prefix = if span_idx + 1 == span_count {
                "\u{2514}\u{2500}\u{2500} "
            } else {
                "\u{251c}\u{2500}\u{2500} "
            };
            let _ = writeln!(
                out,
                "{child_prefix}{span_prefix}{}  L{}-{} ({} lines)",
                span.name,
                span.start_line,
                span.end_line,
                span.size()
            );
        }
    }

    out
}

/// Render scanned files as a flat JSON array of spans.
///
/// # Errors
///
/// Returns [`FixscopeError::Serialization`] if serialization fails.
pub fn format_json(files: &[ScannedFile]) -> Result<String, FixscopeError> {
    let output: Vec<SpanOutput<'_>> = files
        .iter()
        .flat_map(|file| {
            file.spans.iter().map(move |s| SpanOutput {
                file: &file.path,
                name: &s.name,
                start_line: s.start_line,
                end_line: s.end_line,
                size_lines: s.size(),
            })
        })
        .collect();

    serde_json::to_string_pretty(&output).map_err(FixscopeError::from)
}

/// Render scanned files as Markdown tables.
pub fn format_markdown(files: &[ScannedFile]) -> String {
    if files.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    out.push_str("# Method Spans\n\n");

    for file in files {
        let _ = writeln!(out, "## `{}`\n", file.path);
        if file.spans.is_empty() {
            out.push_str("_No methods detected._\n\n");
            continue;
        }
        out.push_str("| Method | Start | End | Lines |\n");
        out.push_str("|--------|------:|----:|------:|\n");
        for span in &file.spans {
            let _ = writeln!(
                out,
                "| `{}` | {} | {} | {} |",
                span.name,
                span.start_line,
                span.end_line,
                span.size()
            );
        }
        out.push('\n');
    }

    out
}
