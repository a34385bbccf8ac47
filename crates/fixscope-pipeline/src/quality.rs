//! Per-method quality metrics for one file of a repository.

use std::fmt;
use std::path::{Path, PathBuf};

use fixscope_core::{FixKeywords, FixscopeError};
use fixscope_history::authors::{author_concentration, blame_authors, fix_commit_authors};
use fixscope_scan::boundary;
use fixscope_scan::quality::{analyze_text, method_source, TextMetrics};
use fixscope_scan::walker::read_source;
use serde::Serialize;

/// Metrics of one method.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodQuality {
    pub name: String,
    pub start_line: u32,
    pub end_line: u32,
    pub size_lines: u32,
    #[serde(flatten)]
    pub metrics: TextMetrics,
    /// Distinct authors of the method's current lines.
    pub authors: Vec<String>,
}

/// Metrics of every method in a file, plus file-level fix authorship.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileQuality {
    pub repository: PathBuf,
    pub file_path: String,
    /// One entry per fix commit touching the file.
    pub fix_authors: Vec<String>,
    /// Share of the most frequent fix author.
    pub author_concentration: f64,
    pub methods: Vec<MethodQuality>,
}

/// Scan `file_path` (relative to `repo_path`) and measure each method.
///
/// Authorship comes from git; when the history cannot be read the author
/// lists are empty and the concentration is 0.
///
/// # Errors
///
/// Returns [`FixscopeError`] if the file cannot be read.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use fixscope_core::FixKeywords;
/// use fixscope_pipeline::quality::analyze_file;
///
/// let report = analyze_file(Path::new("repos/guava"), "src/Strings.java", &FixKeywords::default()).unwrap();
/// println!("{report}");
/// ```
pub fn analyze_file(
    repo_path: &Path,
    file_path: &str,
    keywords: &FixKeywords,
) -> Result<FileQuality, FixscopeError> {
    let content = read_source(&repo_path.join(file_path))?;

    let fix_authors = fix_commit_authors(repo_path, file_path, keywords).unwrap_or_else(|e| {
        tracing::warn!(repository = %repo_path.display(), file = file_path, error = %e, "fix authors unavailable");
        Vec::new()
    });

    let methods = boundary::scan_source(&content)
        .into_iter()
        .map(|span| {
            let body = method_source(&content, span.start_line, span.end_line);
            let authors = blame_authors(repo_path, file_path, span.start_line, span.end_line)
                .unwrap_or_else(|e| {
                    tracing::debug!(file = file_path, method = %span.name, error = %e, "blame unavailable");
                    Vec::new()
                });
            MethodQuality {
                size_lines: span.size(),
                name: span.name,
                start_line: span.start_line,
                end_line: span.end_line,
                metrics: analyze_text(&body),
                authors,
            }
        })
        .collect();

    Ok(FileQuality {
        repository: repo_path.to_path_buf(),
        file_path: file_path.to_string(),
        author_concentration: author_concentration(&fix_authors),
        fix_authors,
        methods,
    })
}

impl fmt::Display for FileQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.file_path)?;
        writeln!(
            f,
            "  fix commits: {}  author concentration: {:.2}",
            self.fix_authors.len(),
            self.author_concentration
        )?;
        for m in &self.methods {
            writeln!(
                f,
                "  {}  L{}-{}  size {}  code {}  comments {:.0}%  complexity {}  identifiers {} (avg {:.1}, short {:.0}%)  authors {}",
                m.name,
                m.start_line,
                m.end_line,
                m.size_lines,
                m.metrics.lines.code_lines,
                m.metrics.lines.comment_ratio * 100.0,
                m.metrics.cyclomatic_complexity,
                m.metrics.identifiers.total_count,
                m.metrics.identifiers.avg_length,
                m.metrics.identifiers.short_names_ratio * 100.0,
                m.authors.len(),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "class A {\n  public int abs(int value) {\n    if (value < 0) {\n      return -value;\n    }\n    return value;\n  }\n}\n";

    #[test]
    fn untracked_file_degrades_to_empty_authors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("A.java"), SOURCE).unwrap();

        let report = analyze_file(dir.path(), "A.java", &FixKeywords::default()).unwrap();
        assert!(report.fix_authors.is_empty());
        assert_eq!(report.author_concentration, 0.0);
        assert_eq!(report.methods.len(), 1);

        let abs = &report.methods[0];
        assert_eq!(abs.name, "abs");
        assert_eq!((abs.start_line, abs.end_line), (2, 7));
        assert_eq!(abs.metrics.cyclomatic_complexity, 2);
        assert!(abs.authors.is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(analyze_file(dir.path(), "Nope.java", &FixKeywords::default()).is_err());
    }

    #[test]
    fn display_lists_each_method() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("A.java"), SOURCE).unwrap();
        let report = analyze_file(dir.path(), "A.java", &FixKeywords::default()).unwrap();
        let text = report.to_string();
        assert!(text.starts_with("A.java\n"));
        assert!(text.contains("abs  L2-7  size 6"));
    }
}
