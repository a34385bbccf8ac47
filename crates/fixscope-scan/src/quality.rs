//! Text-level quality metrics for a method body.
//!
//! Everything here works on raw source text with the same line-oriented
//! heuristics as the boundary scanner: comments are recognized by their
//! delimiters and decision points by keyword regexes, with no awareness of
//! string literals.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static DECISION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bif\b",
        r"(?i)\belse\s+if\b",
        r"(?i)\bwhile\b",
        r"(?i)\bfor\b",
        r"(?i)\bswitch\b",
        r"(?i)\bcase\b",
        r"(?i)\bcatch\b",
        r"\b\?\s*:",
        r"&&",
        r"\|\|",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid regex"))
    .collect()
});

static INLINE_BLOCK_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\*.*?\*/").expect("Invalid regex"));

static IDENTIFIER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[a-zA-Z_][a-zA-Z0-9_]*\b").expect("Invalid regex"));

/// Lowercased Java keywords and common type names excluded from identifier stats.
const JAVA_KEYWORDS: &[&str] = &[
    "public", "private", "protected", "static", "final", "abstract", "class", "interface",
    "extends", "implements", "import", "package", "if", "else", "while", "for", "switch",
    "case", "default", "try", "catch", "finally", "throw", "throws", "return", "int",
    "double", "float", "boolean", "char", "string", "void", "this", "super", "new", "null",
    "true", "false",
];

/// Line counts with and without comments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineCounts {
    /// Non-blank lines that still contain code once comments are removed.
    pub code_lines: usize,
    /// All non-blank lines.
    pub total_lines: usize,
    /// `(total_lines - code_lines) / total_lines`, or 0 for empty input.
    pub comment_ratio: f64,
}

/// Length statistics over the identifiers of a method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierStats {
    pub avg_length: f64,
    pub min_length: usize,
    pub max_length: usize,
    pub total_count: usize,
    /// Share of identifiers with three characters or fewer.
    pub short_names_ratio: f64,
}

/// All text-derived metrics of one method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMetrics {
    #[serde(flatten)]
    pub lines: LineCounts,
    pub cyclomatic_complexity: u32,
    pub identifiers: IdentifierStats,
}

impl TextMetrics {
    /// Metrics of an empty or unreadable method body.
    pub fn empty() -> Self {
        Self {
            lines: LineCounts {
                code_lines: 0,
                total_lines: 0,
                comment_ratio: 0.0,
            },
            cyclomatic_complexity: 1,
            identifiers: IdentifierStats::default(),
        }
    }
}

/// Compute every text metric for `source`.
///
/// # Examples
///
/// ```
/// use fixscope_scan::quality::analyze_text;
///
/// let body = "public int abs(int value) {\n    // negate\n    if (value < 0) return -value;\n    return value;\n}";
/// let metrics = analyze_text(body);
/// assert_eq!(metrics.lines.total_lines, 5);
/// assert_eq!(metrics.lines.code_lines, 4);
/// assert_eq!(metrics.cyclomatic_complexity, 2);
/// ```
pub fn analyze_text(source: &str) -> TextMetrics {
    if source.trim().is_empty() {
        return TextMetrics::empty();
    }
    TextMetrics {
        lines: count_lines(source),
        cyclomatic_complexity: cyclomatic_complexity(source),
        identifiers: identifier_stats(source),
    }
}

/// Extract lines `start..=end` (1-based, clamped to the file) from `content`.
///
/// # Examples
///
/// ```
/// use fixscope_scan::quality::method_source;
///
/// let text = "a\nb\nc\nd\n";
/// assert_eq!(method_source(text, 2, 3), "b\nc");
/// assert_eq!(method_source(text, 3, 99), "c\nd");
/// ```
pub fn method_source(content: &str, start_line: u32, end_line: u32) -> String {
    let skip = start_line.saturating_sub(1) as usize;
    let take = (end_line as usize).saturating_sub(skip);
    content
        .lines()
        .skip(skip)
        .take(take)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Count code lines, excluding `//` lines and `/* */` comments.
pub fn count_lines(source: &str) -> LineCounts {
    let mut total = 0usize;
    let mut code = 0usize;
    let mut in_block = false;

    for raw in source.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        total += 1;

        if line.starts_with("//") {
            continue;
        }
        if line.contains("/*") && line.contains("*/") {
            if !INLINE_BLOCK_COMMENT.replace_all(line, "").trim().is_empty() {
                code += 1;
            }
            continue;
        }
        if let Some(open) = line.find("/*") {
            in_block = true;
            if !line[..open].trim().is_empty() {
                code += 1;
            }
            continue;
        }
        if let Some(close) = line.find("*/") {
            in_block = false;
            if !line[close + 2..].trim().is_empty() {
                code += 1;
            }
            continue;
        }
        if in_block {
            continue;
        }
        code += 1;
    }

    let comment_ratio = if total > 0 {
        (total - code) as f64 / total as f64
    } else {
        0.0
    };
    LineCounts {
        code_lines: code,
        total_lines: total,
        comment_ratio,
    }
}

/// `1 +` the number of decision points.
///
/// `else if` counts both as an `if` and as an `else if`.
pub fn cyclomatic_complexity(source: &str) -> u32 {
    let decisions: usize = DECISION_PATTERNS
        .iter()
        .map(|re| re.find_iter(source).count())
        .sum();
    1 + decisions as u32
}

/// Length statistics over non-keyword identifiers.
pub fn identifier_stats(source: &str) -> IdentifierStats {
    let lengths: Vec<usize> = IDENTIFIER_REGEX
        .find_iter(source)
        .map(|m| m.as_str())
        .filter(|id| !JAVA_KEYWORDS.contains(&id.to_lowercase().as_str()))
        .map(str::len)
        .collect();

    if lengths.is_empty() {
        return IdentifierStats::default();
    }

    let count = lengths.len();
    let short = lengths.iter().filter(|&&l| l <= 3).count();
    IdentifierStats {
        avg_length: lengths.iter().sum::<usize>() as f64 / count as f64,
        min_length: lengths.iter().copied().min().unwrap_or(0),
        max_length: lengths.iter().copied().max().unwrap_or(0),
        total_count: count,
        short_names_ratio: short as f64 / count as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_are_excluded_from_code_lines() {
        let src = "\
/**
 * Docs.
 */
int a = 1; // trailing
/* inline */ int b = 2;
/* only comment */
int c = 3; /* opens
still comment
closes */ int d = 4;
// line comment
";
        let counts = count_lines(src);
        assert_eq!(counts.total_lines, 10);
        // a, b, c (before the opener), d (after the closer)
        assert_eq!(counts.code_lines, 4);
        assert!((counts.comment_ratio - 0.6).abs() < 1e-9);
    }

    #[test]
    fn empty_source_counts_zero() {
        let counts = count_lines("\n   \n");
        assert_eq!(counts.total_lines, 0);
        assert_eq!(counts.comment_ratio, 0.0);
    }

    #[test]
    fn complexity_counts_decision_points() {
        let src = "\
if (a && b) {
} else if (c || d) {
}
for (int i = 0; i < n; i++) {}
while (x) {}
switch (y) { case 1: break; case 2: break; }
try {} catch (Exception e) {}";
        // if x2 (including the one in `else if`), else if, &&, ||, for, while,
        // switch, case x2, catch
        assert_eq!(cyclomatic_complexity(src), 1 + 11);
    }

    #[test]
    fn complexity_of_straight_line_code_is_one() {
        assert_eq!(cyclomatic_complexity("return a + b;"), 1);
    }

    #[test]
    fn identifier_stats_skip_keywords() {
        let stats = identifier_stats("public int sum(int ab, int total) { return ab + total; }");
        // sum, ab, total, ab, total
        assert_eq!(stats.total_count, 5);
        assert_eq!(stats.min_length, 2);
        assert_eq!(stats.max_length, 5);
        assert!((stats.short_names_ratio - 0.6).abs() < 1e-9);
        assert!((stats.avg_length - 3.4).abs() < 1e-9);
    }

    #[test]
    fn identifier_stats_of_keywords_only_are_zero() {
        assert_eq!(identifier_stats("return null;"), IdentifierStats::default());
    }

    #[test]
    fn blank_body_gives_empty_metrics() {
        assert_eq!(analyze_text("  \n"), TextMetrics::empty());
    }

    #[test]
    fn method_source_clamps_range() {
        assert_eq!(method_source("x\ny", 0, 1), "x");
        assert_eq!(method_source("x\ny", 5, 9), "");
    }
}
