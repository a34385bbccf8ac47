//! Heuristic method-boundary detection.
//!
//! The scanner is line oriented: it recognizes method signatures with a
//! regular expression and tracks nesting by looking only at whether a line
//! ends with `{` or `}`. It is not a parser. Braces inside strings or
//! comments are counted, `public static void main(` style lines and
//! constructors are not recognized as signatures, and nested or anonymous
//! functions produce approximate spans.

use once_cell::sync::Lazy;
use regex::Regex;

use fixscope_core::Span;

/// Optional modifier, return-type-like token, identifier, parameter list, optional `{`.
static SIGNATURE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(public|private|protected|static|\s) +[\w<>\[\]]+\s+(\w+) *\([^)]*\) *\{?")
        .expect("Invalid regex")
});

/// First identifier immediately followed by `(`.
static NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+) *\(").expect("Invalid regex"));

/// Decides whether a trimmed source line opens a method and what it is called.
///
/// # Examples
///
/// ```
/// use fixscope_scan::boundary::{HeuristicMatcher, SignatureMatcher};
///
/// let matcher = HeuristicMatcher;
/// assert!(matcher.is_signature("public int size() {"));
/// assert_eq!(matcher.method_name("public int size() {").as_deref(), Some("size"));
/// assert!(!matcher.is_signature("return size();"));
/// ```
pub trait SignatureMatcher {
    /// `true` when `line` (already trimmed) starts a method.
    fn is_signature(&self, line: &str) -> bool;

    /// The method name declared on `line`, if one can be extracted.
    fn method_name(&self, line: &str) -> Option<String>;
}

/// The built-in regex heuristic for Java-like signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicMatcher;

impl SignatureMatcher for HeuristicMatcher {
    fn is_signature(&self, line: &str) -> bool {
        SIGNATURE_REGEX.is_match(line)
    }

    fn method_name(&self, line: &str) -> Option<String> {
        NAME_REGEX
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

#[derive(Debug)]
struct OpenSpan {
    name: String,
    start: u32,
    depth: i64,
}

/// Scan `lines` with the built-in [`HeuristicMatcher`].
///
/// Returns spans sorted by `(name, start_line)`.
///
/// # Examples
///
/// ```
/// use fixscope_scan::boundary::scan;
///
/// let source = "public class A {\n  public int one() {\n    return 1;\n  }\n}\n";
/// let lines: Vec<&str> = source.lines().collect();
/// let spans = scan(&lines);
/// assert_eq!(spans.len(), 1);
/// assert_eq!((spans[0].start_line, spans[0].end_line), (2, 4));
/// ```
pub fn scan<S: AsRef<str>>(lines: &[S]) -> Vec<Span> {
    scan_with(&HeuristicMatcher, lines)
}

/// Scan the full text of a source file.
pub fn scan_source(source: &str) -> Vec<Span> {
    let lines: Vec<&str> = source.lines().collect();
    scan(&lines)
}

/// Scan `lines` using a custom [`SignatureMatcher`].
///
/// A new signature while a span is open closes that span on the previous
/// line. A span still open at the end of input closes on the last line.
pub fn scan_with<M, S>(matcher: &M, lines: &[S]) -> Vec<Span>
where
    M: SignatureMatcher + ?Sized,
    S: AsRef<str>,
{
    let mut spans = Vec::new();
    let mut open: Option<OpenSpan> = None;

    for (idx, raw) in lines.iter().enumerate() {
        let line_no = idx as u32 + 1;
        let line = raw.as_ref().trim();

        if matcher.is_signature(line) {
            if let Some(prev) = open.take() {
                spans.push(Span::new(prev.name, prev.start, line_no - 1));
            }
            let name = matcher
                .method_name(line)
                .unwrap_or_else(|| format!("unknown_method_at_line_{line_no}"));
            open = Some(OpenSpan {
                name,
                start: line_no,
                depth: if line.ends_with('{') { 1 } else { 0 },
            });
            continue;
        }

        let Some(current) = open.as_mut() else {
            continue;
        };
        if line.ends_with('{') {
            current.depth += 1;
        } else if line.ends_with('}') {
            current.depth -= 1;
            if current.depth == 0 {
                if let Some(done) = open.take() {
                    spans.push(Span::new(done.name, done.start, line_no));
                }
            }
        }
    }

    if let Some(rest) = open {
        spans.push(Span::new(rest.name, rest.start, lines.len() as u32));
    }

    spans.sort_by(|a, b| (&a.name, a.start_line).cmp(&(&b.name, b.start_line)));
    spans
}
