use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const DEFAULT_KEYWORDS: &[&str] = &["fix", "bug", "issue", "problem", "error"];

const STRICT_EXTRA_KEYWORDS: &[&str] = &[
    "bugfix", "hotfix", "patch", "resolve", "correct", "repair", "debug",
];

/// Named keyword presets selectable from config or the CLI.
///
/// # Examples
///
/// ```
/// use fixscope_core::KeywordSet;
///
/// let set: KeywordSet = "strict".parse().unwrap();
/// assert_eq!(set, KeywordSet::Strict);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordSet {
    /// `fix`, `bug`, `issue`, `problem`, `error`.
    #[default]
    Default,
    /// The default set plus `bugfix`, `hotfix`, `patch`, `resolve`,
    /// `correct`, `repair`, `debug`.
    Strict,
}

impl KeywordSet {
    /// The keywords of this preset, lowercase, in declaration order.
    pub fn keywords(self) -> Vec<String> {
        let mut words: Vec<String> = DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect();
        if self == KeywordSet::Strict {
            words.extend(STRICT_EXTRA_KEYWORDS.iter().map(|k| k.to_string()));
        }
        words
    }
}

impl fmt::Display for KeywordSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeywordSet::Default => write!(f, "default"),
            KeywordSet::Strict => write!(f, "strict"),
        }
    }
}

impl FromStr for KeywordSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(KeywordSet::Default),
            "strict" => Ok(KeywordSet::Strict),
            other => Err(format!("unknown keyword set: {other}")),
        }
    }
}

/// An immutable, case-folded set of fix keywords.
///
/// A message is a fix when any keyword occurs in it as a plain substring
/// after lowercasing, so `error` matches `errorHandler`.
///
/// # Examples
///
/// ```
/// use fixscope_core::FixKeywords;
///
/// let keywords = FixKeywords::default();
/// assert!(keywords.matches("ERROR: null pointer"));
/// assert!(keywords.matches("rename errorHandler"));
/// assert!(!keywords.matches("Add caching layer"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixKeywords {
    words: Vec<String>,
}

impl FixKeywords {
    /// Build a keyword set, lowercasing and dropping blanks and duplicates.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for word in words {
            let word = word.as_ref().trim().to_lowercase();
            if !word.is_empty() && !out.contains(&word) {
                out.push(word);
            }
        }
        Self { words: out }
    }

    /// Keywords of a named preset.
    pub fn from_set(set: KeywordSet) -> Self {
        Self::new(set.keywords())
    }

    /// Parse a comma-separated list such as `"fix, bug,hotfix"`.
    pub fn from_list(list: &str) -> Self {
        Self::new(list.split(','))
    }

    /// The normalized keywords.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// `true` when no keyword is configured.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Whether `message` contains any keyword, ignoring case.
    pub fn matches(&self, message: &str) -> bool {
        let folded = message.to_lowercase();
        self.words.iter().any(|k| folded.contains(k.as_str()))
    }
}

impl Default for FixKeywords {
    fn default() -> Self {
        Self::from_set(KeywordSet::Default)
    }
}
