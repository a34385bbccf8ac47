use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::FixscopeError;
use crate::keywords::{FixKeywords, KeywordSet};

/// Environment variable holding a comma-separated fix keyword list.
pub const KEYWORDS_ENV: &str = "FIXSCOPE_KEYWORDS";

/// Top-level configuration loaded from `.fixscope.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
///
/// # Examples
///
/// ```
/// use fixscope_core::FixscopeConfig;
///
/// let config = FixscopeConfig::default();
/// assert_eq!(config.analysis.timeout_secs, 300);
/// assert_eq!(config.report.small_max, 10);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixscopeConfig {
    /// Input and output locations.
    #[serde(default)]
    pub paths: PathsConfig,
    /// History analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// File and method filters.
    #[serde(default)]
    pub filters: FilterConfig,
    /// Statistics and rendering settings.
    #[serde(default)]
    pub report: ReportConfig,
    /// GitHub repository sourcing.
    #[serde(default)]
    pub sources: SourcesConfig,
}

impl FixscopeConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FixscopeError::Io`] if the file cannot be read, or
    /// [`FixscopeError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fixscope_core::FixscopeConfig;
    /// use std::path::Path;
    ///
    /// let config = FixscopeConfig::from_file(Path::new(".fixscope.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, FixscopeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`FixscopeError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use fixscope_core::FixscopeConfig;
    ///
    /// let toml = r#"
    /// [analysis]
    /// keyword_set = "strict"
    /// jobs = 4
    /// "#;
    /// let config = FixscopeConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.analysis.jobs, 4);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, FixscopeError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply `FIXSCOPE_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply `FIXSCOPE_*` overrides using `lookup` to read variables.
    ///
    /// Unparseable numeric values are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use fixscope_core::FixscopeConfig;
    ///
    /// let mut config = FixscopeConfig::default();
    /// config.apply_env_with(|key| match key {
    ///     "FIXSCOPE_KEYWORDS" => Some("defect,crash".into()),
    ///     _ => None,
    /// });
    /// assert!(config.fix_keywords().matches("Crash on startup"));
    /// ```
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("FIXSCOPE_REPOSITORIES_DIR") {
            self.paths.repositories_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("FIXSCOPE_RESULTS_DIR") {
            self.paths.results_dir = PathBuf::from(dir);
        }
        if let Some(jar) = lookup("FIXSCOPE_CODESHOVEL_JAR") {
            self.paths.codeshovel_jar = PathBuf::from(jar);
        }
        if let Some(list) = lookup(KEYWORDS_ENV) {
            let words: Vec<String> = list
                .split(',')
                .map(|w| w.trim().to_string())
                .filter(|w| !w.is_empty())
                .collect();
            if !words.is_empty() {
                self.analysis.keywords = Some(words);
            }
        }
        if let Some(secs) = lookup("FIXSCOPE_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.analysis.timeout_secs = secs;
        }
        if let Some(jobs) = lookup("FIXSCOPE_JOBS").and_then(|s| s.parse().ok()) {
            self.analysis.jobs = jobs;
        }
    }

    /// The effective fix keywords: an explicit list wins over the preset.
    pub fn fix_keywords(&self) -> FixKeywords {
        match &self.analysis.keywords {
            Some(words) => FixKeywords::new(words),
            None => FixKeywords::from_set(self.analysis.keyword_set),
        }
    }

    /// Check the configuration for values the pipeline cannot work with.
    ///
    /// Returns every problem found; an empty list means the config is usable.
    ///
    /// # Examples
    ///
    /// ```
    /// use fixscope_core::FixscopeConfig;
    ///
    /// let mut config = FixscopeConfig::default();
    /// assert!(config.validate().is_empty());
    ///
    /// config.report.medium_max = 5;
    /// assert_eq!(config.validate().len(), 1);
    /// ```
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.fix_keywords().is_empty() {
            problems.push("at least one fix keyword is required".to_string());
        }
        if self.report.small_max == 0 || self.report.medium_max <= self.report.small_max {
            problems.push(format!(
                "size tiers must be increasing: small_max={} medium_max={}",
                self.report.small_max, self.report.medium_max
            ));
        }
        if self.analysis.timeout_secs == 0 {
            problems.push("timeout_secs must be positive".to_string());
        }
        if self.analysis.jobs == 0 {
            problems.push("jobs must be at least 1".to_string());
        }
        if let Some(max) = self.filters.max_size {
            if max < self.filters.min_size {
                problems.push(format!(
                    "filters.max_size ({max}) is below filters.min_size ({})",
                    self.filters.min_size
                ));
            }
        }
        problems
    }
}

/// Input and output locations.
///
/// # Examples
///
/// ```
/// use fixscope_core::PathsConfig;
///
/// let paths = PathsConfig::default();
/// assert_eq!(paths.repositories_dir.to_str(), Some("./repos"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory containing one checkout per repository (default: `./repos`).
    #[serde(default = "default_repositories_dir")]
    pub repositories_dir: PathBuf,
    /// Directory for aggregation documents and reports
    /// (default: `./fix_analysis_results`).
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    /// Path to the CodeShovel jar (default: `codeshovel.jar`).
    #[serde(default = "default_codeshovel_jar")]
    pub codeshovel_jar: PathBuf,
}

fn default_repositories_dir() -> PathBuf {
    PathBuf::from("./repos")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("./fix_analysis_results")
}

fn default_codeshovel_jar() -> PathBuf {
    PathBuf::from("codeshovel.jar")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            repositories_dir: default_repositories_dir(),
            results_dir: default_results_dir(),
            codeshovel_jar: default_codeshovel_jar(),
        }
    }
}

/// History analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Keyword preset used when `keywords` is not set (default: `default`).
    #[serde(default)]
    pub keyword_set: KeywordSet,
    /// Explicit keyword list, overriding the preset.
    pub keywords: Option<Vec<String>>,
    /// Per-method provider timeout in seconds (default: 300).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum repositories per run (default: 5).
    #[serde(default = "default_repo_limit")]
    pub repo_limit: Option<usize>,
    /// Maximum source files per repository (default: 50).
    #[serde(default = "default_file_limit")]
    pub file_limit: Option<usize>,
    /// Maximum methods per repository (default: unlimited).
    pub method_limit: Option<usize>,
    /// Concurrent provider calls per repository (default: 1).
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    /// Java executable used to run CodeShovel (default: `java`).
    #[serde(default = "default_java")]
    pub java: String,
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_repo_limit() -> Option<usize> {
    Some(5)
}

fn default_file_limit() -> Option<usize> {
    Some(50)
}

fn default_jobs() -> usize {
    1
}

fn default_java() -> String {
    "java".into()
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            keyword_set: KeywordSet::Default,
            keywords: None,
            timeout_secs: default_timeout_secs(),
            repo_limit: default_repo_limit(),
            file_limit: default_file_limit(),
            method_limit: None,
            jobs: default_jobs(),
            java: default_java(),
        }
    }
}

/// File and method filters.
///
/// # Examples
///
/// ```
/// use fixscope_core::FilterConfig;
///
/// let filters = FilterConfig::default();
/// assert_eq!(filters.extensions, vec!["java"]);
/// assert!(filters.exclude_patterns.contains(&"test".to_string()));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Source file extensions to scan, without the dot (default: `["java"]`).
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Path fragments or globs that exclude a file.
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
    /// Smallest method size to analyze, in lines (default: 1).
    #[serde(default = "default_min_size")]
    pub min_size: u32,
    /// Largest method size to analyze, in lines.
    pub max_size: Option<u32>,
    /// Minimum recorded changes for a method to be kept (default: 1).
    #[serde(default = "default_min_commits")]
    pub min_commits: u32,
}

fn default_extensions() -> Vec<String> {
    vec!["java".into()]
}

fn default_exclude_patterns() -> Vec<String> {
    ["test", "Test", "target", "build"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_min_size() -> u32 {
    1
}

fn default_min_commits() -> u32 {
    1
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            exclude_patterns: default_exclude_patterns(),
            min_size: default_min_size(),
            max_size: None,
            min_commits: default_min_commits(),
        }
    }
}

/// Statistics and rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Largest size counted as a small method (default: 10).
    #[serde(default = "default_small_max")]
    pub small_max: u32,
    /// Largest size counted as a medium method (default: 50).
    #[serde(default = "default_medium_max")]
    pub medium_max: u32,
    /// Number of methods listed in the top fix ratio table (default: 10).
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Chart width in pixels (default: 1200).
    #[serde(default = "default_chart_width")]
    pub chart_width: u32,
    /// Chart height in pixels (default: 900).
    #[serde(default = "default_chart_height")]
    pub chart_height: u32,
}

fn default_small_max() -> u32 {
    10
}

fn default_medium_max() -> u32 {
    50
}

fn default_top_k() -> usize {
    10
}

fn default_chart_width() -> u32 {
    1200
}

fn default_chart_height() -> u32 {
    900
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            small_max: default_small_max(),
            medium_max: default_medium_max(),
            top_k: default_top_k(),
            chart_width: default_chart_width(),
            chart_height: default_chart_height(),
        }
    }
}

/// GitHub repository sourcing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Repository language to search for (default: `Java`).
    #[serde(default = "default_language")]
    pub language: String,
    /// Minimum star count (default: 5000).
    #[serde(default = "default_min_stars")]
    pub min_stars: u32,
    /// Number of repositories to fetch (default: 20).
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// File listing one clone URL per line (default: `repos/top_repos.txt`).
    #[serde(default = "default_list_file")]
    pub list_file: PathBuf,
}

fn default_language() -> String {
    "Java".into()
}

fn default_min_stars() -> u32 {
    5000
}

fn default_top_n() -> usize {
    20
}

fn default_list_file() -> PathBuf {
    PathBuf::from("repos/top_repos.txt")
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            min_stars: default_min_stars(),
            top_n: default_top_n(),
            list_file: default_list_file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = FixscopeConfig::default();
        assert_eq!(config.paths.results_dir, PathBuf::from("./fix_analysis_results"));
        assert_eq!(config.analysis.keyword_set, KeywordSet::Default);
        assert_eq!(config.analysis.timeout_secs, 300);
        assert_eq!(config.analysis.repo_limit, Some(5));
        assert_eq!(config.analysis.file_limit, Some(50));
        assert_eq!(config.analysis.jobs, 1);
        assert_eq!(config.analysis.java, "java");
        assert_eq!(config.filters.min_commits, 1);
        assert_eq!(config.report.medium_max, 50);
        assert_eq!(config.report.top_k, 10);
        assert_eq!(config.sources.min_stars, 5000);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = FixscopeConfig::from_toml("").unwrap();
        assert_eq!(config.analysis.timeout_secs, 300);
        assert_eq!(config.filters.extensions, vec!["java"]);
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[paths]
repositories_dir = "/data/repos"
codeshovel_jar = "/opt/codeshovel.jar"

[analysis]
keyword_set = "strict"
timeout_secs = 60
jobs = 8
method_limit = 200

[filters]
exclude_patterns = ["generated", "*.g.java"]
max_size = 1000

[report]
small_max = 5
medium_max = 25
"#;
        let config = FixscopeConfig::from_toml(toml).unwrap();
        assert_eq!(config.paths.repositories_dir, PathBuf::from("/data/repos"));
        assert_eq!(config.analysis.keyword_set, KeywordSet::Strict);
        assert_eq!(config.analysis.timeout_secs, 60);
        assert_eq!(config.analysis.jobs, 8);
        assert_eq!(config.analysis.method_limit, Some(200));
        assert_eq!(config.filters.exclude_patterns, vec!["generated", "*.g.java"]);
        assert_eq!(config.filters.max_size, Some(1000));
        assert_eq!(config.report.small_max, 5);
        assert_eq!(config.fix_keywords().words().len(), 12);
    }

    #[test]
    fn invalid_toml_returns_error() {
        assert!(FixscopeConfig::from_toml("{{invalid}}").is_err());
    }

    #[test]
    fn explicit_keywords_override_preset() {
        let toml = r#"
[analysis]
keyword_set = "strict"
keywords = ["regression"]
"#;
        let config = FixscopeConfig::from_toml(toml).unwrap();
        assert_eq!(config.fix_keywords().words(), &["regression"]);
    }

    #[test]
    fn env_overrides_paths_and_numbers() {
        let mut config = FixscopeConfig::default();
        config.apply_env_with(|key| match key {
            "FIXSCOPE_RESULTS_DIR" => Some("/tmp/out".into()),
            "FIXSCOPE_CODESHOVEL_JAR" => Some("/opt/cs.jar".into()),
            "FIXSCOPE_TIMEOUT_SECS" => Some("45".into()),
            "FIXSCOPE_JOBS" => Some("not-a-number".into()),
            _ => None,
        });
        assert_eq!(config.paths.results_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.paths.codeshovel_jar, PathBuf::from("/opt/cs.jar"));
        assert_eq!(config.analysis.timeout_secs, 45);
        assert_eq!(config.analysis.jobs, 1);
    }

    #[test]
    fn env_keywords_replace_configured_preset() {
        let mut config = FixscopeConfig::from_toml("[analysis]\nkeyword_set = \"strict\"\n").unwrap();
        assert!(config.fix_keywords().matches("hotfix for login"));

        config.apply_env_with(|key| (key == KEYWORDS_ENV).then(|| "Defect, crash".to_string()));
        let keywords = config.fix_keywords();
        assert_eq!(keywords.words(), &["defect", "crash"]);
        assert!(keywords.matches("Crash on startup"));
        assert!(!keywords.matches("hotfix for login"));
    }

    #[test]
    fn blank_keyword_env_is_ignored() {
        let mut config = FixscopeConfig::default();
        config.apply_env_with(|key| (key == KEYWORDS_ENV).then(|| " , ".to_string()));
        assert!(config.analysis.keywords.is_none());
        assert_eq!(config.fix_keywords(), FixKeywords::default());
    }

    #[test]
    fn validate_reports_every_problem() {
        let mut config = FixscopeConfig::default();
        config.analysis.keywords = Some(vec![]);
        config.analysis.timeout_secs = 0;
        config.analysis.jobs = 0;
        config.report.small_max = 20;
        config.report.medium_max = 20;
        assert_eq!(config.validate().len(), 4);
    }
}
