use std::path::{Path, PathBuf};

use fixscope_core::{FilterConfig, FixscopeError};

/// Number of bytes to check for binary detection.
const BINARY_CHECK_SIZE: usize = 8192;

/// A repository checkout found in the repositories directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoEntry {
    /// Directory name, used as the repository name.
    pub name: String,
    /// Absolute or caller-relative path to the checkout.
    pub path: PathBuf,
}

/// List the repositories under `dir`.
///
/// A repository is any immediate subdirectory containing a `.git` directory.
/// Results are sorted by name, ignoring case.
///
/// # Errors
///
/// Returns [`FixscopeError::FileNotFound`] if `dir` does not exist, or
/// [`FixscopeError::Io`] if it cannot be read.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use fixscope_scan::walker::discover_repositories;
///
/// for repo in discover_repositories(Path::new("./repos")).unwrap() {
///     println!("{}", repo.name);
/// }
/// ```
pub fn discover_repositories(dir: &Path) -> Result<Vec<RepoEntry>, FixscopeError> {
    if !dir.is_dir() {
        return Err(FixscopeError::FileNotFound(dir.to_path_buf()));
    }

    let mut repos = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() || !path.join(".git").is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        repos.push(RepoEntry { name, path });
    }

    repos.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
    Ok(repos)
}

/// Decides which files of a repository are scanned.
///
/// Exclusion patterns containing `*` are globs matched against the relative
/// path; all others exclude a file when they occur anywhere in it.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use fixscope_scan::walker::SourceFilter;
///
/// let filter = SourceFilter::new(vec!["java".into()], vec!["test".into(), "**/gen/*".into()]);
/// assert!(filter.accepts(Path::new("src/main/java/App.java")));
/// assert!(!filter.accepts(Path::new("src/test/java/AppTest.java")));
/// assert!(!filter.accepts(Path::new("out/gen/Parser.java")));
/// assert!(!filter.accepts(Path::new("README.md")));
/// ```
#[derive(Debug, Clone)]
pub struct SourceFilter {
    extensions: Vec<String>,
    fragments: Vec<String>,
    globs: Vec<glob::Pattern>,
}

impl SourceFilter {
    /// Build a filter. Invalid glob patterns are ignored with a warning.
    pub fn new(extensions: Vec<String>, exclude_patterns: Vec<String>) -> Self {
        let mut fragments = Vec::new();
        let mut globs = Vec::new();
        for pattern in exclude_patterns {
            if pattern.contains('*') {
                match glob::Pattern::new(&pattern) {
                    Ok(p) => globs.push(p),
                    Err(e) => tracing::warn!(pattern = %pattern, error = %e, "invalid exclude glob"),
                }
            } else {
                fragments.push(pattern);
            }
        }
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect(),
            fragments,
            globs,
        }
    }

    /// Build a filter from the `[filters]` config section.
    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(config.extensions.clone(), config.exclude_patterns.clone())
    }

    /// Whether `relative` has a scanned extension and matches no exclusion.
    pub fn accepts(&self, relative: &Path) -> bool {
        let Some(ext) = relative.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        if !self.extensions.iter().any(|e| e == ext) {
            return false;
        }
        let text = relative.to_string_lossy();
        if self.fragments.iter().any(|f| text.contains(f.as_str())) {
            return false;
        }
        !self.globs.iter().any(|g| g.matches_path(relative))
    }
}

impl Default for SourceFilter {
    fn default() -> Self {
        Self::from_config(&FilterConfig::default())
    }
}

/// A source file selected for scanning.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use fixscope_scan::walker::SourceFile;
///
/// let file = SourceFile {
///     name: "App.java".into(),
///     path: PathBuf::from("src/main/java/App.java"),
/// };
/// assert_eq!(file.relative_str(), "src/main/java/App.java");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// File name without directories.
    pub name: String,
    /// Path relative to the repository root.
    pub path: PathBuf,
}

impl SourceFile {
    /// The relative path with `/` separators, as handed to the history provider.
    pub fn relative_str(&self) -> String {
        self.path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Walk a repository and return the files accepted by `filter`.
///
/// Hidden directories (including `.git`) are skipped; `.gitignore` rules
/// are not applied, so checked-in generated sources are still scanned.
/// Files are sorted by lowercased file name, then by path.
///
/// # Errors
///
/// Returns [`FixscopeError::FileNotFound`] if `root` does not exist.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use fixscope_scan::walker::{walk_sources, SourceFilter};
///
/// let files = walk_sources(Path::new("repos/guava"), &SourceFilter::default()).unwrap();
/// println!("{} source files", files.len());
/// ```
pub fn walk_sources(root: &Path, filter: &SourceFilter) -> Result<Vec<SourceFile>, FixscopeError> {
    if !root.is_dir() {
        return Err(FixscopeError::FileNotFound(root.to_path_buf()));
    }

    let walker = ignore::WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(true)
        .build();
    let mut files = Vec::new();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };

        let Some(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_file() {
            continue;
        }

        let relative = match entry.path().strip_prefix(root) {
            Ok(r) => r.to_path_buf(),
            Err(_) => continue,
        };
        if !filter.accepts(&relative) {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        files.push(SourceFile {
            name,
            path: relative,
        });
    }

    files.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.path.cmp(&b.path))
    });
    Ok(files)
}

/// Read a source file as lines, replacing invalid UTF-8.
///
/// # Errors
///
/// Returns [`FixscopeError::Io`] if the file cannot be read, or
/// [`FixscopeError::Parse`] if it looks binary.
pub fn read_source(path: &Path) -> Result<String, FixscopeError> {
    let bytes = std::fs::read(path)?;
    let check_len = bytes.len().min(BINARY_CHECK_SIZE);
    if bytes[..check_len].contains(&0) {
        return Err(FixscopeError::Parse(format!(
            "binary content in {}",
            path.display()
        )));
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
