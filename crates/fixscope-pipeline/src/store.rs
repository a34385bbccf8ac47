use std::path::{Path, PathBuf};

use fixscope_core::{AggregatedMethod, FixscopeError};

/// Suffix of aggregation document file names.
pub const DOCUMENT_SUFFIX: &str = "_fix_analysis.json";

/// Persists per-repository collections of aggregated methods.
pub trait AggregationStore: Send + Sync {
    /// The saved collection for `repository`, or `None` if there is none.
    fn load(&self, repository: &str) -> Result<Option<Vec<AggregatedMethod>>, FixscopeError>;

    /// Replace the saved collection for `repository`.
    fn save(&self, repository: &str, methods: &[AggregatedMethod]) -> Result<(), FixscopeError>;

    /// Every saved collection, concatenated in repository name order.
    fn load_all(&self) -> Result<Vec<AggregatedMethod>, FixscopeError>;
}

/// Stores each repository as `<dir>/<repository>_fix_analysis.json`, a
/// pretty-printed JSON array with camelCase keys.
///
/// # Examples
///
/// ```
/// use fixscope_pipeline::store::JsonDirStore;
///
/// let store = JsonDirStore::new("fix_analysis_results");
/// assert!(store.document_path("guava").ends_with("guava_fix_analysis.json"));
/// ```
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory holding the documents.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document for `repository`.
    pub fn document_path(&self, repository: &str) -> PathBuf {
        self.dir.join(format!("{repository}{DOCUMENT_SUFFIX}"))
    }

    fn read(path: &Path) -> Result<Vec<AggregatedMethod>, FixscopeError> {
        let content = std::fs::read_to_string(path)?;
        let methods = serde_json::from_str(&content)?;
        Ok(methods)
    }
}

impl AggregationStore for JsonDirStore {
    fn load(&self, repository: &str) -> Result<Option<Vec<AggregatedMethod>>, FixscopeError> {
        let path = self.document_path(repository);
        if !path.exists() {
            return Ok(None);
        }
        Self::read(&path).map(Some)
    }

    fn save(&self, repository: &str, methods: &[AggregatedMethod]) -> Result<(), FixscopeError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.document_path(repository);
        let content = serde_json::to_string_pretty(methods)?;
        write_atomic(&path, &content)?;
        tracing::info!(repository, path = %path.display(), methods = methods.len(), "saved aggregation document");
        Ok(())
    }

    /// Unreadable or malformed documents are skipped with a warning.
    fn load_all(&self) -> Result<Vec<AggregatedMethod>, FixscopeError> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(DOCUMENT_SUFFIX))
            })
            .collect();
        paths.sort_by_key(|p| p.to_string_lossy().to_lowercase());

        let mut all = Vec::new();
        for path in paths {
            match Self::read(&path) {
                Ok(methods) => all.extend(methods),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable aggregation document");
                }
            }
        }
        Ok(all)
    }
}

/// Write `content` to `path` through a sibling `.tmp` file and a rename, so
/// an interrupted run never leaves a half-written document behind.
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<(), FixscopeError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(name: &str, repo: &str) -> AggregatedMethod {
        AggregatedMethod {
            name: name.into(),
            file_path: "src/A.java".into(),
            start_line: 1,
            end_line: 4,
            size_lines: 4,
            repository: repo.into(),
            commit_count: 3,
            fix_commit_count: 1,
            fix_ratio: 1.0 / 3.0,
            fix_commit_ids: vec!["abc".into()],
        }
    }

    #[test]
    fn save_then_load_is_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::new(dir.path().join("results"));
        let methods = vec![method("a", "demo"), method("b", "demo")];

        assert!(store.load("demo").unwrap().is_none());
        store.save("demo", &methods).unwrap();
        assert_eq!(store.load("demo").unwrap(), Some(methods));
    }

    #[test]
    fn document_is_pretty_camel_case_array() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::new(dir.path());
        store.save("demo", &[method("a", "demo")]).unwrap();

        let text = std::fs::read_to_string(store.document_path("demo")).unwrap();
        assert!(text.starts_with("[\n"));
        assert!(text.contains("\"fixCommitCount\": 1"));
    }

    #[test]
    fn load_all_concatenates_and_skips_bad_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::new(dir.path());
        store.save("beta", &[method("b", "beta")]).unwrap();
        store.save("Alpha", &[method("a", "Alpha")]).unwrap();
        std::fs::write(dir.path().join("broken_fix_analysis.json"), "{").unwrap();
        std::fs::write(dir.path().join("notes.json"), "[]").unwrap();

        let all = store.load_all().unwrap();
        let repos: Vec<&str> = all.iter().map(|m| m.repository.as_str()).collect();
        assert_eq!(repos, vec!["Alpha", "beta"]);
    }

    #[test]
    fn load_all_of_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::new(dir.path().join("nothing"));
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn non_dyadic_ratios_reload_bit_for_bit() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::new(dir.path());
        let mut methods = Vec::new();
        for total in 1..=60u32 {
            for fixes in 0..=total {
                let mut m = method(&format!("m{fixes}_{total}"), "demo");
                m.commit_count = total;
                m.fix_commit_count = fixes;
                m.fix_ratio = f64::from(fixes) / f64::from(total);
                methods.push(m);
            }
        }
        store.save("demo", &methods).unwrap();

        let loaded = store.load("demo").unwrap().unwrap();
        assert_eq!(loaded.len(), methods.len());
        for (saved, back) in methods.iter().zip(&loaded) {
            assert_eq!(saved.fix_ratio.to_bits(), back.fix_ratio.to_bits(), "{}", saved.name);
        }
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::new(dir.path());
        store.save("demo", &[method("a", "demo")]).unwrap();
        store.save("demo", &[method("b", "demo")]).unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["demo_fix_analysis.json".to_string()]);
        assert_eq!(store.load("demo").unwrap().unwrap()[0].name, "b");
    }

    #[test]
    fn malformed_document_load_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::new(dir.path());
        std::fs::write(store.document_path("demo"), "not json").unwrap();
        assert!(matches!(
            store.load("demo"),
            Err(FixscopeError::Serialization(_))
        ));
    }
}
