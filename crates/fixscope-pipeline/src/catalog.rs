//! Resumable per-repository catalog of files and methods.
//!
//! A [`RepoCatalog`] owns its files and methods in two flat arenas addressed
//! by [`FileId`] and [`MethodId`]. Every entity carries a [`Stage`] that only
//! moves forward, so a catalog saved mid-run can be reloaded and continued.

use std::fmt;
use std::path::{Path, PathBuf};

use fixscope_core::{FixscopeError, Span};
use fixscope_scan::walker::{discover_repositories, walk_sources, SourceFilter};
use serde::{Deserialize, Serialize};

use crate::store::write_atomic;

/// Processing stage of a repository, file, or method.
///
/// # Examples
///
/// ```
/// use fixscope_pipeline::catalog::Stage;
///
/// assert!(Stage::Discovered < Stage::FilesExtracted);
/// assert!(Stage::MethodsExtracted < Stage::Analyzed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    /// Known to exist; nothing extracted yet.
    Discovered,
    /// Source files listed.
    FilesExtracted,
    /// Method spans listed.
    MethodsExtracted,
    /// History analysis finished.
    Analyzed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Discovered => "discovered",
            Stage::FilesExtracted => "files-extracted",
            Stage::MethodsExtracted => "methods-extracted",
            Stage::Analyzed => "analyzed",
        };
        f.write_str(label)
    }
}

/// Move `current` to `next`, refusing to go backwards.
fn advance(current: &mut Stage, next: Stage, entity: impl FnOnce() -> String) -> Result<(), FixscopeError> {
    if next < *current {
        return Err(FixscopeError::StageRegression {
            entity: entity(),
            from: current.to_string(),
            to: next.to_string(),
        });
    }
    *current = next;
    Ok(())
}

/// Index of a file within its [`RepoCatalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub usize);

/// Index of a method within its [`RepoCatalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodId(pub usize);

/// Classified history of one method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodHistory {
    pub commit_count: u32,
    pub fix_commit_count: u32,
    pub fix_ratio: f64,
    pub fix_commit_ids: Vec<String>,
    /// Identifiers of every well-formed change, in provider order.
    pub change_ids: Vec<String>,
}

/// A source file of the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// File name without directories.
    pub name: String,
    /// Path relative to the repository root, `/`-separated.
    pub path: String,
    pub stage: Stage,
    /// Methods of this file, in scanner order.
    pub methods: Vec<MethodId>,
}

/// A method span of a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodEntry {
    pub file: FileId,
    pub name: String,
    pub start_line: u32,
    pub end_line: u32,
    pub size_lines: u32,
    pub stage: Stage,
    /// `None` until analyzed, and also when the method had no recorded changes.
    pub history: Option<MethodHistory>,
}

/// Catalog of one repository and everything extracted from it.
///
/// # Examples
///
/// ```
/// use fixscope_core::Span;
/// use fixscope_pipeline::catalog::{RepoCatalog, Stage};
///
/// let mut catalog = RepoCatalog::new("demo", "repos/demo");
/// let file = catalog.add_file("A.java", "src/A.java");
/// catalog.mark_files_extracted().unwrap();
/// let methods = catalog.extract_methods(file, &[Span::new("run", 3, 9)]).unwrap();
/// assert_eq!(catalog.method(methods[0]).size_lines, 7);
/// assert_eq!(catalog.file(file).stage, Stage::MethodsExtracted);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoCatalog {
    pub name: String,
    pub path: PathBuf,
    pub stage: Stage,
    files: Vec<FileEntry>,
    methods: Vec<MethodEntry>,
}

impl RepoCatalog {
    /// An empty catalog in the [`Stage::Discovered`] stage.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            stage: Stage::Discovered,
            files: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// One fresh catalog per repository under `repos_dir`, in name order.
    ///
    /// # Errors
    ///
    /// Propagates discovery errors such as a missing directory.
    pub fn discover(repos_dir: &Path) -> Result<Vec<Self>, FixscopeError> {
        Ok(discover_repositories(repos_dir)?
            .into_iter()
            .map(|repo| Self::new(repo.name, repo.path))
            .collect())
    }

    /// All files, indexed by [`FileId`].
    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    /// All methods, indexed by [`MethodId`].
    pub fn methods(&self) -> &[MethodEntry] {
        &self.methods
    }

    pub fn file(&self, id: FileId) -> &FileEntry {
        &self.files[id.0]
    }

    pub fn method(&self, id: MethodId) -> &MethodEntry {
        &self.methods[id.0]
    }

    /// Iterate files with their ids.
    pub fn file_ids(&self) -> impl Iterator<Item = FileId> + '_ {
        (0..self.files.len()).map(FileId)
    }

    /// Append a file in the [`Stage::Discovered`] stage.
    pub fn add_file(&mut self, name: impl Into<String>, path: impl Into<String>) -> FileId {
        let id = FileId(self.files.len());
        self.files.push(FileEntry {
            name: name.into(),
            path: path.into(),
            stage: Stage::Discovered,
            methods: Vec::new(),
        });
        id
    }

    /// Advance the repository to [`Stage::FilesExtracted`].
    pub fn mark_files_extracted(&mut self) -> Result<(), FixscopeError> {
        let name = self.name.clone();
        advance(&mut self.stage, Stage::FilesExtracted, || format!("repository {name}"))
    }

    /// Walk the checkout and append every accepted source file, then advance
    /// the repository to [`Stage::FilesExtracted`].
    ///
    /// Does nothing if files were already extracted. `limit` caps the number
    /// of files taken, in walk order.
    ///
    /// # Errors
    ///
    /// Propagates walk errors such as a missing checkout.
    pub fn extract_files(
        &mut self,
        filter: &SourceFilter,
        limit: Option<usize>,
    ) -> Result<usize, FixscopeError> {
        if self.stage >= Stage::FilesExtracted {
            return Ok(0);
        }
        let sources = walk_sources(&self.path, filter)?;
        let take = limit.unwrap_or(usize::MAX);
        let mut added = 0;
        for source in sources.into_iter().take(take) {
            let path = source.relative_str();
            self.add_file(source.name, path);
            added += 1;
        }
        self.mark_files_extracted()?;
        Ok(added)
    }

    /// Append `spans` as methods of `file` and advance the file to
    /// [`Stage::MethodsExtracted`].
    ///
    /// # Errors
    ///
    /// Returns [`FixscopeError::StageRegression`] if the file was already past
    /// method extraction; nothing is appended in that case.
    pub fn extract_methods(
        &mut self,
        file: FileId,
        spans: &[Span],
    ) -> Result<Vec<MethodId>, FixscopeError> {
        if self.files[file.0].stage > Stage::MethodsExtracted {
            let entry = &self.files[file.0];
            return Err(FixscopeError::StageRegression {
                entity: format!("file {}", entry.path),
                from: entry.stage.to_string(),
                to: Stage::MethodsExtracted.to_string(),
            });
        }
        if self.files[file.0].stage == Stage::MethodsExtracted {
            return Ok(self.files[file.0].methods.clone());
        }

        let mut ids = Vec::with_capacity(spans.len());
        for span in spans {
            let id = MethodId(self.methods.len());
            self.methods.push(MethodEntry {
                file,
                name: span.name.clone(),
                start_line: span.start_line,
                end_line: span.end_line,
                size_lines: span.size(),
                stage: Stage::MethodsExtracted,
                history: None,
            });
            ids.push(id);
        }

        let entry = &mut self.files[file.0];
        entry.methods.extend(ids.iter().copied());
        let path = entry.path.clone();
        advance(&mut entry.stage, Stage::MethodsExtracted, || format!("file {path}"))?;
        if spans.is_empty() {
            // Nothing to analyze.
            entry.stage = Stage::Analyzed;
            self.refresh_repository_stage();
        }
        Ok(ids)
    }

    /// Store the outcome of analyzing `method` and advance it to
    /// [`Stage::Analyzed`], cascading to its file and the repository once
    /// all their methods are analyzed.
    ///
    /// # Errors
    ///
    /// Returns [`FixscopeError::StageRegression`] if the method was never
    /// extracted properly (its stage is below `MethodsExtracted`).
    pub fn record_analysis(
        &mut self,
        method: MethodId,
        history: Option<MethodHistory>,
    ) -> Result<(), FixscopeError> {
        let entry = &mut self.methods[method.0];
        if entry.stage < Stage::MethodsExtracted {
            return Err(FixscopeError::StageRegression {
                entity: format!("method {}", entry.name),
                from: entry.stage.to_string(),
                to: Stage::Analyzed.to_string(),
            });
        }
        entry.stage = Stage::Analyzed;
        entry.history = history;
        let file = entry.file;

        let all_done = self.files[file.0]
            .methods
            .iter()
            .all(|m| self.methods[m.0].stage == Stage::Analyzed);
        if all_done {
            self.files[file.0].stage = Stage::Analyzed;
            self.refresh_repository_stage();
        }
        Ok(())
    }

    /// Methods not yet analyzed, in arena order.
    pub fn pending_methods(&self) -> Vec<MethodId> {
        self.methods
            .iter()
            .enumerate()
            .filter(|(_, m)| m.stage < Stage::Analyzed)
            .map(|(i, _)| MethodId(i))
            .collect()
    }

    /// Files whose methods have not been extracted yet.
    pub fn pending_files(&self) -> Vec<FileId> {
        self.file_ids()
            .filter(|id| self.files[id.0].stage < Stage::MethodsExtracted)
            .collect()
    }

    /// Count of entities per stage: `(files_analyzed, methods_analyzed, methods_total)`.
    pub fn progress(&self) -> (usize, usize, usize) {
        let files = self.files.iter().filter(|f| f.stage == Stage::Analyzed).count();
        let methods = self
            .methods
            .iter()
            .filter(|m| m.stage == Stage::Analyzed)
            .count();
        (files, methods, self.methods.len())
    }

    fn refresh_repository_stage(&mut self) {
        if self.stage >= Stage::FilesExtracted
            && self.files.iter().all(|f| f.stage == Stage::Analyzed)
        {
            self.stage = Stage::Analyzed;
        }
    }

    /// Path of the catalog document for `repository` inside `dir`.
    pub fn document_path(dir: &Path, repository: &str) -> PathBuf {
        dir.join(format!("{repository}.catalog.json"))
    }

    /// Load the saved catalog for `repository`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`FixscopeError::Io`] or [`FixscopeError::Serialization`] if
    /// the document exists but cannot be read.
    pub fn load(dir: &Path, repository: &str) -> Result<Option<Self>, FixscopeError> {
        let path = Self::document_path(dir, repository);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Save this catalog into `dir`, creating it if needed.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, FixscopeError> {
        std::fs::create_dir_all(dir)?;
        let path = Self::document_path(dir, &self.name);
        let content = serde_json::to_string_pretty(self)?;
        write_atomic(&path, &content)?;
        Ok(path)
    }
}
