//! Per-repository method aggregation.
//!
//! Scans every selected source file, asks the history provider about each
//! method span, classifies the answer, and keeps one [`AggregatedMethod`] per
//! method that has at least one recorded change. Provider and file failures
//! are logged and skipped; only setup problems abort a run.

use std::sync::Arc;

use fixscope_core::{AggregatedMethod, FilterConfig, FixKeywords, FixscopeError, Span};
use fixscope_history::{classify, ClassifiedSet, HistoryProvider, HistoryQuery, ProviderError};
use fixscope_scan::boundary;
use fixscope_scan::walker::{read_source, walk_sources, RepoEntry, SourceFilter};
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinSet;

use crate::store::AggregationStore;

/// Size and history thresholds applied to methods.
///
/// # Examples
///
/// ```
/// use fixscope_pipeline::aggregate::MethodFilter;
///
/// let filter = MethodFilter { min_size: 3, max_size: Some(100), min_commits: 2 };
/// assert!(filter.accepts_size(3));
/// assert!(!filter.accepts_size(101));
/// assert!(!filter.accepts_commits(1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodFilter {
    /// Smallest method size queried.
    pub min_size: u32,
    /// Largest method size queried.
    pub max_size: Option<u32>,
    /// Fewest recorded changes for a method to be kept.
    pub min_commits: u32,
}

impl MethodFilter {
    pub fn from_config(config: &FilterConfig) -> Self {
        Self {
            min_size: config.min_size,
            max_size: config.max_size,
            min_commits: config.min_commits.max(1),
        }
    }

    pub fn accepts_size(&self, size: u32) -> bool {
        size >= self.min_size && self.max_size.map_or(true, |max| size <= max)
    }

    pub fn accepts_commits(&self, commits: u32) -> bool {
        commits >= self.min_commits.max(1)
    }
}

impl Default for MethodFilter {
    fn default() -> Self {
        Self::from_config(&FilterConfig::default())
    }
}

/// Knobs for one aggregation run.
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    /// Maximum concurrent provider calls (at least 1).
    pub jobs: usize,
    /// Maximum files scanned per repository.
    pub file_limit: Option<usize>,
    /// Maximum methods queried per repository.
    pub method_limit: Option<usize>,
    /// Recompute even when a document already exists.
    pub force: bool,
    pub methods: MethodFilter,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            file_limit: Some(50),
            method_limit: None,
            force: false,
            methods: MethodFilter::default(),
        }
    }
}

/// Counters describing one repository run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub methods_found: usize,
    pub methods_filtered: usize,
    pub provider_calls: usize,
    pub provider_failures: usize,
    /// Methods whose history had no well-formed change (or too few).
    pub methods_without_history: usize,
}

/// Result of aggregating one repository.
#[derive(Debug, Clone)]
pub struct RepoOutcome {
    pub repository: String,
    /// Aggregated methods sorted by `(file_path, name, start_line)`.
    pub methods: Vec<AggregatedMethod>,
    /// `true` when loaded from an existing document without provider calls.
    pub resumed: bool,
    pub stats: AggregateStats,
}

/// One provider lookup to perform.
#[derive(Debug, Clone)]
pub struct MethodTask {
    /// Caller-assigned identifier, carried through unchanged.
    pub id: usize,
    pub query: HistoryQuery,
    pub span: Span,
}

/// Build the aggregated record for a classified history.
///
/// Returns `None` when the history has no changes.
///
/// # Examples
///
/// ```
/// use fixscope_core::Span;
/// use fixscope_history::ClassifiedSet;
/// use fixscope_pipeline::aggregate::aggregate_method;
///
/// let span = Span::new("run", 10, 19);
/// assert!(aggregate_method("demo", "A.java", &span, &ClassifiedSet::default()).is_none());
/// ```
pub fn aggregate_method(
    repository: &str,
    file_path: &str,
    span: &Span,
    classified: &ClassifiedSet,
) -> Option<AggregatedMethod> {
    if classified.total == 0 {
        return None;
    }
    Some(AggregatedMethod {
        name: span.name.clone(),
        file_path: file_path.to_string(),
        start_line: span.start_line,
        end_line: span.end_line,
        size_lines: span.size(),
        repository: repository.to_string(),
        commit_count: classified.total,
        fix_commit_count: classified.fix_count,
        fix_ratio: classified.ratio(),
        fix_commit_ids: classified.fix_ids(),
    })
}

/// Stable sort into persistence order.
pub fn sort_methods(methods: &mut [AggregatedMethod]) {
    methods.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

/// Drives the provider over the methods of each repository.
pub struct Aggregator<P, S> {
    provider: Arc<P>,
    store: S,
    keywords: FixKeywords,
    sources: SourceFilter,
    options: AggregateOptions,
}

impl<P, S> Aggregator<P, S>
where
    P: HistoryProvider + 'static,
    S: AggregationStore,
{
    pub fn new(
        provider: P,
        store: S,
        keywords: FixKeywords,
        sources: SourceFilter,
        options: AggregateOptions,
    ) -> Self {
        Self {
            provider: Arc::new(provider),
            store,
            keywords,
            sources,
            options,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn keywords(&self) -> &FixKeywords {
        &self.keywords
    }

    pub fn sources(&self) -> &SourceFilter {
        &self.sources
    }

    pub fn options(&self) -> &AggregateOptions {
        &self.options
    }

    /// Aggregate one repository and persist the result.
    ///
    /// When a document already exists and `force` is off, it is returned as is
    /// and the provider is not called. A document that cannot be read is
    /// recomputed and overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`FixscopeError`] only if the checkout cannot be walked or the
    /// store cannot save; per-file and per-method problems are skipped.
    pub async fn run_repository(&self, repo: &RepoEntry) -> Result<RepoOutcome, FixscopeError> {
        if !self.options.force {
            match self.store.load(&repo.name) {
                Ok(Some(methods)) => {
                    tracing::info!(repository = %repo.name, methods = methods.len(), "reusing existing aggregation document");
                    return Ok(RepoOutcome {
                        repository: repo.name.clone(),
                        methods,
                        resumed: true,
                        stats: AggregateStats::default(),
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(repository = %repo.name, error = %e, "unreadable aggregation document, recomputing");
                }
            }
        }

        let mut stats = AggregateStats::default();
        let tasks = self.plan(repo, &mut stats)?;
        let mut methods = self.execute(tasks, &mut stats).await;
        sort_methods(&mut methods);

        self.store.save(&repo.name, &methods)?;
        tracing::info!(
            repository = %repo.name,
            methods = methods.len(),
            failures = stats.provider_failures,
            "repository aggregated"
        );
        Ok(RepoOutcome {
            repository: repo.name.clone(),
            methods,
            resumed: false,
            stats,
        })
    }

    /// List the provider lookups for `repo`, honoring file, size and method limits.
    pub fn plan(
        &self,
        repo: &RepoEntry,
        stats: &mut AggregateStats,
    ) -> Result<Vec<MethodTask>, FixscopeError> {
        let files = walk_sources(&repo.path, &self.sources)?;
        let file_limit = self.options.file_limit.unwrap_or(usize::MAX);
        let method_limit = self.options.method_limit.unwrap_or(usize::MAX);
        tracing::info!(repository = %repo.name, files = files.len(), "source files found");

        let mut tasks = Vec::new();
        for file in files.into_iter().take(file_limit) {
            let content = match read_source(&repo.path.join(&file.path)) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(repository = %repo.name, file = %file.path.display(), error = %e, "skipping unreadable file");
                    stats.files_skipped += 1;
                    continue;
                }
            };
            stats.files_scanned += 1;

            let file_path = file.relative_str();
            for span in boundary::scan_source(&content) {
                stats.methods_found += 1;
                if !self.options.methods.accepts_size(span.size()) {
                    stats.methods_filtered += 1;
                    continue;
                }
                if tasks.len() >= method_limit {
                    continue;
                }
                tasks.push(MethodTask {
                    id: tasks.len(),
                    query: HistoryQuery {
                        repository: repo.name.clone(),
                        repo_path: repo.path.clone(),
                        file_path: file_path.clone(),
                        method_name: span.name.clone(),
                        start_line: span.start_line,
                    },
                    span,
                });
            }
        }
        Ok(tasks)
    }

    /// Run `tasks` with at most `jobs` provider calls in flight.
    ///
    /// Output order follows completion order; callers sort before persisting.
    pub async fn execute(
        &self,
        tasks: Vec<MethodTask>,
        stats: &mut AggregateStats,
    ) -> Vec<AggregatedMethod> {
        let mut methods = Vec::new();
        for (task, result) in self.fetch_all(tasks).await {
            stats.provider_calls += 1;
            let value = match result {
                Ok(v) => v,
                Err(e) => {
                    stats.provider_failures += 1;
                    log_failure(&task.query, &e);
                    continue;
                }
            };
            match self.aggregate(&task, &value) {
                Some(method) => methods.push(method),
                None => {
                    tracing::debug!(query = %task.query, "no usable history");
                    stats.methods_without_history += 1;
                }
            }
        }
        methods
    }

    /// Classify a fetched history and apply the commit threshold.
    pub fn aggregate(&self, task: &MethodTask, value: &Value) -> Option<AggregatedMethod> {
        let classified = classify(value, &self.keywords);
        if !self.options.methods.accepts_commits(classified.total) {
            return None;
        }
        let method = aggregate_method(
            &task.query.repository,
            &task.query.file_path,
            &task.span,
            &classified,
        )?;
        tracing::debug!(
            query = %task.query,
            size = method.size_lines,
            fixes = method.fix_commit_count,
            commits = method.commit_count,
            "method aggregated"
        );
        Some(method)
    }

    /// Fetch every task's history, bounded by `jobs`, returning `(task, result)`
    /// pairs in completion order.
    pub async fn fetch_all(
        &self,
        tasks: Vec<MethodTask>,
    ) -> Vec<(MethodTask, Result<Value, ProviderError>)> {
        let jobs = self.options.jobs.max(1);
        let mut pending = tasks.into_iter();
        let mut set = JoinSet::new();
        let mut results = Vec::new();

        loop {
            while set.len() < jobs {
                let Some(task) = pending.next() else { break };
                let provider = Arc::clone(&self.provider);
                set.spawn(async move {
                    let result = provider.fetch(&task.query).await;
                    (task, result)
                });
            }
            match set.join_next().await {
                Some(Ok(pair)) => results.push(pair),
                Some(Err(e)) => tracing::warn!(error = %e, "history lookup task failed"),
                None => break,
            }
        }
        results
    }
}

pub(crate) fn log_failure(query: &HistoryQuery, error: &ProviderError) {
    tracing::warn!(
        repository = %query.repository,
        file = %query.file_path,
        method = %query.method_name,
        line = query.start_line,
        kind = error.kind(),
        error = %error,
        "history lookup failed, skipping method"
    );
}
