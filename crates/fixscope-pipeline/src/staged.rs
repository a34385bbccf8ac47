//! Catalog-driven aggregation that survives interruption.
//!
//! Each stage is recorded in a [`RepoCatalog`] saved next to the aggregation
//! documents. Re-running picks up where the previous run stopped: files are
//! walked once, methods are extracted once per file, and only methods not yet
//! analyzed reach the provider. A provider failure leaves the method pending
//! so the next run retries it.

use std::path::Path;

use fixscope_core::{AggregatedMethod, FixKeywords, FixscopeError, Span};
use fixscope_history::classify::{change_records, classify_records};
use fixscope_history::{HistoryProvider, HistoryQuery};
use fixscope_scan::boundary;
use fixscope_scan::walker::{read_source, RepoEntry};
use serde_json::Value;

use crate::aggregate::{
    log_failure, sort_methods, AggregateStats, Aggregator, MethodFilter, MethodTask, RepoOutcome,
};
use crate::catalog::{FileId, MethodHistory, MethodId, RepoCatalog, Stage};
use crate::store::AggregationStore;

/// Provider calls per `jobs` slot between catalog checkpoints.
const CHECKPOINT_FACTOR: usize = 16;

/// Classify `value` into a method history.
///
/// Returns `None` when the history has fewer changes than `filter` requires.
///
/// # Examples
///
/// ```
/// use fixscope_core::FixKeywords;
/// use fixscope_pipeline::aggregate::MethodFilter;
/// use fixscope_pipeline::staged::method_history;
/// use serde_json::json;
///
/// let value = json!({"changeHistoryDetails": {
///     "c1": {"commitMessage": "Fix NPE"},
///     "c2": {"commitMessage": "Rename"}
/// }});
/// let history = method_history(&value, &FixKeywords::default(), &MethodFilter::default()).unwrap();
/// assert_eq!(history.change_ids, vec!["c1", "c2"]);
/// assert_eq!(history.fix_ratio, 0.5);
/// ```
pub fn method_history(
    value: &Value,
    keywords: &FixKeywords,
    filter: &MethodFilter,
) -> Option<MethodHistory> {
    let records = change_records(value).unwrap_or_default();
    let change_ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
    let classified = classify_records(records, keywords);
    if !filter.accepts_commits(classified.total) {
        return None;
    }
    Some(MethodHistory {
        commit_count: classified.total,
        fix_commit_count: classified.fix_count,
        fix_ratio: classified.ratio(),
        fix_commit_ids: classified.fix_ids(),
        change_ids,
    })
}

/// Aggregated records for every analyzed method with history, sorted.
pub fn catalog_methods(catalog: &RepoCatalog) -> Vec<AggregatedMethod> {
    let mut methods: Vec<AggregatedMethod> = catalog
        .methods()
        .iter()
        .filter(|m| m.stage == Stage::Analyzed)
        .filter_map(|m| {
            let history = m.history.as_ref().filter(|h| h.commit_count > 0)?;
            Some(AggregatedMethod {
                name: m.name.clone(),
                file_path: catalog.file(m.file).path.clone(),
                start_line: m.start_line,
                end_line: m.end_line,
                size_lines: m.size_lines,
                repository: catalog.name.clone(),
                commit_count: history.commit_count,
                fix_commit_count: history.fix_commit_count,
                fix_ratio: history.fix_ratio,
                fix_commit_ids: history.fix_commit_ids.clone(),
            })
        })
        .collect();
    sort_methods(&mut methods);
    methods
}

impl<P, S> Aggregator<P, S>
where
    P: HistoryProvider + 'static,
    S: AggregationStore,
{
    /// Load the catalog of `repo` from `catalog_dir` (or start a new one)
    /// and advance it as far as possible.
    ///
    /// With `force` set, any saved catalog is discarded first. The outcome is
    /// `resumed` when a saved catalog was picked up.
    ///
    /// # Errors
    ///
    /// Returns [`FixscopeError`] if the catalog cannot be written, the checkout
    /// cannot be walked, or the store fails. An unreadable catalog is replaced.
    pub async fn resume_repository(
        &self,
        repo: &RepoEntry,
        catalog_dir: &Path,
    ) -> Result<RepoOutcome, FixscopeError> {
        let saved = if self.options().force {
            None
        } else {
            RepoCatalog::load(catalog_dir, &repo.name).unwrap_or_else(|e| {
                tracing::warn!(repository = %repo.name, error = %e, "unreadable catalog, starting over");
                None
            })
        };
        let resumed = saved.is_some();
        let mut catalog = saved.unwrap_or_else(|| RepoCatalog::new(&repo.name, &repo.path));
        if resumed {
            let (files, analyzed, total) = catalog.progress();
            tracing::info!(
                repository = %repo.name,
                stage = %catalog.stage,
                files_analyzed = files,
                methods_analyzed = analyzed,
                methods = total,
                "resuming from catalog"
            );
        }

        let mut outcome = self.run_staged(&mut catalog, catalog_dir).await?;
        outcome.resumed = resumed;
        Ok(outcome)
    }

    /// Advance `catalog` through file extraction, method extraction and
    /// analysis, checkpointing it into `catalog_dir` after each stage and
    /// each batch of provider calls. The aggregation document is rewritten
    /// from every analyzed method at the end.
    ///
    /// # Errors
    ///
    /// Returns [`FixscopeError`] on catalog or store I/O failures, or if the
    /// catalog's stages are inconsistent.
    pub async fn run_staged(
        &self,
        catalog: &mut RepoCatalog,
        catalog_dir: &Path,
    ) -> Result<RepoOutcome, FixscopeError> {
        let mut stats = AggregateStats::default();
        let options = self.options();

        let added = catalog.extract_files(self.sources(), options.file_limit)?;
        if added > 0 {
            tracing::info!(repository = %catalog.name, files = added, "files extracted");
            catalog.save(catalog_dir)?;
        }

        let pending_files = catalog.pending_files();
        for file in &pending_files {
            let spans = self.file_spans(catalog, *file, &mut stats);
            catalog.extract_methods(*file, &spans)?;
        }
        if !pending_files.is_empty() {
            catalog.save(catalog_dir)?;
        }

        let mut pending = catalog.pending_methods();
        if let Some(limit) = options.method_limit {
            let analyzed = catalog.methods().len() - pending.len();
            pending.truncate(limit.saturating_sub(analyzed));
        }
        let tasks: Vec<MethodTask> = pending.iter().map(|id| task_for(catalog, *id)).collect();

        let batch = options.jobs.max(1) * CHECKPOINT_FACTOR;
        let mut remaining = tasks.into_iter().peekable();
        while remaining.peek().is_some() {
            let chunk: Vec<MethodTask> = remaining.by_ref().take(batch).collect();
            for (task, result) in self.fetch_all(chunk).await {
                stats.provider_calls += 1;
                match result {
                    Ok(value) => {
                        let history = method_history(&value, self.keywords(), &options.methods);
                        if history.is_none() {
                            stats.methods_without_history += 1;
                        }
                        catalog.record_analysis(MethodId(task.id), history)?;
                    }
                    Err(e) => {
                        stats.provider_failures += 1;
                        log_failure(&task.query, &e);
                    }
                }
            }
            catalog.save(catalog_dir)?;
        }

        let methods = catalog_methods(catalog);
        self.store().save(&catalog.name, &methods)?;
        tracing::info!(
            repository = %catalog.name,
            stage = %catalog.stage,
            methods = methods.len(),
            failures = stats.provider_failures,
            "staged run finished"
        );
        Ok(RepoOutcome {
            repository: catalog.name.clone(),
            methods,
            resumed: false,
            stats,
        })
    }

    /// Spans of a catalog file that pass the size filter. Unreadable files
    /// yield no spans.
    fn file_spans(
        &self,
        catalog: &RepoCatalog,
        file: FileId,
        stats: &mut AggregateStats,
    ) -> Vec<Span> {
        let entry = catalog.file(file);
        let content = match read_source(&catalog.path.join(&entry.path)) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(repository = %catalog.name, file = %entry.path, error = %e, "skipping unreadable file");
                stats.files_skipped += 1;
                return Vec::new();
            }
        };
        stats.files_scanned += 1;

        let spans = boundary::scan_source(&content);
        stats.methods_found += spans.len();
        let (kept, dropped): (Vec<Span>, Vec<Span>) = spans
            .into_iter()
            .partition(|s| self.options().methods.accepts_size(s.size()));
        stats.methods_filtered += dropped.len();
        kept
    }
}

fn task_for(catalog: &RepoCatalog, id: MethodId) -> MethodTask {
    let method = catalog.method(id);
    MethodTask {
        id: id.0,
        query: HistoryQuery {
            repository: catalog.name.clone(),
            repo_path: catalog.path.clone(),
            file_path: catalog.file(method.file).path.clone(),
            method_name: method.name.clone(),
            start_line: method.start_line,
        },
        span: Span::new(method.name.clone(), method.start_line, method.end_line),
    }
}
