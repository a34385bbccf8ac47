//! End-to-end aggregation runs against an in-memory history provider.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fixscope_core::FixKeywords;
use fixscope_history::{HistoryProvider, HistoryQuery, ProviderError};
use fixscope_pipeline::aggregate::{AggregateOptions, Aggregator};
use fixscope_pipeline::catalog::{RepoCatalog, Stage};
use fixscope_pipeline::store::{AggregationStore, JsonDirStore};
use fixscope_scan::walker::{RepoEntry, SourceFilter};
use serde_json::{json, Value};

/// Answers from a fixed table keyed by method name; unknown methods fail.
#[derive(Default)]
struct StubProvider {
    answers: HashMap<String, Value>,
    calls: Arc<AtomicUsize>,
    delay_for: HashMap<String, Duration>,
}

impl StubProvider {
    fn with(mut self, method: &str, messages: &[&str]) -> Self {
        let details: serde_json::Map<String, Value> = messages
            .iter()
            .enumerate()
            .map(|(i, m)| (format!("{method}-{i}"), json!({ "commitMessage": m })))
            .collect();
        self.answers
            .insert(method.into(), json!({ "changeHistoryDetails": details }));
        self
    }

    fn slow(mut self, method: &str, millis: u64) -> Self {
        self.delay_for
            .insert(method.into(), Duration::from_millis(millis));
        self
    }
}

impl HistoryProvider for StubProvider {
    async fn fetch(&self, query: &HistoryQuery) -> Result<Value, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay_for.get(&query.method_name) {
            tokio::time::sleep(*delay).await;
        }
        self.answers
            .get(&query.method_name)
            .cloned()
            .ok_or(ProviderError::Exit {
                code: Some(1),
                stderr: format!("no history for {}", query.method_name),
            })
    }
}

const TWO_METHODS: &str = "\
public class Pair {
    public int first() {
        int a = 1;
        a += 1;
        return a;
    }
    public int second() {
        int b = 2;
        b += 2;
        return b;
    }
}
";

fn checkout(root: &Path, name: &str, files: &[(&str, &str)]) -> RepoEntry {
    let path = root.join(name);
    std::fs::create_dir_all(path.join(".git")).unwrap();
    for (rel, content) in files {
        let full = path.join(rel);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, content).unwrap();
    }
    RepoEntry {
        name: name.into(),
        path,
    }
}

fn aggregator(
    provider: StubProvider,
    results: &Path,
    options: AggregateOptions,
) -> Aggregator<StubProvider, JsonDirStore> {
    Aggregator::new(
        provider,
        JsonDirStore::new(results),
        FixKeywords::default(),
        SourceFilter::default(),
        options,
    )
}

#[tokio::test]
async fn adjacent_methods_get_independent_ratios() {
    let dir = tempfile::tempdir().unwrap();
    let repo = checkout(dir.path(), "demo", &[("src/Pair.java", TWO_METHODS)]);
    let provider = StubProvider::default()
        .with("first", &["Fix off-by-one"])
        .with("second", &["Add accessor"]);
    let agg = aggregator(provider, &dir.path().join("out"), AggregateOptions::default());

    let outcome = agg.run_repository(&repo).await.unwrap();
    assert!(!outcome.resumed);
    assert_eq!(outcome.methods.len(), 2);

    let first = &outcome.methods[0];
    assert_eq!((first.name.as_str(), first.start_line, first.end_line), ("first", 2, 6));
    assert_eq!(first.size_lines, 5);
    assert_eq!(first.fix_ratio, 1.0);

    let second = &outcome.methods[1];
    assert_eq!((second.name.as_str(), second.start_line, second.end_line), ("second", 7, 11));
    assert_eq!(second.size_lines, 5);
    assert_eq!(second.fix_ratio, 0.0);
    assert_eq!(second.file_path, "src/Pair.java");
}

#[tokio::test]
async fn truncated_method_ends_at_last_line() {
    let dir = tempfile::tempdir().unwrap();
    let source = "public class Cut {\n    public void open() {\n        work();\n        more();";
    let repo = checkout(dir.path(), "cut", &[("Cut.java", source)]);
    let provider = StubProvider::default().with("open", &["bugfix", "cleanup"]);
    let agg = aggregator(provider, &dir.path().join("out"), AggregateOptions::default());

    let outcome = agg.run_repository(&repo).await.unwrap();
    assert_eq!(outcome.methods.len(), 1);
    assert_eq!((outcome.methods[0].start_line, outcome.methods[0].end_line), (2, 4));
    assert_eq!(outcome.methods[0].fix_ratio, 0.5);
}

#[tokio::test]
async fn existing_document_is_reused_without_provider_calls() {
    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join("out");
    let repo = checkout(dir.path(), "demo", &[("src/Pair.java", TWO_METHODS)]);

    // Ratios of 1/3 and 1/11 have no exact binary form.
    let mut eleven = vec!["docs"; 10];
    eleven.push("fix crash");
    let first_run = aggregator(
        StubProvider::default()
            .with("first", &["fix", "docs", "refactor"])
            .with("second", &eleven),
        &results,
        AggregateOptions::default(),
    );
    let original = first_run.run_repository(&repo).await.unwrap();
    assert_eq!(original.methods[0].fix_ratio, 1.0 / 3.0);
    assert_eq!(original.methods[1].fix_ratio, 1.0 / 11.0);

    let calls = Arc::new(AtomicUsize::new(0));
    let provider = StubProvider {
        calls: Arc::clone(&calls),
        ..StubProvider::default()
    };
    let second_run = aggregator(provider, &results, AggregateOptions::default());
    let again = second_run.run_repository(&repo).await.unwrap();

    assert!(again.resumed);
    assert_eq!(again.methods, original.methods);
    let bits = |methods: &[fixscope_core::AggregatedMethod]| -> Vec<u64> {
        methods.iter().map(|m| m.fix_ratio.to_bits()).collect()
    };
    assert_eq!(bits(&again.methods), bits(&original.methods));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unreadable_document_is_recomputed() {
    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join("out");
    let repo = checkout(dir.path(), "demo", &[("src/Pair.java", TWO_METHODS)]);
    std::fs::create_dir_all(&results).unwrap();
    let store = JsonDirStore::new(&results);
    std::fs::write(store.document_path("demo"), "[\n  {\n    \"name\": \"fir").unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let provider = StubProvider {
        calls: Arc::clone(&calls),
        ..StubProvider::default().with("first", &["fix"]).with("second", &["docs"])
    };
    let agg = aggregator(provider, &results, AggregateOptions::default());
    let outcome = agg.run_repository(&repo).await.unwrap();

    assert!(!outcome.resumed);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(outcome.methods.len(), 2);
    assert_eq!(store.load("demo").unwrap().unwrap(), outcome.methods);
}

#[tokio::test]
async fn unreadable_catalog_restarts_the_staged_run() {
    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join("out");
    let repo = checkout(dir.path(), "demo", &[("src/Pair.java", TWO_METHODS)]);
    std::fs::create_dir_all(&results).unwrap();
    std::fs::write(results.join("demo.catalog.json"), "{\"name\": ").unwrap();

    let agg = aggregator(
        StubProvider::default().with("first", &["fix"]).with("second", &["docs"]),
        &results,
        AggregateOptions::default(),
    );
    let outcome = agg.resume_repository(&repo, &results).await.unwrap();

    assert!(!outcome.resumed);
    assert_eq!(outcome.methods.len(), 2);
    let catalog = RepoCatalog::load(&results, "demo").unwrap().unwrap();
    assert_eq!(catalog.stage, Stage::Analyzed);
}

#[tokio::test]
async fn force_recomputes_existing_document() {
    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join("out");
    let repo = checkout(dir.path(), "demo", &[("src/Pair.java", TWO_METHODS)]);
    JsonDirStore::new(&results).save("demo", &[]).unwrap();

    let options = AggregateOptions {
        force: true,
        ..AggregateOptions::default()
    };
    let agg = aggregator(
        StubProvider::default().with("first", &["fix"]).with("second", &["docs"]),
        &results,
        options,
    );
    let outcome = agg.run_repository(&repo).await.unwrap();
    assert!(!outcome.resumed);
    assert_eq!(outcome.methods.len(), 2);
    assert_eq!(agg.store().load("demo").unwrap().unwrap().len(), 2);
}

#[tokio::test]
async fn provider_failures_and_empty_histories_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let repo = checkout(dir.path(), "demo", &[("src/Pair.java", TWO_METHODS)]);
    // `first` has no answer and fails; `second` has an empty history.
    let provider = StubProvider::default().with("second", &[]);
    let agg = aggregator(provider, &dir.path().join("out"), AggregateOptions::default());

    let outcome = agg.run_repository(&repo).await.unwrap();
    assert!(outcome.methods.is_empty());
    assert_eq!(outcome.stats.provider_calls, 2);
    assert_eq!(outcome.stats.provider_failures, 1);
    assert_eq!(outcome.stats.methods_without_history, 1);
}

#[tokio::test]
async fn parallel_run_output_is_independent_of_completion_order() {
    let dir = tempfile::tempdir().unwrap();
    let repo = checkout(
        dir.path(),
        "demo",
        &[("a/Pair.java", TWO_METHODS), ("b/Pair.java", TWO_METHODS)],
    );
    let provider = || {
        StubProvider::default()
            .with("first", &["fix", "docs"])
            .with("second", &["docs"])
    };

    let sequential = aggregator(provider(), &dir.path().join("seq"), AggregateOptions::default())
        .run_repository(&repo)
        .await
        .unwrap();

    let options = AggregateOptions {
        jobs: 4,
        ..AggregateOptions::default()
    };
    // The first method finishes last.
    let parallel = aggregator(provider().slow("first", 50), &dir.path().join("par"), options)
        .run_repository(&repo)
        .await
        .unwrap();

    assert_eq!(parallel.methods, sequential.methods);
    let files: Vec<&str> = parallel.methods.iter().map(|m| m.file_path.as_str()).collect();
    assert_eq!(files, vec!["a/Pair.java", "a/Pair.java", "b/Pair.java", "b/Pair.java"]);
}

#[tokio::test]
async fn limits_cap_files_and_methods() {
    let dir = tempfile::tempdir().unwrap();
    let repo = checkout(
        dir.path(),
        "demo",
        &[("a/Pair.java", TWO_METHODS), ("b/Pair.java", TWO_METHODS)],
    );
    let options = AggregateOptions {
        file_limit: Some(1),
        method_limit: Some(1),
        ..AggregateOptions::default()
    };
    let agg = aggregator(
        StubProvider::default().with("first", &["fix"]).with("second", &["fix"]),
        &dir.path().join("out"),
        options,
    );
    let outcome = agg.run_repository(&repo).await.unwrap();
    assert_eq!(outcome.stats.files_scanned, 1);
    assert_eq!(outcome.stats.provider_calls, 1);
    assert_eq!(outcome.methods.len(), 1);
}

#[tokio::test]
async fn staged_run_retries_failed_methods_on_resume() {
    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join("out");
    let repo = checkout(dir.path(), "demo", &[("src/Pair.java", TWO_METHODS)]);

    // First run: `second` fails and stays pending.
    let flaky = aggregator(
        StubProvider::default().with("first", &["fix"]),
        &results,
        AggregateOptions::default(),
    );
    let partial = flaky.resume_repository(&repo, &results).await.unwrap();
    assert!(!partial.resumed);
    assert_eq!(partial.methods.len(), 1);

    let catalog = RepoCatalog::load(&results, "demo").unwrap().unwrap();
    assert_eq!(catalog.stage, Stage::FilesExtracted);
    assert_eq!(catalog.pending_methods().len(), 1);

    // Second run only asks about the pending method.
    let calls = Arc::new(AtomicUsize::new(0));
    let provider = StubProvider {
        calls: Arc::clone(&calls),
        ..StubProvider::default().with("second", &["docs", "fix typo"])
    };
    let healthy = aggregator(provider, &results, AggregateOptions::default());
    let finished = healthy.resume_repository(&repo, &results).await.unwrap();

    assert!(finished.resumed);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(finished.methods.len(), 2);
    assert_eq!(finished.methods[1].fix_ratio, 0.5);

    let catalog = RepoCatalog::load(&results, "demo").unwrap().unwrap();
    assert_eq!(catalog.stage, Stage::Analyzed);
    assert_eq!(
        healthy.store().load("demo").unwrap().unwrap(),
        finished.methods
    );

    // A third run has nothing left to do.
    let idle_calls = Arc::new(AtomicUsize::new(0));
    let idle = aggregator(
        StubProvider {
            calls: Arc::clone(&idle_calls),
            ..StubProvider::default()
        },
        &results,
        AggregateOptions::default(),
    );
    let idle_outcome = idle.resume_repository(&repo, &results).await.unwrap();
    assert_eq!(idle_calls.load(Ordering::SeqCst), 0);
    assert_eq!(idle_outcome.methods, finished.methods);
}
