use fixscope_core::{AggregatedMethod, FixKeywords};
use fixscope_report::chart::write_chart;
use fixscope_report::{compute, SizeTiers, Tier, CHART_FILE, REPORT_FILE};

/// A document as written by the aggregation step, including one from before
/// fix commit ids were recorded.
const DOCUMENT: &str = r#"[
  {
    "name": "checkArgument",
    "filePath": "guava/src/com/google/common/base/Preconditions.java",
    "startLine": 120,
    "endLine": 126,
    "sizeLines": 7,
    "repository": "guava",
    "commitCount": 4,
    "fixCommitCount": 1,
    "fixRatio": 0.25,
    "fixCommitIds": ["a1"]
  },
  {
    "name": "parse",
    "filePath": "src/main/java/Json.java",
    "startLine": 10,
    "endLine": 99,
    "sizeLines": 90,
    "repository": "gson",
    "commitCount": 3,
    "fixCommitCount": 3,
    "fixRatio": 1.0
  }
]"#;

#[test]
fn documents_flow_into_report_and_chart() {
    let methods: Vec<AggregatedMethod> = serde_json::from_str(DOCUMENT).unwrap();
    assert!(methods[1].fix_commit_ids.is_empty());

    let stats = compute(&methods, SizeTiers::default(), 10);
    assert_eq!(stats.total_repositories, 2);
    assert_eq!(stats.tier(Tier::Large).unwrap().count, 1);
    assert_eq!(stats.per_repository[0].repository, "gson");

    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join(REPORT_FILE);
    std::fs::write(&report_path, stats.to_markdown(&FixKeywords::default())).unwrap();
    let report = std::fs::read_to_string(&report_path).unwrap();
    assert!(report.contains("- **parse** (gson, `src/main/java/Json.java`:10): 100.00% (3 fixes, 90 lines)"));

    let chart_path = dir.path().join(CHART_FILE);
    assert!(write_chart(&chart_path, &methods, &stats, 600, 400).unwrap());
    assert!(chart_path.is_file());
}
