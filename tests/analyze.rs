//! Full `analyze` run with a stand-in for the Java launcher.
//!
//! Kept to a single test: writing an executable while other tests spawn
//! processes can fail with ETXTBSY.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::process::Command;

const PAIR: &str = "\
public class Pair {
    public int first() {
        int a = 1;
        return a;
    }
    public int second() {
        int b = 2;
        return b;
    }
}
";

/// Writes a two-change history to the path following `-outfile`.
const FAKE_JAVA: &str = r#"#!/bin/sh
out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-outfile" ]; then out="$2"; fi
  shift
done
printf '{"changeHistoryDetails":{"a1":{"commitMessage":"Fix overflow"},"b2":{"commitMessage":"Add pair"}}}' > "$out"
"#;

#[test]
fn analyze_writes_documents_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    let repo = root.join("repos/pair");
    std::fs::create_dir_all(repo.join(".git")).unwrap();
    std::fs::create_dir_all(repo.join("src")).unwrap();
    std::fs::write(repo.join("src/Pair.java"), PAIR).unwrap();
    std::fs::write(root.join("codeshovel.jar"), b"").unwrap();

    let java = root.join("fake-java");
    std::fs::write(&java, FAKE_JAVA).unwrap();
    std::fs::set_permissions(&java, std::fs::Permissions::from_mode(0o755)).unwrap();

    std::fs::write(
        root.join(".fixscope.toml"),
        format!(
            "[paths]\nrepositories_dir = \"repos\"\nresults_dir = \"results\"\ncodeshovel_jar = \"codeshovel.jar\"\n\n[analysis]\njava = \"{}\"\njobs = 2\n",
            java.display()
        ),
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_fixscope"))
        .arg("analyze")
        .current_dir(root)
        .env_remove("RUST_LOG")
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let document = std::fs::read_to_string(root.join("results/pair_fix_analysis.json")).unwrap();
    let methods: Vec<fixscope_core::AggregatedMethod> = serde_json::from_str(&document).unwrap();
    let names: Vec<&str> = methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second"]);
    for m in &methods {
        assert_eq!(m.repository, "pair");
        assert_eq!(m.file_path, "src/Pair.java");
        assert_eq!((m.commit_count, m.fix_commit_count), (2, 1));
        assert_eq!(m.fix_ratio, 0.5);
        assert_eq!(m.fix_commit_ids, vec!["a1".to_string()]);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Methods: 2 in 1 repositories (2 with fixes)"), "{stdout}");
    assert!(root.join("results/fix_analysis_report.md").is_file());
    assert!(root.join("results/fix_analysis_visualization.png").is_file());
}
