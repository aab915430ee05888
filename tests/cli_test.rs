//! Binary-level tests for the agedcare CLI
//!
//! Every test points `--config` at a temp workspace; nothing touches the network.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn workspace() -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let config = format!(
        r#"
paths:
  raw-dir: {root}/raw
  interim-dir: {root}/interim
  output-dir: {root}/processed
  archive-dir: {root}/raw/archive
  log-dir: {root}/logs
fetch:
  attempts: 1
  delay-ms: 0
  timeout-ms: 200
pipelines:
  operations:
    nids-csv: {root}/ops.csv
    endpoint: "http://127.0.0.1:9/details/{{nid}}"
"#,
        root = root.display()
    );
    let path = root.join("agedcare.yml");
    fs::write(&path, config).unwrap();
    (temp, path)
}

fn agedcare(root: &Path, config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("agedcare").unwrap();
    cmd.current_dir(root).arg("--config").arg(config);
    cmd
}

// =============================================================================
// Inspection
// =============================================================================

#[test]
fn test_pipelines_lists_both_kinds() {
    let (temp, config) = workspace();
    agedcare(temp.path(), &config)
        .arg("pipelines")
        .assert()
        .success()
        .stdout(predicate::str::contains("operations"))
        .stdout(predicate::str::contains("rads"))
        .stdout(predicate::str::contains("suburb_postcode"))
        .stdout(predicate::str::contains("http://127.0.0.1:9/details/{nid}"));
}

#[test]
fn test_unknown_pipeline_is_rejected() {
    let (temp, config) = workspace();
    agedcare(temp.path(), &config)
        .args(["run", "homes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown pipeline"));
}

#[test]
fn test_healthcheck_missing_then_fresh() {
    let (temp, config) = workspace();
    agedcare(temp.path(), &config).arg("healthcheck").assert().failure();

    fs::create_dir_all(temp.path().join("logs")).unwrap();
    fs::write(temp.path().join("logs").join("agedcare.log"), "run finished\n").unwrap();
    agedcare(temp.path(), &config)
        .arg("healthcheck")
        .assert()
        .success()
        .stdout(predicate::str::contains("Healthcheck passed"));
}

#[test]
fn test_healthcheck_accepts_huge_max_age() {
    let (temp, config) = workspace();
    fs::create_dir_all(temp.path().join("logs")).unwrap();
    fs::write(temp.path().join("logs").join("agedcare.log"), "run finished\n").unwrap();
    agedcare(temp.path(), &config)
        .args(["healthcheck", "--max-age-hours", "18446744073709551615"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Healthcheck passed"));
}

#[test]
fn test_schedule_without_entries_fails() {
    let (temp, config) = workspace();
    agedcare(temp.path(), &config)
        .arg("schedule")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No schedules configured"));
}

// =============================================================================
// Pipeline stages
// =============================================================================

#[test]
fn test_run_from_cache() {
    let (temp, config) = workspace();
    let root = temp.path();
    fs::write(root.join("ops.csv"), "nid\n12345\n").unwrap();
    fs::create_dir_all(root.join("raw/operations")).unwrap();
    fs::write(
        root.join("raw/operations/12345_20250101.json"),
        r#"{"nid": 12345, "name": "Cached Home", "ratings": {"compliance": [{"rating": 3}]}}"#,
    )
    .unwrap();

    agedcare(root, &config)
        .args(["run", "operations"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 1 rows"))
        .stdout(predicate::str::contains("Coverage: 1/1 (100.0%)"));

    let outputs: Vec<_> = fs::read_dir(root.join("processed/operations")).unwrap().collect();
    assert_eq!(outputs.len(), 1);
    assert!(root.join("logs/agedcare.log").exists());
}

#[test]
fn test_run_fails_when_fetch_fails() {
    let (temp, config) = workspace();
    fs::write(temp.path().join("ops.csv"), "nid\n1\n").unwrap();

    agedcare(temp.path(), &config)
        .args(["run", "operations"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Fetch failed for nid 1"));
}

#[test]
fn test_run_skip_failed_completes() {
    let (temp, config) = workspace();
    fs::write(temp.path().join("ops.csv"), "nid\n1\n").unwrap();

    agedcare(temp.path(), &config)
        .args(["run", "operations", "--skip-failed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No rows produced"))
        .stdout(predicate::str::contains("Failed fetches: [1]"));
}

#[test]
fn test_parse_then_write() {
    let (temp, config) = workspace();
    let root = temp.path();
    let raw = root.join("rads_9.json");
    fs::write(
        &raw,
        r#"{"nid": 9, "name": "Hill", "ach_room_costs": {"subtypes": [{"productName": "Single", "maximumRAD": 1}]}}"#,
    )
    .unwrap();

    agedcare(root, &config)
        .args(["parse", "rads"])
        .arg(&raw)
        .assert()
        .success()
        .stdout(predicate::str::contains("Parsed 1 rows"));
    let parsed = root.join("interim/rads/rads_9_parsed.json");
    assert!(parsed.exists());

    agedcare(root, &config)
        .args(["write", "rads"])
        .arg(&parsed)
        .assert()
        .success();
    let csv = fs::read_to_string(root.join("processed/rads/rads_9_parsed.csv")).unwrap();
    assert!(csv.starts_with("nid,provider_name,room_type,maximumRAD"));
    assert!(csv.contains("9,Hill,Single,1,"));
}

#[test]
fn test_cleanup_archives_raw_files() {
    let (temp, config) = workspace();
    let root = temp.path();
    fs::create_dir_all(root.join("raw/rads")).unwrap();
    fs::write(root.join("raw/rads/rads_1_17_10_2026.json"), r#"{"nid": 1}"#).unwrap();

    agedcare(root, &config)
        .args(["cleanup", "rads", "--keep-raw"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Merged 1 raw files"))
        .stdout(predicate::str::contains("0 partial files"));

    assert!(root.join("raw/rads/rads_1_17_10_2026.json").exists());
    let archives: Vec<_> = fs::read_dir(root.join("raw/archive/rads")).unwrap().collect();
    assert_eq!(archives.len(), 1);
}
