use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn typesniff() -> Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("typesniff");
    // Keep results independent of whichever oracle tools the host has.
    cmd.env("TYPESNIFF_ORACLE_MODE", "off");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn fixture_tree(root: &Path) {
    fs::create_dir_all(root.join("data")).unwrap();
    fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
    fs::write(root.join("data/people.csv"), "name,age\nann,31\nbob,42\ncid,27\n").unwrap();
    fs::write(root.join("data/config.json"), r#"{"debug": false}"#).unwrap();
    fs::write(
        root.join("feed.xml"),
        "<?xml version=\"1.0\"?>\n<feed><item/></feed>\n",
    )
    .unwrap();
    fs::write(root.join("node_modules/pkg/index.json"), "{}").unwrap();
}

fn parse_json(output: &[u8]) -> serde_json::Value {
    serde_json::from_slice(output).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({e}): {}",
            String::from_utf8_lossy(output)
        )
    })
}

#[test]
fn test_detect_single_file_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{"name": "typesniff", "tags": ["a"]}"#).unwrap();

    let output = typesniff().arg("detect").arg(&path).output().unwrap();
    assert!(output.status.success());

    let json = parse_json(&output.stdout);
    assert_eq!(json["candidates"][0]["media_type"], "application/json");
    assert_eq!(json["candidates"][0]["confidence"], 1.0);
    assert_eq!(json["hash"].as_str().unwrap().len(), 64);
}

#[test]
fn test_detect_raw_is_compact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.json");
    fs::write(&path, "[1, 2, 3]").unwrap();

    typesniff()
        .arg("detect")
        .arg(&path)
        .arg("--raw")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("{\"candidates\":["))
        .stdout(predicate::str::contains("\n  ").not());
}

#[test]
fn test_detect_text_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("image.bin");
    fs::write(&path, b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR").unwrap();

    typesniff()
        .env("NO_COLOR", "1")
        .arg("detect")
        .arg(&path)
        .args(["--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("image/png"))
        .stdout(predicate::str::contains("0.990"));
}

#[test]
fn test_detect_directory_lists_every_file() {
    let dir = tempfile::tempdir().unwrap();
    fixture_tree(dir.path());

    let output = typesniff()
        .arg("detect")
        .arg(dir.path())
        .args(["--workers", "2", "--ignore", "node_modules"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json = parse_json(&output.stdout);
    let entries = json.as_array().expect("directory output is an array");
    assert_eq!(entries.len(), 3);

    let best_for = |suffix: &str| {
        entries
            .iter()
            .find(|e| e["path"].as_str().unwrap().ends_with(suffix))
            .map(|e| e["candidates"][0]["media_type"].as_str().unwrap().to_string())
            .unwrap_or_else(|| panic!("no entry for {suffix}"))
    };
    assert_eq!(best_for("people.csv"), "text/csv");
    assert_eq!(best_for("config.json"), "application/json");
    assert_eq!(best_for("feed.xml"), "application/xml");
}

#[test]
fn test_detect_directory_extension_filter() {
    let dir = tempfile::tempdir().unwrap();
    fixture_tree(dir.path());

    let output = typesniff()
        .arg("detect")
        .arg(dir.path())
        .args(["--ext", "json", "--raw"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json = parse_json(&output.stdout);
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(
        entries
            .iter()
            .all(|e| e["path"].as_str().unwrap().ends_with(".json"))
    );
}

#[test]
fn test_only_restricts_engines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("people.csv");
    fs::write(&path, "name,age\nann,31\nbob,42\ncid,27\n").unwrap();

    let output = typesniff()
        .arg("detect")
        .arg(&path)
        .args(["--only", "csv"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = parse_json(&output.stdout);
    assert_eq!(json["engine"], "csv");
}

#[test]
fn test_trid_adds_field_beside_each_entry() {
    let dir = tempfile::tempdir().unwrap();
    fixture_tree(dir.path());

    let output = typesniff()
        .arg("detect")
        .arg(dir.path().join("data/config.json"))
        .arg("--trid")
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = parse_json(&output.stdout);
    assert_eq!(json["candidates"][0]["media_type"], "application/json");
    // Oracles are off, so TrID has nothing to say.
    assert!(json["trid"]["candidates"].as_array().unwrap().is_empty());

    let output = typesniff()
        .arg("detect")
        .arg(dir.path())
        .args(["--ignore", "node_modules", "--trid"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = parse_json(&output.stdout);
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e["trid"].is_object()));

    let output = typesniff()
        .arg("detect")
        .arg(dir.path().join("feed.xml"))
        .output()
        .unwrap();
    assert!(parse_json(&output.stdout).get("trid").is_none());
}

#[test]
fn test_unknown_engine_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.txt");
    fs::write(&path, "hello").unwrap();

    typesniff()
        .arg("detect")
        .arg(&path)
        .args(["--only", "cobol"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown engine: cobol"));
}

#[test]
fn test_missing_path_fails() {
    let dir = tempfile::tempdir().unwrap();
    typesniff()
        .arg("detect")
        .arg(dir.path().join("absent.bin"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to classify"));
}

#[test]
fn test_invalid_pattern_fails() {
    let dir = tempfile::tempdir().unwrap();
    typesniff()
        .arg("detect")
        .arg(dir.path())
        .args(["--pattern", "[oops"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid glob pattern"));
}

#[test]
fn test_zero_workers_fails() {
    let dir = tempfile::tempdir().unwrap();
    typesniff()
        .arg("detect")
        .arg(dir.path())
        .args(["--workers", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 1"));
}

#[test]
fn test_config_file_is_applied() {
    let dir = tempfile::tempdir().unwrap();
    fixture_tree(dir.path());
    let config = dir.path().join("typesniff.toml");
    fs::write(
        &config,
        "pattern = \"**/*.csv\"\nignore = [\"node_modules\"]\n",
    )
    .unwrap();

    let output = typesniff()
        .arg("--config")
        .arg(&config)
        .arg("detect")
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = parse_json(&output.stdout);
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0]["path"].as_str().unwrap().ends_with("people.csv"));
}

#[test]
fn test_engines_lists_names_in_cost_order() {
    let output = typesniff()
        .args(["engines", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = parse_json(&output.stdout);
    let rows = json.as_array().unwrap();
    assert_eq!(rows[0]["name"], "python");
    assert_eq!(rows.last().unwrap()["name"], "trid");
    assert!(rows.iter().any(|r| r["name"] == "csv"));
}

#[test]
fn test_engines_text_output() {
    typesniff()
        .env("NO_COLOR", "1")
        .arg("engines")
        .assert()
        .success()
        .stdout(predicate::str::contains("json"))
        .stdout(predicate::str::contains("magika"));
}
