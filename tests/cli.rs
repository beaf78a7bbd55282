//! End-to-end runs of the `framescan` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn cli() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_framescan"));
    for key in [
        "FRAMESCAN_DETECTOR",
        "FRAMESCAN_THREADS",
        "FRAMESCAN_THRESHOLD",
        "FRAMESCAN_PROGRESS_PATH",
        "FRAMESCAN_MODEL_PATH",
    ] {
        cmd.env_remove(key);
    }
    cmd.args(["--ui", "plain"]);
    cmd
}

fn write_job(dir: &Path, body: &serde_json::Value) -> std::path::PathBuf {
    let path = dir.join("job.json");
    fs::write(&path, serde_json::to_vec(body).unwrap()).unwrap();
    path
}

fn read_results(path: &Path) -> serde_json::Value {
    serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
}

#[test]
fn classifies_with_stub_detector() {
    let dir = TempDir::new().unwrap();
    let progress = dir.path().join("progress.txt");
    let output = dir.path().join("results.json");
    let input = write_job(
        dir.path(),
        &serde_json::json!({
            "frames": [
                {"index": 2, "timestamp": 1.0, "path": "/frames/2_flagged.jpg"},
                {"index": 0, "timestamp": 0.0, "path": "/frames/0.jpg"},
                {"index": 1, "timestamp": 0.5, "path": "/frames/1.jpg"}
            ],
            "detector": "stub",
            "threads": 2,
            "progress_path": progress
        }),
    );

    cli()
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stderr(predicate::str::contains("Write results"));

    let results = read_results(&output);
    let indices: Vec<u64> = results
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["index"].as_u64().unwrap())
        .collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(results[2]["flagged"], true);
    assert_eq!(results[0]["flagged"], false);
    assert_eq!(fs::read_to_string(&progress).unwrap(), "3");
}

#[test]
fn empty_batch_writes_empty_array() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("results.json");
    let input = write_job(dir.path(), &serde_json::json!({"frames": []}));

    cli()
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    assert_eq!(read_results(&output), serde_json::json!([]));
}

#[test]
fn unknown_detector_flags_nothing() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("results.json");
    let input = write_job(
        dir.path(),
        &serde_json::json!({
            "frames": [{"index": 0, "timestamp": 0.0, "path": "flagged.jpg"}],
            "detector": "mystery"
        }),
    );

    cli()
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    assert_eq!(read_results(&output)[0]["flagged"], false);
}

#[test]
fn missing_input_fails_without_output() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("results.json");

    cli()
        .arg("-i")
        .arg(dir.path().join("absent.json"))
        .arg("-o")
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("job descriptor does not exist"));

    assert!(!output.exists());
}

#[test]
fn invalid_threshold_is_rejected() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("results.json");
    let input = write_job(dir.path(), &serde_json::json!({"frames": []}));

    cli()
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .args(["--threshold", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("threshold"));

    assert!(!output.exists());
}

#[test]
fn env_detector_override_applies() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("results.json");
    let input = write_job(
        dir.path(),
        &serde_json::json!({
            "frames": [{"index": 0, "timestamp": 0.0, "path": "flagged.jpg"}],
            "detector": "mystery",
            "threads": 1
        }),
    );

    cli()
        .env("FRAMESCAN_DETECTOR", "stub")
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    assert_eq!(read_results(&output)[0]["flagged"], true);
}

#[test]
fn failed_results_write_leaves_progress_incomplete() {
    let dir = TempDir::new().unwrap();
    let progress = dir.path().join("progress.txt");
    let output = dir.path().join("missing/results.json");
    let input = write_job(
        dir.path(),
        &serde_json::json!({
            "frames": [
                {"index": 0, "timestamp": 0.0, "path": "a.jpg"},
                {"index": 1, "timestamp": 0.5, "path": "b.jpg"}
            ],
            "detector": "stub",
            "progress_path": progress
        }),
    );

    cli()
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("results"));

    assert!(!output.exists());
    assert_eq!(fs::read_to_string(&progress).unwrap(), "0");
}
