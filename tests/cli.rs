//! Drives the `steiner-ceph` binary against a scratch model directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("steiner-ceph-cli-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn run(model_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_steiner-ceph"))
        .arg("--model-dir")
        .arg(model_dir)
        .arg("--config")
        .arg(model_dir.join("config.json"))
        .args(args)
        .output()
        .expect("failed to run steiner-ceph")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Write a landmark file with points A and B shifted by `offset` and return its path.
fn write_landmarks(dir: &Path, offset: f64) -> PathBuf {
    let path = dir.join(format!("landmarks-{offset}.json"));
    let json = serde_json::json!({
        "Sella (S)": { "x": 100.0, "y": 100.0 },
        "N": { "x": 100.0, "y": 50.0 },
        "PointA": { "x": 120.0 + offset, "y": 90.0 },
        "B": { "x": 110.0, "y": 130.0 - offset },
        "IS": { "x": 125.0, "y": 110.0 },
        "ii": { "x": 122.0, "y": 112.0 },
        "Pogonion (Pg)": null
    });
    fs::write(&path, json.to_string()).unwrap();
    path
}

fn write_corrections(dir: &Path, offset: f64) -> PathBuf {
    let path = dir.join(format!("corrections-{offset}.json"));
    let json = serde_json::json!({
        "SNA": 82.0 + offset,
        "SNB": "80.5",
        "ANB": 1.5 + offset,
        "UI_NA": 22.0,
        "LI-NB": 25.0,
        "UI_LI": "131"
    });
    fs::write(&path, json.to_string()).unwrap();
    path
}

fn corpus_len(dir: &Path) -> usize {
    let corpus: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join("corpus.json")).unwrap()).unwrap();
    corpus.as_array().map_or(0, Vec::len)
}

fn add_example(dir: &Path, offset: f64) -> Output {
    let landmarks = write_landmarks(dir, offset);
    let corrections = write_corrections(dir, offset);
    run(
        dir,
        &[
            "add-example",
            landmarks.to_str().unwrap(),
            corrections.to_str().unwrap(),
        ],
    )
}

#[test]
fn corpus_is_replayed_across_invocations() {
    let dir = scratch_dir("corpus");
    fs::write(
        dir.join("config.json"),
        r#"{ "hidden_layers": [8], "max_iter": 100 }"#,
    )
    .unwrap();

    for i in 0..4 {
        let output = add_example(&dir, i as f64);
        assert!(output.status.success(), "add-example failed: {}", stderr(&output));
        assert_eq!(corpus_len(&dir), i + 1);
    }

    let output = run(&dir, &["retrain"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Need at least 5"), "{}", stderr(&output));
    assert!(!dir.join("cephalometric_model.bin").exists());

    let output = add_example(&dir, 4.0);
    assert!(output.status.success(), "add-example failed: {}", stderr(&output));
    assert!(stdout(&output).contains("(5 total)"));
    assert_eq!(corpus_len(&dir), 5);

    let output = run(&dir, &["retrain"]);
    assert!(output.status.success(), "retrain failed: {}", stderr(&output));
    assert!(stdout(&output).contains("Model retrained with 5 examples"));
    assert!(dir.join("cephalometric_model.bin").exists());
    assert!(dir.join("cephalometric_scaler.bin").exists());

    let status = run(&dir, &["status"]);
    assert!(status.status.success());
    assert!(stdout(&status).contains("Calibration model: trained"));
    assert!(stdout(&status).contains("Training examples: 5"));

    let landmarks = write_landmarks(&dir, 0.0);
    let output = run(&dir, &["analyze", landmarks.to_str().unwrap()]);
    assert!(output.status.success(), "analyze failed: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.starts_with("=== MEASUREMENTS ==="));
    assert!(text.contains("ML suggested"), "{text}");

    fs::remove_dir_all(dir).ok();
}

#[test]
fn analyze_without_corpus_is_uncalibrated() {
    let dir = scratch_dir("uncalibrated");
    fs::write(dir.join("config.json"), "{}").unwrap();
    let landmarks = write_landmarks(&dir, 0.0);

    let output = run(&dir, &["analyze", landmarks.to_str().unwrap(), "--json"]);
    assert!(output.status.success(), "analyze failed: {}", stderr(&output));
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["calibrated"], serde_json::Value::Bool(false));
    assert_eq!(report["measurements"].as_array().map(Vec::len), Some(6));
    assert!(!dir.join("corpus.json").exists());

    fs::remove_dir_all(dir).ok();
}

#[test]
fn bad_correction_is_not_recorded() {
    let dir = scratch_dir("bad-correction");
    fs::write(dir.join("config.json"), "{}").unwrap();
    let landmarks = write_landmarks(&dir, 0.0);
    let corrections = dir.join("bad.json");
    fs::write(
        &corrections,
        r#"{"SNA": "abc", "SNB": 80, "ANB": 2, "UI_NA": 22, "LI_NB": 25, "UI_LI": 131}"#,
    )
    .unwrap();

    let output = run(
        &dir,
        &[
            "add-example",
            landmarks.to_str().unwrap(),
            corrections.to_str().unwrap(),
        ],
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("SNA"));
    assert!(!dir.join("corpus.json").exists());

    fs::remove_dir_all(dir).ok();
}

#[test]
fn missing_landmarks_are_reported() {
    let dir = scratch_dir("missing");
    fs::write(dir.join("config.json"), "{}").unwrap();
    let landmarks = dir.join("partial.json");
    fs::write(&landmarks, r#"{"S": {"x": 1.0, "y": 2.0}}"#).unwrap();

    let output = run(&dir, &["analyze", landmarks.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Nasion (N)"), "{}", stderr(&output));

    let output = run(&dir, &["check", landmarks.to_str().unwrap()]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Sella (S): ✓"));
    assert!(text.contains("Nasion (N): ✗"));
    assert_eq!(text.lines().count(), 19);

    fs::remove_dir_all(dir).ok();
}
