//! Exit-code and payload conventions of the `driver` binary.

use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const PAIR_JSON: &str = r#"{
    "detection1": {"sensor_lat": 40.0, "sensor_lon": -74.0, "ioo_lat": 40.5, "ioo_lon": -73.5,
                   "freq_mhz": 100.0, "timestamp": 1234567890, "bistatic_range_km": 100.0, "doppler_hz": -50.0},
    "detection2": {"sensor_lat": 41.0, "sensor_lon": -73.0, "ioo_lat": 40.5, "ioo_lon": -73.5,
                   "freq_mhz": 100.0, "timestamp": 1234567890, "bistatic_range_km": 110.0, "doppler_hz": 30.0}
}"#;

const IMPOSSIBLE_PAIR_JSON: &str = r#"{
    "detection1": {"sensor_lat": 40.0, "sensor_lon": -74.0, "ioo_lat": 40.0, "ioo_lon": -74.0,
                   "freq_mhz": 100.0, "timestamp": 1234567890, "bistatic_range_km": 0.1, "doppler_hz": -10000.0},
    "detection2": {"sensor_lat": 41.0, "sensor_lon": -73.0, "ioo_lat": 41.0, "ioo_lon": -73.0,
                   "freq_mhz": 100.0, "timestamp": 1234567890, "bistatic_range_km": 0.1, "doppler_hz": 10000.0}
}"#;

fn run_driver(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_driver"))
        .args(args)
        .output()
        .unwrap()
}

fn run_on(path: &Path) -> (i32, Value) {
    let output = run_driver(&[path.to_str().unwrap()]);
    let payload: Value = serde_json::from_slice(&output.stdout).unwrap();
    (output.status.code().unwrap(), payload)
}

#[test]
fn valid_pair_prints_solution_and_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pair.json");
    fs::write(&path, PAIR_JSON).unwrap();

    let (code, payload) = run_on(&path);
    assert_eq!(code, 0);
    assert_eq!(payload["timestamp"], 1234567890);
    assert_eq!(payload["altitude"], 5000.0);
    assert_eq!(payload["velocity_up"], 0.0);
    assert!(payload.get("residuals").is_none());
}

#[test]
fn impossible_geometry_reports_no_solution_and_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("impossible.json");
    fs::write(&path, IMPOSSIBLE_PAIR_JSON).unwrap();

    let (code, payload) = run_on(&path);
    assert_eq!(code, 0);
    assert_eq!(payload["error"], "No Solution");
}

#[test]
fn malformed_json_exits_nonzero_with_error_payload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{\"detection1\": ").unwrap();

    let (code, payload) = run_on(&path);
    assert_eq!(code, 1);
    assert!(payload["error"].is_string());
}

#[test]
fn out_of_range_detection_names_the_detection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("invalid.json");
    fs::write(
        &path,
        PAIR_JSON.replacen("\"bistatic_range_km\": 110.0", "\"bistatic_range_km\": 0.0", 1),
    )
    .unwrap();

    let (code, payload) = run_on(&path);
    assert_eq!(code, 1);
    assert!(payload["error"]
        .as_str()
        .unwrap()
        .starts_with("Detection 2 validation failed"));
}

#[test]
fn missing_file_exits_nonzero() {
    let (code, payload) = run_on(Path::new("/nonexistent/detections.json"));
    assert_eq!(code, 1);
    assert!(payload["error"].as_str().unwrap().contains("reading detection file"));
}

#[test]
fn batch_reports_every_file_and_fails_on_input_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("1_pair.json"), PAIR_JSON).unwrap();
    fs::write(dir.path().join("2_impossible.json"), IMPOSSIBLE_PAIR_JSON).unwrap();

    let output = run_driver(&["--batch", dir.path().to_str().unwrap(), "--workers", "2", "--compact"]);
    assert_eq!(output.status.code(), Some(0));
    let payload: Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = payload.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["file"], "1_pair.json");
    assert_eq!(entries[1]["result"]["error"], "No Solution");

    fs::write(dir.path().join("3_broken.json"), "[]").unwrap();
    let output = run_driver(&["--batch", dir.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn synthesized_triple_solves_through_the_binary() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = dir.path().join("scenario.yaml");
    fs::write(&scenario, "seed: 7\ntimestamp: 42\n").unwrap();

    let output = run_driver(&["--synthesize", scenario.to_str().unwrap(), "--compact"]);
    assert_eq!(output.status.code(), Some(0));
    let document: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(document["detection3"]["timestamp"], 42);

    let input = dir.path().join("triple.json");
    fs::write(&input, &output.stdout).unwrap();
    let (code, payload) = run_on(&input);
    assert_eq!(code, 0);
    assert_eq!(payload["timestamp"], 42);
    assert!((payload["altitude"].as_f64().unwrap() - 6000.0).abs() < 5.0);
    assert!((payload["velocity_east"].as_f64().unwrap() - 120.0).abs() < 0.5);
    assert_eq!(payload["residuals"].as_array().map(Vec::len), Some(6));
}
