//! Shared test helpers for integration tests
//!
//! This module provides common utilities used across all test files.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use assert_cmd::cargo;
use assert_cmd::Command;
use tempfile::TempDir;

/// Electrical power from a voltage and a current, each with a calibration
/// correction. At `Low`, W = 2 * 3 and u_c(W) = 0.1.
pub const POWER_MODEL: &str = r#"
equation: "W = V * I, V = VMEAS + VCAL, I = IMEAS + ICAL"
points: [Low, High]
variables:
  - name: W
    unit: W
  - name: V
    unit: V
  - name: I
    unit: A
  - name: VMEAS
    type: B
    unit: V
    values:
      - central_value: 2.0
        standard_uncertainty: 0.03
        degrees_of_freedom: 5
      - central_value: 4.0
        standard_uncertainty: 0.03
        degrees_of_freedom: 5
  - name: VCAL
    type: B
    distribution: rectangular
    unit: V
    values:
      - central_value: 0.0
        half_width: 0.01
      - central_value: 0.0
        half_width: 0.01
  - name: IMEAS
    type: B
    unit: A
    values:
      - central_value: 3.0
        standard_uncertainty: 0.02
        degrees_of_freedom: 10
      - central_value: 1.5
        standard_uncertainty: 0.02
        degrees_of_freedom: 10
  - name: ICAL
    type: fixed
    unit: A
    values:
      - fixed_value: 0.0
      - fixed_value: 0.0
"#;

/// Helper to get a gum command
pub fn gum() -> Command {
    Command::new(cargo::cargo_bin!("gum"))
}

/// Write `content` as `name` inside a fresh temp directory
pub fn write_file(name: &str, content: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join(name);
    fs::write(&path, content).unwrap();
    (tmp, path)
}

/// Helper to create a model file in a temp directory
pub fn write_model(content: &str) -> (TempDir, PathBuf) {
    write_file("model.yaml", content)
}

/// Run gum with `--format json` and parse stdout
pub fn run_json(args: &[&str]) -> serde_json::Value {
    let output = gum().args(["--format", "json"]).args(args).output().unwrap();
    assert!(
        output.status.success(),
        "gum {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

pub fn approx(value: &serde_json::Value, expected: f64, tolerance: f64) -> bool {
    value
        .as_f64()
        .map(|v| (v - expected).abs() <= tolerance)
        .unwrap_or(false)
}
