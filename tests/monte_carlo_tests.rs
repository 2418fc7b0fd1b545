//! Monte Carlo command tests - seeded runs, correlation, CSV export

mod common;

use common::{approx, gum, run_json, write_model, POWER_MODEL};
use predicates::prelude::*;

const DIFFERENCE_MODEL: &str = r#"
equation: "Y = A - B"
variables:
  - name: A
    values:
      - central_value: 0.0
        standard_uncertainty: 1.0
  - name: B
    values:
      - central_value: 0.0
        standard_uncertainty: 1.0
"#;

// ============================================================================
// Statistics
// ============================================================================

#[test]
fn test_mc_seeded_run_is_reproducible() {
    let (_tmp, model) = write_model(POWER_MODEL);
    let path = model.to_str().unwrap();
    let first = run_json(&["mc", path, "--seed", "42", "--samples", "2000"]);
    let second = run_json(&["mc", path, "--seed", "42", "--samples", "2000"]);
    assert_eq!(first["statistics"], second["statistics"]);
    assert_eq!(first["statistics"]["sample_count"], 2000);
}

#[test]
fn test_mc_matches_budget() {
    let (_tmp, model) = write_model(POWER_MODEL);
    let json = run_json(&[
        "mc",
        model.to_str().unwrap(),
        "-t",
        "W",
        "-p",
        "Low",
        "--seed",
        "7",
        "--samples",
        "40000",
    ]);
    assert_eq!(json["target"], "W");
    assert_eq!(json["point"], "Low");
    assert!(approx(&json["statistics"]["mean"], 6.0, 0.01));
    assert!(approx(&json["statistics"]["std_dev"], 0.1, 0.005));
}

#[test]
fn test_mc_difference_of_independent_normals() {
    let (_tmp, model) = write_model(DIFFERENCE_MODEL);
    let json = run_json(&["mc", model.to_str().unwrap(), "--seed", "7", "--samples", "40000"]);
    let std_dev = json["statistics"]["std_dev"].as_f64().unwrap();
    assert!((std_dev - 2f64.sqrt()).abs() < 0.05, "std_dev = {}", std_dev);
}

#[test]
fn test_mc_correlation_narrows_difference() {
    let correlated = format!("{}correlations:\n  - [A, B, 0.9]\n", DIFFERENCE_MODEL);
    let (_tmp, model) = write_model(&correlated);
    let json = run_json(&["mc", model.to_str().unwrap(), "--seed", "7", "--samples", "40000"]);
    let std_dev = json["statistics"]["std_dev"].as_f64().unwrap();
    assert!((std_dev - 0.2f64.sqrt()).abs() < 0.03, "std_dev = {}", std_dev);
    assert!(std_dev < 2f64.sqrt() / 2.0);
}

#[test]
fn test_mc_histogram_bins() {
    let (_tmp, model) = write_model(DIFFERENCE_MODEL);
    let json = run_json(&[
        "mc",
        model.to_str().unwrap(),
        "--seed",
        "1",
        "--samples",
        "500",
        "--bins",
        "10",
    ]);
    let counts = json["histogram"]["counts"].as_array().unwrap();
    assert_eq!(counts.len(), 10);
    assert_eq!(json["histogram"]["edges"].as_array().unwrap().len(), 11);
    let total: u64 = counts.iter().map(|c| c.as_u64().unwrap()).sum();
    assert_eq!(total, 500);
}

// ============================================================================
// Output Modes
// ============================================================================

#[test]
fn test_mc_text_with_histogram() {
    let (_tmp, model) = write_model(DIFFERENCE_MODEL);
    gum()
        .arg("mc")
        .arg(&model)
        .args(["--seed", "3", "--samples", "1000", "--bins", "12", "--histogram"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Monte Carlo: Y"))
        .stdout(predicate::str::contains("Std Dev:"))
        .stdout(predicate::str::contains("Distribution Histogram"))
        .stdout(predicate::str::contains("█"));
}

#[test]
fn test_mc_csv_export() {
    let (_tmp, model) = write_model(DIFFERENCE_MODEL);
    let output = gum()
        .arg("mc")
        .arg(&model)
        .args(["--seed", "5", "--samples", "100", "--csv"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "sample,value");
    assert_eq!(lines.len(), 101);
    assert!(lines[1].starts_with("1,"));
}

// ============================================================================
// Failure Cases
// ============================================================================

#[test]
fn test_mc_perfect_correlation_rejected() {
    let correlated = format!("{}correlations:\n  - [A, B, 1.0]\n", DIFFERENCE_MODEL);
    let (_tmp, model) = write_model(&correlated);
    gum()
        .arg("mc")
        .arg(&model)
        .args(["--samples", "100"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not positive definite"));
}

#[test]
fn test_mc_missing_central_value_fails() {
    let (_tmp, model) = write_model(
        r#"
equation: "Y = A + B"
variables:
  - name: A
    values:
      - central_value: 1.0
        standard_uncertainty: 0.1
"#,
    );
    gum()
        .arg("mc")
        .arg(&model)
        .args(["--samples", "100"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing central value for 'B'"));
}

#[test]
fn test_mc_zero_samples_rejected() {
    let (_tmp, model) = write_model(DIFFERENCE_MODEL);
    gum()
        .arg("mc")
        .arg(&model)
        .args(["--samples", "0"])
        .assert()
        .failure();
}

#[test]
fn test_mc_unrepresentable_range_fails_cleanly() {
    let (_tmp, model) = write_model(
        r#"
equation: "Y = A + B"
variables:
  - name: A
    distribution: rectangular
    values:
      - central_value: 0.0
        standard_uncertainty: 1.0e308
  - name: B
    values:
      - central_value: 1.0
        standard_uncertainty: 0.1
"#,
    );
    gum()
        .arg("mc")
        .arg(&model)
        .args(["--seed", "1", "--samples", "100"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input 'A' has a non-finite half-width"))
        .stderr(predicate::str::contains("panicked").not());
}
