//! CLI surface tests - help, resolve, derive, completions and error reporting

mod common;

use common::{gum, run_json, write_file, write_model, POWER_MODEL};
use predicates::prelude::*;

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_help_displays() {
    gum()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("GUM measurement uncertainty calculator"));
}

#[test]
fn test_version_displays() {
    gum()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gum"));
}

#[test]
fn test_unknown_command_fails() {
    gum()
        .arg("unknown-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_subcommands_listed_in_help() {
    gum()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("budget"))
        .stdout(predicate::str::contains("units"))
        .stdout(predicate::str::contains("mc"));
}

// ============================================================================
// Resolve Command Tests
// ============================================================================

#[test]
fn test_resolve_flattens_chain() {
    let (_tmp, model) = write_model(POWER_MODEL);
    gum()
        .arg("resolve")
        .arg(&model)
        .args(["--target", "W"])
        .assert()
        .success()
        .stdout(predicate::str::contains("W = (VMEAS + VCAL) * (IMEAS + ICAL)"))
        .stdout(predicate::str::contains("inputs: VMEAS, VCAL, IMEAS, ICAL"));
}

#[test]
fn test_resolve_lists_variables() {
    let (_tmp, model) = write_model(POWER_MODEL);
    gum()
        .arg("resolve")
        .arg(&model)
        .arg("--variables")
        .assert()
        .success()
        .stdout(predicate::str::contains("Result variables: W, V, I"))
        .stdout(predicate::str::contains("Input variables: VMEAS, VCAL, IMEAS, ICAL"));
}

#[test]
fn test_resolve_json_output() {
    let (_tmp, model) = write_model(POWER_MODEL);
    let json = run_json(&["resolve", model.to_str().unwrap()]);

    assert_eq!(json["result_variables"], serde_json::json!(["W", "V", "I"]));
    let resolved = json["resolved"].as_array().unwrap();
    assert_eq!(resolved.len(), 3);
    assert_eq!(resolved[1]["target"], "V");
    assert_eq!(resolved[1]["expression"], "VMEAS + VCAL");
    assert!(resolved.iter().all(|r| r.get("error").is_none()));
}

#[test]
fn test_resolve_circular_dependency_fails() {
    let (_tmp, model) = write_model("equation: \"A = B, B = A\"\n");
    gum()
        .arg("resolve")
        .arg(&model)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Circular dependency"));
}

#[test]
fn test_resolve_unknown_target_fails() {
    let (_tmp, model) = write_model(POWER_MODEL);
    gum()
        .arg("resolve")
        .arg(&model)
        .args(["-t", "Q"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No equation defines 'Q'"));
}

// ============================================================================
// Derive Command Tests
// ============================================================================

#[test]
fn test_derive_product_rule() {
    let (_tmp, model) = write_model("equation: \"W = V * I\"\n");
    gum()
        .arg("derive")
        .arg(&model)
        .assert()
        .success()
        .stdout(predicate::str::contains("∂W/∂V = I"))
        .stdout(predicate::str::contains("∂W/∂I = V"));
}

#[test]
fn test_derive_single_variable() {
    let (_tmp, model) = write_model("equation: \"W = V * I\"\n");
    let json = run_json(&["derive", model.to_str().unwrap(), "--wrt", "I"]);
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["variable"], "I");
    assert_eq!(entries[0]["derivative"], "∂W/∂I = V");
}

#[test]
fn test_derive_unknown_input_fails() {
    let (_tmp, model) = write_model("equation: \"W = V * I\"\n");
    gum()
        .arg("derive")
        .arg(&model)
        .args(["--wrt", "R"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'R' is not an input"));
}

// ============================================================================
// Error Reporting Tests
// ============================================================================

#[test]
fn test_missing_model_file_fails() {
    gum()
        .args(["resolve", "does-not-exist.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read file"));
}

#[test]
fn test_invalid_yaml_reports_location() {
    let (_tmp, model) = write_model("equation: [unclosed\n");
    gum()
        .arg("resolve")
        .arg(&model)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid YAML"));
}

#[test]
fn test_duplicate_variable_rejected() {
    let (_tmp, model) = write_model(
        "equation: \"Y = X\"\nvariables:\n  - name: X\n  - name: X\n",
    );
    gum()
        .arg("resolve")
        .arg(&model)
        .assert()
        .failure()
        .stderr(predicate::str::contains("defined more than once"));
}

#[test]
fn test_invalid_config_rejected() {
    let (_tmp, model) = write_model(POWER_MODEL);
    let (_cfg_tmp, config) = write_file("gum.yaml", "monte_carlo:\n  default_samples: 0\n");
    gum()
        .arg("--config")
        .arg(&config)
        .arg("budget")
        .arg(&model)
        .assert()
        .failure();
}

// ============================================================================
// Completions Tests
// ============================================================================

#[test]
fn test_completions_bash() {
    gum()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gum"));
}
