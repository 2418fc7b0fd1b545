//! Unit consistency tests - `gum units` reports and strict mode

mod common;

use common::{gum, run_json, write_model, POWER_MODEL};
use predicates::prelude::*;

const FORCE_MODEL: &str = r#"
equation: "F = m * a"
variables:
  - name: F
    unit: N
  - name: m
    unit: kg
  - name: a
    unit: m/s^2
"#;

const MISMATCH_MODEL: &str = r#"
equation: "x = t + y"
variables:
  - name: x
    unit: m
  - name: t
    unit: s
  - name: y
    unit: m
"#;

// ============================================================================
// Consistent Models
// ============================================================================

#[test]
fn test_units_force_model_consistent() {
    let (_tmp, model) = write_model(FORCE_MODEL);
    let json = run_json(&["units", model.to_str().unwrap()]);
    assert_eq!(json["error_count"], 0);
    assert_eq!(json["equation_items"][0]["status"], "OK");
    assert_eq!(json["variable_items"].as_array().unwrap().len(), 3);
}

#[test]
fn test_units_power_chain_consistent() {
    let (_tmp, model) = write_model(POWER_MODEL);
    let json = run_json(&["units", model.to_str().unwrap()]);
    assert_eq!(json["error_count"], 0);
    let equations = json["equation_items"].as_array().unwrap();
    assert_eq!(equations.len(), 3);
    assert!(equations.iter().all(|e| e["status"] == "OK"));
}

#[test]
fn test_units_text_summary() {
    let (_tmp, model) = write_model(FORCE_MODEL);
    gum()
        .arg("units")
        .arg(&model)
        .assert()
        .success()
        .stdout(predicate::str::contains("F = m * a"))
        .stdout(predicate::str::contains("LHS and RHS dimensions are consistent."))
        .stdout(predicate::str::contains("0 ERROR"));
}

// ============================================================================
// Inconsistent Models
// ============================================================================

#[test]
fn test_units_mismatched_terms_reported() {
    let (_tmp, model) = write_model(MISMATCH_MODEL);
    let json = run_json(&["units", model.to_str().unwrap()]);
    assert!(json["error_count"].as_u64().unwrap() >= 1);
    assert_eq!(json["equation_items"][0]["status"], "ERROR");
}

#[test]
fn test_units_strict_fails_on_error() {
    let (_tmp, model) = write_model(MISMATCH_MODEL);
    gum()
        .arg("units")
        .arg(&model)
        .assert()
        .success();
    gum()
        .arg("units")
        .arg(&model)
        .arg("--strict")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unit check(s) failed"));
}

#[test]
fn test_units_missing_unit_warns() {
    let (_tmp, model) = write_model(
        r#"
equation: "y = k * x"
variables:
  - name: y
    unit: m
  - name: k
  - name: x
    unit: m
"#,
    );
    let json = run_json(&["units", model.to_str().unwrap()]);
    let k = json["variable_items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|i| i["name"] == "k")
        .cloned()
        .unwrap();
    assert_eq!(k["status"], "WARN");
    assert_eq!(k["message"], "Unit is not set.");
}

#[test]
fn test_units_bad_unit_is_error() {
    let (_tmp, model) = write_model(
        r#"
equation: "y = x"
variables:
  - name: y
    unit: m
  - name: x
    unit: "furlong"
"#,
    );
    let json = run_json(&["units", model.to_str().unwrap()]);
    let x = &json["variable_items"][1];
    assert_eq!(x["name"], "x");
    assert_eq!(x["status"], "ERROR");
    assert!(json["error_count"].as_u64().unwrap() >= 1);
}

#[test]
fn test_units_transcendental_requires_dimensionless() {
    let (_tmp, model) = write_model(
        r#"
equation: "y = exp(x)"
variables:
  - name: y
    unit: "1"
  - name: x
    unit: s
"#,
    );
    let json = run_json(&["units", model.to_str().unwrap()]);
    assert_eq!(json["equation_items"][0]["status"], "ERROR");
    assert_eq!(
        json["equation_items"][0]["message"],
        "Function 'exp' requires dimensionless arguments."
    );
}

#[test]
fn test_units_exponent_overflow_is_reported() {
    let (_tmp, model) = write_model(
        r#"
equation: "y = (x^3037000500)^3037000500"
variables:
  - name: y
    unit: m
  - name: x
    unit: m
  - name: z
    unit: "(m^3037000500)^3037000500"
"#,
    );
    let json = run_json(&["units", model.to_str().unwrap()]);
    assert_eq!(json["equation_items"][0]["status"], "ERROR");
    assert_eq!(json["equation_items"][0]["message"], "Exponent is too large.");
    let z = &json["variable_items"][2];
    assert_eq!(z["name"], "z");
    assert_eq!(z["status"], "ERROR");
    assert!(z["message"].as_str().unwrap().contains("Exponent out of range"));
}
