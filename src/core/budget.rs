//! Uncertainty budget aggregation
//!
//! Combines per-input contributions (sensitivity × standard uncertainty) into
//! the combined standard uncertainty, Welch-Satterthwaite effective degrees of
//! freedom, a coverage factor from the t-table and the expanded uncertainty.

use num_complex::Complex64;
use serde::Serialize;

use crate::core::config::{CalcConfig, TTable};
use crate::core::equation::ResolvedExpression;
use crate::core::sensitivity::{
    central_value, partial_derivative_text, sensitivity, summarize_budget_issues, to_budget_value,
    zero_denominator_hint, zero_denominator_terms, BudgetCalculationIssue, IssueContext,
    IssueReason, SensitivityError,
};
use crate::entities::model::InputSnapshot;
use crate::entities::variable::{DegreesOfFreedom, Distribution};

/// Stand-in for infinite degrees of freedom in the Welch-Satterthwaite sum
pub const INFINITE_DOF: f64 = 1e100;

/// Lines shown by [`UncertaintyBudget::issue_summary`]
pub const ISSUE_SUMMARY_LINES: usize = 6;

/// √Σc² over the non-zero contributions
pub fn combined_uncertainty(contributions: &[f64]) -> f64 {
    let total: f64 = contributions
        .iter()
        .filter(|c| **c != 0.0)
        .map(|c| c * c)
        .sum();
    if total > 0.0 {
        total.sqrt()
    } else {
        0.0
    }
}

/// Percentage share of each contribution in Σc²
pub fn contribution_rates(contributions: &[f64]) -> Vec<f64> {
    let total: f64 = contributions.iter().map(|c| c * c).sum();
    if total <= 0.0 {
        return vec![0.0; contributions.len()];
    }
    contributions.iter().map(|c| c * c / total * 100.0).collect()
}

/// Welch-Satterthwaite effective degrees of freedom
///
/// Contributions are signed (`c·u`). Only rows whose signed contribution is
/// strictly positive and whose degrees of freedom are positive enter the
/// denominator, so an input with a negative sensitivity does not lower the
/// result. Returns [`INFINITE_DOF`] when nothing enters or when `combined` is
/// not positive.
pub fn effective_degrees_of_freedom(
    combined: f64,
    contributions: &[f64],
    degrees_of_freedom: &[f64],
) -> f64 {
    if combined <= 0.0 {
        return INFINITE_DOF;
    }
    let denominator: f64 = contributions
        .iter()
        .zip(degrees_of_freedom)
        .filter(|(c, dof)| **c > 0.0 && **dof > 0.0)
        .map(|(c, dof)| c.powi(4) / dof.min(INFINITE_DOF))
        .sum();
    if denominator > 0.0 {
        combined.powi(4) / denominator
    } else {
        INFINITE_DOF
    }
}

/// Coverage factor for ~95 % coverage
///
/// Ten or more degrees of freedom give 2.0. Below that the t-table is used,
/// interpolating linearly between bracketing entries; anything the table does
/// not bracket falls back to the infinity value.
pub fn coverage_factor(effective_dof: f64, table: &TTable) -> f64 {
    if effective_dof >= 10.0 {
        return 2.0;
    }
    t_value(effective_dof, table)
}

/// t value for `dof`, by exact entry or linear interpolation
pub fn t_value(dof: f64, table: &TTable) -> f64 {
    if let Some((_, t)) = table.entries.iter().find(|(k, _)| f64::from(**k) == dof) {
        return *t;
    }
    let keys: Vec<(f64, f64)> = table
        .entries
        .iter()
        .map(|(k, t)| (f64::from(*k), *t))
        .collect();
    for pair in keys.windows(2) {
        let (x1, y1) = pair[0];
        let (x2, y2) = pair[1];
        if x1 <= dof && dof < x2 {
            return y1 + (y2 - y1) * (dof - x1) / (x2 - x1);
        }
    }
    table.infinity
}

pub fn expanded_uncertainty(coverage_factor: f64, combined: f64) -> f64 {
    coverage_factor * combined
}

/// One input's line in a budget
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetRow {
    pub variable: String,
    pub central_value: Option<f64>,
    pub standard_uncertainty: Option<f64>,
    pub degrees_of_freedom: Option<DegreesOfFreedom>,
    pub distribution: Distribution,
    /// Rendered ∂target/∂variable
    pub partial_derivative: Option<String>,
    pub sensitivity: Option<f64>,
    pub contribution: Option<f64>,
    /// Percentage of Σc²
    pub contribution_rate: f64,
}

/// Budget of one result variable at one calibration point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UncertaintyBudget {
    pub target: String,
    pub point: String,
    pub expression: String,
    pub central_value: Option<f64>,
    pub rows: Vec<BudgetRow>,
    pub combined_uncertainty: f64,
    pub effective_degrees_of_freedom: f64,
    pub coverage_factor: f64,
    pub expanded_uncertainty: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<BudgetCalculationIssue>,
}

impl UncertaintyBudget {
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn issue_summary(&self) -> Option<String> {
        summarize_budget_issues(&self.issues, ISSUE_SUMMARY_LINES)
    }

    /// Effective dof, with the sentinel mapped back to infinity
    pub fn effective_dof_value(&self) -> f64 {
        if self.effective_degrees_of_freedom >= INFINITE_DOF {
            f64::INFINITY
        } else {
            self.effective_degrees_of_freedom
        }
    }
}

/// Build the budget of `resolved` from the inputs at one point
///
/// Rows follow `canonical` order first. Rows whose sensitivity or standard
/// uncertainty is unavailable contribute nothing; numeric problems are
/// collected in `issues` rather than aborting.
pub fn compute_budget(
    resolved: &ResolvedExpression,
    snapshot: &InputSnapshot,
    canonical: &[String],
    config: &CalcConfig,
) -> UncertaintyBudget {
    let point = snapshot.working_point();
    let point_name = snapshot.point_name.as_str();
    let tiny = config.tiny_imaginary_threshold;
    let mut issues = Vec::new();

    let central = match central_value(&resolved.expression, &point) {
        Ok(z) => checked(z, "central_value", &resolved.target, point_name, tiny, &mut issues),
        Err(e) => {
            record_failure(&e, "central_value", &resolved.target, point_name, &mut issues);
            None
        }
    };

    let mut rows = Vec::new();
    for name in resolved.ordered_inputs(canonical) {
        let input = snapshot.get(&name);
        let standard_uncertainty = input.and_then(|i| i.standard_uncertainty);

        let sensitivity = match sensitivity(&resolved.expression, &name, &point) {
            Ok(z) => checked(z, "sensitivity", &name, point_name, tiny, &mut issues),
            Err(e) => {
                record_failure(&e, "sensitivity", &name, point_name, &mut issues);
                None
            }
        };

        let contribution = match (sensitivity, standard_uncertainty) {
            (Some(s), Some(u)) => checked(
                Complex64::new(s * u, 0.0),
                "contribution",
                &name,
                point_name,
                tiny,
                &mut issues,
            ),
            _ => None,
        };

        rows.push(BudgetRow {
            partial_derivative: partial_derivative_text(&resolved.target, &resolved.expression, &name).ok(),
            variable: name,
            central_value: input.and_then(|i| i.central_value),
            standard_uncertainty,
            degrees_of_freedom: input.map(|i| i.degrees_of_freedom),
            distribution: input.map(|i| i.distribution).unwrap_or_default(),
            sensitivity,
            contribution,
            contribution_rate: 0.0,
        });
    }

    let contributions: Vec<f64> = rows.iter().map(|r| r.contribution.unwrap_or(0.0)).collect();
    let dofs: Vec<f64> = rows
        .iter()
        .map(|r| match r.degrees_of_freedom {
            Some(DegreesOfFreedom::Finite(n)) => f64::from(n),
            Some(DegreesOfFreedom::Infinite) => INFINITE_DOF,
            None => 0.0,
        })
        .collect();

    let combined = combined_uncertainty(&contributions);
    for (row, rate) in rows.iter_mut().zip(contribution_rates(&contributions)) {
        row.contribution_rate = rate;
    }
    let effective_dof = effective_degrees_of_freedom(combined, &contributions, &dofs);
    let k = coverage_factor(effective_dof, &config.t_table);

    if !issues.is_empty() {
        let hint = zero_denominator_hint(&zero_denominator_terms(&resolved.expression, &point));
        for issue in &mut issues {
            issue.hint = hint.clone();
        }
        tracing::warn!(
            target_variable = %resolved.target,
            point = point_name,
            count = issues.len(),
            "budget has calculation issues"
        );
    }

    tracing::debug!(
        target_variable = %resolved.target,
        point = point_name,
        combined,
        effective_dof,
        k,
        "computed budget"
    );

    UncertaintyBudget {
        target: resolved.target.clone(),
        point: point_name.to_string(),
        expression: resolved.expression.to_string(),
        central_value: central,
        rows,
        combined_uncertainty: combined,
        effective_degrees_of_freedom: effective_dof,
        coverage_factor: k,
        expanded_uncertainty: expanded_uncertainty(k, combined),
        issues,
    }
}

fn checked(
    z: Complex64,
    field: &str,
    variable: &str,
    point: &str,
    tiny: f64,
    issues: &mut Vec<BudgetCalculationIssue>,
) -> Option<f64> {
    let ctx = IssueContext {
        field,
        variable,
        point,
    };
    match to_budget_value(z, &ctx, tiny) {
        Ok(v) => Some(v),
        Err(issue) => {
            issues.push(issue);
            None
        }
    }
}

/// A missing central value is a placeholder; anything else is an issue
fn record_failure(
    error: &SensitivityError,
    field: &str,
    variable: &str,
    point: &str,
    issues: &mut Vec<BudgetCalculationIssue>,
) {
    if let SensitivityError::Eval(e) = error {
        let ctx = IssueContext {
            field,
            variable,
            point,
        };
        issues.push(BudgetCalculationIssue::new(&ctx, IssueReason::Unevaluable, e.to_string()));
    }
}
