//! Sensitivity coefficients and the checked numeric boundary
//!
//! Derivatives are evaluated in complex arithmetic. Before a value enters an
//! uncertainty budget it passes through [`to_budget_value`], which turns NaN,
//! infinities and complex results into a [`BudgetCalculationIssue`] instead of
//! letting them leak into the sums.

use std::collections::HashMap;
use std::fmt;

use num_complex::Complex64;
use serde::Serialize;
use thiserror::Error;

use crate::core::expr::Expr;
use crate::core::symbolic::{denominator_variables, derivative, evaluate_complex, EvalError};

/// Central values of the inputs at one calibration point
pub type WorkingPoint = HashMap<String, f64>;

/// Some referenced variables have no central value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Missing central value for: {}", missing.join(", "))]
pub struct UnresolvedVariableError {
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensitivityError {
    #[error(transparent)]
    Unresolved(#[from] UnresolvedVariableError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Why a value could not be used in a budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueReason {
    Empty,
    ComplexInfinity,
    Infinite,
    NotANumber,
    Complex,
    Unevaluable,
}

impl fmt::Display for IssueReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            IssueReason::Empty => "value is empty",
            IssueReason::ComplexInfinity => "complex infinity (possible division by zero)",
            IssueReason::Infinite => "infinite (possible division by zero or divergence)",
            IssueReason::NotANumber => "not a number (NaN)",
            IssueReason::Complex => "complex value",
            IssueReason::Unevaluable => "cannot be evaluated",
        };
        write!(f, "{}", text)
    }
}

/// One offending value in a budget computation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetCalculationIssue {
    pub field_name: String,
    pub variable_name: String,
    pub point_name: String,
    pub reason: IssueReason,
    pub value_repr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl BudgetCalculationIssue {
    pub fn new(ctx: &IssueContext<'_>, reason: IssueReason, value_repr: impl Into<String>) -> Self {
        BudgetCalculationIssue {
            field_name: ctx.field.to_string(),
            variable_name: ctx.variable.to_string(),
            point_name: ctx.point.to_string(),
            reason,
            value_repr: value_repr.into(),
            hint: None,
        }
    }

    /// `field [variable] @ point: reason (value=...) / hint`
    pub fn to_display_line(&self) -> String {
        let line = format!(
            "{} [{}] @ {}: {} (value={})",
            self.field_name, self.variable_name, self.point_name, self.reason, self.value_repr
        );
        match &self.hint {
            Some(hint) if !hint.is_empty() => format!("{} / {}", line, hint),
            _ => line,
        }
    }
}

impl fmt::Display for BudgetCalculationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_line())
    }
}

/// Where a value came from, for issue reporting
#[derive(Debug, Clone, Copy)]
pub struct IssueContext<'a> {
    pub field: &'a str,
    pub variable: &'a str,
    pub point: &'a str,
}

/// Accept a value only if it is a finite real number
///
/// An imaginary part no larger than `tiny_imaginary` is treated as rounding
/// noise and dropped.
pub fn to_budget_value(
    z: Complex64,
    ctx: &IssueContext<'_>,
    tiny_imaginary: f64,
) -> Result<f64, BudgetCalculationIssue> {
    let reason = if z.re.is_infinite() && z.im.is_infinite() {
        IssueReason::ComplexInfinity
    } else if z.re.is_nan() || z.im.is_nan() {
        IssueReason::NotANumber
    } else if z.re.is_infinite() || z.im.is_infinite() {
        IssueReason::Infinite
    } else if z.im.abs() > tiny_imaginary {
        IssueReason::Complex
    } else {
        return Ok(z.re);
    };

    let repr = if reason == IssueReason::ComplexInfinity {
        "zoo".to_string()
    } else if z.im == 0.0 {
        z.re.to_string()
    } else {
        z.to_string()
    };
    Err(BudgetCalculationIssue::new(ctx, reason, repr))
}

/// Evaluate `expr` at the working point
pub fn central_value(expr: &Expr, point: &WorkingPoint) -> Result<Complex64, SensitivityError> {
    check_bound(&expr.variables(), point)?;
    Ok(evaluate_complex(expr, &|name| point.get(name).copied())?)
}

/// ∂expr/∂wrt evaluated at the working point
///
/// Only the variables the derivative still mentions need a central value.
pub fn sensitivity(
    expr: &Expr,
    wrt: &str,
    point: &WorkingPoint,
) -> Result<Complex64, SensitivityError> {
    let d = derivative(expr, wrt)?;
    check_bound(&d.variables(), point)?;
    let value = evaluate_complex(&d, &|name| point.get(name).copied())?;
    tracing::debug!(variable = wrt, derivative = %d, value = %value, "sensitivity");
    Ok(value)
}

/// Rendered partial derivative, e.g. `∂W/∂V = I`
pub fn partial_derivative_text(target: &str, expr: &Expr, wrt: &str) -> Result<String, EvalError> {
    let d = derivative(expr, wrt)?;
    Ok(format!("∂{}/∂{} = {}", target, wrt, d))
}

fn check_bound(variables: &[String], point: &WorkingPoint) -> Result<(), UnresolvedVariableError> {
    let missing: Vec<String> = variables
        .iter()
        .filter(|v| !point.contains_key(*v))
        .cloned()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(UnresolvedVariableError { missing })
    }
}

/// Denominator variables whose central value is exactly zero
pub fn zero_denominator_terms(expr: &Expr, point: &WorkingPoint) -> Vec<(String, f64)> {
    denominator_variables(expr)
        .into_iter()
        .filter_map(|name| match point.get(&name) {
            Some(v) if *v == 0.0 => Some((name, *v)),
            _ => None,
        })
        .collect()
}

/// Hint text listing zero-denominator candidates
pub fn zero_denominator_hint(terms: &[(String, f64)]) -> Option<String> {
    if terms.is_empty() {
        return None;
    }
    let joined = terms
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join(", ");
    Some(format!("zero-denominator candidates: {}", joined))
}

/// Consolidated text for a batch of issues, `None` when there are none
pub fn summarize_budget_issues(issues: &[BudgetCalculationIssue], max_lines: usize) -> Option<String> {
    if issues.is_empty() {
        return None;
    }
    let mut lines: Vec<String> = issues
        .iter()
        .take(max_lines)
        .map(BudgetCalculationIssue::to_display_line)
        .collect();
    if issues.len() > max_lines {
        lines.push(format!("... and {} more issue(s)", issues.len() - max_lines));
    }
    Some(format!(
        "Uncertainty budget calculation failed.\n\
         Check the values involved (especially zero denominators, complex values, NaN and infinity).\n\n{}",
        lines.join("\n")
    ))
}
