//! Input evaluation helpers
//!
//! Turn the raw description of an input (repeated observations, a declared
//! half-width, a calibration curve, a numeric formula) into a central value,
//! a standard uncertainty and degrees of freedom.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use crate::core::expr::{Expr, ParseError};
use crate::core::symbolic::{evaluate_real, EvalError};

/// Type A evaluation of repeated observations
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TypeAResult {
    pub mean: f64,
    /// Experimental standard deviation of the observations (n-1 divisor)
    pub std_dev: f64,
    /// Standard deviation of the mean, s/√n
    pub standard_uncertainty: f64,
    pub degrees_of_freedom: u32,
}

/// Mean, s/√n and n-1 degrees of freedom
///
/// A single observation gives a zero uncertainty with zero degrees of freedom.
/// Returns `None` for an empty slice.
pub fn type_a_evaluation(observations: &[f64]) -> Option<TypeAResult> {
    if observations.is_empty() {
        return None;
    }
    let n = observations.len() as f64;
    let mean = observations.iter().sum::<f64>() / n;
    let std_dev = if observations.len() > 1 {
        let variance = observations.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
        variance.sqrt()
    } else {
        0.0
    };
    Some(TypeAResult {
        mean,
        std_dev,
        standard_uncertainty: std_dev / n.sqrt(),
        degrees_of_freedom: (observations.len() - 1) as u32,
    })
}

/// Type B standard uncertainty from a half-width and divisor
pub fn type_b_standard_uncertainty(half_width: f64, divisor: f64) -> Option<f64> {
    if divisor == 0.0 || !divisor.is_finite() || !half_width.is_finite() {
        return None;
    }
    Some(half_width / divisor)
}

/// Prediction from a straight-line calibration curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegressionPrediction {
    pub value: f64,
    pub standard_uncertainty: f64,
    /// `None` means infinite (fewer than three points)
    pub degrees_of_freedom: Option<u32>,
    pub slope: f64,
    pub intercept: f64,
}

/// Least-squares line through `points`, evaluated at `x`
///
/// With three or more points the prediction uncertainty is
/// `se * sqrt(1/n + (x - x̄)² / Sxx)` with n-2 degrees of freedom. Two points
/// give an exact line with zero uncertainty. Returns `None` for fewer than two
/// points or when all x values coincide.
pub fn linear_regression_prediction(points: &[(f64, f64)], x: f64) -> Option<RegressionPrediction> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let x_mean = points.iter().map(|(px, _)| px).sum::<f64>() / n;
    let y_mean = points.iter().map(|(_, py)| py).sum::<f64>() / n;

    let sxx: f64 = points.iter().map(|(px, _)| (px - x_mean).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = points
        .iter()
        .map(|(px, py)| (px - x_mean) * (py - y_mean))
        .sum();
    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    let value = slope * x + intercept;

    let (standard_uncertainty, degrees_of_freedom) = if points.len() >= 3 {
        let residual_sq: f64 = points
            .iter()
            .map(|(px, py)| (py - (slope * px + intercept)).powi(2))
            .sum();
        let standard_error = (residual_sq / (n - 2.0)).sqrt();
        let u = standard_error * (1.0 / n + (x - x_mean).powi(2) / sxx).sqrt();
        (u, Some((points.len() - 2) as u32))
    } else {
        (0.0, None)
    };

    Some(RegressionPrediction {
        value,
        standard_uncertainty,
        degrees_of_freedom,
        slope,
        intercept,
    })
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    #[error("Formula is empty")]
    Empty,

    #[error("Invalid formula: {0}")]
    Parse(#[from] ParseError),

    #[error("Cannot evaluate formula: {0}")]
    Eval(#[from] EvalError),

    #[error("Formula result is not a finite number")]
    NotFinite,
}

/// Evaluate a numeric formula such as `50e-6 * 2 + 0.3^2`
///
/// Names resolve through `variables`. The result is rounded to `precision`
/// significant digits (capped at what an `f64` carries).
pub fn evaluate_formula(
    formula: &str,
    variables: &HashMap<String, f64>,
    precision: u32,
) -> Result<f64, FormulaError> {
    if formula.trim().is_empty() {
        return Err(FormulaError::Empty);
    }
    let expr = Expr::parse(formula)?;
    let value = evaluate_real(&expr, &|name| variables.get(name).copied())?;
    if !value.is_finite() {
        return Err(FormulaError::NotFinite);
    }
    Ok(round_significant(value, precision))
}

/// Round to a number of significant digits; 17 or more leaves `f64` as is
pub fn round_significant(value: f64, digits: u32) -> f64 {
    if value == 0.0 || digits >= 17 || !value.is_finite() {
        return value;
    }
    let digits = digits.max(1) as i32;
    let magnitude = value.abs().log10().floor() as i32;
    let factor = 10f64.powi(digits - 1 - magnitude);
    (value * factor).round() / factor
}
