//! Dimensional consistency of a model's equations
//!
//! Every variable's unit string is parsed with [`parse_unit_expression`]; each
//! equation's right-hand side is then evaluated in the dimension algebra and
//! compared with the unit of its left-hand variable.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::core::equation::{Clause, EquationSet};
use crate::core::expr::{BinaryOp, Expr, Function};
use crate::core::units::{parse_unit_expression, Dimension};

/// Outcome of one check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationStatus {
    Ok,
    Warn,
    Error,
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationStatus::Ok => write!(f, "OK"),
            ValidationStatus::Warn => write!(f, "WARN"),
            ValidationStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Why a right-hand side has no dimension
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DimensionEvaluationError {
    #[error("Unit for variable '{0}' is unresolved.")]
    UnresolvedVariable(String),

    #[error("Addition/subtraction requires same dimensions for all terms.")]
    MismatchedTerms,

    #[error("Exponent must be dimensionless.")]
    DimensionalExponent,

    #[error("Exponent must be numeric.")]
    NonNumericExponent,

    #[error("Exponent is too large.")]
    ExponentOverflow,

    #[error("Function '{0}' requires dimensionless arguments.")]
    DimensionalArgument(String),

    #[error("{0} function expects a single argument.")]
    Arity(String),

    #[error("Unsupported function '{0}' in equation.")]
    UnsupportedFunction(String),
}

/// Check of one variable's unit string
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitValidationItem {
    pub name: String,
    pub unit: String,
    pub status: ValidationStatus,
    pub message: String,
    pub dimension: Option<Dimension>,
}

/// Check of one equation clause
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquationValidationItem {
    pub equation: String,
    pub lhs_dimension: Option<Dimension>,
    pub rhs_dimension: Option<Dimension>,
    pub status: ValidationStatus,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitValidationReport {
    pub variable_items: Vec<UnitValidationItem>,
    pub equation_items: Vec<EquationValidationItem>,
    pub ok_count: usize,
    pub warn_count: usize,
    pub error_count: usize,
}

impl UnitValidationReport {
    pub fn is_consistent(&self) -> bool {
        self.error_count == 0
    }
}

/// Validate the units of `variable_units` against `equation_text`
///
/// `variable_units` lists every registered variable (results included) with
/// its unit text; an empty unit means "not set".
pub fn validate_unit_consistency<I, K, V>(equation_text: &str, variable_units: I) -> UnitValidationReport
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut variable_items = Vec::new();
    let mut dimensions: HashMap<String, Option<Dimension>> = HashMap::new();

    for (name, unit) in variable_units {
        let name = name.as_ref().to_string();
        let unit = unit.as_ref().trim().to_string();
        let (status, message, dimension) = if unit.is_empty() {
            (ValidationStatus::Warn, "Unit is not set.".to_string(), None)
        } else {
            match parse_unit_expression(&unit) {
                Ok(d) => (ValidationStatus::Ok, "Parsed successfully.".to_string(), Some(d)),
                Err(e) => (ValidationStatus::Error, e.to_string(), None),
            }
        };
        dimensions.insert(name.clone(), dimension);
        variable_items.push(UnitValidationItem {
            name,
            unit,
            status,
            message,
            dimension,
        });
    }

    let equation_items = validate_equations(equation_text, &dimensions);

    let count = |status: ValidationStatus| {
        variable_items.iter().filter(|i| i.status == status).count()
            + equation_items.iter().filter(|i| i.status == status).count()
    };
    let report = UnitValidationReport {
        ok_count: count(ValidationStatus::Ok),
        warn_count: count(ValidationStatus::Warn),
        error_count: count(ValidationStatus::Error),
        variable_items,
        equation_items,
    };
    tracing::debug!(
        ok = report.ok_count,
        warn = report.warn_count,
        error = report.error_count,
        "unit validation finished"
    );
    report
}

fn validate_equations(
    equation_text: &str,
    dimensions: &HashMap<String, Option<Dimension>>,
) -> Vec<EquationValidationItem> {
    let set = EquationSet::parse(equation_text);
    if set.is_empty() {
        return vec![item("", None, None, ValidationStatus::Warn, "No equation found.")];
    }

    set.clauses()
        .iter()
        .map(|clause| {
            let equation = match clause {
                Clause::Ignored(text) => {
                    return item(
                        text,
                        None,
                        None,
                        ValidationStatus::Warn,
                        "Equation is ignored because '=' is not found.",
                    )
                }
                Clause::Equation(eq) => eq,
            };
            let text = format!("{} = {}", equation.result, equation.expression_text);

            let lhs = match dimensions.get(&equation.result) {
                None => {
                    let message = format!("LHS variable '{}' is not registered.", equation.result);
                    return item(&text, None, None, ValidationStatus::Warn, &message);
                }
                Some(None) => {
                    let message = format!("LHS variable '{}' unit is unresolved.", equation.result);
                    return item(&text, None, None, ValidationStatus::Warn, &message);
                }
                Some(Some(d)) => *d,
            };

            let rhs = match equation.parse_expression() {
                Ok(expr) => evaluate_dimension(&expr, dimensions).map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            match rhs {
                Err(message) => item(&text, Some(lhs), None, ValidationStatus::Error, &message),
                Ok(rhs) if rhs == lhs => item(
                    &text,
                    Some(lhs),
                    Some(rhs),
                    ValidationStatus::Ok,
                    "LHS and RHS dimensions are consistent.",
                ),
                Ok(rhs) => item(
                    &text,
                    Some(lhs),
                    Some(rhs),
                    ValidationStatus::Error,
                    "LHS and RHS dimensions do not match.",
                ),
            }
        })
        .collect()
}

fn item(
    equation: &str,
    lhs: Option<Dimension>,
    rhs: Option<Dimension>,
    status: ValidationStatus,
    message: &str,
) -> EquationValidationItem {
    EquationValidationItem {
        equation: equation.to_string(),
        lhs_dimension: lhs,
        rhs_dimension: rhs,
        status,
        message: message.to_string(),
    }
}

/// Dimension of an expression given the dimensions of its variables
pub fn evaluate_dimension(
    expr: &Expr,
    dimensions: &HashMap<String, Option<Dimension>>,
) -> Result<Dimension, DimensionEvaluationError> {
    match expr {
        Expr::Literal(_) => Ok(Dimension::dimensionless()),
        Expr::Variable(name) => dimensions
            .get(name)
            .copied()
            .flatten()
            .ok_or_else(|| DimensionEvaluationError::UnresolvedVariable(name.clone())),
        Expr::Unary { operand, .. } => evaluate_dimension(operand, dimensions),
        Expr::Binary { op, lhs, rhs } => {
            let left = evaluate_dimension(lhs, dimensions)?;
            match op {
                BinaryOp::Add | BinaryOp::Sub => {
                    let right = evaluate_dimension(rhs, dimensions)?;
                    if left == right {
                        Ok(left)
                    } else {
                        Err(DimensionEvaluationError::MismatchedTerms)
                    }
                }
                BinaryOp::Mul => left
                    .checked_mul(&evaluate_dimension(rhs, dimensions)?)
                    .ok_or(DimensionEvaluationError::ExponentOverflow),
                BinaryOp::Div => left
                    .checked_div(&evaluate_dimension(rhs, dimensions)?)
                    .ok_or(DimensionEvaluationError::ExponentOverflow),
                BinaryOp::Pow => {
                    if !evaluate_dimension(rhs, dimensions)?.is_dimensionless() {
                        return Err(DimensionEvaluationError::DimensionalExponent);
                    }
                    let power = rhs
                        .constant_rational()
                        .ok_or(DimensionEvaluationError::NonNumericExponent)?;
                    left.checked_powr(power)
                        .ok_or(DimensionEvaluationError::ExponentOverflow)
                }
            }
        }
        Expr::Call { func, args } => match func {
            Function::Sqrt | Function::Abs => {
                let [arg] = args.as_slice() else {
                    return Err(DimensionEvaluationError::Arity(func.name().to_string()));
                };
                let inner = evaluate_dimension(arg, dimensions)?;
                if *func == Function::Sqrt {
                    inner
                        .checked_powr(num_rational::Rational64::new(1, 2))
                        .ok_or(DimensionEvaluationError::ExponentOverflow)
                } else {
                    Ok(inner)
                }
            }
            Function::Other(name) => Err(DimensionEvaluationError::UnsupportedFunction(name.clone())),
            known => {
                for arg in args {
                    if !evaluate_dimension(arg, dimensions)?.is_dimensionless() {
                        return Err(DimensionEvaluationError::DimensionalArgument(
                            known.name().to_string(),
                        ));
                    }
                }
                Ok(Dimension::dimensionless())
            }
        },
    }
}
