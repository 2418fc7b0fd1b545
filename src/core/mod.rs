//! Core module - equation handling and uncertainty calculations

pub mod budget;
pub mod config;
pub mod equation;
pub mod evaluation;
pub mod expr;
pub mod monte_carlo;
pub mod normalize;
pub mod rounding;
pub mod sensitivity;
pub mod symbolic;
pub mod unit_validator;
pub mod units;

pub use budget::{compute_budget, BudgetRow, UncertaintyBudget, INFINITE_DOF};
pub use config::{CalcConfig, ConfigError};
pub use equation::{EquationSet, ResolveError, ResolvedExpression};
pub use expr::{Expr, ParseError};
pub use monte_carlo::{run_monte_carlo, MonteCarloError, MonteCarloOptions, MonteCarloResult};
pub use rounding::RoundingMode;
pub use sensitivity::{BudgetCalculationIssue, UnresolvedVariableError};
pub use unit_validator::{
    validate_unit_consistency, DimensionEvaluationError, UnitValidationReport, ValidationStatus,
};
pub use units::{parse_unit_expression, Dimension, UnitParseError};
