//! Variable records - how each input of a measurement model is evaluated
//!
//! A record holds one [`ValuePoint`] per calibration point. Depending on the
//! uncertainty type, a point is evaluated from repeated observations (Type A),
//! a declared half-width or a calibration curve (Type B), or a fixed value.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::CalcConfig;
use crate::core::evaluation::{
    evaluate_formula, linear_regression_prediction, type_a_evaluation, type_b_standard_uncertainty,
    FormulaError,
};

/// Probability distribution assigned to an input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    /// Normal (Gaussian) distribution
    #[default]
    Normal,
    /// Rectangular (uniform) distribution
    #[serde(alias = "uniform")]
    Rectangular,
    /// Symmetric triangular distribution
    Triangular,
    /// U-shaped (arcsine) distribution
    #[serde(alias = "u", alias = "ushaped")]
    UShaped,
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distribution::Normal => write!(f, "normal"),
            Distribution::Rectangular => write!(f, "rectangular"),
            Distribution::Triangular => write!(f, "triangular"),
            Distribution::UShaped => write!(f, "u_shaped"),
        }
    }
}

/// How an input's uncertainty is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum UncertaintyType {
    #[serde(rename = "A", alias = "a")]
    A,
    #[default]
    #[serde(rename = "B", alias = "b")]
    B,
    #[serde(rename = "fixed")]
    Fixed,
}

impl fmt::Display for UncertaintyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UncertaintyType::A => write!(f, "A"),
            UncertaintyType::B => write!(f, "B"),
            UncertaintyType::Fixed => write!(f, "fixed"),
        }
    }
}

/// Degrees of freedom: a count, or infinite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "DofRepr", into = "DofRepr")]
pub enum DegreesOfFreedom {
    Finite(u32),
    #[default]
    Infinite,
}

impl DegreesOfFreedom {
    pub fn as_f64(&self) -> f64 {
        match self {
            DegreesOfFreedom::Finite(n) => f64::from(*n),
            DegreesOfFreedom::Infinite => f64::INFINITY,
        }
    }
}

impl fmt::Display for DegreesOfFreedom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegreesOfFreedom::Finite(n) => write!(f, "{}", n),
            DegreesOfFreedom::Infinite => write!(f, "inf"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum DofRepr {
    Count(u32),
    Text(String),
}

impl TryFrom<DofRepr> for DegreesOfFreedom {
    type Error = String;

    fn try_from(repr: DofRepr) -> Result<Self, Self::Error> {
        match repr {
            DofRepr::Count(n) => Ok(DegreesOfFreedom::Finite(n)),
            DofRepr::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "inf" | "infinite" | "infinity" | "∞" => Ok(DegreesOfFreedom::Infinite),
                other => other
                    .parse()
                    .map(DegreesOfFreedom::Finite)
                    .map_err(|_| format!("invalid degrees of freedom '{}'", text)),
            },
        }
    }
}

impl From<DegreesOfFreedom> for DofRepr {
    fn from(dof: DegreesOfFreedom) -> Self {
        match dof {
            DegreesOfFreedom::Finite(n) => DofRepr::Count(n),
            DegreesOfFreedom::Infinite => DofRepr::Text("inf".to_string()),
        }
    }
}

/// One (x, y) pair of a calibration curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionPoint {
    pub x: f64,
    pub y: f64,
}

/// Straight-line calibration curve used to predict a Type B value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegressionModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub data: Vec<RegressionPoint>,
}

/// Raw values of a variable at one calibration point
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuePoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub central_value: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_uncertainty: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degrees_of_freedom: Option<DegreesOfFreedom>,

    /// Type A: repeated observations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub measurements: Vec<f64>,

    /// Type B: half-width of the distribution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub half_width: Option<f64>,

    /// Type B: half-width given as a formula, e.g. `0.02% * 10` written `0.0002 * 10`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub half_width_formula: Option<String>,

    /// Type B, Normal only: divisor overriding the configured default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub divisor: Option<f64>,

    /// Type B: evaluate the record's regression model at this x
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regression_x: Option<f64>,

    /// Fixed type: the value itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_value: Option<f64>,
}

/// Definition of one variable of a measurement model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableRecord {
    pub name: String,

    #[serde(rename = "type", default)]
    pub uncertainty_type: UncertaintyType,

    #[serde(default)]
    pub distribution: Distribution,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Record-level divisor for Normal, used when a point has none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub divisor: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regression: Option<RegressionModel>,

    #[serde(default)]
    pub values: Vec<ValuePoint>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("Variable '{variable}' has no value for calibration point {index}")]
    MissingPoint { variable: String, index: usize },

    #[error("Half-width formula for '{variable}': {source}")]
    Formula {
        variable: String,
        #[source]
        source: FormulaError,
    },

    #[error("Regression model for '{0}' needs at least two points with distinct x")]
    Regression(String),

    #[error("Divisor for '{0}' must be non-zero")]
    ZeroDivisor(String),
}

/// Effective values of an input at one calibration point
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvaluatedInput {
    pub central_value: Option<f64>,
    pub standard_uncertainty: Option<f64>,
    pub degrees_of_freedom: DegreesOfFreedom,
    pub distribution: Distribution,
}

impl VariableRecord {
    pub fn new(name: impl Into<String>) -> Self {
        VariableRecord {
            name: name.into(),
            uncertainty_type: UncertaintyType::default(),
            distribution: Distribution::default(),
            unit: None,
            description: None,
            divisor: None,
            regression: None,
            values: Vec::new(),
        }
    }

    /// Distribution used for sampling; only Type B declares one
    pub fn effective_distribution(&self) -> Distribution {
        match self.uncertainty_type {
            UncertaintyType::B => self.distribution,
            UncertaintyType::A | UncertaintyType::Fixed => Distribution::Normal,
        }
    }

    /// Evaluate the point at `index`
    pub fn evaluate(&self, index: usize, config: &CalcConfig) -> Result<EvaluatedInput, InputError> {
        let point = self.values.get(index).ok_or_else(|| InputError::MissingPoint {
            variable: self.name.clone(),
            index,
        })?;
        let distribution = self.effective_distribution();

        let explicit = EvaluatedInput {
            central_value: point.central_value,
            standard_uncertainty: point.standard_uncertainty,
            degrees_of_freedom: point.degrees_of_freedom.unwrap_or_default(),
            distribution,
        };

        match self.uncertainty_type {
            UncertaintyType::Fixed => Ok(EvaluatedInput {
                central_value: point.fixed_value.or(point.central_value),
                standard_uncertainty: Some(0.0),
                degrees_of_freedom: DegreesOfFreedom::Infinite,
                distribution,
            }),
            UncertaintyType::A => match type_a_evaluation(&point.measurements) {
                Some(stats) => Ok(EvaluatedInput {
                    central_value: Some(stats.mean),
                    standard_uncertainty: Some(stats.standard_uncertainty),
                    degrees_of_freedom: DegreesOfFreedom::Finite(stats.degrees_of_freedom),
                    distribution,
                }),
                None => Ok(explicit),
            },
            UncertaintyType::B => {
                if let (Some(model), Some(x)) = (&self.regression, point.regression_x) {
                    let pairs: Vec<(f64, f64)> = model.data.iter().map(|p| (p.x, p.y)).collect();
                    let prediction = linear_regression_prediction(&pairs, x)
                        .ok_or_else(|| InputError::Regression(self.name.clone()))?;
                    return Ok(EvaluatedInput {
                        central_value: Some(prediction.value),
                        standard_uncertainty: Some(prediction.standard_uncertainty),
                        degrees_of_freedom: prediction
                            .degrees_of_freedom
                            .map(DegreesOfFreedom::Finite)
                            .unwrap_or(DegreesOfFreedom::Infinite),
                        distribution,
                    });
                }

                let Some(half_width) = self.half_width(point, config)? else {
                    return Ok(explicit);
                };
                let divisor = config
                    .divisors
                    .divisor_for(distribution, point.divisor.or(self.divisor));
                let u = type_b_standard_uncertainty(half_width, divisor)
                    .ok_or_else(|| InputError::ZeroDivisor(self.name.clone()))?;
                Ok(EvaluatedInput {
                    standard_uncertainty: Some(u),
                    ..explicit
                })
            }
        }
    }

    fn half_width(&self, point: &ValuePoint, config: &CalcConfig) -> Result<Option<f64>, InputError> {
        if let Some(hw) = point.half_width {
            return Ok(Some(hw));
        }
        match &point.half_width_formula {
            Some(formula) if !formula.trim().is_empty() => {
                evaluate_formula(formula, &HashMap::new(), config.precision)
                    .map(Some)
                    .map_err(|source| InputError::Formula {
                        variable: self.name.clone(),
                        source,
                    })
            }
            _ => Ok(None),
        }
    }
}
