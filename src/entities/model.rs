//! Measurement model - equation text, variable records and correlations
//!
//! This is the document a caller hands to the engine. Loading it is the only
//! place that touches the filesystem; everything downstream works on a
//! snapshot taken with [`MeasurementModel::inputs_at`].

use std::collections::HashMap;
use std::path::Path;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::CalcConfig;
use crate::core::equation::EquationSet;
use crate::core::normalize::normalize_variable_name;
use crate::core::sensitivity::WorkingPoint;
use crate::entities::correlation::{CorrelationError, CorrelationMatrix};
use crate::entities::variable::{EvaluatedInput, InputError, VariableRecord};
use crate::yaml::{parse_yaml_file, YamlError};

#[derive(Debug, Error, Diagnostic)]
pub enum ModelError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Yaml(#[from] YamlError),

    #[error("Variable '{0}' is defined more than once")]
    #[diagnostic(code(gum::model::duplicate_variable))]
    DuplicateVariable(String),

    #[error("Correlation refers to unknown variable '{0}'")]
    #[diagnostic(code(gum::model::unknown_variable))]
    UnknownCorrelationVariable(String),

    #[error(transparent)]
    #[diagnostic(code(gum::model::correlation))]
    Correlation(#[from] CorrelationError),

    #[error("Unknown calibration point '{0}'")]
    #[diagnostic(code(gum::model::unknown_point), help("use a point name or its 1-based number"))]
    UnknownPoint(String),

    #[error(transparent)]
    #[diagnostic(code(gum::model::input))]
    Input(#[from] InputError),
}

/// A complete measurement model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementModel {
    /// Comma-separated `result = expression` clauses
    #[serde(default)]
    pub equation: String,

    /// Calibration point names; unnamed points are called P1, P2, ...
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<String>,

    #[serde(default)]
    pub variables: Vec<VariableRecord>,

    #[serde(default, skip_serializing_if = "CorrelationMatrix::is_empty")]
    pub correlations: CorrelationMatrix,
}

/// Effective input values at one calibration point
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSnapshot {
    pub point_name: String,
    pub inputs: HashMap<String, EvaluatedInput>,
}

impl InputSnapshot {
    /// Central values of every input that has one
    pub fn working_point(&self) -> WorkingPoint {
        self.inputs
            .iter()
            .filter_map(|(name, input)| input.central_value.map(|c| (name.clone(), c)))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&EvaluatedInput> {
        self.inputs.get(name)
    }
}

impl MeasurementModel {
    /// Load a model file and check its structure
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let mut model: MeasurementModel = parse_yaml_file(path)?;
        for variable in &mut model.variables {
            variable.name = normalize_variable_name(&variable.name);
        }
        model.correlations = model.correlations.rename_with(normalize_variable_name)?;
        model.validate()?;
        tracing::info!(
            path = %path.display(),
            variables = model.variables.len(),
            points = model.point_count(),
            "loaded measurement model"
        );
        Ok(model)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        let mut seen: Vec<&str> = Vec::new();
        for variable in &self.variables {
            if seen.contains(&variable.name.as_str()) {
                return Err(ModelError::DuplicateVariable(variable.name.clone()));
            }
            seen.push(&variable.name);
        }
        if let Some(unknown) = self
            .correlations
            .variables()
            .into_iter()
            .find(|name| !seen.contains(name))
        {
            return Err(ModelError::UnknownCorrelationVariable(unknown.to_string()));
        }
        Ok(())
    }

    pub fn equation_set(&self) -> EquationSet {
        EquationSet::parse(&self.equation)
    }

    pub fn variable(&self, name: &str) -> Option<&VariableRecord> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Variable names in declaration order
    pub fn variable_order(&self) -> Vec<String> {
        self.variables.iter().map(|v| v.name.clone()).collect()
    }

    /// Number of calibration points, at least one
    pub fn point_count(&self) -> usize {
        let from_values = self.variables.iter().map(|v| v.values.len()).max().unwrap_or(0);
        self.points.len().max(from_values).max(1)
    }

    pub fn point_name(&self, index: usize) -> String {
        self.points
            .get(index)
            .filter(|name| !name.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| format!("P{}", index + 1))
    }

    /// Find a point by name, or by its 1-based number
    pub fn point_index(&self, selector: &str) -> Result<usize, ModelError> {
        let selector = selector.trim();
        if let Some(index) = (0..self.point_count()).find(|i| self.point_name(*i) == selector) {
            return Ok(index);
        }
        match selector.parse::<usize>() {
            Ok(n) if n >= 1 && n <= self.point_count() => Ok(n - 1),
            _ => Err(ModelError::UnknownPoint(selector.to_string())),
        }
    }

    /// Evaluate every variable that has a value at `index`
    ///
    /// Variables without an entry for the point are left out so the caller can
    /// render them as unavailable.
    pub fn inputs_at(&self, index: usize, config: &CalcConfig) -> Result<InputSnapshot, ModelError> {
        let mut inputs = HashMap::new();
        for variable in &self.variables {
            match variable.evaluate(index, config) {
                Ok(input) => {
                    inputs.insert(variable.name.clone(), input);
                }
                Err(InputError::MissingPoint { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(InputSnapshot {
            point_name: self.point_name(index),
            inputs,
        })
    }
}
