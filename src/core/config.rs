//! Calculation settings
//!
//! Every component takes a [`CalcConfig`] explicitly. The defaults match the
//! usual GUM conventions; a YAML file can override any subset of them:
//!
//! ```yaml
//! precision: 28
//! display_digits: 6
//! divisors:
//!   normal: 2.0
//! t_table:
//!   "1": 12.706
//!   "2": 4.303
//!   infinity: 1.960
//! monte_carlo:
//!   default_samples: 100000
//!   histogram_bins: 80
//! rounding:
//!   significant_digits: 2
//!   mode: 5_percent
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::rounding::RoundingMode;
use crate::entities::variable::Distribution;
use crate::yaml::{parse_yaml_file, YamlError};

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Yaml(#[from] YamlError),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(gum::config::invalid))]
    Invalid(String),
}

/// Top-level calculation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalcConfig {
    /// Significant digits kept by formula evaluation
    pub precision: u32,

    /// Significant digits shown in text reports
    pub display_digits: usize,

    pub divisors: DistributionDivisors,

    pub t_table: TTable,

    pub monte_carlo: MonteCarloSettings,

    pub rounding: RoundingSettings,

    /// Imaginary parts at or below this magnitude are treated as noise
    pub tiny_imaginary_threshold: f64,
}

impl Default for CalcConfig {
    fn default() -> Self {
        Self {
            precision: 28,
            display_digits: 6,
            divisors: DistributionDivisors::default(),
            t_table: TTable::default(),
            monte_carlo: MonteCarloSettings::default(),
            rounding: RoundingSettings::default(),
            tiny_imaginary_threshold: 1e-12,
        }
    }
}

impl CalcConfig {
    /// Load from a YAML file, filling unspecified fields with defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config: CalcConfig = parse_yaml_file(path)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded calculation config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let divisors = [
            ("normal", self.divisors.normal),
            ("rectangular", self.divisors.rectangular),
            ("triangular", self.divisors.triangular),
            ("u_shaped", self.divisors.u_shaped),
        ];
        for (name, value) in divisors {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "divisor for {} must be positive, got {}",
                    name, value
                )));
            }
        }
        if self.display_digits == 0 {
            return Err(ConfigError::Invalid(
                "display_digits must be at least 1".to_string(),
            ));
        }
        if self.rounding.significant_digits == 0 {
            return Err(ConfigError::Invalid(
                "rounding.significant_digits must be at least 1".to_string(),
            ));
        }
        if self.monte_carlo.default_samples == 0 || self.monte_carlo.histogram_bins == 0 {
            return Err(ConfigError::Invalid(
                "monte_carlo sample and bin counts must be positive".to_string(),
            ));
        }
        if let Some((dof, t)) = self.t_table.entries.iter().find(|(_, t)| **t <= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "t_table value for {} must be positive, got {}",
                dof, t
            )));
        }
        Ok(())
    }
}

/// Half-width divisors per distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionDivisors {
    /// Default for Normal; a point may override it
    pub normal: f64,
    pub rectangular: f64,
    pub triangular: f64,
    pub u_shaped: f64,
}

impl Default for DistributionDivisors {
    fn default() -> Self {
        Self {
            normal: 2.0,
            rectangular: 3f64.sqrt(),
            triangular: 6f64.sqrt(),
            u_shaped: 2f64.sqrt(),
        }
    }
}

impl DistributionDivisors {
    /// Divisor for a distribution; `normal_override` only applies to Normal
    pub fn divisor_for(&self, distribution: Distribution, normal_override: Option<f64>) -> f64 {
        match distribution {
            Distribution::Normal => normal_override.unwrap_or(self.normal),
            Distribution::Rectangular => self.rectangular,
            Distribution::Triangular => self.triangular,
            Distribution::UShaped => self.u_shaped,
        }
    }
}

/// Student t values keyed by degrees of freedom, plus the infinite-dof value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct TTable {
    pub entries: BTreeMap<u32, f64>,
    pub infinity: f64,
}

impl Default for TTable {
    fn default() -> Self {
        let entries = [
            (1, 12.706),
            (2, 4.303),
            (3, 3.182),
            (4, 2.776),
            (5, 2.571),
            (6, 2.447),
            (7, 2.365),
            (8, 2.306),
            (9, 2.262),
            (10, 2.228),
            (15, 2.131),
            (20, 2.086),
            (30, 2.042),
            (40, 2.021),
            (60, 2.000),
            (120, 1.980),
        ]
        .into_iter()
        .collect();
        Self {
            entries,
            infinity: 1.960,
        }
    }
}

impl TryFrom<BTreeMap<String, f64>> for TTable {
    type Error = String;

    fn try_from(raw: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        let mut table = TTable {
            entries: BTreeMap::new(),
            infinity: TTable::default().infinity,
        };
        for (key, value) in raw {
            match key.trim().to_ascii_lowercase().as_str() {
                "inf" | "infinity" | "∞" => table.infinity = value,
                other => {
                    let dof: u32 = other
                        .parse()
                        .map_err(|_| format!("invalid t_table key '{}'", key))?;
                    table.entries.insert(dof, value);
                }
            }
        }
        Ok(table)
    }
}

impl From<TTable> for BTreeMap<String, f64> {
    fn from(table: TTable) -> Self {
        let mut raw: BTreeMap<String, f64> = table
            .entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        raw.insert("infinity".to_string(), table.infinity);
        raw
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloSettings {
    pub default_samples: usize,
    pub histogram_bins: usize,
}

impl Default for MonteCarloSettings {
    fn default() -> Self {
        Self {
            default_samples: 100_000,
            histogram_bins: 80,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundingSettings {
    pub significant_digits: u32,
    pub mode: RoundingMode,
}

impl Default for RoundingSettings {
    fn default() -> Self {
        Self {
            significant_digits: 2,
            mode: RoundingMode::FivePercent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yaml::parse_yaml;

    #[test]
    fn test_defaults() {
        let config = CalcConfig::default();
        assert_eq!(config.precision, 28);
        assert_eq!(config.t_table.entries.len(), 16);
        assert_eq!(config.t_table.entries[&1], 12.706);
        assert_eq!(config.t_table.infinity, 1.960);
        assert_eq!(config.monte_carlo.default_samples, 100_000);
        assert!((config.divisors.rectangular - 1.732050808).abs() < 1e-9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "precision: 10\nrounding:\n  mode: round_up\n";
        let config: CalcConfig = parse_yaml(yaml, "config.yaml").unwrap();
        assert_eq!(config.precision, 10);
        assert_eq!(config.rounding.mode, RoundingMode::RoundUp);
        assert_eq!(config.rounding.significant_digits, 2);
        assert_eq!(config.t_table, TTable::default());
    }

    #[test]
    fn test_t_table_from_yaml() {
        let yaml = "t_table:\n  \"7\": 2.365\n  \"9\": 2.262\n  infinity: 1.96\n";
        let config: CalcConfig = parse_yaml(yaml, "config.yaml").unwrap();
        assert_eq!(config.t_table.entries.len(), 2);
        assert_eq!(config.t_table.entries[&9], 2.262);
    }

    #[test]
    fn test_t_table_rejects_bad_key() {
        let yaml = "t_table:\n  seven: 2.365\n";
        let result: Result<CalcConfig, _> = parse_yaml(yaml, "config.yaml");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_divisor() {
        let mut config = CalcConfig::default();
        config.divisors.triangular = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_display_digits_independent_of_precision() {
        let config: CalcConfig = parse_yaml("precision: 12\n", "config.yaml").unwrap();
        assert_eq!(config.display_digits, 6);
        let config: CalcConfig = parse_yaml("display_digits: 3\n", "config.yaml").unwrap();
        assert_eq!(config.display_digits, 3);
        assert_eq!(config.precision, 28);

        let mut config = CalcConfig::default();
        config.display_digits = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_divisor_for() {
        let divisors = DistributionDivisors::default();
        assert_eq!(divisors.divisor_for(Distribution::Normal, None), 2.0);
        assert_eq!(divisors.divisor_for(Distribution::Normal, Some(3.0)), 3.0);
        assert_eq!(divisors.divisor_for(Distribution::UShaped, Some(3.0)), 2f64.sqrt());
    }
}
