//! Correlation coefficients between input variables

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CorrelationError {
    #[error("Correlation of '{0}' with itself is fixed at 1")]
    Diagonal(String),

    #[error("Correlation between '{first}' and '{second}' must be within [-1, 1], got {value}")]
    OutOfRange {
        first: String,
        second: String,
        value: f64,
    },
}

/// Symmetric correlation matrix keyed by variable names
///
/// The diagonal is always 1 and absent pairs are 0. In YAML it is written as a
/// list of `[first, second, coefficient]` triples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(String, String, f64)>", into = "Vec<(String, String, f64)>")]
pub struct CorrelationMatrix {
    entries: BTreeMap<(String, String), f64>,
}

fn key(first: &str, second: &str) -> (String, String) {
    if first <= second {
        (first.to_string(), second.to_string())
    } else {
        (second.to_string(), first.to_string())
    }
}

impl CorrelationMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one coefficient; a zero removes the pair
    pub fn set(&mut self, first: &str, second: &str, value: f64) -> Result<(), CorrelationError> {
        if first == second {
            return Err(CorrelationError::Diagonal(first.to_string()));
        }
        if !(-1.0..=1.0).contains(&value) {
            return Err(CorrelationError::OutOfRange {
                first: first.to_string(),
                second: second.to_string(),
                value,
            });
        }
        if value == 0.0 {
            self.entries.remove(&key(first, second));
        } else {
            self.entries.insert(key(first, second), value);
        }
        Ok(())
    }

    pub fn get(&self, first: &str, second: &str) -> f64 {
        if first == second {
            return 1.0;
        }
        self.entries.get(&key(first, second)).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names appearing in any stored pair
    pub fn variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .entries
            .keys()
            .flat_map(|(a, b)| [a.as_str(), b.as_str()])
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// The subset of `names` correlated with at least one other name in `names`
    pub fn correlated_subset(&self, names: &[String]) -> Vec<String> {
        names
            .iter()
            .filter(|a| names.iter().any(|b| a != &b && self.get(a, b) != 0.0))
            .cloned()
            .collect()
    }

    /// Rebuild with every variable name passed through `rename`
    pub fn rename_with<F>(&self, rename: F) -> Result<Self, CorrelationError>
    where
        F: Fn(&str) -> String,
    {
        let mut renamed = CorrelationMatrix::new();
        for ((first, second), &value) in &self.entries {
            renamed.set(&rename(first), &rename(second), value)?;
        }
        Ok(renamed)
    }

    /// Dense row-major matrix over `names`
    pub fn restricted(&self, names: &[String]) -> Vec<Vec<f64>> {
        names
            .iter()
            .map(|a| names.iter().map(|b| self.get(a, b)).collect())
            .collect()
    }
}

impl TryFrom<Vec<(String, String, f64)>> for CorrelationMatrix {
    type Error = CorrelationError;

    fn try_from(triples: Vec<(String, String, f64)>) -> Result<Self, Self::Error> {
        let mut matrix = CorrelationMatrix::new();
        for (first, second, value) in triples {
            matrix.set(&first, &second, value)?;
        }
        Ok(matrix)
    }
}

impl From<CorrelationMatrix> for Vec<(String, String, f64)> {
    fn from(matrix: CorrelationMatrix) -> Self {
        matrix
            .entries
            .into_iter()
            .map(|((a, b), v)| (a, b, v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yaml::parse_yaml;

    #[test]
    fn test_symmetric_lookup() {
        let mut m = CorrelationMatrix::new();
        m.set("b", "a", 0.5).unwrap();
        assert_eq!(m.get("a", "b"), 0.5);
        assert_eq!(m.get("b", "a"), 0.5);
        assert_eq!(m.get("a", "a"), 1.0);
        assert_eq!(m.get("a", "c"), 0.0);
    }

    #[test]
    fn test_rejects_diagonal_and_out_of_range() {
        let mut m = CorrelationMatrix::new();
        assert_eq!(m.set("a", "a", 0.5), Err(CorrelationError::Diagonal("a".into())));
        assert!(matches!(
            m.set("a", "b", 1.5),
            Err(CorrelationError::OutOfRange { .. })
        ));
        assert!(m.set("a", "b", f64::NAN).is_err());
        assert!(m.is_empty());
    }

    #[test]
    fn test_zero_removes_pair() {
        let mut m = CorrelationMatrix::new();
        m.set("a", "b", -0.3).unwrap();
        m.set("a", "b", 0.0).unwrap();
        assert!(m.is_empty());
    }

    #[test]
    fn test_restriction() {
        let mut m = CorrelationMatrix::new();
        m.set("x", "y", 0.9).unwrap();
        m.set("x", "other", 0.2).unwrap();
        let names = vec!["x".to_string(), "y".to_string(), "z".to_string()];
        assert_eq!(m.correlated_subset(&names), vec!["x", "y"]);
        assert_eq!(
            m.restricted(&names),
            vec![vec![1.0, 0.9, 0.0], vec![0.9, 1.0, 0.0], vec![0.0, 0.0, 1.0]]
        );
        assert_eq!(m.variables(), vec!["other", "x", "y"]);
    }

    #[test]
    fn test_rename_with() {
        let mut m = CorrelationMatrix::new();
        m.set("a", "b", 0.4).unwrap();
        let upper = m.rename_with(|n| n.to_uppercase()).unwrap();
        assert_eq!(upper.get("B", "A"), 0.4);
        assert_eq!(upper.get("a", "b"), 0.0);
        assert_eq!(
            m.rename_with(|_| "x".to_string()),
            Err(CorrelationError::Diagonal("x".into()))
        );
    }

    #[test]
    fn test_yaml_triples() {
        let m: CorrelationMatrix = parse_yaml("- [A, B, 0.5]\n- [C, A, -0.25]\n", "c.yaml").unwrap();
        assert_eq!(m.get("B", "A"), 0.5);
        assert_eq!(m.get("A", "C"), -0.25);
        assert!(parse_yaml::<CorrelationMatrix>("- [A, A, 0.5]\n", "c.yaml").is_err());
    }
}
