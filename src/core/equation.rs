//! Model equation sets and the dependency resolver
//!
//! A model is written as comma-separated `name = expression` clauses. Result
//! variables are the left-hand names; everything else referenced on a right
//! side is an input. [`Resolver`] substitutes result definitions into each
//! other until a target depends on inputs only.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use crate::core::expr::{Expr, ParseError};
use crate::core::normalize::{normalize_equation_text, normalize_variable_name};

/// Failures that abort resolution of one target
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("Circular dependency: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },

    #[error("No equation defines '{0}'")]
    UnknownTarget(String),

    #[error("Cannot parse the equation for '{result}': {source}")]
    Parse {
        result: String,
        #[source]
        source: ParseError,
    },
}

/// One `result = expression` clause
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Equation {
    pub result: String,
    pub expression_text: String,
}

impl Equation {
    pub fn parse_expression(&self) -> Result<Expr, ParseError> {
        Expr::parse(&self.expression_text)
    }
}

/// A comma-separated clause, which may lack an `=`
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Equation(Equation),
    Ignored(String),
}

/// Parsed equation text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EquationSet {
    clauses: Vec<Clause>,
}

impl EquationSet {
    /// Split normalized text into clauses on top-level commas and the first `=`
    pub fn parse(text: &str) -> Self {
        let normalized = normalize_equation_text(text);
        let clauses = split_top_level(&normalized)
            .into_iter()
            .map(str::trim)
            .filter(|clause| !clause.is_empty())
            .map(|clause| match clause.split_once('=') {
                Some((lhs, rhs)) => Clause::Equation(Equation {
                    result: normalize_variable_name(lhs),
                    expression_text: rhs.trim().to_string(),
                }),
                None => Clause::Ignored(clause.to_string()),
            })
            .collect();
        EquationSet { clauses }
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn equations(&self) -> impl Iterator<Item = &Equation> {
        self.clauses.iter().filter_map(|c| match c {
            Clause::Equation(eq) => Some(eq),
            Clause::Ignored(_) => None,
        })
    }

    /// The defining equation for `name`; a later clause overrides an earlier one
    pub fn definition(&self, name: &str) -> Option<&Equation> {
        self.equations().filter(|eq| eq.result == name).last()
    }

    /// Left-hand names in clause order
    pub fn result_variables(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for eq in self.equations() {
            if !out.contains(&eq.result) {
                out.push(eq.result.clone());
            }
        }
        out
    }

    /// Right-hand names that no clause defines, in first-seen order
    ///
    /// Clauses whose right side does not parse contribute nothing.
    pub fn input_variables(&self) -> Vec<String> {
        let results = self.result_variables();
        let mut out: Vec<String> = Vec::new();
        for eq in self.equations() {
            let Ok(expr) = eq.parse_expression() else {
                continue;
            };
            for name in expr.variables() {
                if !results.contains(&name) && !out.contains(&name) {
                    out.push(name);
                }
            }
        }
        out
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(self)
    }
}

/// Split on commas outside parentheses
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth <= 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// A target expressed in input variables only
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedExpression {
    pub target: String,
    pub expression: Expr,
    /// Inputs referenced, in first-seen order
    pub inputs: Vec<String>,
}

impl ResolvedExpression {
    /// Inputs listed in `canonical` order first, the rest in first-seen order
    pub fn ordered_inputs(&self, canonical: &[String]) -> Vec<String> {
        let mut out: Vec<String> = canonical
            .iter()
            .filter(|name| self.inputs.contains(*name))
            .cloned()
            .collect();
        for name in &self.inputs {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
        out
    }

    /// `target = expression`
    pub fn equation_text(&self) -> String {
        format!("{} = {}", self.target, self.expression)
    }
}

/// Substitutes result definitions into each other
pub struct Resolver<'a> {
    definitions: HashMap<&'a str, &'a Equation>,
}

impl<'a> Resolver<'a> {
    pub fn new(set: &'a EquationSet) -> Self {
        let mut definitions = HashMap::new();
        for eq in set.equations() {
            definitions.insert(eq.result.as_str(), eq);
        }
        Resolver { definitions }
    }

    pub fn is_result(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Resolve `target` into an expression over input variables
    pub fn resolve(&self, target: &str) -> Result<ResolvedExpression, ResolveError> {
        let target = normalize_variable_name(target);
        if !self.is_result(&target) {
            return Err(ResolveError::UnknownTarget(target));
        }

        let mut path = Vec::new();
        let mut expanded = HashMap::new();
        let expression = self.expand(&target, &mut path, &mut expanded)?;
        let inputs = expression.variables();
        tracing::debug!(result = %target, expression = %expression, "resolved equation");

        Ok(ResolvedExpression {
            target,
            expression,
            inputs,
        })
    }

    fn expand(
        &self,
        name: &str,
        path: &mut Vec<String>,
        expanded: &mut HashMap<String, Expr>,
    ) -> Result<Expr, ResolveError> {
        if let Some(start) = path.iter().position(|p| p == name) {
            let mut cycle = path[start..].to_vec();
            cycle.push(name.to_string());
            return Err(ResolveError::CircularDependency { cycle });
        }
        if let Some(done) = expanded.get(name) {
            return Ok(done.clone());
        }

        let Some(equation) = self.definitions.get(name) else {
            return Ok(Expr::Variable(name.to_string()));
        };
        let rhs = equation
            .parse_expression()
            .map_err(|source| ResolveError::Parse {
                result: name.to_string(),
                source,
            })?;

        path.push(name.to_string());
        let result = self.substitute(rhs, path, expanded);
        path.pop();

        let result = result?;
        expanded.insert(name.to_string(), result.clone());
        Ok(result)
    }

    /// Post-order rebuild replacing result variables with their expansion
    fn substitute(
        &self,
        expr: Expr,
        path: &mut Vec<String>,
        expanded: &mut HashMap<String, Expr>,
    ) -> Result<Expr, ResolveError> {
        Ok(match expr {
            Expr::Variable(name) if self.is_result(&name) => self.expand(&name, path, expanded)?,
            Expr::Literal(_) | Expr::Variable(_) => expr,
            Expr::Unary { op, operand } => Expr::Unary {
                op,
                operand: Box::new(self.substitute(*operand, path, expanded)?),
            },
            Expr::Binary { op, lhs, rhs } => Expr::Binary {
                op,
                lhs: Box::new(self.substitute(*lhs, path, expanded)?),
                rhs: Box::new(self.substitute(*rhs, path, expanded)?),
            },
            Expr::Call { func, args } => Expr::Call {
                func,
                args: args
                    .into_iter()
                    .map(|arg| self.substitute(arg, path, expanded))
                    .collect::<Result<Vec<_>, _>>()?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POWER_MODEL: &str = "W=V*I, V=VMEAS+VCAL, I=IMEAS+ICAL";

    #[test]
    fn test_parse_clauses() {
        let set = EquationSet::parse("W = V*I, V = VMEAS + VCAL, junk");
        assert_eq!(set.clauses().len(), 3);
        assert_eq!(set.result_variables(), vec!["W", "V"]);
        assert!(matches!(&set.clauses()[2], Clause::Ignored(t) if t == "junk"));
    }

    #[test]
    fn test_detect_variables() {
        let set = EquationSet::parse(POWER_MODEL);
        assert_eq!(set.result_variables(), vec!["W", "V", "I"]);
        assert_eq!(
            set.input_variables(),
            vec!["VMEAS", "VCAL", "IMEAS", "ICAL"]
        );
    }

    #[test]
    fn test_resolve_nested_definitions() {
        let set = EquationSet::parse(POWER_MODEL);
        let resolved = set.resolver().resolve("W").unwrap();
        insta::assert_snapshot!(resolved.expression.to_string(), @"(VMEAS + VCAL) * (IMEAS + ICAL)");
        assert_eq!(resolved.inputs, vec!["VMEAS", "VCAL", "IMEAS", "ICAL"]);
        assert_eq!(
            resolved.equation_text(),
            "W = (VMEAS + VCAL) * (IMEAS + ICAL)"
        );
    }

    #[test]
    fn test_resolve_intermediate_result() {
        let set = EquationSet::parse(POWER_MODEL);
        let resolved = set.resolver().resolve("V").unwrap();
        assert_eq!(resolved.expression.to_string(), "VMEAS + VCAL");
    }

    #[test]
    fn test_resolve_detects_two_cycle() {
        let set = EquationSet::parse("A=B, B=A");
        let err = set.resolver().resolve("A").unwrap_err();
        assert_eq!(
            err,
            ResolveError::CircularDependency {
                cycle: vec!["A".into(), "B".into(), "A".into()]
            }
        );
    }

    #[test]
    fn test_resolve_detects_self_reference() {
        let set = EquationSet::parse("A = A + 1");
        assert!(matches!(
            set.resolver().resolve("A"),
            Err(ResolveError::CircularDependency { .. })
        ));
    }

    #[test]
    fn test_shared_subexpression_is_not_a_cycle() {
        let set = EquationSet::parse("Y = X + X*Z, X = a + b, Z = X / 2");
        let resolved = set.resolver().resolve("Y").unwrap();
        assert_eq!(resolved.inputs, vec!["a", "b"]);
    }

    #[test]
    fn test_unknown_target() {
        let set = EquationSet::parse(POWER_MODEL);
        assert_eq!(
            set.resolver().resolve("Q").unwrap_err(),
            ResolveError::UnknownTarget("Q".into())
        );
    }

    #[test]
    fn test_parse_error_names_the_result() {
        let set = EquationSet::parse("Y = X * 2, X = a +");
        let err = set.resolver().resolve("Y").unwrap_err();
        assert!(matches!(err, ResolveError::Parse { ref result, .. } if result == "X"));
    }

    #[test]
    fn test_commas_inside_calls_do_not_split() {
        let set = EquationSet::parse("Y = foo(a, b), Z = c");
        assert_eq!(set.result_variables(), vec!["Y", "Z"]);
    }

    #[test]
    fn test_ordered_inputs_prefers_canonical_order() {
        let set = EquationSet::parse(POWER_MODEL);
        let resolved = set.resolver().resolve("W").unwrap();
        let canonical = vec!["ICAL".to_string(), "VCAL".to_string(), "other".to_string()];
        assert_eq!(
            resolved.ordered_inputs(&canonical),
            vec!["ICAL", "VCAL", "VMEAS", "IMEAS"]
        );
    }

    #[test]
    fn test_later_definition_wins() {
        let set = EquationSet::parse("Y = a, Y = b");
        assert_eq!(set.resolver().resolve("Y").unwrap().inputs, vec!["b"]);
    }
}
