//! gumcalc: GUM uncertainty propagation
//!
//! Resolves a set of model equations, builds uncertainty budgets from symbolic
//! sensitivity coefficients, checks dimensional consistency of the equations
//! and cross-checks the analytic result with a Monte Carlo simulation.

pub mod cli;
pub mod core;
pub mod entities;
pub mod yaml;
