//! Monte Carlo propagation of distributions
//!
//! Inputs are drawn from their declared distributions and pushed through the
//! resolved expression. Correlated inputs share a normal copula: standard
//! normals are mixed through the Cholesky factor of their correlation matrix
//! and mapped onto each marginal by matching quantiles through Φ(z).

use std::f64::consts::{FRAC_PI_2, PI};
use std::sync::atomic::{AtomicBool, Ordering};

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use thiserror::Error;

use crate::core::equation::{EquationSet, ResolveError, ResolvedExpression};
use crate::core::expr::Expr;
use crate::core::symbolic::{evaluate_real, EvalError};
use crate::entities::correlation::CorrelationMatrix;
use crate::entities::model::InputSnapshot;
use crate::entities::variable::Distribution;

/// Samples between checks of the cancellation flag
const CANCEL_CHECK_INTERVAL: usize = 1024;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MonteCarloError {
    #[error("No model equation is defined")]
    NoEquation,

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("'{0}' does not depend on any input variable")]
    NoInputs(String),

    #[error("Missing central value for '{0}'")]
    MissingCentralValue(String),

    #[error("Standard uncertainty of '{name}' is negative ({value})")]
    NegativeUncertainty { name: String, value: f64 },

    #[error("Input '{name}' has a non-finite {field}")]
    NonFiniteInput { name: String, field: &'static str },

    #[error("Correlation matrix for {} is not positive definite", .0.join(", "))]
    NotPositiveDefinite(Vec<String>),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("No finite samples were produced")]
    NoFiniteSamples,

    #[error("Simulation cancelled")]
    Cancelled,
}

/// One sampled input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct McInput {
    pub name: String,
    pub central_value: f64,
    pub standard_uncertainty: f64,
    pub distribution: Distribution,
}

impl McInput {
    /// Half-width of the distribution with standard deviation `u`
    pub fn half_width(&self) -> f64 {
        let u = self.standard_uncertainty;
        match self.distribution {
            Distribution::Normal => u,
            Distribution::Rectangular => u * 3f64.sqrt(),
            Distribution::Triangular => u * 6f64.sqrt(),
            Distribution::UShaped => u * 2f64.sqrt(),
        }
    }

    /// Reject values whose sampling range is not representable
    fn check_finite(&self) -> Result<(), MonteCarloError> {
        let c = self.central_value;
        let h = self.half_width();
        let field = if !c.is_finite() {
            "central value"
        } else if !self.standard_uncertainty.is_finite() {
            "standard uncertainty"
        } else if !h.is_finite() || !((c + h) - (c - h)).is_finite() {
            "half-width"
        } else {
            return Ok(());
        };
        Err(MonteCarloError::NonFiniteInput {
            name: self.name.clone(),
            field,
        })
    }

    /// Independent draw
    fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        let c = self.central_value;
        if self.standard_uncertainty == 0.0 {
            return c;
        }
        let h = self.half_width();
        match self.distribution {
            Distribution::Normal => c + self.standard_uncertainty * standard_normal(rng),
            Distribution::Rectangular => rng.random_range((c - h)..=(c + h)),
            Distribution::Triangular => {
                let min = c - h;
                let max = c + h;
                let u: f64 = rng.random();
                let fc = (c - min) / (max - min);
                if u < fc {
                    min + (u * (max - min) * (c - min)).sqrt()
                } else {
                    max - ((1.0 - u) * (max - min) * (max - c)).sqrt()
                }
            }
            Distribution::UShaped => {
                // Beta(0.5, 0.5) is sin²(πU/2)
                let u: f64 = rng.random();
                let beta = (FRAC_PI_2 * u).sin().powi(2);
                c + h * (2.0 * beta - 1.0)
            }
        }
    }

    /// Draw driven by a standard normal `z` from the copula
    fn from_standard_normal(&self, z: f64) -> f64 {
        let c = self.central_value;
        if self.standard_uncertainty == 0.0 {
            return c;
        }
        if self.distribution == Distribution::Normal {
            return c + self.standard_uncertainty * z;
        }
        let p = normal_cdf(z);
        let h = self.half_width();
        match self.distribution {
            Distribution::Rectangular => c + h * (2.0 * p - 1.0),
            Distribution::Triangular => {
                if p < 0.5 {
                    c - h + h * (2.0 * p).sqrt()
                } else {
                    c + h - h * (2.0 * (1.0 - p)).sqrt()
                }
            }
            Distribution::UShaped => c - h * (PI * p).cos(),
            Distribution::Normal => c + self.standard_uncertainty * z,
        }
    }
}

/// Run settings
#[derive(Debug, Clone, PartialEq)]
pub struct MonteCarloOptions {
    pub samples: usize,
    pub histogram_bins: usize,
    /// Fixed seed for reproducible runs
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonteCarloStatistics {
    pub sample_count: usize,
    pub finite_count: usize,
    pub mean: f64,
    /// Sample standard deviation (n-1)
    pub std_dev: f64,
    /// mean ± 1σ
    pub sigma_band: (f64, f64),
    /// mean ± 1.96σ
    pub interval95: (f64, f64),
    /// 2.5 % and 97.5 % empirical percentiles
    pub empirical_interval95: (f64, f64),
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    /// `counts.len() + 1` bin edges
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonteCarloResult {
    pub target: String,
    pub point: String,
    pub expression: String,
    pub inputs: Vec<McInput>,
    pub statistics: MonteCarloStatistics,
    pub histogram: Histogram,
    /// Finite samples in draw order
    #[serde(skip)]
    pub samples: Vec<f64>,
}

/// Resolve `target`, collect its inputs at one point and simulate
pub fn run_monte_carlo(
    equations: &EquationSet,
    target: &str,
    snapshot: &InputSnapshot,
    correlations: &CorrelationMatrix,
    options: &MonteCarloOptions,
    cancel: Option<&AtomicBool>,
) -> Result<MonteCarloResult, MonteCarloError> {
    if equations.equations().next().is_none() {
        return Err(MonteCarloError::NoEquation);
    }
    let resolved = equations.resolver().resolve(target)?;
    let inputs = collect_inputs(&resolved, snapshot)?;
    let samples = simulate(&resolved.expression, &inputs, correlations, options, cancel)?;

    let statistics = compute_statistics(&samples, options.samples)?;
    let histogram = histogram(&samples, options.histogram_bins);
    tracing::info!(
        target_variable = %resolved.target,
        point = %snapshot.point_name,
        samples = options.samples,
        finite = statistics.finite_count,
        mean = statistics.mean,
        std_dev = statistics.std_dev,
        "monte carlo finished"
    );

    Ok(MonteCarloResult {
        target: resolved.target.clone(),
        point: snapshot.point_name.clone(),
        expression: resolved.expression.to_string(),
        inputs,
        statistics,
        histogram,
        samples,
    })
}

/// Inputs referenced by `resolved`, checked for sampling
pub fn collect_inputs(
    resolved: &ResolvedExpression,
    snapshot: &InputSnapshot,
) -> Result<Vec<McInput>, MonteCarloError> {
    if resolved.inputs.is_empty() {
        return Err(MonteCarloError::NoInputs(resolved.target.clone()));
    }
    resolved
        .inputs
        .iter()
        .map(|name| {
            let input = snapshot.get(name);
            let central_value = input
                .and_then(|i| i.central_value)
                .ok_or_else(|| MonteCarloError::MissingCentralValue(name.clone()))?;
            let standard_uncertainty = input.and_then(|i| i.standard_uncertainty).unwrap_or(0.0);
            if standard_uncertainty < 0.0 {
                return Err(MonteCarloError::NegativeUncertainty {
                    name: name.clone(),
                    value: standard_uncertainty,
                });
            }
            let mc_input = McInput {
                name: name.clone(),
                central_value,
                standard_uncertainty,
                distribution: input.map(|i| i.distribution).unwrap_or_default(),
            };
            mc_input.check_finite()?;
            Ok(mc_input)
        })
        .collect()
}

/// Draw `options.samples` evaluations of `expr`, keeping the finite ones
pub fn simulate(
    expr: &Expr,
    inputs: &[McInput],
    correlations: &CorrelationMatrix,
    options: &MonteCarloOptions,
    cancel: Option<&AtomicBool>,
) -> Result<Vec<f64>, MonteCarloError> {
    match options.seed {
        Some(seed) => simulate_with(expr, inputs, correlations, options.samples, cancel, &mut StdRng::seed_from_u64(seed)),
        None => simulate_with(expr, inputs, correlations, options.samples, cancel, &mut rand::rng()),
    }
}

fn simulate_with<R: Rng>(
    expr: &Expr,
    inputs: &[McInput],
    correlations: &CorrelationMatrix,
    sample_count: usize,
    cancel: Option<&AtomicBool>,
    rng: &mut R,
) -> Result<Vec<f64>, MonteCarloError> {
    let names: Vec<String> = inputs.iter().map(|i| i.name.clone()).collect();
    let correlated = correlations.correlated_subset(&names);
    let correlated_index: Vec<usize> = correlated
        .iter()
        .filter_map(|name| names.iter().position(|n| n == name))
        .collect();

    let factor = if correlated.is_empty() {
        None
    } else {
        let rho = correlations.restricted(&correlated);
        let k = correlated.len();
        // Perfectly correlated pairs make the matrix singular
        let singular = (0..k).any(|i| (0..k).any(|j| i != j && rho[i][j].abs() >= 1.0));
        if singular {
            return Err(MonteCarloError::NotPositiveDefinite(correlated));
        }
        let matrix = DMatrix::from_fn(k, k, |i, j| rho[i][j]);
        let cholesky = matrix
            .cholesky()
            .ok_or_else(|| MonteCarloError::NotPositiveDefinite(correlated.clone()))?;
        tracing::debug!(variables = ?correlated, "sampling with normal copula");
        Some(cholesky.l())
    };

    let mut is_correlated = vec![false; inputs.len()];
    for &index in &correlated_index {
        is_correlated[index] = true;
    }

    let k = correlated_index.len();
    let mut z = DVector::<f64>::zeros(k);
    let mut mixed = DVector::<f64>::zeros(k);
    let mut values = vec![0.0; inputs.len()];
    let mut samples = Vec::with_capacity(sample_count);

    for i in 0..sample_count {
        if i % CANCEL_CHECK_INTERVAL == 0 && cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
            tracing::debug!(completed = i, "monte carlo cancelled");
            return Err(MonteCarloError::Cancelled);
        }

        for ((value, input), &in_copula) in values.iter_mut().zip(inputs).zip(&is_correlated) {
            if !in_copula {
                *value = input.sample(rng);
            }
        }
        if let Some(l) = &factor {
            for zi in z.iter_mut() {
                *zi = standard_normal(rng);
            }
            l.mul_to(&z, &mut mixed);
            for (slot, &index) in correlated_index.iter().enumerate() {
                values[index] = inputs[index].from_standard_normal(mixed[slot]);
            }
        }

        let y = evaluate_real(expr, &|name| {
            names.iter().position(|n| n == name).map(|idx| values[idx])
        })?;
        if y.is_finite() {
            samples.push(y);
        }
    }
    Ok(samples)
}

/// Box-Muller standard normal
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    // 1 - U keeps the logarithm finite
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random();
    (-2.0_f64 * u1.ln()).sqrt() * (2.0_f64 * PI * u2).cos()
}

/// Standard normal cumulative distribution function
/// Φ(z) = probability that a standard normal random variable is ≤ z
/// Uses Hastings approximation (error < 7.5e-8)
pub fn normal_cdf(z: f64) -> f64 {
    if z.is_nan() {
        return 0.5;
    }
    if z >= 8.0 {
        return 1.0;
    }
    if z <= -8.0 {
        return 0.0;
    }

    // Φ(-z) = 1 - Φ(z)
    let (z_abs, negate) = if z < 0.0 { (-z, true) } else { (z, false) };

    // A&S 26.2.17
    const B0: f64 = 0.2316419;
    const B1: f64 = 0.319381530;
    const B2: f64 = -0.356563782;
    const B3: f64 = 1.781477937;
    const B4: f64 = -1.821255978;
    const B5: f64 = 1.330274429;

    let t = 1.0 / (1.0 + B0 * z_abs);
    let poly = t * (B1 + t * (B2 + t * (B3 + t * (B4 + t * B5))));
    let pdf = (-0.5 * z_abs * z_abs).exp() / (2.0 * PI).sqrt();
    let cdf = 1.0 - pdf * poly;

    if negate {
        1.0 - cdf
    } else {
        cdf
    }
}

/// Summary statistics of the finite samples
pub fn compute_statistics(
    samples: &[f64],
    sample_count: usize,
) -> Result<MonteCarloStatistics, MonteCarloError> {
    if samples.is_empty() {
        return Err(MonteCarloError::NoFiniteSamples);
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len() as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    let std_dev = if sorted.len() > 1 {
        (sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
    } else {
        0.0
    };

    Ok(MonteCarloStatistics {
        sample_count,
        finite_count: sorted.len(),
        mean,
        std_dev,
        sigma_band: (mean - std_dev, mean + std_dev),
        interval95: (mean - 1.96 * std_dev, mean + 1.96 * std_dev),
        empirical_interval95: (percentile(&sorted, 2.5), percentile(&sorted, 97.5)),
        median: percentile(&sorted, 50.0),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
    })
}

/// Percentile of sorted data, interpolating between order statistics
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let position = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Equal-width histogram over [min, max]; a single value gets a unit-wide range
pub fn histogram(samples: &[f64], bins: usize) -> Histogram {
    let bins = bins.max(1);
    if samples.is_empty() {
        return Histogram {
            edges: Vec::new(),
            counts: Vec::new(),
        };
    }
    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let (low, high) = if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    };
    let width = (high - low) / bins as f64;

    let edges: Vec<f64> = (0..=bins)
        .map(|i| if i == bins { high } else { low + width * i as f64 })
        .collect();
    let mut counts = vec![0usize; bins];
    for &x in samples {
        let index = (((x - low) / width) as usize).min(bins - 1);
        counts[index] += 1;
    }
    Histogram { edges, counts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::equation::EquationSet;

    fn input(name: &str, c: f64, u: f64, distribution: Distribution) -> McInput {
        McInput {
            name: name.to_string(),
            central_value: c,
            standard_uncertainty: u,
            distribution,
        }
    }

    fn options(samples: usize, seed: u64) -> MonteCarloOptions {
        MonteCarloOptions {
            samples,
            histogram_bins: 80,
            seed: Some(seed),
        }
    }

    fn std_of(expr: &str, inputs: &[McInput], correlations: &CorrelationMatrix) -> f64 {
        let expr = Expr::parse(expr).unwrap();
        let samples = simulate(&expr, inputs, correlations, &options(40_000, 7), None).unwrap();
        compute_statistics(&samples, 40_000).unwrap().std_dev
    }

    #[test]
    fn test_normal_cdf() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-6);
        assert!((normal_cdf(1.0) - 0.841345).abs() < 1e-6);
        assert!((normal_cdf(-1.0) - 0.158655).abs() < 1e-6);
        assert!((normal_cdf(1.96) - 0.975002).abs() < 1e-6);
        assert_eq!(normal_cdf(10.0), 1.0);
        assert_eq!(normal_cdf(-10.0), 0.0);
    }

    #[test]
    fn test_difference_of_independent_normals() {
        let inputs = [
            input("A", 0.0, 1.0, Distribution::Normal),
            input("B", 0.0, 1.0, Distribution::Normal),
        ];
        let std = std_of("A - B", &inputs, &CorrelationMatrix::new());
        assert!((std - 2f64.sqrt()).abs() < 0.08, "std = {}", std);
    }

    #[test]
    fn test_correlation_shrinks_difference() {
        let inputs = [
            input("A", 0.0, 1.0, Distribution::Normal),
            input("B", 0.0, 1.0, Distribution::Normal),
        ];
        let mut rho = CorrelationMatrix::new();
        rho.set("A", "B", 0.9).unwrap();
        let correlated = std_of("A - B", &inputs, &rho);
        assert!((correlated - 0.2f64.sqrt()).abs() < 0.05, "std = {}", correlated);
        assert!(correlated < 2f64.sqrt() / 2.0);
    }

    #[test]
    fn test_marginal_standard_deviations() {
        for distribution in [
            Distribution::Rectangular,
            Distribution::Triangular,
            Distribution::UShaped,
        ] {
            let inputs = [input("x", 5.0, 0.2, distribution)];
            let std = std_of("x", &inputs, &CorrelationMatrix::new());
            assert!((std - 0.2).abs() < 0.01, "{}: std = {}", distribution, std);
        }
    }

    #[test]
    fn test_copula_keeps_marginals() {
        let inputs = [
            input("x", 0.0, 1.0, Distribution::Rectangular),
            input("y", 0.0, 1.0, Distribution::UShaped),
        ];
        let mut rho = CorrelationMatrix::new();
        rho.set("x", "y", 0.5).unwrap();
        let std_x = std_of("x", &inputs, &rho);
        assert!((std_x - 1.0).abs() < 0.03, "std = {}", std_x);
        assert!(std_of("x - y", &inputs, &rho) < std_of("x - y", &inputs, &CorrelationMatrix::new()));
    }

    #[test]
    fn test_copula_members_skip_independent_draw() {
        let expr = Expr::parse("a").unwrap();
        let inputs = [
            input("a", 0.0, 1.0, Distribution::Normal),
            input("b", 0.0, 1.0, Distribution::Normal),
        ];
        let mut rho = CorrelationMatrix::new();
        rho.set("a", "b", 0.5).unwrap();
        let samples = simulate_with(&expr, &inputs, &rho, 5, None, &mut StdRng::seed_from_u64(9)).unwrap();

        // Each sample consumes exactly the two copula normals
        let mut rng = StdRng::seed_from_u64(9);
        let expected: Vec<f64> = (0..5)
            .map(|_| {
                let z0 = standard_normal(&mut rng);
                standard_normal(&mut rng);
                z0
            })
            .collect();
        assert_eq!(samples, expected);
    }

    #[test]
    fn test_non_finite_inputs_rejected() {
        let huge = input("A", 0.0, 1.0e308, Distribution::Rectangular);
        assert_eq!(
            huge.check_finite(),
            Err(MonteCarloError::NonFiniteInput {
                name: "A".into(),
                field: "half-width"
            })
        );
        let nan = input("B", f64::NAN, 1.0, Distribution::Normal);
        assert!(matches!(
            nan.check_finite(),
            Err(MonteCarloError::NonFiniteInput { field: "central value", .. })
        ));
        let inf = input("C", 0.0, f64::INFINITY, Distribution::Normal);
        assert!(matches!(
            inf.check_finite(),
            Err(MonteCarloError::NonFiniteInput { field: "standard uncertainty", .. })
        ));
        assert_eq!(input("D", 1.0, 0.5, Distribution::UShaped).check_finite(), Ok(()));
    }

    #[test]
    fn test_rectangular_bounds() {
        let expr = Expr::parse("x").unwrap();
        let inputs = [input("x", 1.0, 1.0 / 3f64.sqrt(), Distribution::Rectangular)];
        let samples = simulate(&expr, &inputs, &CorrelationMatrix::new(), &options(5_000, 3), None).unwrap();
        assert!(samples.iter().all(|x| (0.0..=2.0).contains(x)));
    }

    #[test]
    fn test_zero_uncertainty_is_constant() {
        let expr = Expr::parse("2 * x").unwrap();
        let inputs = [input("x", 1.5, 0.0, Distribution::Triangular)];
        let samples = simulate(&expr, &inputs, &CorrelationMatrix::new(), &options(100, 1), None).unwrap();
        let stats = compute_statistics(&samples, 100).unwrap();
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.median, 3.0);
        let hist = histogram(&samples, 80);
        assert_eq!(hist.edges[0], 2.5);
        assert_eq!(hist.edges[80], 3.5);
        assert_eq!(hist.counts.iter().sum::<usize>(), 100);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let expr = Expr::parse("a * b").unwrap();
        let inputs = [
            input("a", 1.0, 0.1, Distribution::Normal),
            input("b", 2.0, 0.1, Distribution::Triangular),
        ];
        let rho = CorrelationMatrix::new();
        let first = simulate(&expr, &inputs, &rho, &options(1_000, 11), None).unwrap();
        let second = simulate(&expr, &inputs, &rho, &options(1_000, 11), None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_non_finite_samples_are_dropped() {
        let expr = Expr::parse("log(x)").unwrap();
        let inputs = [input("x", 0.0, 1.0, Distribution::Normal)];
        let samples = simulate(&expr, &inputs, &CorrelationMatrix::new(), &options(2_000, 5), None).unwrap();
        assert!(!samples.is_empty());
        assert!(samples.len() < 2_000);
        assert!(samples.iter().all(|y| y.is_finite()));
    }

    #[test]
    fn test_no_finite_samples() {
        let expr = Expr::parse("sqrt(x)").unwrap();
        let inputs = [input("x", -1.0, 0.0, Distribution::Normal)];
        let samples = simulate(&expr, &inputs, &CorrelationMatrix::new(), &options(10, 5), None).unwrap();
        assert_eq!(compute_statistics(&samples, 10), Err(MonteCarloError::NoFiniteSamples));
    }

    #[test]
    fn test_cancelled_run_has_no_result() {
        let expr = Expr::parse("x").unwrap();
        let inputs = [input("x", 0.0, 1.0, Distribution::Normal)];
        let cancel = AtomicBool::new(true);
        let result = simulate(&expr, &inputs, &CorrelationMatrix::new(), &options(10_000, 5), Some(&cancel));
        assert_eq!(result, Err(MonteCarloError::Cancelled));
    }

    #[test]
    fn test_not_positive_definite() {
        let expr = Expr::parse("a + b + c").unwrap();
        let inputs = [
            input("a", 0.0, 1.0, Distribution::Normal),
            input("b", 0.0, 1.0, Distribution::Normal),
            input("c", 0.0, 1.0, Distribution::Normal),
        ];
        let mut rho = CorrelationMatrix::new();
        rho.set("a", "b", 0.9).unwrap();
        rho.set("b", "c", 0.9).unwrap();
        rho.set("a", "c", -0.9).unwrap();
        assert!(matches!(
            simulate(&expr, &inputs, &rho, &options(10, 5), None),
            Err(MonteCarloError::NotPositiveDefinite(_))
        ));
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&sorted, 50.0), 2.5);
        assert_eq!(percentile(&sorted, 0.0), 1.0);
        assert_eq!(percentile(&sorted, 100.0), 4.0);
        assert!((percentile(&sorted, 2.5) - 1.075).abs() < 1e-12);
    }

    #[test]
    fn test_histogram_edges_and_counts() {
        let hist = histogram(&[0.0, 1.0, 2.0, 3.0, 4.0], 4);
        assert_eq!(hist.edges, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(hist.counts, vec![1, 1, 1, 2]);
    }

    #[test]
    fn test_run_input_errors() {
        let snapshot = InputSnapshot {
            point_name: "P1".into(),
            inputs: Default::default(),
        };
        let rho = CorrelationMatrix::new();
        let opts = options(10, 1);
        assert_eq!(
            run_monte_carlo(&EquationSet::parse(""), "Y", &snapshot, &rho, &opts, None),
            Err(MonteCarloError::NoEquation)
        );
        assert_eq!(
            run_monte_carlo(&EquationSet::parse("Y = 2 * 3"), "Y", &snapshot, &rho, &opts, None),
            Err(MonteCarloError::NoInputs("Y".into()))
        );
        assert_eq!(
            run_monte_carlo(&EquationSet::parse("Y = a"), "Y", &snapshot, &rho, &opts, None),
            Err(MonteCarloError::MissingCentralValue("a".into()))
        );
    }
}
