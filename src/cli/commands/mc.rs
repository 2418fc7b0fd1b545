//! `gum mc` command - Monte Carlo cross-check of a budget

use std::io;
use std::path::PathBuf;

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{format_value, load_context};
use crate::cli::output::print_structured;
use crate::cli::GlobalOpts;
use crate::core::monte_carlo::{run_monte_carlo, Histogram, MonteCarloOptions, MonteCarloResult};

#[derive(clap::Args, Debug)]
pub struct McArgs {
    /// Measurement model file (YAML)
    pub model: PathBuf,

    /// Result variable (default: first result in the equation)
    #[arg(long, short = 't')]
    pub target: Option<String>,

    /// Calibration point name or 1-based number
    #[arg(long, short = 'p', default_value = "1")]
    pub point: String,

    /// Number of samples (default from config)
    #[arg(long, short = 'n')]
    pub samples: Option<usize>,

    /// Seed for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Histogram bins (default from config)
    #[arg(long)]
    pub bins: Option<usize>,

    /// Print an ASCII histogram of the samples
    #[arg(long)]
    pub histogram: bool,

    /// Write the samples as CSV to stdout instead of the summary
    #[arg(long)]
    pub csv: bool,
}

pub fn run(args: McArgs, global: &GlobalOpts) -> Result<()> {
    let (model, config) = load_context(global, &args.model)?;
    let equations = model.equation_set();
    let target = match args.target {
        Some(t) => t,
        None => match equations.result_variables().into_iter().next() {
            Some(t) => t,
            None => miette::bail!("model has no result variable"),
        },
    };
    let index = model.point_index(&args.point)?;
    let snapshot = model.inputs_at(index, &config)?;

    let options = MonteCarloOptions {
        samples: args.samples.unwrap_or(config.monte_carlo.default_samples),
        histogram_bins: args.bins.unwrap_or(config.monte_carlo.histogram_bins),
        seed: args.seed,
    };
    if options.samples == 0 {
        miette::bail!("sample count must be positive");
    }

    let result = run_monte_carlo(
        &equations,
        &target,
        &snapshot,
        &model.correlations,
        &options,
        None,
    )
    .into_diagnostic()?;

    if args.csv {
        return write_samples_csv(&result.samples);
    }
    if print_structured(&result, global.format)? {
        return Ok(());
    }
    print_summary(&result, config.display_digits);
    if args.histogram {
        println!();
        print_histogram(&result.histogram, result.samples.len());
    }
    Ok(())
}

fn write_samples_csv(samples: &[f64]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["sample", "value"]).into_diagnostic()?;
    for (i, value) in samples.iter().enumerate() {
        writer
            .write_record([(i + 1).to_string(), value.to_string()])
            .into_diagnostic()?;
    }
    writer.flush().into_diagnostic()?;
    Ok(())
}

fn print_summary(result: &MonteCarloResult, digits: usize) {
    let stats = &result.statistics;
    let fmt = |v: f64| format_value(Some(v), digits);

    println!(
        "{} {} @ {}",
        style("⚙").cyan(),
        style(format!("Monte Carlo: {}", result.target)).bold(),
        style(&result.point).yellow()
    );
    println!("   {} = {}", result.target, result.expression);
    println!();
    for input in &result.inputs {
        println!(
            "   {:<12} {} ± {} ({})",
            input.name,
            fmt(input.central_value),
            fmt(input.standard_uncertainty),
            input.distribution
        );
    }
    println!();
    println!(
        "   Samples:     {} ({} finite)",
        stats.sample_count, stats.finite_count
    );
    println!("   Mean:        {}", fmt(stats.mean));
    println!("   Std Dev:     {}", fmt(stats.std_dev));
    println!("   Median:      {}", fmt(stats.median));
    println!("   Range:       [{}, {}]", fmt(stats.min), fmt(stats.max));
    println!(
        "   ±1σ:         [{}, {}]",
        fmt(stats.sigma_band.0),
        fmt(stats.sigma_band.1)
    );
    println!(
        "   95% (±1.96σ): [{}, {}]",
        fmt(stats.interval95.0),
        fmt(stats.interval95.1)
    );
    println!(
        "   95% (empirical): [{}, {}]",
        fmt(stats.empirical_interval95.0),
        fmt(stats.empirical_interval95.1)
    );
    if stats.finite_count < stats.sample_count {
        println!(
            "   {} {} non-finite sample(s) dropped",
            style("⚠").yellow(),
            stats.sample_count - stats.finite_count
        );
    }
}

/// Print an ASCII histogram of precomputed bins
fn print_histogram(histogram: &Histogram, samples: usize) {
    let bins = histogram.counts.len();
    if bins == 0 {
        return;
    }
    let max_count = histogram.counts.iter().copied().max().unwrap_or(1).max(1);
    let bar_max_width = 50;

    println!(
        "   {} ({} samples, {} bins):",
        style("Distribution Histogram").bold(),
        samples,
        bins
    );
    println!();

    for (i, &count) in histogram.counts.iter().enumerate() {
        let bar_width = (count as f64 / max_count as f64 * bar_max_width as f64) as usize;
        let bin_center = (histogram.edges[i] + histogram.edges[i + 1]) / 2.0;
        let bar = "█".repeat(bar_width);
        println!(
            "   {:>10.4} │{:<width$}│ {:>6}",
            bin_center,
            bar,
            count,
            width = bar_max_width
        );
    }
    println!("   {:>10} └{}┘", "", "─".repeat(bar_max_width));
}
