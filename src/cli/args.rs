//! Command-line argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::commands::budget::BudgetArgs;
use crate::cli::commands::completions::CompletionsArgs;
use crate::cli::commands::derive::DeriveArgs;
use crate::cli::commands::mc::McArgs;
use crate::cli::commands::resolve::ResolveArgs;
use crate::cli::commands::units::UnitsArgs;

#[derive(Parser, Debug)]
#[command(name = "gum")]
#[command(author, version, about = "GUM measurement uncertainty calculator")]
#[command(long_about = "Propagates measurement uncertainty through model equations \
    following the GUM: symbolic sensitivity coefficients, uncertainty budgets, \
    unit consistency checks and Monte Carlo cross-checks.")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand
#[derive(clap::Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Calculation settings file (YAML)
    #[arg(long, global = true, env = "GUM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables
    Text,
    Json,
    Yaml,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve result variables into expressions over the inputs
    Resolve(ResolveArgs),

    /// Show symbolic partial derivatives
    Derive(DeriveArgs),

    /// Compute uncertainty budgets
    Budget(BudgetArgs),

    /// Check dimensional consistency of the model equations
    Units(UnitsArgs),

    /// Run a Monte Carlo simulation
    Mc(McArgs),

    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}
