//! `gum budget` command - uncertainty budgets per result and calibration point

use std::path::PathBuf;

use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::cli::helpers::{format_dof, format_value, load_context, select_points, select_targets, PLACEHOLDER};
use crate::cli::output::print_structured;
use crate::cli::GlobalOpts;
use crate::core::budget::{compute_budget, UncertaintyBudget};
use crate::core::config::CalcConfig;
use crate::core::rounding::format_uncertainty;

#[derive(clap::Args, Debug)]
pub struct BudgetArgs {
    /// Measurement model file (YAML)
    pub model: PathBuf,

    /// Result variable (default: all)
    #[arg(long, short = 't')]
    pub target: Option<String>,

    /// Calibration point name or 1-based number (default: all)
    #[arg(long, short = 'p')]
    pub point: Option<String>,

    /// Show the partial derivative of each row
    #[arg(long)]
    pub derivatives: bool,
}

#[derive(Tabled)]
struct BudgetTableRow {
    #[tabled(rename = "Variable")]
    variable: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "u")]
    uncertainty: String,
    #[tabled(rename = "DoF")]
    dof: String,
    #[tabled(rename = "Dist")]
    distribution: String,
    #[tabled(rename = "Sensitivity")]
    sensitivity: String,
    #[tabled(rename = "Contribution")]
    contribution: String,
    #[tabled(rename = "Rate%")]
    rate: String,
}

pub fn run(args: BudgetArgs, global: &GlobalOpts) -> Result<()> {
    let (model, config) = load_context(global, &args.model)?;
    let equations = model.equation_set();
    if equations.is_empty() {
        miette::bail!("model has no equations");
    }
    let resolver = equations.resolver();
    let canonical = model.variable_order();
    let targets = select_targets(equations.result_variables(), args.target.as_deref());
    let points = select_points(&model, args.point.as_deref())?;

    let mut budgets = Vec::new();
    for target in &targets {
        let resolved = resolver.resolve(target).into_diagnostic()?;
        for &index in &points {
            let snapshot = model.inputs_at(index, &config)?;
            budgets.push(compute_budget(&resolved, &snapshot, &canonical, &config));
        }
    }

    for budget in &budgets {
        if let Some(summary) = budget.issue_summary() {
            eprintln!(
                "{} {} @ {}",
                style("⚠").yellow(),
                style(&budget.target).cyan(),
                budget.point
            );
            eprintln!("{}", style(summary).yellow());
        }
    }

    if print_structured(&budgets, global.format)? {
        return Ok(());
    }
    for (i, budget) in budgets.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print_budget(budget, &config, args.derivatives);
    }
    Ok(())
}

fn print_budget(budget: &UncertaintyBudget, config: &CalcConfig, derivatives: bool) {
    let digits = config.display_digits;
    println!("{}", style("─".repeat(60)).dim());
    println!(
        "{}: {}   {}: {}",
        style("Result").bold(),
        style(&budget.target).cyan(),
        style("Point").bold(),
        style(&budget.point).yellow()
    );
    println!("{} = {}", budget.target, budget.expression);
    println!("{}", style("─".repeat(60)).dim());

    let rows: Vec<BudgetTableRow> = budget
        .rows
        .iter()
        .map(|row| BudgetTableRow {
            variable: row.variable.clone(),
            value: format_value(row.central_value, digits),
            uncertainty: format_value(row.standard_uncertainty, digits),
            dof: row
                .degrees_of_freedom
                .map(|d| d.to_string())
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            distribution: row.distribution.to_string(),
            sensitivity: format_value(row.sensitivity, digits),
            contribution: format_value(row.contribution, digits),
            rate: format!("{:.2}", row.contribution_rate),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if derivatives {
        for row in &budget.rows {
            if let Some(text) = &row.partial_derivative {
                println!("   {}", style(text).dim());
            }
        }
    }

    let rounding = &config.rounding;
    println!();
    println!(
        "   {:<24} {}",
        style("Central value").bold(),
        format_value(budget.central_value, digits)
    );
    println!(
        "   {:<24} {}",
        style("Combined uncertainty").bold(),
        format_value(Some(budget.combined_uncertainty), digits)
    );
    println!(
        "   {:<24} {}",
        style("Effective DoF").bold(),
        format_dof(budget.effective_degrees_of_freedom)
    );
    println!(
        "   {:<24} {}",
        style("Coverage factor k").bold(),
        budget.coverage_factor
    );
    println!(
        "   {:<24} {} ({} significant, {})",
        style("Expanded uncertainty").bold(),
        style(format_uncertainty(
            budget.expanded_uncertainty,
            rounding.significant_digits,
            rounding.mode
        ))
        .green(),
        rounding.significant_digits,
        rounding.mode
    );
}
