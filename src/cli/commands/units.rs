//! `gum units` command - dimensional consistency report

use std::path::PathBuf;

use console::style;
use miette::Result;

use crate::cli::helpers::load_context;
use crate::cli::output::print_structured;
use crate::cli::GlobalOpts;
use crate::core::unit_validator::{validate_unit_consistency, UnitValidationReport, ValidationStatus};
use crate::core::units::format_dimension;

#[derive(clap::Args, Debug)]
pub struct UnitsArgs {
    /// Measurement model file (YAML)
    pub model: PathBuf,

    /// Exit with an error when any check fails
    #[arg(long)]
    pub strict: bool,
}

pub fn run(args: UnitsArgs, global: &GlobalOpts) -> Result<()> {
    let (model, _config) = load_context(global, &args.model)?;
    let equations = model.equation_set();

    // Result variables first, then the remaining declared variables
    let mut registered: Vec<(String, String)> = equations
        .result_variables()
        .into_iter()
        .map(|name| {
            let unit = model
                .variable(&name)
                .and_then(|v| v.unit.clone())
                .unwrap_or_default();
            (name, unit)
        })
        .collect();
    for variable in &model.variables {
        if !registered.iter().any(|(name, _)| *name == variable.name) {
            registered.push((variable.name.clone(), variable.unit.clone().unwrap_or_default()));
        }
    }

    let report = validate_unit_consistency(&model.equation, registered);

    if !print_structured(&report, global.format)? {
        print_report(&report);
    }

    if args.strict && report.error_count > 0 {
        miette::bail!("{} unit check(s) failed", report.error_count);
    }
    Ok(())
}

fn status_glyph(status: ValidationStatus) -> String {
    match status {
        ValidationStatus::Ok => style("✓").green().to_string(),
        ValidationStatus::Warn => style("⚠").yellow().to_string(),
        ValidationStatus::Error => style("✗").red().to_string(),
    }
}

fn print_report(report: &UnitValidationReport) {
    println!("{}", style("Variables").bold());
    for item in &report.variable_items {
        let unit = if item.unit.is_empty() { "-" } else { item.unit.as_str() };
        println!(
            "  {} {:<12} {:<16} {}",
            status_glyph(item.status),
            item.name,
            unit,
            style(&item.message).dim()
        );
    }

    println!();
    println!("{}", style("Equations").bold());
    for item in &report.equation_items {
        println!("  {} {}", status_glyph(item.status), item.equation);
        if item.lhs_dimension.is_some() || item.rhs_dimension.is_some() {
            println!(
                "      LHS: {}   RHS: {}",
                format_dimension(item.lhs_dimension.as_ref()),
                format_dimension(item.rhs_dimension.as_ref())
            );
        }
        println!("      {}", style(&item.message).dim());
    }

    println!();
    println!(
        "{} OK, {} WARN, {} ERROR",
        style(report.ok_count).green(),
        style(report.warn_count).yellow(),
        style(report.error_count).red()
    );
}
