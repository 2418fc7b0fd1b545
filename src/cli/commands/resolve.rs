//! `gum resolve` command - flatten result variables into input expressions

use std::path::PathBuf;

use console::style;
use miette::Result;
use serde::Serialize;

use crate::cli::helpers::{load_context, select_targets};
use crate::cli::output::print_structured;
use crate::cli::GlobalOpts;

#[derive(clap::Args, Debug)]
pub struct ResolveArgs {
    /// Measurement model file (YAML)
    pub model: PathBuf,

    /// Result variable to resolve (default: all)
    #[arg(long, short = 't')]
    pub target: Option<String>,

    /// Also list detected result and input variables
    #[arg(long)]
    pub variables: bool,
}

#[derive(Debug, Serialize)]
struct ResolvedEntry {
    target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    expression: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    inputs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ResolveOutput {
    result_variables: Vec<String>,
    input_variables: Vec<String>,
    resolved: Vec<ResolvedEntry>,
}

pub fn run(args: ResolveArgs, global: &GlobalOpts) -> Result<()> {
    let (model, _config) = load_context(global, &args.model)?;
    let equations = model.equation_set();
    let resolver = equations.resolver();
    let canonical = model.variable_order();

    let entries: Vec<ResolvedEntry> =
        select_targets(equations.result_variables(), args.target.as_deref())
            .into_iter()
            .map(|target| match resolver.resolve(&target) {
                Ok(resolved) => ResolvedEntry {
                    expression: Some(resolved.expression.to_string()),
                    inputs: resolved.ordered_inputs(&canonical),
                    target: resolved.target,
                    error: None,
                },
                Err(e) => ResolvedEntry {
                    target,
                    expression: None,
                    inputs: Vec::new(),
                    error: Some(e.to_string()),
                },
            })
            .collect();
    let failed = entries.iter().filter(|e| e.error.is_some()).count();

    let output = ResolveOutput {
        result_variables: equations.result_variables(),
        input_variables: equations.input_variables(),
        resolved: entries,
    };

    if !print_structured(&output, global.format)? {
        if args.variables {
            println!(
                "{} {}",
                style("Result variables:").bold(),
                output.result_variables.join(", ")
            );
            println!(
                "{} {}",
                style("Input variables:").bold(),
                output.input_variables.join(", ")
            );
            println!();
        }
        for entry in &output.resolved {
            match (&entry.expression, &entry.error) {
                (Some(expression), _) => {
                    println!(
                        "{} {} = {}",
                        style("✓").green(),
                        style(&entry.target).cyan(),
                        expression
                    );
                    println!("    inputs: {}", entry.inputs.join(", "));
                }
                (None, Some(error)) => {
                    eprintln!("{} {}: {}", style("✗").red(), style(&entry.target).cyan(), error);
                }
                (None, None) => {}
            }
        }
    }

    if failed > 0 {
        miette::bail!("{} result variable(s) could not be resolved", failed);
    }
    Ok(())
}
