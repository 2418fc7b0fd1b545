//! `gum derive` command - symbolic partial derivatives

use std::path::PathBuf;

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use crate::cli::helpers::{load_context, select_targets};
use crate::cli::output::print_structured;
use crate::cli::GlobalOpts;
use crate::core::sensitivity::partial_derivative_text;

#[derive(clap::Args, Debug)]
pub struct DeriveArgs {
    /// Measurement model file (YAML)
    pub model: PathBuf,

    /// Result variable to differentiate (default: all)
    #[arg(long, short = 't')]
    pub target: Option<String>,

    /// Only differentiate with respect to this input
    #[arg(long, short = 'w')]
    pub wrt: Option<String>,
}

#[derive(Debug, Serialize)]
struct DerivativeEntry {
    target: String,
    variable: String,
    derivative: String,
}

pub fn run(args: DeriveArgs, global: &GlobalOpts) -> Result<()> {
    let (model, _config) = load_context(global, &args.model)?;
    let equations = model.equation_set();
    let resolver = equations.resolver();
    let canonical = model.variable_order();

    let mut entries = Vec::new();
    for target in select_targets(equations.result_variables(), args.target.as_deref()) {
        let resolved = resolver.resolve(&target).into_diagnostic()?;
        let inputs: Vec<String> = resolved
            .ordered_inputs(&canonical)
            .into_iter()
            .filter(|name| args.wrt.as_deref().map_or(true, |w| w == name.as_str()))
            .collect();
        for variable in inputs {
            let text = partial_derivative_text(&resolved.target, &resolved.expression, &variable)
                .into_diagnostic()?;
            entries.push(DerivativeEntry {
                target: resolved.target.clone(),
                variable,
                derivative: text,
            });
        }
    }

    if let Some(wrt) = &args.wrt {
        if entries.is_empty() {
            miette::bail!("'{}' is not an input of the selected result variables", wrt);
        }
    }

    if print_structured(&entries, global.format)? {
        return Ok(());
    }
    let mut current: Option<&str> = None;
    for entry in &entries {
        if current != Some(entry.target.as_str()) {
            println!("{}", style(&entry.target).bold());
            current = Some(entry.target.as_str());
        }
        println!("   {}", entry.derivative);
    }
    Ok(())
}
