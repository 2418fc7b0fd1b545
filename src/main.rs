use clap::Parser;
use gumcalc::cli::{Cli, Commands};
use miette::Result;
use tracing::Level;

fn main() -> Result<()> {
    // Install miette's fancy error handler for beautiful diagnostics
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();

    let level = match cli.global.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let global = cli.global;
    match cli.command {
        Commands::Resolve(args) => gumcalc::cli::commands::resolve::run(args, &global),
        Commands::Derive(args) => gumcalc::cli::commands::derive::run(args, &global),
        Commands::Budget(args) => gumcalc::cli::commands::budget::run(args, &global),
        Commands::Units(args) => gumcalc::cli::commands::units::run(args, &global),
        Commands::Mc(args) => gumcalc::cli::commands::mc::run(args, &global),
        Commands::Completions(args) => gumcalc::cli::commands::completions::run(args, &global),
    }
}
