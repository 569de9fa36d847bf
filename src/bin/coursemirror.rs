//! Coursemirror CLI Binary
//!
//! Command-line interface for the incremental course file mirror.

use clap::Parser;
use coursemirror::logging::init_logging;
use coursemirror::tooling::cli::{Cli, CliContext};
use std::process;

fn main() {
    let cli = Cli::parse();

    let context = match CliContext::new(cli.config.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };

    let logging = context.config().logging.clone().apply_env().with_overrides(
        cli.log_level.as_deref(),
        cli.log_format.as_deref(),
        cli.log_output.as_deref(),
        cli.log_file.clone(),
        cli.verbose,
    );
    if let Err(e) = init_logging(&logging) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    match context.execute(&cli.command) {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
