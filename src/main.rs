//! quarry - Resource Sync Tool
//!
//! Command-line entry point: builds the option registry, resolves the
//! effective configuration, runs the startup sequence, records the
//! invocation, and dispatches to the requested command.

use clap::FromArgMatches;
use std::collections::HashMap;
use tracing::error;

use quarry::cli::{self, Cli};
use quarry::config;
use quarry::startup::{audit, InitContext, InitSequencer, InvocationRecord};
use quarry::utils::terminal;
use quarry::{QuarryError, Result};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Error: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let registry = config::global_options()?;
    let command = cli::command(&registry);
    let matches = command.clone().get_matches();
    let cli = Cli::from_arg_matches(&matches)
        .map_err(|e| QuarryError::config(format!("failed to interpret arguments: {e}")))?;

    let environ: HashMap<String, String> = std::env::vars().collect();
    let resolved = config::resolve(&registry, &matches, &environ)?;

    let mut sequencer = InitSequencer::new();
    let mut ctx = InitContext::new(
        resolved,
        cli.command.is_completion(),
        terminal::stdout_is_interactive(),
    );
    sequencer.run(&mut ctx)?;

    let record = InvocationRecord::new(
        cli::version(),
        &ctx.resolved,
        cli::local_options(&registry, &command, &matches),
        &cli.command.path(),
        cli.command.positional_args(),
    );
    audit::emit(&record);

    cli.execute(&registry, ctx.settings()?).await
}
