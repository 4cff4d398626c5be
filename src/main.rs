use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod completeness;
mod config;
mod engine;
mod error;
mod merge;
mod orchestrator;
mod paths;
mod prompts;
mod response_log;
mod schema;
mod util;
mod validate;
mod workflow;

use cli::{Command, RootArgs};

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.command.verbose());

    match &args.command {
        Command::Analyze(args) => workflow::run_analyze(args),
        Command::Steps(args) => workflow::run_steps(args),
        Command::Validate(args) => workflow::run_validate(args),
        Command::Check(args) => workflow::run_check(args),
        Command::Init(args) => workflow::run_init(args),
        Command::Responses(args) => workflow::run_responses(args),
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "docsift=debug" } else { "docsift=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
