//! Vitrine CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Configuration error
//! - 3: Pipeline failure

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vitrine_core::{CoreError, PipelineError};

mod commands;

use commands::{Cli, Commands};

const DEFAULT_DIRECTIVES: &str =
    "vitrine_core=info,vitrine_agents=info,vitrine_server=info,vitrine_cli=info,tower_http=info,warn";
const VERBOSE_DIRECTIVES: &str =
    "vitrine_core=debug,vitrine_agents=debug,vitrine_server=debug,vitrine_cli=debug,tower_http=debug,info";

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const CONFIG_ERROR: u8 = 2;
    pub const PIPELINE_FAILURE: u8 = 3;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::execute(args).await,
        Commands::Fetch(args) => commands::fetch::execute(args).await,
        Commands::Agents(args) => commands::agents::execute(args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(categorize_error(&e))
        }
    }
}

fn init_logging(cli: &Cli) {
    let directives = if cli.verbose {
        VERBOSE_DIRECTIVES
    } else if cli.quiet {
        "warn"
    } else {
        DEFAULT_DIRECTIVES
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    let log_result = if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };

    if log_result.is_err() {
        // Logging already initialized, continue
    }
}

/// Map an error to an exit code.
fn categorize_error(e: &anyhow::Error) -> u8 {
    if let Some(core) = e.downcast_ref::<CoreError>() {
        return match core {
            CoreError::Config(_) => ExitCodes::CONFIG_ERROR,
            CoreError::Pipeline(_) => ExitCodes::PIPELINE_FAILURE,
        };
    }
    if e.downcast_ref::<PipelineError>().is_some() {
        return ExitCodes::PIPELINE_FAILURE;
    }
    ExitCodes::GENERAL_ERROR
}
