//! advisor CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Validation failure
//! - 4: Configuration error
//! - 5: No agent available / routing failure

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use advisor_core::AdvisorError;

mod commands;

use commands::{Cli, Commands, Context};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const CONFIG_ERROR: u8 = 4;
    pub const NO_AGENT: u8 = 5;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("advisor=debug,advisor_core=debug,advisor_agents=debug,info")
    } else if cli.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("advisor=info,advisor_core=info,warn"))
    };
    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let ctx = Context {
        config: cli.config,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Agents(args) => commands::agents::execute(args, &ctx).await,
        Commands::Consult(args) => commands::consult::execute(args, &ctx).await,
        Commands::Route(args) => commands::route::execute(args, &ctx).await,
        Commands::Collaborate(args) => commands::collaborate::execute(args, &ctx).await,
        Commands::Workflow(args) => commands::workflow::execute(args, &ctx).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    if let Some(err) = e.chain().find_map(|cause| cause.downcast_ref::<AdvisorError>()) {
        match err {
            AdvisorError::Config(_) | AdvisorError::Yaml(_) | AdvisorError::Toml(_) => {
                return ExitCodes::CONFIG_ERROR
            }
            AdvisorError::DependencyCycle(_) | AdvisorError::MissingDependency { .. } => {
                return ExitCodes::VALIDATION_FAILURE
            }
            AdvisorError::NoCandidateAgent { .. } | AdvisorError::AgentNotFound(_) => {
                return ExitCodes::NO_AGENT
            }
            _ => {}
        }
    }

    let msg = e.to_string().to_lowercase();
    if msg.contains("validation") {
        ExitCodes::VALIDATION_FAILURE
    } else if msg.contains("config") {
        ExitCodes::CONFIG_ERROR
    } else if msg.contains("no agent") || msg.contains("routing") || msg.contains("collaboration") {
        ExitCodes::NO_AGENT
    } else if msg.contains("argument") || msg.contains("not found") {
        ExitCodes::INVALID_ARGS
    } else {
        ExitCodes::GENERAL_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let config = anyhow::Error::from(AdvisorError::Config("bad".to_string()));
        assert_eq!(categorize_error(&config), ExitCodes::CONFIG_ERROR);

        let routing = anyhow::anyhow!("Routing failed (no_agents_available): none");
        assert_eq!(categorize_error(&routing), ExitCodes::NO_AGENT);

        let invalid = anyhow::anyhow!("Request validation failed: query must not be empty");
        assert_eq!(categorize_error(&invalid), ExitCodes::VALIDATION_FAILURE);

        assert_eq!(categorize_error(&anyhow::anyhow!("boom")), ExitCodes::GENERAL_ERROR);
    }
}
