//! CLI command definitions.
//!
//! This module defines the command structure for the advisor CLI.
//! Each subcommand exercises one part of the guidance service.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use advisor_agents::request::{ROLE_KEY, TYPE_KEY};
use advisor_agents::{ConsultationRequest, Priority};
use advisor_core::{Advisor, AdvisorConfig};

pub mod agents;
pub mod collaborate;
pub mod consult;
pub mod route;
pub mod workflow;

/// advisor - multi-agent developer guidance
#[derive(Parser)]
#[command(name = "advisor")]
#[command(version, about = "advisor - multi-agent developer guidance")]
#[command(long_about = r#"
advisor routes development questions to specialised guidance agents
and reconciles their answers.

COMMANDS:
  agents       → List registered agents and their health
  consult      → Ask the single best agent (with failover)
  route        → Route to the top-ranked agents by priority
  collaborate  → Consult several agents and check consistency
  workflow     → Show the agents consulted for a domain or workflow

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation failure
  4 - Configuration error
  5 - No agent available / routing failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (YAML or TOML)
    #[arg(short, long, global = true, env = "ADVISOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List registered agents
    Agents(agents::AgentsArgs),

    /// Consult the best agent for a question
    Consult(consult::ConsultArgs),

    /// Route a question to the top-ranked agents
    Route(route::RouteArgs),

    /// Consult several agents together
    Collaborate(collaborate::CollaborateArgs),

    /// Show the collaboration workflow for a domain
    Workflow(workflow::WorkflowArgs),
}

/// Options shared by every command that sends a request.
#[derive(Args)]
pub struct RequestArgs {
    /// Domain of the question, e.g. security
    #[arg(short, long)]
    pub domain: String,

    /// The question itself
    pub query: String,

    /// Caller role (guest, developer, lead, admin)
    #[arg(long)]
    pub role: Option<String>,

    /// Request type, e.g. review or design
    #[arg(long = "type")]
    pub kind: Option<String>,

    /// Mark the request as high priority
    #[arg(long)]
    pub urgent: bool,
}

impl RequestArgs {
    pub fn to_request(&self) -> Result<ConsultationRequest> {
        let mut request = ConsultationRequest::new(&self.domain, &self.query)
            .with_client("advisor-cli")
            .with_priority(if self.urgent { Priority::High } else { Priority::Normal });
        if let Some(role) = &self.role {
            request = request.with_context_entry(ROLE_KEY, role.as_str());
        }
        if let Some(kind) = &self.kind {
            request = request.with_context_entry(TYPE_KEY, kind.as_str());
        }
        if let Err(e) = request.validate("advisor-cli") {
            anyhow::bail!("Request validation failed: {}", e);
        }
        Ok(request)
    }
}

/// Global options every command receives.
pub struct Context {
    pub config: Option<PathBuf>,
    pub json: bool,
}

impl Context {
    /// Load configuration and assemble the service.
    pub fn advisor(&self) -> Result<Advisor> {
        let config = load_config(self.config.as_deref())?;
        Ok(Advisor::new(config)?)
    }

    /// Print `value` as JSON when requested. Returns whether it did.
    pub fn print_json<T: Serialize>(&self, value: &T) -> Result<bool> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        Ok(self.json)
    }
}

fn load_config(path: Option<&Path>) -> Result<AdvisorConfig> {
    match path {
        Some(path) => AdvisorConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(AdvisorConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_route() {
        let cli = Cli::try_parse_from([
            "advisor",
            "--json",
            "route",
            "--domain",
            "security",
            "--role",
            "lead",
            "Rotate JWT keys",
        ])
        .unwrap();
        assert!(cli.json);
        let Commands::Route(args) = cli.command else {
            panic!("expected route");
        };
        let request = args.request.to_request().unwrap();
        assert_eq!(request.domain, "security");
        assert_eq!(request.context_str(ROLE_KEY), Some("lead"));
    }

    #[test]
    fn test_invalid_request_is_rejected() {
        let args = RequestArgs {
            domain: "testing".to_string(),
            query: "unit tests".to_string(),
            role: None,
            kind: Some("poem".to_string()),
            urgent: false,
        };
        let err = args.to_request().unwrap_err();
        assert!(err.to_string().contains("validation"));
    }

    #[test]
    fn test_missing_config_file() {
        let err = load_config(Some(Path::new("/nonexistent/advisor.yaml"))).unwrap_err();
        assert!(err.to_string().contains("config"));
    }
}
