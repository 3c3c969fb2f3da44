//! Error types for the core module.

use thiserror::Error;

/// Result type alias for core operations.
pub type AdvisorResult<T> = Result<T, AdvisorError>;

/// Errors that can occur in the registry, routing and collaboration layers.
///
/// Consultation paths convert these into status values before they reach a
/// caller; they surface directly only from setup operations such as loading
/// configuration or validating agent dependencies.
#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("No agent available for request {request_id} (domain {domain})")]
    NoCandidateAgent { request_id: String, domain: String },

    #[error("Caller role {role} may not consult domain {domain}")]
    Unauthorized { role: String, domain: String },

    #[error("Timed out after {elapsed_ms}ms: {operation}")]
    Timeout { operation: String, elapsed_ms: u64 },

    #[error("Dependency cycle detected among agents: {0:?}")]
    DependencyCycle(Vec<String>),

    #[error("Agent {agent} depends on unregistered agent {dependency}")]
    MissingDependency { agent: String, dependency: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Agent error: {0}")]
    Agent(#[from] advisor_agents::AgentError),
}

impl AdvisorError {
    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Create an unauthorized error.
    pub fn unauthorized(role: impl std::fmt::Display, domain: impl Into<String>) -> Self {
        Self::Unauthorized {
            role: role.to_string(),
            domain: domain.into(),
        }
    }
}
