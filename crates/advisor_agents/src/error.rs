//! Error types for agents module.

use thiserror::Error;

/// Result type alias for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors that can occur while an agent prepares guidance.
///
/// These never cross the [`Agent`](crate::Agent) boundary: `provide_guidance`
/// converts them into a [`GuidanceResponse`](crate::GuidanceResponse) with a
/// non-success status.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    #[error("Invalid request for agent {agent}: {message}")]
    InvalidRequest { agent: String, message: String },

    #[error("Missing context: {0}")]
    MissingContext(String),

    #[error("Unrecognized request type: {0}")]
    UnrecognizedType(String),

    #[error("Agent {agent} cannot handle domain {domain}")]
    OutOfDomain { agent: String, domain: String },

    #[error("Guidance generation failed: {agent} - {message}")]
    GenerationFailed { agent: String, message: String },
}

impl AgentError {
    /// Create an invalid request error.
    pub fn invalid_request(agent: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            agent: agent.into(),
            message: message.into(),
        }
    }

    /// Create a generation failed error.
    pub fn generation_failed(agent: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GenerationFailed {
            agent: agent.into(),
            message: message.into(),
        }
    }
}
