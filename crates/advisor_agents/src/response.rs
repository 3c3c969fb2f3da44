//! Guidance responses produced by agents.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// Outcome of a single consultation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    /// Guidance was produced
    Success,
    /// The request was malformed or the agent failed
    Failure,
    /// The agent cannot handle the request and defers to someone else
    Escalation,
    /// The request lacked the context needed to answer
    InsufficientContext,
}

impl ResponseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseStatus::Success => "SUCCESS",
            ResponseStatus::Failure => "FAILURE",
            ResponseStatus::Escalation => "ESCALATION",
            ResponseStatus::InsufficientContext => "INSUFFICIENT_CONTEXT",
        }
    }

    pub fn all() -> [Self; 4] {
        [
            ResponseStatus::Success,
            ResponseStatus::Failure,
            ResponseStatus::Escalation,
            ResponseStatus::InsufficientContext,
        ]
    }
}

impl std::fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&AgentError> for ResponseStatus {
    fn from(err: &AgentError) -> Self {
        match err {
            AgentError::MissingContext(_) => ResponseStatus::InsufficientContext,
            AgentError::OutOfDomain { .. } => ResponseStatus::Escalation,
            AgentError::InvalidRequest { .. }
            | AgentError::UnrecognizedType(_)
            | AgentError::GenerationFailed { .. } => ResponseStatus::Failure,
        }
    }
}

/// Guidance returned by one agent for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidanceResponse {
    /// Id of the originating request
    pub request_id: String,
    /// Agent that answered
    pub agent_id: String,
    /// Guidance text
    pub guidance: String,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
    /// Ordered actionable recommendations
    pub recommendations: Vec<String>,
    /// Free-form metadata
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// When the response was produced
    pub timestamp: DateTime<Utc>,
    /// Time spent producing the response
    pub processing_time: Duration,
    /// Outcome
    pub status: ResponseStatus,
}

impl GuidanceResponse {
    fn base(
        request_id: impl Into<String>,
        agent_id: impl Into<String>,
        guidance: impl Into<String>,
        confidence: f64,
        status: ResponseStatus,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            agent_id: agent_id.into(),
            guidance: guidance.into(),
            confidence: clamp_confidence(confidence),
            recommendations: Vec::new(),
            metadata: BTreeMap::new(),
            timestamp: Utc::now(),
            processing_time: Duration::ZERO,
            status,
        }
    }

    /// Create a successful response.
    pub fn success(
        request_id: impl Into<String>,
        agent_id: impl Into<String>,
        guidance: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self::base(request_id, agent_id, guidance, confidence, ResponseStatus::Success)
    }

    /// Create a failed response carrying an error message.
    pub fn failure(
        request_id: impl Into<String>,
        agent_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        Self::base(request_id, agent_id, message.clone(), 0.0, ResponseStatus::Failure)
            .with_metadata("error", message)
    }

    /// Create an escalation response.
    pub fn escalation(
        request_id: impl Into<String>,
        agent_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::base(request_id, agent_id, reason, 0.0, ResponseStatus::Escalation)
    }

    /// Create an insufficient context response.
    pub fn insufficient_context(
        request_id: impl Into<String>,
        agent_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::base(
            request_id,
            agent_id,
            reason,
            0.0,
            ResponseStatus::InsufficientContext,
        )
    }

    /// Convert an agent error into the matching non-success response.
    pub fn from_error(
        request_id: impl Into<String>,
        agent_id: impl Into<String>,
        err: &AgentError,
    ) -> Self {
        let status = ResponseStatus::from(err);
        Self::base(request_id, agent_id, err.to_string(), 0.0, status)
            .with_metadata("error", err.to_string())
    }

    /// Add a recommendation.
    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendations.push(recommendation.into());
        self
    }

    /// Replace the recommendations.
    pub fn with_recommendations<I, S>(mut self, recommendations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recommendations = recommendations.into_iter().map(Into::into).collect();
        self
    }

    /// Add metadata.
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Set processing time.
    pub fn with_processing_time(mut self, processing_time: Duration) -> Self {
        self.processing_time = processing_time;
        self
    }

    /// Whether the response is a usable success.
    pub fn is_successful(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// Error message recorded in metadata, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.metadata.get("error").and_then(|v| v.as_str())
    }

    /// Domain of the answering agent, when it reported one.
    pub fn domain(&self) -> Option<&str> {
        self.metadata.get("domain").and_then(|v| v.as_str())
    }

    /// Check the response contract: a success carries non-blank guidance
    /// and a confidence in `[0, 1]`.
    pub fn satisfies_contract(&self) -> bool {
        let confidence_ok = (0.0..=1.0).contains(&self.confidence);
        match self.status {
            ResponseStatus::Success => confidence_ok && !self.guidance.trim().is_empty(),
            _ => confidence_ok,
        }
    }
}

/// Clamp a confidence into `[0, 1]`, mapping NaN to zero.
pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_response() {
        let response = GuidanceResponse::success("req-1", "security-agent", "Use JWT", 0.94)
            .with_recommendation("Rotate signing keys")
            .with_metadata("domain", "security");

        assert!(response.is_successful());
        assert!(response.satisfies_contract());
        assert_eq!(response.recommendations.len(), 1);
        assert_eq!(response.domain(), Some("security"));
        assert_eq!(GuidanceResponse::failure("req-1", "a", "boom").domain(), None);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let high = GuidanceResponse::success("req-1", "a", "text", 1.7);
        let nan = GuidanceResponse::success("req-1", "a", "text", f64::NAN);
        assert_eq!(high.confidence, 1.0);
        assert_eq!(nan.confidence, 0.0);
    }

    #[test]
    fn test_failure_records_error() {
        let response = GuidanceResponse::failure("req-1", "registry", "No suitable agent found");
        assert!(!response.is_successful());
        assert_eq!(response.status, ResponseStatus::Failure);
        assert_eq!(response.error_message(), Some("No suitable agent found"));
    }

    #[test]
    fn test_status_from_error() {
        let missing = AgentError::MissingContext("none".into());
        let invalid = AgentError::invalid_request("a", "blank");
        let out = AgentError::OutOfDomain {
            agent: "a".into(),
            domain: "b".into(),
        };

        assert_eq!(ResponseStatus::from(&missing), ResponseStatus::InsufficientContext);
        assert_eq!(ResponseStatus::from(&invalid), ResponseStatus::Failure);
        assert_eq!(ResponseStatus::from(&out), ResponseStatus::Escalation);

        let response = GuidanceResponse::from_error("req-1", "a", &missing);
        assert_eq!(response.status, ResponseStatus::InsufficientContext);
        assert!(response.error_message().is_some());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ResponseStatus::InsufficientContext).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_CONTEXT\"");
    }
}
