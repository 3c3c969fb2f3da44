//! Audit events emitted by the registry, routing and collaboration layers.
//!
//! Persisting or searching audit events is left to the sink implementation.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use advisor_agents::GuidanceResponse;

/// Outcome recorded for one audited consultation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Failure,
    /// Refused by the access policy
    Rejected,
    TimedOut,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOutcome::Success => "success",
            AuditOutcome::Failure => "failure",
            AuditOutcome::Rejected => "rejected",
            AuditOutcome::TimedOut => "timed_out",
        }
    }
}

/// One audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub agent_id: String,
    pub request_id: String,
    pub outcome: AuditOutcome,
    pub latency: Duration,
    /// Captured error, for non-success outcomes
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(
        agent_id: impl Into<String>,
        request_id: impl Into<String>,
        outcome: AuditOutcome,
        latency: Duration,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            agent_id: agent_id.into(),
            request_id: request_id.into(),
            outcome,
            latency,
            error: None,
        }
    }

    /// Build an event describing an agent response.
    pub fn from_response(response: &GuidanceResponse) -> Self {
        let outcome = if response.is_successful() {
            AuditOutcome::Success
        } else {
            AuditOutcome::Failure
        };
        let mut event = Self::new(
            &response.agent_id,
            &response.request_id,
            outcome,
            response.processing_time,
        );
        if !response.is_successful() {
            event.error = Some(
                response
                    .error_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| response.status.to_string()),
            );
        }
        event
    }

    /// Build an event for an access-policy rejection.
    pub fn rejection(
        agent_id: impl Into<String>,
        request_id: impl Into<String>,
        error: impl std::fmt::Display,
    ) -> Self {
        Self::new(agent_id, request_id, AuditOutcome::Rejected, Duration::ZERO)
            .with_error(error.to_string())
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Destination for audit events.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Writes each event as one structured log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        let latency_ms = event.latency.as_millis() as u64;
        match event.outcome {
            AuditOutcome::Success => info!(
                target: "advisor::audit",
                agent_id = %event.agent_id,
                request_id = %event.request_id,
                outcome = event.outcome.as_str(),
                latency_ms,
                "consultation audited"
            ),
            _ => warn!(
                target: "advisor::audit",
                agent_id = %event.agent_id,
                request_id = %event.request_id,
                outcome = event.outcome.as_str(),
                latency_ms,
                error = event.error.as_deref().unwrap_or(""),
                "consultation audited"
            ),
        }
    }
}

/// Keeps events in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn with_outcome(&self, outcome: AuditOutcome) -> Vec<AuditEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.outcome == outcome)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_from_response() {
        let ok = GuidanceResponse::success("req-1", "security-agent", "Use JWT", 0.9);
        let event = AuditEvent::from_response(&ok);
        assert_eq!(event.outcome, AuditOutcome::Success);
        assert!(event.error.is_none());

        let failed = GuidanceResponse::failure("req-2", "registry", "No suitable agent found");
        let event = AuditEvent::from_response(&failed);
        assert_eq!(event.outcome, AuditOutcome::Failure);
        assert_eq!(event.error.as_deref(), Some("No suitable agent found"));
    }

    #[test]
    fn test_memory_sink() {
        let sink = MemoryAuditSink::new();
        let shared = sink.clone();
        sink.record(AuditEvent::rejection("security-agent", "req-1", "guest denied"));
        sink.record(AuditEvent::new("a", "req-2", AuditOutcome::Success, Duration::ZERO));

        assert_eq!(shared.len(), 2);
        let rejected = shared.with_outcome(AuditOutcome::Rejected);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].error.as_deref(), Some("guest denied"));
    }
}
