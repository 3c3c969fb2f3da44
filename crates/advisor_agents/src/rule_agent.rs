//! Rule-based agent backed by a catalog playbook.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::agent::{Agent, AgentProfile};
use crate::catalog::{self, CatalogEntry};
use crate::error::AgentError;
use crate::matching::{self, TokenSet};
use crate::metrics::{AgentMetrics, MetricsSnapshot};
use crate::playbook::Playbook;
use crate::request::ConsultationRequest;
use crate::response::GuidanceResponse;
use crate::roles::AgentRole;

/// Confidence deducted when an agent answers outside its own domain,
/// either on a capability match or as an invited collaboration participant.
pub const CAPABILITY_ONLY_PENALTY: f64 = 0.1;

/// A catalog agent answering from its playbook.
pub struct RuleBasedAgent {
    role: AgentRole,
    profile: AgentProfile,
    base_confidence: f64,
    playbook: Playbook,
    available: AtomicBool,
    in_flight: AtomicUsize,
    metrics: AgentMetrics,
}

/// Decrements the in-flight counter on drop.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl RuleBasedAgent {
    pub fn new(entry: CatalogEntry) -> Self {
        Self {
            role: entry.role,
            profile: entry.profile,
            base_confidence: entry.base_confidence,
            playbook: entry.playbook,
            available: AtomicBool::new(true),
            in_flight: AtomicUsize::new(0),
            metrics: AgentMetrics::new(),
        }
    }

    /// Build the catalog agent for a role.
    pub fn for_role(role: AgentRole) -> Self {
        Self::new(catalog::entry(role))
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    pub fn base_confidence(&self) -> f64 {
        self.base_confidence
    }

    /// Toggle liveness.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    fn acquire(&self) -> Option<InFlight<'_>> {
        let limit = self.profile.performance.max_concurrent;
        let previous = self.in_flight.fetch_add(1, Ordering::AcqRel);
        let guard = InFlight(&self.in_flight);
        if previous >= limit {
            None
        } else {
            Some(guard)
        }
    }

    fn respond(&self, request: &ConsultationRequest) -> GuidanceResponse {
        if let Err(err) = request.validate(self.id()) {
            debug!("{} rejected request {}: {}", self.id(), request.request_id, err);
            return GuidanceResponse::from_error(&request.request_id, self.id(), &err);
        }

        let score = self.match_score(request);
        if !score.is_match() && !request.is_collaborative() {
            let err = AgentError::OutOfDomain {
                agent: self.id().to_string(),
                domain: request.domain.clone(),
            };
            debug!("{} escalating request {}", self.id(), request.request_id);
            return GuidanceResponse::from_error(&request.request_id, self.id(), &err);
        }

        let Some(_guard) = self.acquire() else {
            warn!("{} at maximum capacity", self.id());
            return GuidanceResponse::failure(
                &request.request_id,
                self.id(),
                "Agent at maximum capacity",
            );
        };

        let composed = self.playbook.compose(self.name(), request);
        if composed.guidance.trim().is_empty() || composed.recommendations.is_empty() {
            let err = AgentError::generation_failed(self.id(), "playbook produced no guidance");
            return GuidanceResponse::from_error(&request.request_id, self.id(), &err);
        }

        let confidence = if score.domain_match {
            self.base_confidence
        } else {
            self.base_confidence - CAPABILITY_ONLY_PENALTY
        };

        let query = TokenSet::from_text(&request.query);
        let matched = matching::matched_capabilities(&query, self.capabilities());

        GuidanceResponse::success(&request.request_id, self.id(), composed.guidance, confidence)
            .with_recommendations(composed.recommendations)
            .with_metadata("domain", self.domain())
            .with_metadata("domain_match", score.domain_match)
            .with_metadata("supporting", !score.is_match())
            .with_metadata("matched_capabilities", matched)
            .with_metadata("sections", composed.sections)
    }
}

#[async_trait]
impl Agent for RuleBasedAgent {
    fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
            && self.in_flight.load(Ordering::Acquire) < self.profile.performance.max_concurrent
    }

    async fn provide_guidance(&self, request: &ConsultationRequest) -> GuidanceResponse {
        let started = Instant::now();
        let response = self.respond(request);
        let elapsed = started.elapsed();

        self.metrics.record(elapsed, response.is_successful());
        if elapsed > self.profile.performance.max_latency {
            warn!(
                "Agent {} exceeded response time threshold: {:?} > {:?}",
                self.id(),
                elapsed,
                self.profile.performance.max_latency
            );
        }

        response.with_processing_time(elapsed)
    }

    fn metrics(&self) -> Option<MetricsSnapshot> {
        Some(self.metrics.snapshot())
    }
}

impl std::fmt::Debug for RuleBasedAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleBasedAgent")
            .field("id", &self.profile.id)
            .field("domain", &self.profile.domain)
            .field("available", &self.is_available())
            .finish()
    }
}

/// Every catalog agent, concretely typed.
pub fn catalog_agents() -> Vec<Arc<RuleBasedAgent>> {
    catalog::entries()
        .into_iter()
        .map(|entry| Arc::new(RuleBasedAgent::new(entry)))
        .collect()
}

/// Every catalog agent as a trait object, ready for registration.
pub fn default_agents() -> Vec<Arc<dyn Agent>> {
    catalog_agents()
        .into_iter()
        .map(|agent| agent as Arc<dyn Agent>)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::TYPE_KEY;
    use crate::response::ResponseStatus;

    #[tokio::test]
    async fn test_security_agent_domain_match() {
        let agent = RuleBasedAgent::for_role(AgentRole::Security);
        let request =
            ConsultationRequest::new("security", "Implement JWT authentication for API gateway");

        let response = agent.provide_guidance(&request).await;

        assert_eq!(response.status, ResponseStatus::Success);
        assert_eq!(response.request_id, request.request_id);
        assert!(response.confidence >= 0.85);
        assert!(!response.recommendations.is_empty());
        assert!(response.recommendations.len() <= 5);
        assert!(response.guidance.contains("Authentication"));
    }

    #[tokio::test]
    async fn test_capability_match_lowers_confidence() {
        let agent = RuleBasedAgent::for_role(AgentRole::Security);
        let request = ConsultationRequest::new("implementation", "Add JWT validation");

        let response = agent.provide_guidance(&request).await;

        assert!(response.is_successful());
        assert!((response.confidence - (0.94 - CAPABILITY_ONLY_PENALTY)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unrelated_request_escalates() {
        let agent = RuleBasedAgent::for_role(AgentRole::Documentation);
        let request = ConsultationRequest::new("security", "Rotate JWT keys");

        let response = agent.provide_guidance(&request).await;
        assert_eq!(response.status, ResponseStatus::Escalation);
    }

    #[tokio::test]
    async fn test_collaboration_participant_supports() {
        let agent = RuleBasedAgent::for_role(AgentRole::Documentation);
        let request = ConsultationRequest::new("security", "Rotate JWT keys").for_collaboration();

        let response = agent.provide_guidance(&request).await;

        assert_eq!(response.status, ResponseStatus::Success);
        assert_eq!(response.metadata["supporting"], true);
        assert_eq!(response.domain(), Some("documentation"));
        assert!((response.confidence - (0.94 - CAPABILITY_ONLY_PENALTY)).abs() < 1e-9);
        assert!(!response.recommendations.is_empty());
    }

    #[tokio::test]
    async fn test_collaboration_does_not_bypass_validation() {
        let agent = RuleBasedAgent::for_role(AgentRole::Documentation);
        let request = ConsultationRequest::new("security", "  ").for_collaboration();

        let response = agent.provide_guidance(&request).await;
        assert_eq!(response.status, ResponseStatus::Failure);
    }

    #[tokio::test]
    async fn test_invalid_requests_are_rejected() {
        let agent = RuleBasedAgent::for_role(AgentRole::Testing);

        let blank = ConsultationRequest::new("testing", "");
        assert_eq!(agent.provide_guidance(&blank).await.status, ResponseStatus::Failure);

        let no_context = ConsultationRequest::new("testing", "unit tests").without_context();
        assert_eq!(
            agent.provide_guidance(&no_context).await.status,
            ResponseStatus::InsufficientContext
        );

        let bad_type =
            ConsultationRequest::new("testing", "unit tests").with_context_entry(TYPE_KEY, "haiku");
        assert_eq!(agent.provide_guidance(&bad_type).await.status, ResponseStatus::Failure);
    }

    #[tokio::test]
    async fn test_metrics_and_availability() {
        let agent = RuleBasedAgent::for_role(AgentRole::Testing);
        let request = ConsultationRequest::new("testing", "contract tests with pact");
        agent.provide_guidance(&request).await;
        agent.provide_guidance(&ConsultationRequest::new("testing", " ")).await;

        let metrics = agent.metrics().unwrap();
        assert_eq!(metrics.total_requests, 2);
        assert_eq!(metrics.successful_requests, 1);

        assert!(agent.is_available());
        agent.set_available(false);
        assert!(!agent.is_available());
    }

    #[test]
    fn test_default_agents() {
        let agents = default_agents();
        assert_eq!(agents.len(), 15);
        assert!(agents.iter().any(|a| a.id() == "security-agent"));
    }
}
