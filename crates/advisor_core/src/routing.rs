//! Priority-based routing.
//!
//! A routed request moves through a small state machine:
//!
//! ```text
//! RECEIVED -> CANDIDATE_SELECTION -> DISPATCHED -> [CONSISTENCY_CHECK] -> RESOLVED | FAILED
//! ```
//!
//! Candidates come from three sources: agents whose match score accepts the
//! request, agents holding a capability named by the keyword table, and
//! agents of the domains that support the request domain. They are ranked by
//! match score, keyword hits, declared priority and registration order, and
//! the top few are consulted concurrently within the routing budget.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use advisor_agents::matching::{domain_covered_by, same_domain, TokenSet};
use advisor_agents::{Agent, ConsultationRequest, GuidanceResponse, MatchScore};

use crate::audit::{AuditEvent, AuditOutcome, AuditSink};
use crate::config::{AdvisorConfig, CollaborationConfig, RoutingConfig};
use crate::conflict::ConflictResolver;
use crate::consistency::{ConsistencyValidationResult, ConsistencyValidator};
use crate::dependency::cross_domain_support;
use crate::dispatch;
use crate::error::AdvisorError;
use crate::registry::AgentRegistry;
use crate::security::AccessPolicy;

/// Agent id used on audit events and responses produced by the router.
pub const ROUTER_AGENT_ID: &str = "routing-manager";

/// Query phrase to capability tag.
const KEYWORD_TABLE: &[(&str, &str)] = &[
    ("spring boot", "spring-boot"),
    ("security", "security"),
    ("test", "testing"),
    ("testing", "testing"),
    ("deploy", "deployment"),
    ("deployment", "deployment"),
    ("document", "documentation"),
    ("documentation", "documentation"),
    ("architecture", "architecture"),
    ("event", "event-driven"),
    ("kafka", "event-driven"),
    ("sns", "event-driven"),
    ("sqs", "event-driven"),
    ("rabbitmq", "event-driven"),
    ("messaging", "event-driven"),
    ("schema", "event-schemas"),
    ("idempotent", "idempotency"),
    ("event handler", "idempotency"),
    ("event sourcing", "event-sourcing"),
    ("cqrs", "event-sourcing"),
    ("cicd", "cicd"),
    ("ci cd", "cicd"),
    ("pipeline", "cicd"),
    ("build", "cicd"),
    ("jenkins", "cicd"),
    ("github actions", "cicd"),
    ("maven", "build-automation"),
    ("gradle", "build-automation"),
    ("sast", "security-scanning"),
    ("dast", "security-scanning"),
    ("security scanning", "security-scanning"),
    ("blue green", "deployment-strategies"),
    ("canary", "deployment-strategies"),
    ("deployment strategy", "deployment-strategies"),
    ("config", "configuration"),
    ("configuration", "configuration"),
    ("consul", "centralized-config"),
    ("etcd", "centralized-config"),
    ("feature flag", "feature-flags"),
    ("toggle", "feature-flags"),
    ("vault", "secrets-management"),
    ("secret", "secrets-management"),
    ("resilience", "resilience"),
    ("circuit breaker", "resilience"),
    ("retry", "resilience"),
    ("resilience4j", "circuit-breaker"),
    ("hystrix", "circuit-breaker"),
    ("bulkhead", "bulkhead-pattern"),
    ("rate limit", "bulkhead-pattern"),
    ("chaos", "chaos-engineering"),
    ("failure injection", "chaos-engineering"),
];

/// Capability tags named by the query, via the keyword table.
pub fn extract_capabilities(query: &str) -> BTreeSet<&'static str> {
    let tokens = TokenSet::from_text(query);
    KEYWORD_TABLE
        .iter()
        .filter(|(phrase, _)| tokens.contains_phrase(phrase))
        .map(|(_, tag)| *tag)
        .collect()
}

/// Stage of a routed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoutingStage {
    Received,
    CandidateSelection,
    Dispatched,
    ConsistencyCheck,
    Resolved,
    Failed,
}

impl RoutingStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingStage::Received => "RECEIVED",
            RoutingStage::CandidateSelection => "CANDIDATE_SELECTION",
            RoutingStage::Dispatched => "DISPATCHED",
            RoutingStage::ConsistencyCheck => "CONSISTENCY_CHECK",
            RoutingStage::Resolved => "RESOLVED",
            RoutingStage::Failed => "FAILED",
        }
    }

    /// Whether the request stops at this stage.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RoutingStage::Resolved | RoutingStage::Failed)
    }
}

impl std::fmt::Display for RoutingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Final status of a routed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingStatus {
    Success,
    NoAgentsAvailable,
    AllAgentsFailed,
    Unauthorized,
    TimedOut,
}

impl RoutingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingStatus::Success => "success",
            RoutingStatus::NoAgentsAvailable => "no_agents_available",
            RoutingStatus::AllAgentsFailed => "all_agents_failed",
            RoutingStatus::Unauthorized => "unauthorized",
            RoutingStatus::TimedOut => "timed_out",
        }
    }
}

impl std::fmt::Display for RoutingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A ranked routing candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingCandidate {
    pub agent_id: String,
    pub domain: String,
    pub priority: u32,
    pub score: MatchScore,
    /// Keyword-table tags the agent holds
    pub keyword_hits: usize,
    /// Added only as a supporting domain
    pub cross_domain: bool,
}

impl RoutingCandidate {
    /// Single-number rendering of the rank keys, for display.
    pub fn points(&self) -> u32 {
        self.score
            .points()
            .saturating_add((self.keyword_hits as u32).saturating_mul(5))
    }
}

/// Result of `route_with_priority`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityRoutingResult {
    pub request_id: String,
    pub status: RoutingStatus,
    /// Explanation for unsuccessful outcomes
    pub reason: Option<String>,
    /// Every candidate, best first
    pub candidates: Vec<RoutingCandidate>,
    /// Responses of the dispatched agents, in rank order
    pub responses: Vec<GuidanceResponse>,
    /// Best successful response
    pub primary: Option<GuidanceResponse>,
    pub consistency: Option<ConsistencyValidationResult>,
    /// Resolved response when the dispatched agents disagreed
    pub resolution: Option<GuidanceResponse>,
    pub stages: Vec<RoutingStage>,
    pub routing_time: Duration,
}

impl PriorityRoutingResult {
    fn new(request_id: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            status: RoutingStatus::Success,
            reason: None,
            candidates: Vec::new(),
            responses: Vec::new(),
            primary: None,
            consistency: None,
            resolution: None,
            stages: vec![RoutingStage::Received],
            routing_time: Duration::ZERO,
        }
    }

    fn fail(mut self, status: RoutingStatus, reason: impl Into<String>, started: Instant) -> Self {
        self.status = status;
        self.reason = Some(reason.into());
        self.stages.push(RoutingStage::Failed);
        self.routing_time = started.elapsed();
        self
    }

    pub fn is_successful(&self) -> bool {
        self.status == RoutingStatus::Success
    }

    /// The answer to hand back: the resolution when there is one, else the
    /// primary response.
    pub fn final_response(&self) -> Option<&GuidanceResponse> {
        self.resolution.as_ref().or(self.primary.as_ref())
    }

    /// Ids of the agents that were dispatched.
    pub fn dispatched_agents(&self) -> Vec<&str> {
        self.responses.iter().map(|r| r.agent_id.as_str()).collect()
    }

    pub fn last_stage(&self) -> RoutingStage {
        self.stages.last().copied().unwrap_or(RoutingStage::Received)
    }
}

struct Ranked {
    agent: Arc<dyn Agent>,
    candidate: RoutingCandidate,
    seq: u64,
}

/// Routes requests to the best agents.
pub struct RoutingManager {
    registry: Arc<AgentRegistry>,
    config: RoutingConfig,
    enable_conflict_resolution: bool,
    validator: ConsistencyValidator,
    resolver: ConflictResolver,
    /// Primary responses below this are flagged `low_confidence`
    quality_threshold: f64,
    /// Expected minimum confidence of a domain-matched primary response
    domain_match_floor: f64,
    policy: AccessPolicy,
    audit: Arc<dyn AuditSink>,
}

impl RoutingManager {
    /// Create a router with default configuration over `registry`.
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self::from_config(registry, &AdvisorConfig::default())
    }

    pub fn from_config(registry: Arc<AgentRegistry>, config: &AdvisorConfig) -> Self {
        let audit = registry.audit_sink();
        let collaboration: &CollaborationConfig = &config.collaboration;
        Self {
            registry,
            config: config.routing.clone(),
            enable_conflict_resolution: collaboration.enable_conflict_resolution,
            validator: ConsistencyValidator::new(collaboration.consistency_threshold),
            resolver: ConflictResolver::from_config(config),
            quality_threshold: config.confidence.quality_threshold,
            domain_match_floor: config.confidence.domain_match_floor,
            policy: config.access.policy(),
            audit,
        }
    }

    pub fn with_policy(mut self, policy: AccessPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    fn rank(&self, request: &ConsultationRequest) -> Vec<Ranked> {
        let tags = extract_capabilities(&request.query);
        let supporting = cross_domain_support(&request.domain);

        let mut ranked: Vec<Ranked> = self
            .registry
            .available_entries()
            .into_iter()
            .filter_map(|(agent, seq)| {
                let score = agent.match_score(request);
                let keyword_hits = tags
                    .iter()
                    .filter(|tag| {
                        same_domain(agent.domain(), tag) || agent.profile().has_capability(tag)
                    })
                    .count();
                let cross_domain = !score.is_match()
                    && keyword_hits == 0
                    && supporting.iter().any(|d| {
                        same_domain(agent.domain(), d)
                            || domain_covered_by(d, agent.capabilities())
                    });

                if !score.is_match() && keyword_hits == 0 && !cross_domain {
                    return None;
                }
                let candidate = RoutingCandidate {
                    agent_id: agent.id().to_string(),
                    domain: agent.domain().to_string(),
                    priority: agent.priority(),
                    score,
                    keyword_hits,
                    cross_domain,
                };
                Some(Ranked {
                    agent,
                    candidate,
                    seq,
                })
            })
            .collect();

        ranked.sort_by(|a, b| {
            let (x, y) = (&a.candidate, &b.candidate);
            y.score
                .cmp(&x.score)
                .then(y.keyword_hits.cmp(&x.keyword_hits))
                .then(y.priority.cmp(&x.priority))
                .then(a.seq.cmp(&b.seq))
        });
        ranked
    }

    /// Ranked candidates for a request, before access filtering.
    pub fn find_candidates(&self, request: &ConsultationRequest) -> Vec<RoutingCandidate> {
        self.rank(request).into_iter().map(|r| r.candidate).collect()
    }

    /// Route a request to its top-ranked agents.
    ///
    /// Never fails: every outcome, including a refused caller, an empty
    /// candidate list and a missed budget, is reported through the result
    /// status.
    pub async fn route_with_priority(&self, request: &ConsultationRequest) -> PriorityRoutingResult {
        let started = Instant::now();
        let budget = self.config.budget();
        let mut result = PriorityRoutingResult::new(&request.request_id);
        debug!(request_id = %request.request_id, domain = %request.domain, "Routing request");

        let role = match self.policy.authorize(request, &request.domain) {
            Ok(role) => role,
            Err(err) => {
                warn!(request_id = %request.request_id, "Routing rejected: {}", err);
                self.audit.record(AuditEvent::rejection(
                    ROUTER_AGENT_ID,
                    &request.request_id,
                    &err,
                ));
                return result.fail(RoutingStatus::Unauthorized, err.to_string(), started);
            }
        };

        result.stages.push(RoutingStage::CandidateSelection);
        let ranked = self.rank(request);
        let before = ranked.len();
        let ranked: Vec<Ranked> = ranked
            .into_iter()
            .filter(|r| self.policy.is_allowed(role, &r.candidate.domain))
            .collect();
        if ranked.len() < before {
            debug!(
                "Dropped {} candidate(s) in domains restricted for {}",
                before - ranked.len(),
                role
            );
        }
        result.candidates = ranked.iter().map(|r| r.candidate.clone()).collect();

        if ranked.is_empty() {
            let err = AdvisorError::NoCandidateAgent {
                request_id: request.request_id.clone(),
                domain: request.domain.clone(),
            };
            info!(request_id = %request.request_id, "{}", err);
            self.audit.record(
                AuditEvent::new(
                    ROUTER_AGENT_ID,
                    &request.request_id,
                    AuditOutcome::Failure,
                    started.elapsed(),
                )
                .with_error(err.to_string()),
            );
            return result.fail(
                RoutingStatus::NoAgentsAvailable,
                format!("No agent available for domain: {}", request.domain),
                started,
            );
        }

        let selected: Vec<Arc<dyn Agent>> = ranked
            .iter()
            .take(self.config.max_dispatch)
            .map(|r| Arc::clone(&r.agent))
            .collect();
        result.stages.push(RoutingStage::Dispatched);

        let remaining = budget
            .saturating_sub(started.elapsed())
            .max(Duration::from_millis(1));
        let shared = Arc::new(request.clone());
        let outcome = dispatch::dispatch(&selected, &shared, remaining).await;

        for (response, agent) in outcome.responses.iter().zip(&selected) {
            let event = if outcome.timed_out.iter().any(|id| id == agent.id()) {
                AuditEvent::new(
                    agent.id(),
                    &request.request_id,
                    AuditOutcome::TimedOut,
                    response.processing_time,
                )
                .with_error(
                    AdvisorError::timeout(format!("consult {}", agent.id()), remaining).to_string(),
                )
            } else {
                AuditEvent::from_response(response)
            };
            self.audit.record(event);
        }

        let timed_out = outcome.timed_out.len();
        result.responses = outcome.responses;
        let successful: Vec<GuidanceResponse> = result
            .responses
            .iter()
            .filter(|r| r.is_successful())
            .cloned()
            .collect();

        if successful.is_empty() {
            let (status, reason) = if timed_out == selected.len() {
                (
                    RoutingStatus::TimedOut,
                    format!("All agents exceeded the {:?} routing budget", budget),
                )
            } else {
                (
                    RoutingStatus::AllAgentsFailed,
                    "All dispatched agents failed".to_string(),
                )
            };
            warn!(request_id = %request.request_id, "{}", reason);
            return result.fail(status, reason, started);
        }

        result.primary = successful.first().cloned().map(|primary| {
            let domain_matched = ranked
                .iter()
                .any(|r| r.agent.id() == primary.agent_id && same_domain(r.agent.domain(), &request.domain));
            if domain_matched && primary.confidence < self.domain_match_floor {
                warn!(
                    agent_id = %primary.agent_id,
                    confidence = primary.confidence,
                    "Domain-matched response below the confidence floor"
                );
            }
            if primary.confidence < self.quality_threshold {
                debug!(
                    agent_id = %primary.agent_id,
                    confidence = primary.confidence,
                    "Primary response below quality threshold"
                );
                primary.with_metadata("low_confidence", true)
            } else {
                primary
            }
        });
        if successful.len() > 1 {
            result.stages.push(RoutingStage::ConsistencyCheck);
            let consistency = self.validator.validate(&successful);
            if !consistency.is_consistent && self.enable_conflict_resolution {
                result.resolution = Some(self.resolver.resolve_with(request, &successful, &consistency));
            }
            result.consistency = Some(consistency);
        }

        result.stages.push(RoutingStage::Resolved);
        result.routing_time = started.elapsed();
        if result.routing_time > budget {
            warn!(
                request_id = %request.request_id,
                "Routing took {:?}, over the {:?} budget",
                result.routing_time,
                budget
            );
        }
        info!(
            request_id = %request.request_id,
            agents = ?result.dispatched_agents(),
            elapsed_ms = result.routing_time.as_millis() as u64,
            "Routed request"
        );
        result
    }
}

impl std::fmt::Debug for RoutingManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingManager")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::security::CallerRole;
    use advisor_agents::ScriptedAgent;

    fn registry(agents: Vec<ScriptedAgent>) -> Arc<AgentRegistry> {
        let registry = AgentRegistry::new();
        for agent in agents {
            registry.register_agent(Arc::new(agent));
        }
        Arc::new(registry)
    }

    #[test]
    fn test_extract_capabilities() {
        let tags = extract_capabilities("Configure Kafka consumers with retries and a circuit breaker");
        assert!(tags.contains("event-driven"));
        assert!(tags.contains("resilience"));
        assert!(!tags.contains("security"));

        assert!(extract_capabilities("hello world").is_empty());
    }

    #[test]
    fn test_candidate_ranking() {
        let registry = registry(vec![
            ScriptedAgent::new("resilience", "resilience").with_capabilities(["retry-patterns"]),
            ScriptedAgent::new("impl-low", "implementation").with_priority(10),
            ScriptedAgent::new("impl-high", "implementation").with_priority(90),
            ScriptedAgent::new("security", "security"),
            ScriptedAgent::new("docs", "documentation"),
        ]);
        let router = RoutingManager::new(registry);
        let request = ConsultationRequest::new("implementation", "Add a retry around the payment call");

        let ids: Vec<String> = router
            .find_candidates(&request)
            .into_iter()
            .map(|c| c.agent_id)
            .collect();

        assert_eq!(ids, vec!["impl-high", "impl-low", "resilience", "security"]);
    }

    #[tokio::test]
    async fn test_route_dispatches_top_agents() {
        let registry = registry(vec![
            ScriptedAgent::new("sec-a", "security").with_priority(90),
            ScriptedAgent::new("sec-b", "security").with_priority(80),
            ScriptedAgent::new("sec-c", "security").with_priority(70),
            ScriptedAgent::new("sec-d", "security").with_priority(60),
        ]);
        let router = RoutingManager::new(registry);
        let request = ConsultationRequest::new("security", "JWT validation");

        let result = router.route_with_priority(&request).await;

        assert!(result.is_successful());
        assert_eq!(result.dispatched_agents(), vec!["sec-a", "sec-b", "sec-c"]);
        assert_eq!(result.primary.as_ref().unwrap().agent_id, "sec-a");
        assert!(result.consistency.as_ref().unwrap().is_consistent);
        assert!(result.resolution.is_none());
        assert_eq!(
            result.stages,
            vec![
                RoutingStage::Received,
                RoutingStage::CandidateSelection,
                RoutingStage::Dispatched,
                RoutingStage::ConsistencyCheck,
                RoutingStage::Resolved,
            ]
        );
    }

    #[tokio::test]
    async fn test_route_without_candidates() {
        let router = RoutingManager::new(registry(vec![ScriptedAgent::new("docs", "documentation")]));
        let request = ConsultationRequest::new("astrology", "read my stars");

        let result = router.route_with_priority(&request).await;

        assert_eq!(result.status, RoutingStatus::NoAgentsAvailable);
        assert!(result.reason.as_ref().unwrap().contains("astrology"));
        assert_eq!(result.last_stage(), RoutingStage::Failed);
        assert!(result.final_response().is_none());
    }

    #[tokio::test]
    async fn test_route_rejects_guest_for_restricted_domain() {
        let sink = MemoryAuditSink::new();
        let router = RoutingManager::new(registry(vec![ScriptedAgent::new("sec", "security")]))
            .with_audit_sink(Arc::new(sink.clone()));
        let request = ConsultationRequest::new("security", "JWT validation")
            .with_context_entry("role", "guest");

        let result = router.route_with_priority(&request).await;

        assert_eq!(result.status, RoutingStatus::Unauthorized);
        let rejected = sink.with_outcome(AuditOutcome::Rejected);
        assert_eq!(rejected.len(), 1);
        assert!(rejected[0].error.as_deref().unwrap().contains("guest"));
    }

    #[tokio::test]
    async fn test_restricted_candidates_are_filtered() {
        let registry = registry(vec![
            ScriptedAgent::new("impl", "implementation"),
            ScriptedAgent::new("gov", "governance").with_capabilities(["technical-debt"]),
        ]);
        let router = RoutingManager::new(registry);
        let request = ConsultationRequest::new("implementation", "Reduce technical debt")
            .with_context_entry("role", CallerRole::Developer.as_str());

        let result = router.route_with_priority(&request).await;

        assert!(result.is_successful());
        assert_eq!(result.dispatched_agents(), vec!["impl"]);
    }

    #[tokio::test]
    async fn test_route_times_out() {
        let registry = registry(vec![
            ScriptedAgent::new("slow", "testing").with_delay(Duration::from_secs(5)),
        ]);
        let config = AdvisorConfig::default().with_routing_budget(Duration::from_millis(100));
        let router = RoutingManager::from_config(registry, &config);
        let request = ConsultationRequest::new("testing", "unit tests");

        let result = router.route_with_priority(&request).await;

        assert_eq!(result.status, RoutingStatus::TimedOut);
        assert!(result.routing_time < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_route_all_failed() {
        let registry = registry(vec![ScriptedAgent::new("broken", "testing").simulate_failure("boom")]);
        let router = RoutingManager::new(registry);
        let request = ConsultationRequest::new("testing", "unit tests");

        let result = router.route_with_priority(&request).await;

        assert_eq!(result.status, RoutingStatus::AllAgentsFailed);
        assert_eq!(result.responses.len(), 1);
    }

    #[tokio::test]
    async fn test_conflicting_agents_are_resolved() {
        let registry = registry(vec![
            ScriptedAgent::new("data-a", "storage")
                .with_confidence(0.92)
                .with_recommendations(["Keep orders in a SQL database"]),
            ScriptedAgent::new("data-b", "storage")
                .with_confidence(0.9)
                .with_recommendations(["Keep orders in a NoSQL store"]),
        ]);
        let router = RoutingManager::new(registry);
        let request = ConsultationRequest::new("storage", "Where do orders live?");

        let result = router.route_with_priority(&request).await;

        assert!(result.is_successful());
        assert!(!result.consistency.as_ref().unwrap().is_consistent);
        let resolved = result.final_response().unwrap();
        assert_eq!(resolved.agent_id, crate::conflict::RESOLVER_AGENT_ID);
        assert!(resolved.confidence >= 0.92);
    }

    #[tokio::test]
    async fn test_low_confidence_primary_is_flagged() {
        let registry = registry(vec![ScriptedAgent::new("unsure", "testing").with_confidence(0.6)]);
        let router = RoutingManager::new(registry);
        let request = ConsultationRequest::new("testing", "flaky tests");

        let result = router.route_with_priority(&request).await;

        let primary = result.primary.unwrap();
        assert_eq!(primary.metadata["low_confidence"], true);
    }
}
