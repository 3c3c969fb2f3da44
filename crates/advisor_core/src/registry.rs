//! Agent registry for managing agent implementations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use advisor_agents::matching::{domain_covered_by, same_domain};
use advisor_agents::{Agent, ConsultationRequest, GuidanceResponse, MatchScore, MetricsSnapshot};

use crate::audit::{AuditEvent, AuditSink, TracingAuditSink};
use crate::config::RegistryConfig;
use crate::dependency::DependencyGraph;
use crate::dispatch;
use crate::error::AdvisorResult;

/// Agent id used on responses the registry produces itself.
pub const REGISTRY_AGENT_ID: &str = "registry";

#[derive(Clone)]
struct Entry {
    agent: Arc<dyn Agent>,
    /// Registration order; kept when an id is re-registered
    seq: u64,
}

/// An agent together with its fit for one request.
#[derive(Clone)]
pub struct RankedAgent {
    pub agent: Arc<dyn Agent>,
    pub score: MatchScore,
    pub seq: u64,
}

impl RankedAgent {
    pub fn id(&self) -> &str {
        self.agent.id()
    }

    pub fn priority(&self) -> u32 {
        self.agent.priority()
    }
}

impl std::fmt::Debug for RankedAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RankedAgent")
            .field("id", &self.id())
            .field("score", &self.score)
            .field("priority", &self.priority())
            .field("seq", &self.seq)
            .finish()
    }
}

/// Order candidates best first: match score, then declared priority, then
/// registration order.
pub(crate) fn rank(candidates: &mut [RankedAgent]) {
    candidates.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(b.priority().cmp(&a.priority()))
            .then(a.seq.cmp(&b.seq))
    });
}

/// Availability summary of the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryHealth {
    pub total_agents: usize,
    pub available_agents: usize,
    pub unavailable: Vec<String>,
    /// Available fraction; 0 for an empty registry
    pub availability_ratio: f64,
    pub metrics: Vec<(String, MetricsSnapshot)>,
}

impl RegistryHealth {
    pub fn is_healthy(&self) -> bool {
        self.total_agents > 0 && self.unavailable.is_empty()
    }
}

/// A registry of agent implementations.
///
/// The registry maps agent ids to their implementations and is the only
/// state shared across requests. Registration may run concurrently with
/// lookups; readers always see a consistent snapshot.
pub struct AgentRegistry {
    agents: RwLock<HashMap<String, Entry>>,
    next_seq: AtomicU64,
    config: RegistryConfig,
    max_backups: usize,
    audit: Arc<dyn AuditSink>,
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            config: RegistryConfig::default(),
            max_backups: 3,
            audit: Arc::new(TracingAuditSink),
        }
    }

    pub fn with_config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_max_backups(mut self, max_backups: usize) -> Self {
        self.max_backups = max_backups;
        self
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub(crate) fn audit_sink(&self) -> Arc<dyn AuditSink> {
        Arc::clone(&self.audit)
    }

    /// Register an agent under its id.
    ///
    /// Re-registering an id replaces the previous agent but keeps its
    /// original registration position.
    pub fn register_agent(&self, agent: Arc<dyn Agent>) {
        let id = agent.id().to_string();
        let mut agents = self.agents.write();
        match agents.get_mut(&id) {
            Some(entry) => {
                debug!(agent_id = %id, "Replacing registered agent");
                entry.agent = agent;
            }
            None => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                debug!(agent_id = %id, domain = %agent.domain(), seq, "Agent registered");
                agents.insert(id, Entry { agent, seq });
            }
        }
    }

    /// Remove an agent from the registry.
    pub fn unregister_agent(&self, id: &str) -> Option<Arc<dyn Agent>> {
        debug!(agent_id = %id, "Unregistering agent");
        self.agents.write().remove(id).map(|e| e.agent)
    }

    /// Get an agent by id.
    pub fn get_agent(&self, id: &str) -> Option<Arc<dyn Agent>> {
        self.agents.read().get(id).map(|e| Arc::clone(&e.agent))
    }

    /// Check if an agent is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.agents.read().contains_key(id)
    }

    /// Get the number of registered agents.
    pub fn len(&self) -> usize {
        self.agents.read().len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.agents.read().is_empty()
    }

    fn entries(&self) -> Vec<Entry> {
        let mut entries: Vec<Entry> = self.agents.read().values().cloned().collect();
        entries.sort_by_key(|e| e.seq);
        entries
    }

    /// Available agents with their registration sequence numbers.
    pub(crate) fn available_entries(&self) -> Vec<(Arc<dyn Agent>, u64)> {
        self.entries()
            .into_iter()
            .filter(|e| e.agent.is_available())
            .map(|e| (e.agent, e.seq))
            .collect()
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> Vec<String> {
        self.entries()
            .iter()
            .map(|e| e.agent.id().to_string())
            .collect()
    }

    /// All agents in registration order.
    pub fn all_agents(&self) -> Vec<Arc<dyn Agent>> {
        self.entries().into_iter().map(|e| e.agent).collect()
    }

    /// Available agents in registration order.
    pub fn available_agents(&self) -> Vec<Arc<dyn Agent>> {
        self.all_agents()
            .into_iter()
            .filter(|a| a.is_available())
            .collect()
    }

    fn warn_if_slow(&self, operation: &str, started: Instant) {
        let elapsed = started.elapsed();
        if elapsed > self.config.discovery_timeout() {
            warn!(
                "{} took {:?}, over the {:?} discovery budget",
                operation,
                elapsed,
                self.config.discovery_timeout()
            );
        }
    }

    /// Available agents serving a domain, either as their own domain or
    /// through a capability such as `performance-monitoring` for
    /// `performance`.
    pub fn agents_for_domain(&self, domain: &str) -> Vec<Arc<dyn Agent>> {
        let started = Instant::now();
        let agents: Vec<Arc<dyn Agent>> = self
            .available_agents()
            .into_iter()
            .filter(|a| same_domain(a.domain(), domain) || domain_covered_by(domain, a.capabilities()))
            .collect();
        self.warn_if_slow("agents_for_domain", started);
        agents
    }

    /// Available agents able to handle the request, best first.
    pub fn rank_candidates(&self, request: &ConsultationRequest) -> Vec<RankedAgent> {
        let mut candidates: Vec<RankedAgent> = self
            .entries()
            .into_iter()
            .filter(|e| e.agent.is_available())
            .filter_map(|e| {
                let score = e.agent.match_score(request);
                score.is_match().then(|| RankedAgent {
                    agent: e.agent,
                    score,
                    seq: e.seq,
                })
            })
            .collect();
        rank(&mut candidates);
        candidates
    }

    /// The best available agent for a request.
    pub fn find_best_agent(&self, request: &ConsultationRequest) -> Option<Arc<dyn Agent>> {
        let started = Instant::now();
        let best = self
            .rank_candidates(request)
            .into_iter()
            .next()
            .map(|r| r.agent);
        self.warn_if_slow("find_best_agent", started);

        match &best {
            Some(agent) => debug!(
                request_id = %request.request_id,
                agent_id = %agent.id(),
                "Selected best agent"
            ),
            None => debug!(
                request_id = %request.request_id,
                domain = %request.domain,
                "No agent can handle request"
            ),
        }
        best
    }

    /// Agents declaring a capability matching `capability`
    /// (case-insensitive substring), in registration order.
    pub fn find_agents_by_capability(&self, capability: &str) -> Vec<Arc<dyn Agent>> {
        self.all_agents()
            .into_iter()
            .filter(|a| a.profile().has_capability(capability))
            .collect()
    }

    /// Consult the best agent for a request.
    ///
    /// Resolves to a FAILURE response when no agent matches or the agent
    /// misses the consultation timeout.
    pub async fn consult_best_agent(&self, request: &ConsultationRequest) -> GuidanceResponse {
        let Some(agent) = self.find_best_agent(request) else {
            let response = GuidanceResponse::failure(
                &request.request_id,
                REGISTRY_AGENT_ID,
                format!("No suitable agent found for domain: {}", request.domain),
            );
            self.audit.record(AuditEvent::from_response(&response));
            return response;
        };

        let request = Arc::new(request.clone());
        let (response, timed_out) =
            dispatch::consult(&agent, &request, self.config.consultation_timeout()).await;
        if timed_out {
            warn!(agent_id = %agent.id(), "Consultation timed out");
        }
        self.audit.record(AuditEvent::from_response(&response));
        response
    }

    /// Up to `max_backups` available agents that share the domain or a
    /// capability with `agent_id`, in registration order.
    pub fn backup_agents(&self, agent_id: &str) -> Vec<Arc<dyn Agent>> {
        let Some(primary) = self.get_agent(agent_id) else {
            return Vec::new();
        };
        self.available_agents()
            .into_iter()
            .filter(|a| a.id() != agent_id)
            .filter(|a| {
                same_domain(a.domain(), primary.domain())
                    || a.profile().shares_capability(primary.profile())
            })
            .take(self.max_backups)
            .collect()
    }

    /// Availability summary.
    pub fn health(&self) -> RegistryHealth {
        let agents = self.all_agents();
        let total = agents.len();
        let unavailable: Vec<String> = agents
            .iter()
            .filter(|a| !a.is_available())
            .map(|a| a.id().to_string())
            .collect();
        let available = total - unavailable.len();
        let metrics = agents
            .iter()
            .filter_map(|a| a.metrics().map(|m| (a.id().to_string(), m)))
            .collect();

        RegistryHealth {
            total_agents: total,
            available_agents: available,
            unavailable,
            availability_ratio: if total == 0 {
                0.0
            } else {
                available as f64 / total as f64
            },
            metrics,
        }
    }

    /// Dependency graph of the registered agents.
    pub fn dependency_graph(&self) -> DependencyGraph {
        DependencyGraph::from_agents(&self.all_agents())
    }

    /// Check every declared dependency is registered and the graph is
    /// acyclic. Returns the initialization order.
    pub fn validate_dependencies(&self) -> AdvisorResult<Vec<String>> {
        let graph = self.dependency_graph();
        graph.check_missing()?;
        let order = graph.topological_order()?;
        info!("Validated dependencies of {} agents", order.len());
        Ok(order)
    }

    /// Time budget for registry discovery calls.
    pub fn discovery_timeout(&self) -> Duration {
        self.config.discovery_timeout()
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_agents::{ResponseStatus, ScriptedAgent};

    fn scripted(id: &str, domain: &str, caps: &[&str]) -> Arc<dyn Agent> {
        Arc::new(ScriptedAgent::new(id, domain).with_capabilities(caps.iter().copied()))
    }

    #[test]
    fn test_registry_register() {
        let registry = AgentRegistry::new();
        assert!(registry.is_empty());

        registry.register_agent(scripted("security-1", "security", &["jwt"]));

        assert_eq!(registry.len(), 1);
        assert!(registry.contains("security-1"));
        assert!(registry.get_agent("security-1").is_some());
        assert!(registry.get_agent("nonexistent").is_none());
    }

    #[test]
    fn test_reregister_replaces_and_keeps_position() {
        let registry = AgentRegistry::new();
        registry.register_agent(scripted("a", "testing", &[]));
        registry.register_agent(scripted("b", "testing", &[]));
        registry.register_agent(scripted("a", "security", &[]));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ids(), vec!["a", "b"]);
        assert_eq!(registry.get_agent("a").unwrap().domain(), "security");
    }

    #[test]
    fn test_agents_for_domain_filters_unavailable() {
        let registry = AgentRegistry::new();
        registry.register_agent(scripted("obs", "observability", &["performance-monitoring"]));
        registry.register_agent(Arc::new(
            ScriptedAgent::new("perf-down", "performance").set_available(false),
        ));

        let agents = registry.agents_for_domain("performance");
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].id(), "obs");
    }

    #[test]
    fn test_find_best_agent_prefers_domain_then_priority() {
        let registry = AgentRegistry::new();
        registry.register_agent(scripted("gateway", "integration", &["jwt", "api-gateway"]));
        registry.register_agent(scripted("security", "security", &["jwt"]));

        let request = ConsultationRequest::new("security", "JWT for the api gateway");
        assert_eq!(registry.find_best_agent(&request).unwrap().id(), "security");

        let registry = AgentRegistry::new();
        registry.register_agent(Arc::new(ScriptedAgent::new("low", "testing").with_priority(10)));
        registry.register_agent(Arc::new(ScriptedAgent::new("high", "testing").with_priority(90)));
        let request = ConsultationRequest::new("testing", "unit tests");
        assert_eq!(registry.find_best_agent(&request).unwrap().id(), "high");
    }

    #[test]
    fn test_find_best_agent_tie_breaks_by_registration() {
        let registry = AgentRegistry::new();
        registry.register_agent(scripted("second", "testing", &[]));
        registry.register_agent(scripted("first", "testing", &[]));

        let request = ConsultationRequest::new("testing", "unit tests");
        assert_eq!(registry.find_best_agent(&request).unwrap().id(), "second");
    }

    #[test]
    fn test_find_agents_by_capability() {
        let registry = AgentRegistry::new();
        registry.register_agent(scripted("sec", "security", &["spring-security", "jwt"]));
        registry.register_agent(scripted("impl", "implementation", &["spring-boot"]));

        assert_eq!(registry.find_agents_by_capability("SPRING").len(), 2);
        assert_eq!(registry.find_agents_by_capability("jwt").len(), 1);
        assert!(registry.find_agents_by_capability("kafka").is_empty());
    }

    #[tokio::test]
    async fn test_consult_without_candidates_fails() {
        let registry = AgentRegistry::new();
        let request = ConsultationRequest::new("astrology", "read my stars");

        let response = registry.consult_best_agent(&request).await;

        assert_eq!(response.status, ResponseStatus::Failure);
        assert_eq!(response.agent_id, REGISTRY_AGENT_ID);
        assert_eq!(response.request_id, request.request_id);
    }

    #[tokio::test]
    async fn test_consult_times_out() {
        let registry = AgentRegistry::new().with_config(RegistryConfig {
            discovery_timeout_ms: 1000,
            consultation_timeout_ms: 50,
        });
        registry.register_agent(Arc::new(
            ScriptedAgent::new("slow", "testing").with_delay(Duration::from_secs(2)),
        ));

        let request = ConsultationRequest::new("testing", "unit tests");
        let response = registry.consult_best_agent(&request).await;

        assert_eq!(response.status, ResponseStatus::Failure);
        assert_eq!(response.metadata.get("timed_out"), Some(&serde_json::Value::Bool(true)));
    }

    #[test]
    fn test_backup_agents() {
        let registry = AgentRegistry::new().with_max_backups(2);
        registry.register_agent(scripted("primary", "security", &["jwt"]));
        registry.register_agent(scripted("same-domain", "security", &[]));
        registry.register_agent(scripted("shares-cap", "integration", &["jwt"]));
        registry.register_agent(scripted("other-cap", "security", &["tls"]));
        registry.register_agent(scripted("unrelated", "documentation", &["readme"]));

        let backups: Vec<String> = registry
            .backup_agents("primary")
            .iter()
            .map(|a| a.id().to_string())
            .collect();
        assert_eq!(backups, vec!["same-domain", "shares-cap"]);
        assert!(registry.backup_agents("missing").is_empty());
    }

    #[test]
    fn test_health() {
        let registry = AgentRegistry::new();
        assert_eq!(registry.health().availability_ratio, 0.0);

        registry.register_agent(scripted("up", "testing", &[]));
        registry.register_agent(Arc::new(ScriptedAgent::new("down", "testing").set_available(false)));

        let health = registry.health();
        assert_eq!(health.total_agents, 2);
        assert_eq!(health.available_agents, 1);
        assert_eq!(health.unavailable, vec!["down"]);
        assert_eq!(health.availability_ratio, 0.5);
        assert!(!health.is_healthy());
    }
}
