//! Failover between a primary agent and its backups.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use advisor_agents::{Agent, ConsultationRequest, GuidanceResponse, ResponseStatus};

use crate::audit::{AuditEvent, AuditOutcome, AuditSink};
use crate::config::{AdvisorConfig, FailoverConfig};
use crate::dispatch;
use crate::registry::{AgentRegistry, REGISTRY_AGENT_ID};

/// Failure bookkeeping snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailoverStats {
    /// Agents currently excluded from primary selection
    pub failed_agents: Vec<String>,
    pub total_failures: u64,
    pub total_recoveries: u64,
}

#[derive(Debug, Default)]
struct FailureState {
    consecutive: HashMap<String, u32>,
    failed: BTreeSet<String>,
    total_failures: u64,
    total_recoveries: u64,
}

/// Consults the best agent and falls back to its backups on failure.
///
/// An agent that fails `failure_threshold` times in a row is marked failed
/// and skipped until it succeeds again as a backup or is recovered
/// explicitly.
pub struct FailoverManager {
    registry: Arc<AgentRegistry>,
    config: FailoverConfig,
    consultation_timeout: Duration,
    state: Mutex<FailureState>,
    audit: Arc<dyn AuditSink>,
}

impl FailoverManager {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self::from_config(registry, &AdvisorConfig::default())
    }

    pub fn from_config(registry: Arc<AgentRegistry>, config: &AdvisorConfig) -> Self {
        let audit = registry.audit_sink();
        Self {
            consultation_timeout: registry.config().consultation_timeout(),
            registry,
            config: config.failover.clone(),
            state: Mutex::new(FailureState::default()),
            audit,
        }
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn is_failed(&self, agent_id: &str) -> bool {
        self.state.lock().failed.contains(agent_id)
    }

    /// Record a failed consultation. Returns true when the agent has just
    /// crossed the failure threshold.
    pub fn record_failure(&self, agent_id: &str) -> bool {
        let mut state = self.state.lock();
        state.total_failures += 1;
        let count = state.consecutive.entry(agent_id.to_string()).or_insert(0);
        *count += 1;
        let count = *count;
        if count >= self.config.failure_threshold && state.failed.insert(agent_id.to_string()) {
            warn!(agent_id, failures = count, "Agent marked as failed");
            return true;
        }
        false
    }

    /// Record a successful consultation; a failed agent recovers.
    pub fn record_success(&self, agent_id: &str) {
        let mut state = self.state.lock();
        state.consecutive.remove(agent_id);
        if state.failed.remove(agent_id) {
            state.total_recoveries += 1;
            info!(agent_id, "Agent recovered");
        }
    }

    /// Put a failed agent back into rotation.
    pub fn mark_recovered(&self, agent_id: &str) {
        self.record_success(agent_id);
    }

    pub fn stats(&self) -> FailoverStats {
        let state = self.state.lock();
        FailoverStats {
            failed_agents: state.failed.iter().cloned().collect(),
            total_failures: state.total_failures,
            total_recoveries: state.total_recoveries,
        }
    }

    fn chain(&self, request: &ConsultationRequest) -> Vec<Arc<dyn Agent>> {
        let Some(primary) = self
            .registry
            .rank_candidates(request)
            .into_iter()
            .map(|r| r.agent)
            .find(|a| !self.is_failed(a.id()))
        else {
            return Vec::new();
        };
        if !self.config.enabled {
            return vec![primary];
        }

        let backups = self
            .registry
            .backup_agents(primary.id())
            .into_iter()
            .filter(|a| !self.is_failed(a.id()))
            .take(self.config.max_backups);
        std::iter::once(primary).chain(backups).collect()
    }

    /// Consult the best agent, trying its backups in order until one
    /// succeeds.
    pub async fn consult_with_failover(&self, request: &ConsultationRequest) -> GuidanceResponse {
        let chain = self.chain(request);
        let Some(primary_id) = chain.first().map(|a| a.id().to_string()) else {
            let response = GuidanceResponse::failure(
                &request.request_id,
                REGISTRY_AGENT_ID,
                format!("No suitable agent found for domain: {}", request.domain),
            );
            self.audit.record(AuditEvent::from_response(&response));
            return response;
        };

        let shared = Arc::new(request.clone());
        let mut last = None;
        for (attempt, agent) in chain.iter().enumerate() {
            let (response, timed_out) =
                dispatch::consult(agent, &shared, self.consultation_timeout).await;
            let event = if timed_out {
                AuditEvent::new(
                    agent.id(),
                    &request.request_id,
                    AuditOutcome::TimedOut,
                    response.processing_time,
                )
            } else {
                AuditEvent::from_response(&response)
            };
            self.audit.record(event);

            match response.status {
                ResponseStatus::Success => {
                    self.record_success(agent.id());
                    let mut response = response.with_metadata("failover_attempts", attempt);
                    if attempt > 0 {
                        info!(
                            request_id = %request.request_id,
                            from = %primary_id,
                            to = %agent.id(),
                            "Failed over to backup agent"
                        );
                        response = response.with_metadata("failed_over_from", primary_id.clone());
                    }
                    return response;
                }
                // A request problem, not an agent problem.
                ResponseStatus::InsufficientContext => return response,
                ResponseStatus::Escalation => {
                    debug!(agent_id = %agent.id(), "Agent escalated, trying next");
                }
                ResponseStatus::Failure => {
                    self.record_failure(agent.id());
                }
            }
            last = Some(response);
        }

        warn!(request_id = %request.request_id, "Every agent in the failover chain failed");
        last.map(|r| r.with_metadata("failover_exhausted", true))
            .unwrap_or_else(|| {
                GuidanceResponse::failure(&request.request_id, REGISTRY_AGENT_ID, "Failover chain empty")
            })
    }
}

impl std::fmt::Debug for FailoverManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailoverManager")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use advisor_agents::ScriptedAgent;

    fn setup(agents: &[ScriptedAgent]) -> FailoverManager {
        let registry = AgentRegistry::new();
        for agent in agents {
            registry.register_agent(Arc::new(agent.clone()));
        }
        FailoverManager::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_primary_success() {
        let primary = ScriptedAgent::new("sec-1", "security").with_priority(90);
        let manager = setup(&[primary.clone(), ScriptedAgent::new("sec-2", "security")]);

        let response = manager
            .consult_with_failover(&ConsultationRequest::new("security", "JWT"))
            .await;

        assert!(response.is_successful());
        assert_eq!(response.agent_id, "sec-1");
        assert_eq!(response.metadata["failover_attempts"], 0);
    }

    #[tokio::test]
    async fn test_fails_over_to_backup() {
        let primary = ScriptedAgent::new("sec-1", "security")
            .with_priority(90)
            .simulate_failure("down");
        let backup = ScriptedAgent::new("sec-2", "security");
        let manager = setup(&[primary.clone(), backup.clone()]);

        let response = manager
            .consult_with_failover(&ConsultationRequest::new("security", "JWT"))
            .await;

        assert!(response.is_successful());
        assert_eq!(response.agent_id, "sec-2");
        assert_eq!(response.metadata["failed_over_from"], "sec-1");
        assert_eq!(primary.call_count(), 1);
        assert_eq!(manager.stats().total_failures, 1);
    }

    #[tokio::test]
    async fn test_threshold_marks_failed_and_recovery() {
        let primary = ScriptedAgent::new("sec-1", "security")
            .with_priority(90)
            .simulate_failure("down");
        let manager = setup(&[primary.clone(), ScriptedAgent::new("sec-2", "security")]);
        let request = ConsultationRequest::new("security", "JWT");

        for _ in 0..3 {
            manager.consult_with_failover(&request).await;
        }
        assert!(manager.is_failed("sec-1"));
        assert_eq!(manager.stats().failed_agents, vec!["sec-1"]);

        // Failed agents are skipped as primary.
        manager.consult_with_failover(&request).await;
        assert_eq!(primary.call_count(), 3);

        primary.recover();
        manager.mark_recovered("sec-1");
        let response = manager.consult_with_failover(&request).await;
        assert_eq!(response.agent_id, "sec-1");
        assert_eq!(manager.stats().total_recoveries, 1);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let registry = AgentRegistry::new().with_config(RegistryConfig {
            discovery_timeout_ms: 1000,
            consultation_timeout_ms: 50,
        });
        registry.register_agent(Arc::new(
            ScriptedAgent::new("slow", "testing")
                .with_priority(90)
                .with_delay(Duration::from_secs(2)),
        ));
        registry.register_agent(Arc::new(ScriptedAgent::new("fast", "testing")));
        let manager = FailoverManager::new(Arc::new(registry));

        let response = manager
            .consult_with_failover(&ConsultationRequest::new("testing", "unit tests"))
            .await;

        assert_eq!(response.agent_id, "fast");
        assert_eq!(manager.stats().total_failures, 1);
    }

    #[tokio::test]
    async fn test_exhausted_chain() {
        let manager = setup(&[ScriptedAgent::new("only", "testing").simulate_failure("down")]);

        let response = manager
            .consult_with_failover(&ConsultationRequest::new("testing", "unit tests"))
            .await;

        assert_eq!(response.status, ResponseStatus::Failure);
        assert_eq!(response.metadata["failover_exhausted"], true);
    }

    #[tokio::test]
    async fn test_no_candidate() {
        let manager = setup(&[]);
        let response = manager
            .consult_with_failover(&ConsultationRequest::new("astrology", "stars"))
            .await;
        assert_eq!(response.agent_id, REGISTRY_AGENT_ID);
        assert_eq!(response.status, ResponseStatus::Failure);
    }
}
