//! Multi-agent collaboration.
//!
//! A collaboration consults an explicit list of agents concurrently, checks
//! their answers against each other and packages everything into one
//! [`CollaborativeGuidanceResponse`]. The collaboration succeeds only when
//! every participant succeeded and the answers are consistent.
//!
//! Participants receive the request marked as collaborative, so an invited
//! agent contributes supporting guidance even outside its own domain.
//! Agents whose domain the caller may not consult are left out before the
//! round starts.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use advisor_agents::matching::same_domain;
use advisor_agents::{Agent, ConsultationRequest, GuidanceResponse};

use crate::audit::{AuditEvent, AuditOutcome, AuditSink};
use crate::config::{AdvisorConfig, CollaborationConfig};
use crate::conflict::ConflictResolver;
use crate::consistency::{ConsistencyValidationResult, ConsistencyValidator};
use crate::dependency::cross_domain_support;
use crate::dispatch;
use crate::error::AdvisorError;
use crate::registry::AgentRegistry;
use crate::security::{AccessPolicy, CallerRole};

/// Fixed workflows, by agent id.
const WORKFLOWS: &[(&str, &[&str])] = &[
    (
        "microservice-development",
        &[
            "architecture-agent",
            "implementation-agent",
            "integration-gateway-agent",
            "testing-agent",
        ],
    ),
    (
        "deployment-pipeline",
        &[
            "deployment-agent",
            "cicd-pipeline-agent",
            "security-agent",
            "observability-agent",
        ],
    ),
    (
        "documentation-workflow",
        &["documentation-agent", "integration-gateway-agent"],
    ),
    ("security", &["security-agent", "architecture-agent"]),
    (
        "performance",
        &[
            "observability-agent",
            "resilience-engineering-agent",
            "implementation-agent",
        ],
    ),
];

/// Overall outcome of a collaboration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaborationStatus {
    /// Every participant succeeded and the answers agree
    Success,
    /// Every participant succeeded but the answers disagree
    ConsistencyIssues,
    /// Some participants failed
    PartialFailure,
    /// No participant produced guidance
    Failure,
}

impl CollaborationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollaborationStatus::Success => "success",
            CollaborationStatus::ConsistencyIssues => "consistency_issues",
            CollaborationStatus::PartialFailure => "partial_failure",
            CollaborationStatus::Failure => "failure",
        }
    }
}

impl std::fmt::Display for CollaborationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one collaboration round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaborativeGuidanceResponse {
    pub request_id: String,
    /// Agents that took part, in request order
    pub participants: Vec<String>,
    /// Requested ids that were missing, unavailable or over the limit
    pub dropped: Vec<String>,
    /// Requested ids the caller's role may not consult
    pub rejected: Vec<String>,
    /// One response per participant
    pub responses: Vec<GuidanceResponse>,
    pub consistency: ConsistencyValidationResult,
    pub consolidated_guidance: String,
    pub consolidated_recommendations: Vec<String>,
    /// Mean confidence of the successful responses
    pub confidence: f64,
    pub total_processing_time: Duration,
    pub status: CollaborationStatus,
    /// Resolved response when the answers disagreed
    pub resolution: Option<GuidanceResponse>,
    /// Explanation for a collaboration that never ran
    pub reason: Option<String>,
}

impl CollaborativeGuidanceResponse {
    fn empty(
        request_id: &str,
        dropped: Vec<String>,
        rejected: Vec<String>,
        reason: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            request_id: request_id.to_string(),
            participants: Vec::new(),
            dropped,
            rejected,
            responses: Vec::new(),
            consistency: ConsistencyValidationResult::trivial(0, Duration::ZERO),
            consolidated_guidance: String::new(),
            consolidated_recommendations: Vec::new(),
            confidence: 0.0,
            total_processing_time: elapsed,
            status: CollaborationStatus::Failure,
            resolution: None,
            reason: Some(reason.into()),
        }
    }

    /// True iff there were participants, all succeeded, and the answers are
    /// consistent.
    pub fn is_successful(&self) -> bool {
        !self.responses.is_empty()
            && self.responses.iter().all(|r| r.is_successful())
            && self.consistency.is_consistent
    }

    pub fn consistency_result(&self) -> &ConsistencyValidationResult {
        &self.consistency
    }

    pub fn successful_responses(&self) -> impl Iterator<Item = &GuidanceResponse> {
        self.responses.iter().filter(|r| r.is_successful())
    }
}

/// Coordinates consultations across several agents.
pub struct CollaborationProtocol {
    registry: Arc<AgentRegistry>,
    config: CollaborationConfig,
    validator: ConsistencyValidator,
    resolver: ConflictResolver,
    policy: AccessPolicy,
    audit: Arc<dyn AuditSink>,
}

impl CollaborationProtocol {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self::from_config(registry, &AdvisorConfig::default())
    }

    pub fn from_config(registry: Arc<AgentRegistry>, config: &AdvisorConfig) -> Self {
        let audit = registry.audit_sink();
        Self {
            registry,
            config: config.collaboration.clone(),
            validator: ConsistencyValidator::new(config.collaboration.consistency_threshold),
            resolver: ConflictResolver::from_config(config),
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

    pub fn config(&self) -> &CollaborationConfig {
        &self.config
    }

    /// Resolve requested ids to available agents the caller may consult.
    /// Unknown, unavailable and duplicate ids are dropped, as is anything
    /// over the participant limit. Denied agents are audited and returned
    /// separately.
    fn participants<S: AsRef<str>>(
        &self,
        request: &ConsultationRequest,
        ids: &[S],
    ) -> (Vec<Arc<dyn Agent>>, Vec<String>, Vec<String>) {
        let role = self.policy.caller_role(request);
        let mut seen = BTreeSet::new();
        let mut agents = Vec::new();
        let mut dropped = Vec::new();
        let mut rejected = Vec::new();

        for id in ids.iter().map(AsRef::as_ref) {
            if !seen.insert(id.to_string()) {
                continue;
            }
            match self.registry.get_agent(id) {
                Some(agent) if agent.is_available() => {
                    if !self.policy.is_allowed(role, agent.domain()) {
                        self.reject(request, agent.as_ref(), role);
                        rejected.push(id.to_string());
                    } else if agents.len() < self.config.max_participants {
                        agents.push(agent);
                    } else {
                        warn!(agent_id = id, "Participant limit reached, dropping agent");
                        dropped.push(id.to_string());
                    }
                }
                Some(_) => {
                    debug!(agent_id = id, "Dropping unavailable participant");
                    dropped.push(id.to_string());
                }
                None => {
                    debug!(agent_id = id, "Dropping unknown participant");
                    dropped.push(id.to_string());
                }
            }
        }
        (agents, dropped, rejected)
    }

    /// Consult `participant_ids` concurrently and combine their answers.
    pub async fn coordinate_consultation<S: AsRef<str>>(
        &self,
        request: &ConsultationRequest,
        participant_ids: &[S],
    ) -> CollaborativeGuidanceResponse {
        let started = Instant::now();
        let (agents, dropped, rejected) = self.participants(request, participant_ids);
        debug!(
            request_id = %request.request_id,
            participants = agents.len(),
            dropped = dropped.len(),
            rejected = rejected.len(),
            "Starting collaboration"
        );

        if agents.is_empty() {
            warn!(request_id = %request.request_id, "No valid participants for collaboration");
            let reason = if rejected.is_empty() {
                "No available agents found".to_string()
            } else {
                format!(
                    "Caller role {} may not consult any requested agent",
                    self.policy.caller_role(request)
                )
            };
            return CollaborativeGuidanceResponse::empty(
                &request.request_id,
                dropped,
                rejected,
                reason,
                started.elapsed(),
            );
        }

        let shared = Arc::new(request.for_collaboration());
        let outcome = dispatch::dispatch(&agents, &shared, self.config.budget()).await;
        for (response, agent) in outcome.responses.iter().zip(&agents) {
            let event = if outcome.timed_out.iter().any(|id| id == agent.id()) {
                AuditEvent::new(
                    agent.id(),
                    &request.request_id,
                    AuditOutcome::TimedOut,
                    response.processing_time,
                )
                .with_error(AdvisorError::timeout("collaboration", self.config.budget()).to_string())
            } else {
                AuditEvent::from_response(response)
            };
            self.audit.record(event);
        }

        self.assemble(request, agents, dropped, rejected, outcome.responses, started)
    }

    fn reject(&self, request: &ConsultationRequest, agent: &dyn Agent, role: CallerRole) {
        let err = AdvisorError::unauthorized(role, agent.domain());
        warn!(agent_id = %agent.id(), "Collaboration participant rejected: {}", err);
        self.audit
            .record(AuditEvent::rejection(agent.id(), &request.request_id, &err));
    }

    fn assemble(
        &self,
        request: &ConsultationRequest,
        agents: Vec<Arc<dyn Agent>>,
        dropped: Vec<String>,
        rejected: Vec<String>,
        responses: Vec<GuidanceResponse>,
        started: Instant,
    ) -> CollaborativeGuidanceResponse {
        let consistency = self.validator.validate(&responses);
        let successful: Vec<&GuidanceResponse> = responses.iter().filter(|r| r.is_successful()).collect();

        let resolution = (!consistency.is_consistent
            && self.config.enable_conflict_resolution
            && successful.len() > 1)
            .then(|| self.resolver.resolve_with(request, &responses, &consistency));

        let consolidated_guidance = consolidate_guidance(&successful);
        let consolidated_recommendations = match &resolution {
            Some(resolved) => resolved.recommendations.clone(),
            None => consolidate_recommendations(&successful),
        };
        let confidence = if successful.is_empty() {
            0.0
        } else {
            successful.iter().map(|r| r.confidence).sum::<f64>() / successful.len() as f64
        };

        let status = if successful.is_empty() {
            CollaborationStatus::Failure
        } else if successful.len() < responses.len() {
            CollaborationStatus::PartialFailure
        } else if !consistency.is_consistent {
            CollaborationStatus::ConsistencyIssues
        } else {
            CollaborationStatus::Success
        };

        let total_processing_time = started.elapsed();
        if total_processing_time > self.config.budget() {
            warn!(
                "Collaboration for {} took {:?}, over the {:?} budget",
                request.request_id,
                total_processing_time,
                self.config.budget()
            );
        }
        info!(
            request_id = %request.request_id,
            status = status.as_str(),
            score = consistency.consistency_score,
            elapsed_ms = total_processing_time.as_millis() as u64,
            "Collaboration finished"
        );

        CollaborativeGuidanceResponse {
            request_id: request.request_id.clone(),
            participants: agents.iter().map(|a| a.id().to_string()).collect(),
            dropped,
            rejected,
            responses,
            consistency,
            consolidated_guidance,
            consolidated_recommendations,
            confidence,
            total_processing_time,
            status,
            resolution,
            reason: None,
        }
    }

    /// Score agreement between responses.
    pub fn validate_consistency(&self, responses: &[GuidanceResponse]) -> ConsistencyValidationResult {
        self.validator.validate(responses)
    }

    /// Merge disagreeing responses into one.
    pub fn resolve_conflicts(
        &self,
        request: &ConsultationRequest,
        responses: &[GuidanceResponse],
    ) -> GuidanceResponse {
        let consistency = self.validator.validate(responses);
        self.resolver.resolve_with(request, responses, &consistency)
    }

    /// Agents to consult, in order, for a workflow or domain.
    ///
    /// Named workflows use a fixed agent list. Any other domain gets the
    /// agents serving it plus those of its supporting domains, dependencies
    /// first. Only registered agents are listed.
    pub fn get_collaboration_workflow(&self, domain: &str) -> Vec<String> {
        let key = domain.trim().to_lowercase();
        if let Some((_, ids)) = WORKFLOWS.iter().find(|(name, _)| *name == key) {
            return ids
                .iter()
                .filter(|id| self.registry.contains(id))
                .map(|id| id.to_string())
                .collect();
        }

        let supporting = cross_domain_support(&key);
        let members: Vec<String> = self
            .registry
            .all_agents()
            .iter()
            .filter(|a| {
                same_domain(a.domain(), &key) || supporting.iter().any(|s| same_domain(a.domain(), s))
            })
            .map(|a| a.id().to_string())
            .collect();
        if members.is_empty() {
            return members;
        }

        let ids: Vec<&str> = members.iter().map(String::as_str).collect();
        match self.registry.dependency_graph().order_subset(&ids) {
            Ok(order) => order,
            Err(err) => {
                warn!("Falling back to registration order for {}: {}", key, err);
                members
            }
        }
    }
}

impl std::fmt::Debug for CollaborationProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollaborationProtocol")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

fn consolidate_guidance(responses: &[&GuidanceResponse]) -> String {
    match responses {
        [] => String::new(),
        [only] => only.guidance.clone(),
        many => {
            let mut text = String::from("## Collaborative Guidance\n");
            for response in many {
                text.push_str(&format!(
                    "\n### {} (confidence {:.2})\n{}\n",
                    response.agent_id, response.confidence, response.guidance
                ));
            }
            text
        }
    }
}

fn consolidate_recommendations(responses: &[&GuidanceResponse]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    responses
        .iter()
        .flat_map(|r| r.recommendations.iter())
        .filter(|rec| seen.insert(rec.trim().to_lowercase()))
        .cloned()
        .collect()
}
