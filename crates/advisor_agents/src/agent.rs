//! The agent trait and static agent descriptions.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::matching::{self, MatchScore};
use crate::metrics::MetricsSnapshot;
use crate::request::ConsultationRequest;
use crate::response::GuidanceResponse;

/// Performance envelope an agent commits to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSpec {
    /// Maximum expected response latency
    pub max_latency: Duration,
    /// Minimum confidence for domain-matched answers
    pub min_confidence: f64,
    /// Requests the agent is expected to serve concurrently
    pub max_concurrent: usize,
}

impl Default for PerformanceSpec {
    fn default() -> Self {
        Self {
            max_latency: Duration::from_millis(500),
            min_confidence: 0.85,
            max_concurrent: 100,
        }
    }
}

/// Static description of an agent: identity, specialty and capabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: String,
    pub name: String,
    /// Primary specialty, used as the routing key
    pub domain: String,
    /// Keyword tags, lowercase and hyphenated
    pub capabilities: Vec<String>,
    /// Ids of agents this one defers to
    pub dependencies: Vec<String>,
    /// Static priority; higher wins ties
    pub priority: u32,
    pub performance: PerformanceSpec,
}

impl AgentProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            domain: domain.into(),
            capabilities: Vec::new(),
            dependencies: Vec::new(),
            priority: 50,
            performance: PerformanceSpec::default(),
        }
    }

    /// Add capability tags.
    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities
            .extend(capabilities.into_iter().map(|c| c.into().to_lowercase()));
        self
    }

    /// Add dependencies.
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies
            .extend(dependencies.into_iter().map(Into::into));
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_performance(mut self, performance: PerformanceSpec) -> Self {
        self.performance = performance;
        self
    }

    /// Whether the agent declares a capability (case-insensitive substring).
    pub fn has_capability(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        !needle.is_empty() && self.capabilities.iter().any(|c| c.contains(&needle))
    }

    /// Whether this profile shares at least one capability with another.
    pub fn shares_capability(&self, other: &AgentProfile) -> bool {
        self.capabilities
            .iter()
            .any(|c| other.capabilities.iter().any(|o| o == c))
    }
}

/// A domain-specialized responder.
///
/// Implementations must be safe to share and to invoke concurrently.
/// `provide_guidance` never panics on bad input: every failure is reported
/// through the returned response's status.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Static description of the agent.
    fn profile(&self) -> &AgentProfile;

    fn id(&self) -> &str {
        &self.profile().id
    }

    fn name(&self) -> &str {
        &self.profile().name
    }

    fn domain(&self) -> &str {
        &self.profile().domain
    }

    fn capabilities(&self) -> &[String] {
        &self.profile().capabilities
    }

    fn priority(&self) -> u32 {
        self.profile().priority
    }

    /// Liveness flag; an unavailable agent is never selected.
    fn is_available(&self) -> bool {
        true
    }

    /// How well this agent fits the request.
    fn match_score(&self, request: &ConsultationRequest) -> MatchScore {
        matching::score(request, self.domain(), self.capabilities())
    }

    /// Whether this agent can answer the request.
    fn can_handle(&self, request: &ConsultationRequest) -> bool {
        self.match_score(request).is_match()
    }

    /// Produce guidance for the request.
    async fn provide_guidance(&self, request: &ConsultationRequest) -> GuidanceResponse;

    /// Runtime counters, when the agent keeps them.
    fn metrics(&self) -> Option<MetricsSnapshot> {
        None
    }
}
