//! The closed set of specialist agent roles.

use serde::{Deserialize, Serialize};

/// Specialist roles in the built-in catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Architecture,
    Implementation,
    Deployment,
    Testing,
    Security,
    Observability,
    Documentation,
    BusinessDomain,
    IntegrationGateway,
    ArchitecturalGovernance,
    PairNavigator,
    EventDriven,
    CicdPipeline,
    ConfigurationManagement,
    ResilienceEngineering,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Architecture => "architecture",
            AgentRole::Implementation => "implementation",
            AgentRole::Deployment => "deployment",
            AgentRole::Testing => "testing",
            AgentRole::Security => "security",
            AgentRole::Observability => "observability",
            AgentRole::Documentation => "documentation",
            AgentRole::BusinessDomain => "business-domain",
            AgentRole::IntegrationGateway => "integration-gateway",
            AgentRole::ArchitecturalGovernance => "architectural-governance",
            AgentRole::PairNavigator => "pair-navigator",
            AgentRole::EventDriven => "event-driven",
            AgentRole::CicdPipeline => "cicd-pipeline",
            AgentRole::ConfigurationManagement => "configuration-management",
            AgentRole::ResilienceEngineering => "resilience-engineering",
        }
    }

    /// Registry id of the catalog agent playing this role.
    pub fn agent_id(&self) -> String {
        format!("{}-agent", self.as_str())
    }

    /// Routing domain served by this role.
    pub fn domain(&self) -> &'static str {
        match self {
            AgentRole::BusinessDomain => "business",
            AgentRole::IntegrationGateway => "integration",
            AgentRole::ArchitecturalGovernance => "governance",
            AgentRole::PairNavigator => "collaboration",
            AgentRole::CicdPipeline => "cicd",
            AgentRole::ConfigurationManagement => "configuration",
            AgentRole::ResilienceEngineering => "resilience",
            other => other.as_str(),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AgentRole::Architecture => "Architecture Agent",
            AgentRole::Implementation => "Implementation Agent",
            AgentRole::Deployment => "Deployment Agent",
            AgentRole::Testing => "Testing Agent",
            AgentRole::Security => "Security Agent",
            AgentRole::Observability => "Observability Agent",
            AgentRole::Documentation => "Documentation Agent",
            AgentRole::BusinessDomain => "Business Domain Agent",
            AgentRole::IntegrationGateway => "Integration & Gateway Agent",
            AgentRole::ArchitecturalGovernance => "Architectural Governance Agent",
            AgentRole::PairNavigator => "Pair Programming Navigator Agent",
            AgentRole::EventDriven => "Event-Driven Architecture Agent",
            AgentRole::CicdPipeline => "CI/CD Pipeline Agent",
            AgentRole::ConfigurationManagement => "Configuration Management Agent",
            AgentRole::ResilienceEngineering => "Resilience Engineering Agent",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AgentRole::Architecture => "Domain-driven design and service boundaries",
            AgentRole::Implementation => "Spring Boot services, data access and REST APIs",
            AgentRole::Deployment => "Containers, Kubernetes and ECS rollouts",
            AgentRole::Testing => "Unit, integration, contract and property testing",
            AgentRole::Security => "Authentication, authorization and OWASP hardening",
            AgentRole::Observability => "Metrics, tracing, logging and performance monitoring",
            AgentRole::Documentation => "API docs, READMEs and release notes",
            AgentRole::BusinessDomain => "Business rules, payments and workflow design",
            AgentRole::IntegrationGateway => "API gateway, routing and external integrations",
            AgentRole::ArchitecturalGovernance => "Boundary enforcement, ADRs and technical debt",
            AgentRole::PairNavigator => "Pairing support, loop detection and simplification",
            AgentRole::EventDriven => "Event schemas, brokers and event sourcing",
            AgentRole::CicdPipeline => "Build automation, pipelines and release strategies",
            AgentRole::ConfigurationManagement => "Centralized config, feature flags and secrets",
            AgentRole::ResilienceEngineering => "Circuit breakers, retries and chaos engineering",
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            AgentRole::Architecture,
            AgentRole::Implementation,
            AgentRole::Deployment,
            AgentRole::Testing,
            AgentRole::Security,
            AgentRole::Observability,
            AgentRole::Documentation,
            AgentRole::BusinessDomain,
            AgentRole::IntegrationGateway,
            AgentRole::ArchitecturalGovernance,
            AgentRole::PairNavigator,
            AgentRole::EventDriven,
            AgentRole::CicdPipeline,
            AgentRole::ConfigurationManagement,
            AgentRole::ResilienceEngineering,
        ]
    }

    /// Look up a role by its name, domain or agent id.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        Self::all().into_iter().find(|role| {
            role.as_str() == value || role.domain() == value || role.agent_id() == value
        })
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
