//! Startup wiring: one registry holding the agent catalog, shared by the
//! routing, collaboration and failover managers.

use std::sync::Arc;

use tracing::{info, warn};

use advisor_agents::{default_agents, Agent};

use crate::audit::{AuditSink, TracingAuditSink};
use crate::collaboration::CollaborationProtocol;
use crate::config::AdvisorConfig;
use crate::error::AdvisorResult;
use crate::failover::FailoverManager;
use crate::registry::AgentRegistry;
use crate::routing::RoutingManager;

/// Create a registry with every catalog agent registered.
pub fn default_registry(config: &AdvisorConfig) -> AgentRegistry {
    registry_with(config, default_agents(), Arc::new(TracingAuditSink))
}

/// Create a registry holding `agents`, configured from `config`.
pub fn registry_with(
    config: &AdvisorConfig,
    agents: Vec<Arc<dyn Agent>>,
    audit: Arc<dyn AuditSink>,
) -> AgentRegistry {
    let registry = AgentRegistry::new()
        .with_config(config.registry.clone())
        .with_max_backups(config.failover.max_backups)
        .with_audit_sink(audit);
    for agent in agents {
        registry.register_agent(agent);
    }
    registry
}

/// The assembled service.
#[derive(Debug)]
pub struct Advisor {
    pub registry: Arc<AgentRegistry>,
    pub routing: RoutingManager,
    pub collaboration: CollaborationProtocol,
    pub failover: FailoverManager,
    config: AdvisorConfig,
}

impl Advisor {
    /// Build the service around the default catalog.
    pub fn new(config: AdvisorConfig) -> AdvisorResult<Self> {
        Self::with_registry(default_registry(&config), config)
    }

    /// Build the service around an already populated registry.
    ///
    /// Fails when the configuration is out of range or the registered
    /// agents have missing or cyclic dependencies.
    pub fn with_registry(registry: AgentRegistry, config: AdvisorConfig) -> AdvisorResult<Self> {
        config.validate()?;
        let order = registry.validate_dependencies()?;
        if registry.is_empty() {
            warn!("Advisor started without agents");
        }
        info!(agents = registry.len(), "Advisor ready");
        tracing::debug!("Dependency order: {}", order.join(", "));

        let registry = Arc::new(registry);
        Ok(Self {
            routing: RoutingManager::from_config(Arc::clone(&registry), &config),
            collaboration: CollaborationProtocol::from_config(Arc::clone(&registry), &config),
            failover: FailoverManager::from_config(Arc::clone(&registry), &config),
            registry,
            config,
        })
    }

    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }
}
