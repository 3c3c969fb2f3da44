//! # advisor_core
//!
//! Registry, routing and collaboration engine for the advisor service.
//!
//! This crate decides which agents answer a consultation, consults them
//! concurrently within a time budget, and reconciles their answers.
//!
//! # Architecture
//!
//! - **Registry**: owns the registered agents and ranks them for a request
//! - **Routing**: extracts keywords, ranks candidates and dispatches to the best few
//! - **Collaboration**: consults an explicit participant list and consolidates the answers
//! - **Consistency**: scores agreement between responses
//! - **Conflict**: merges disagreeing responses into one
//! - **Failover**: retries on backup agents when the best one fails
//!
//! # Example
//!
//! ```rust,ignore
//! use advisor_core::{Advisor, AdvisorConfig};
//! use advisor_agents::ConsultationRequest;
//!
//! let advisor = Advisor::new(AdvisorConfig::default())?;
//!
//! let request = ConsultationRequest::new("security", "Implement JWT authentication for API gateway");
//! let routed = advisor.routing.route_with_priority(&request).await;
//!
//! let team = advisor.collaboration.get_collaboration_workflow("security");
//! let joint = advisor.collaboration.coordinate_consultation(&request, &team).await;
//! ```

pub mod audit;
pub mod bootstrap;
pub mod collaboration;
pub mod config;
pub mod conflict;
pub mod consistency;
pub mod dependency;
pub mod dispatch;
pub mod error;
pub mod failover;
pub mod registry;
pub mod routing;
pub mod security;

// Re-export main types for convenience
pub use audit::{AuditEvent, AuditOutcome, AuditSink, MemoryAuditSink, TracingAuditSink};
pub use bootstrap::{default_registry, registry_with, Advisor};
pub use collaboration::{CollaborationProtocol, CollaborationStatus, CollaborativeGuidanceResponse};
pub use config::{
    AccessConfig, AdvisorConfig, CollaborationConfig, ConfidenceConfig, FailoverConfig,
    RegistryConfig, RoutingConfig,
};
pub use conflict::{ConflictResolutionStrategy, ConflictResolver};
pub use consistency::{Conflict, ConflictKind, ConsistencyValidationResult, ConsistencyValidator};
pub use dependency::{cross_domain_support, DependencyGraph};
pub use dispatch::DispatchOutcome;
pub use error::{AdvisorError, AdvisorResult};
pub use failover::{FailoverManager, FailoverStats};
pub use registry::{AgentRegistry, RankedAgent, RegistryHealth};
pub use routing::{
    extract_capabilities, PriorityRoutingResult, RoutingCandidate, RoutingManager, RoutingStage,
    RoutingStatus,
};
pub use security::{AccessPolicy, CallerRole};
