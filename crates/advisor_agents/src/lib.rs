//! # advisor_agents
//!
//! Rule-based domain agents for the advisor guidance service.
//!
//! Agents are responsible for:
//! - Validating consultation requests
//! - Deciding whether a request falls within their specialty
//! - Producing guidance text, recommendations and a confidence score
//!
//! ## Architecture
//!
//! All agents implement the [`Agent`] trait, which provides:
//! - **Unified matching**: one scoring function ([`matching::score`]) drives
//!   `can_handle`, best-agent selection and routing
//! - **Total responses**: `provide_guidance` always returns a
//!   [`GuidanceResponse`]; invalid input becomes a non-success status
//! - **Shared use**: agents are `Send + Sync` and safe to call concurrently
//!
//! ## Built-in Agents
//!
//! | Role | Domain | Focus |
//! |------|--------|-------|
//! | Architecture | architecture | DDD, service boundaries |
//! | Implementation | implementation | Spring Boot, data access |
//! | Deployment | deployment | Containers, Kubernetes, ECS |
//! | Testing | testing | Unit, contract, property tests |
//! | Security | security | AuthN/AuthZ, OWASP |
//! | Observability | observability | Metrics, tracing, performance |
//! | Documentation | documentation | API docs, guides |
//! | Business Domain | business | Rules, payments, workflows |
//! | Integration Gateway | integration | Gateway, external APIs |
//! | Architectural Governance | governance | ADRs, technical debt |
//! | Pair Navigator | collaboration | Loop detection, simplification |
//! | Event-Driven | event-driven | Brokers, schemas, event sourcing |
//! | CI/CD Pipeline | cicd | Pipelines, release strategies |
//! | Configuration Management | configuration | Config stores, flags, secrets |
//! | Resilience Engineering | resilience | Circuit breakers, retries, chaos |

pub mod agent;
pub mod catalog;
pub mod error;
pub mod matching;
pub mod metrics;
pub mod mock;
pub mod playbook;
pub mod request;
pub mod response;
pub mod roles;
pub mod rule_agent;

pub use agent::{Agent, AgentProfile, PerformanceSpec};
pub use catalog::CatalogEntry;
pub use error::{AgentError, AgentResult};
pub use matching::{MatchScore, TokenSet};
pub use metrics::{AgentMetrics, MetricsSnapshot};
pub use mock::ScriptedAgent;
pub use request::{ConsultationRequest, InboundRequest, Priority, RequestContext};
pub use response::{GuidanceResponse, ResponseStatus};
pub use roles::AgentRole;
pub use rule_agent::{catalog_agents, default_agents, RuleBasedAgent};
