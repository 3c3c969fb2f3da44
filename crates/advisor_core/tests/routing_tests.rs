//! Integration tests for priority routing, failover and concurrent load.

use std::sync::Arc;
use std::time::{Duration, Instant};

use advisor_agents::{ConsultationRequest, ScriptedAgent};
use advisor_core::{
    default_registry, registry_with, Advisor, AdvisorConfig, AgentRegistry, AuditOutcome,
    MemoryAuditSink, RoutingManager, RoutingStage, RoutingStatus,
};

fn advisor() -> Advisor {
    Advisor::new(AdvisorConfig::default()).unwrap()
}

/// Catalog routing for a security question ends at the security agent.
#[tokio::test]
async fn test_route_security_question() {
    let advisor = advisor();
    let request =
        ConsultationRequest::new("security", "Implement JWT authentication for API gateway");

    let result = advisor.routing.route_with_priority(&request).await;

    assert!(result.is_successful(), "{:?}", result.reason);
    assert_eq!(result.candidates[0].agent_id, "security-agent");
    assert_eq!(result.primary.as_ref().unwrap().agent_id, "security-agent");
    assert!(result.dispatched_agents().len() <= 3);
    assert_eq!(result.last_stage(), RoutingStage::Resolved);
    assert!(result.routing_time < Duration::from_secs(2));
}

/// Keywords pull in agents from outside the request domain.
#[tokio::test]
async fn test_keywords_add_candidates() {
    let advisor = advisor();
    let request = ConsultationRequest::new(
        "implementation",
        "Add a circuit breaker and retries around the Kafka consumer",
    );

    let candidates: Vec<String> = advisor
        .routing
        .find_candidates(&request)
        .into_iter()
        .map(|c| c.agent_id)
        .collect();

    assert_eq!(candidates[0], "implementation-agent");
    assert!(candidates.contains(&"resilience-engineering-agent".to_string()));
    assert!(candidates.contains(&"event-driven-agent".to_string()));
}

/// Governance is reserved for leads.
#[tokio::test]
async fn test_governance_requires_lead() {
    let sink = MemoryAuditSink::new();
    let config = AdvisorConfig::default();
    let registry = registry_with(&config, advisor_agents::default_agents(), Arc::new(sink.clone()));
    let advisor = Advisor::with_registry(registry, config).unwrap();

    let developer = ConsultationRequest::new("governance", "Record an ADR for the event bus");
    let result = advisor.routing.route_with_priority(&developer).await;
    assert_eq!(result.status, RoutingStatus::Unauthorized);
    assert_eq!(sink.with_outcome(AuditOutcome::Rejected).len(), 1);

    let lead = developer.clone().with_context_entry("role", "lead");
    let result = advisor.routing.route_with_priority(&lead).await;
    assert!(result.is_successful());
}

/// The failover manager answers from a backup when the primary is down.
#[tokio::test]
async fn test_failover_to_backup() {
    let config = AdvisorConfig::default();
    let primary = ScriptedAgent::new("pay-1", "business")
        .with_priority(90)
        .simulate_failure("unreachable");
    let agents: Vec<Arc<dyn advisor_agents::Agent>> = vec![
        Arc::new(primary.clone()),
        Arc::new(ScriptedAgent::new("pay-2", "business")),
    ];
    let registry = registry_with(&config, agents, Arc::new(MemoryAuditSink::new()));
    let advisor = Advisor::with_registry(registry, config).unwrap();

    let response = advisor
        .failover
        .consult_with_failover(&ConsultationRequest::new("business", "Refund rules"))
        .await;

    assert!(response.is_successful());
    assert_eq!(response.agent_id, "pay-2");
    assert_eq!(advisor.failover.stats().total_failures, 1);
}

/// Many independent requests routed at once all complete, and the
/// registry stays usable while agents are registered concurrently.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_routing() {
    let config = AdvisorConfig::default();
    let registry = Arc::new(default_registry(&config));
    let router = Arc::new(RoutingManager::from_config(Arc::clone(&registry), &config));
    let domains = ["architecture", "implementation", "testing", "deployment", "observability"];

    let started = Instant::now();
    let mut handles = Vec::new();
    for i in 0..120 {
        let router = Arc::clone(&router);
        let domain = domains[i % domains.len()];
        handles.push(tokio::spawn(async move {
            let request = ConsultationRequest::new(domain, format!("Request {} about the order system", i));
            router.route_with_priority(&request).await
        }));
    }
    for i in 0..20 {
        registry.register_agent(Arc::new(ScriptedAgent::new(format!("extra-{}", i), "testing")));
    }

    for handle in handles {
        let result = handle.await.unwrap();
        assert!(result.is_successful(), "{:?}", result.reason);
    }
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(registry.len(), 35);
}

/// A shared registry tolerates concurrent readers and writers.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_registry_concurrent_access() {
    let registry = Arc::new(AgentRegistry::new());
    let mut handles = Vec::new();
    for i in 0..100 {
        let registry = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            registry.register_agent(Arc::new(ScriptedAgent::new(format!("agent-{}", i % 10), "testing")));
            registry.agents_for_domain("testing").len()
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap() >= 1);
    }
    assert_eq!(registry.len(), 10);
}
