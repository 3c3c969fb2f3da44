//! Concurrent fan-out of one request to several agents.
//!
//! Every agent call runs on its own task. The join is bounded by a deadline:
//! agents still running when it passes are reported as timed-out failures and
//! their tasks are aborted. A panicking agent becomes a FAILURE response.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{self, JoinSet};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use advisor_agents::{Agent, ConsultationRequest, GuidanceResponse};

/// Result of one fan-out round.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// One response per dispatched agent, in dispatch order
    pub responses: Vec<GuidanceResponse>,
    /// Ids of the agents that missed the deadline
    pub timed_out: Vec<String>,
    pub elapsed: Duration,
}

impl DispatchOutcome {
    pub fn any_timed_out(&self) -> bool {
        !self.timed_out.is_empty()
    }

    pub fn successful(&self) -> impl Iterator<Item = &GuidanceResponse> {
        self.responses.iter().filter(|r| r.is_successful())
    }
}

/// Send `request` to every agent concurrently and wait at most `budget`.
pub async fn dispatch(
    agents: &[Arc<dyn Agent>],
    request: &Arc<ConsultationRequest>,
    budget: Duration,
) -> DispatchOutcome {
    let started = Instant::now();
    let deadline = started + budget;
    let mut join_set = JoinSet::new();
    let mut indices: HashMap<task::Id, usize> = HashMap::with_capacity(agents.len());

    for (index, agent) in agents.iter().enumerate() {
        let agent = Arc::clone(agent);
        let request = Arc::clone(request);
        let handle = join_set.spawn(async move {
            let agent_started = Instant::now();
            let mut response = agent.provide_guidance(&request).await;
            if response.processing_time.is_zero() {
                response.processing_time = agent_started.elapsed();
            }
            (index, response)
        });
        indices.insert(handle.id(), index);
    }

    let mut slots: Vec<Option<GuidanceResponse>> = agents.iter().map(|_| None).collect();
    loop {
        match timeout_at(deadline, join_set.join_next()).await {
            Ok(Some(Ok((index, response)))) => {
                debug!(
                    "Agent {} answered request {} with {}",
                    response.agent_id, response.request_id, response.status
                );
                slots[index] = Some(response);
            }
            Ok(Some(Err(err))) => {
                let Some(&index) = indices.get(&err.id()) else {
                    warn!("Dispatch task failed: {}", err);
                    continue;
                };
                let agent_id = agents[index].id();
                warn!("Agent {} task failed: {}", agent_id, err);
                slots[index] = Some(
                    GuidanceResponse::failure(
                        &request.request_id,
                        agent_id,
                        format!("Internal error: {}", err),
                    )
                    .with_processing_time(started.elapsed()),
                );
            }
            Ok(None) => break,
            Err(_) => {
                warn!(
                    "Request {} exceeded its {:?} budget; abandoning {} agent call(s)",
                    request.request_id,
                    budget,
                    join_set.len()
                );
                join_set.abort_all();
                break;
            }
        }
    }

    let mut timed_out = Vec::new();
    let responses = slots
        .into_iter()
        .zip(agents)
        .map(|(slot, agent)| {
            slot.unwrap_or_else(|| {
                timed_out.push(agent.id().to_string());
                GuidanceResponse::failure(
                    &request.request_id,
                    agent.id(),
                    format!("Agent {} timed out after {:?}", agent.id(), budget),
                )
                .with_metadata("timed_out", true)
                .with_processing_time(budget)
            })
        })
        .collect();

    DispatchOutcome {
        responses,
        timed_out,
        elapsed: started.elapsed(),
    }
}

/// Consult a single agent within `budget`.
pub async fn consult(
    agent: &Arc<dyn Agent>,
    request: &Arc<ConsultationRequest>,
    budget: Duration,
) -> (GuidanceResponse, bool) {
    let outcome = dispatch(std::slice::from_ref(agent), request, budget).await;
    let timed_out = outcome.any_timed_out();
    let response = outcome.responses.into_iter().next().unwrap_or_else(|| {
        GuidanceResponse::failure(&request.request_id, agent.id(), "No response collected")
    });
    (response, timed_out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_agents::{ResponseStatus, ScriptedAgent};

    fn agents(list: Vec<ScriptedAgent>) -> Vec<Arc<dyn Agent>> {
        list.into_iter().map(|a| Arc::new(a) as Arc<dyn Agent>).collect()
    }

    #[tokio::test]
    async fn test_dispatch_preserves_order() {
        let agents = agents(vec![
            ScriptedAgent::new("slow", "testing").with_delay(Duration::from_millis(50)),
            ScriptedAgent::new("fast", "testing"),
        ]);
        let request = Arc::new(ConsultationRequest::new("testing", "unit tests"));

        let outcome = dispatch(&agents, &request, Duration::from_secs(1)).await;

        assert_eq!(outcome.responses.len(), 2);
        assert_eq!(outcome.responses[0].agent_id, "slow");
        assert_eq!(outcome.responses[1].agent_id, "fast");
        assert!(!outcome.any_timed_out());
    }

    #[tokio::test]
    async fn test_dispatch_runs_concurrently() {
        let agents = agents(
            (0..4)
                .map(|i| {
                    ScriptedAgent::new(format!("agent-{}", i), "testing")
                        .with_delay(Duration::from_millis(200))
                })
                .collect(),
        );
        let request = Arc::new(ConsultationRequest::new("testing", "unit tests"));

        let outcome = dispatch(&agents, &request, Duration::from_secs(2)).await;

        assert_eq!(outcome.successful().count(), 4);
        assert!(outcome.elapsed < Duration::from_millis(700));
    }

    #[tokio::test]
    async fn test_dispatch_timeout_becomes_failure() {
        let agents = agents(vec![
            ScriptedAgent::new("stuck", "testing").with_delay(Duration::from_secs(5)),
            ScriptedAgent::new("quick", "testing"),
        ]);
        let request = Arc::new(ConsultationRequest::new("testing", "unit tests"));

        let outcome = dispatch(&agents, &request, Duration::from_millis(100)).await;

        assert_eq!(outcome.timed_out, vec!["stuck".to_string()]);
        assert_eq!(outcome.responses[0].status, ResponseStatus::Failure);
        assert!(outcome.responses[1].is_successful());
        assert!(outcome.elapsed < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_dispatch_panic_becomes_failure() {
        let agents = agents(vec![ScriptedAgent::new("broken", "testing").simulate_panic("boom")]);
        let request = Arc::new(ConsultationRequest::new("testing", "unit tests"));

        let (response, timed_out) = consult(&agents[0], &request, Duration::from_secs(1)).await;

        assert!(!timed_out);
        assert_eq!(response.status, ResponseStatus::Failure);
        assert!(response.error_message().unwrap().contains("Internal error"));
    }

    #[tokio::test]
    async fn test_dispatch_panic_is_not_a_timeout() {
        let agents = agents(vec![
            ScriptedAgent::new("quick", "testing"),
            ScriptedAgent::new("broken", "testing").simulate_panic("boom"),
            ScriptedAgent::new("slow", "testing").with_delay(Duration::from_millis(50)),
        ]);
        let request = Arc::new(ConsultationRequest::new("testing", "unit tests"));

        let outcome = dispatch(&agents, &request, Duration::from_secs(1)).await;

        assert!(!outcome.any_timed_out());
        assert_eq!(outcome.responses[1].agent_id, "broken");
        assert_eq!(outcome.responses[1].status, ResponseStatus::Failure);
        assert!(!outcome.responses[1].metadata.contains_key("timed_out"));
        assert!(outcome.responses[0].is_successful());
        assert!(outcome.responses[2].is_successful());
        assert!(outcome.elapsed < Duration::from_secs(1));
    }
}
