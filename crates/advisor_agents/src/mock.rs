//! Scriptable agent for testing.
//!
//! Provides a configurable [`Agent`] whose availability, latency, answer and
//! failure mode are set by the test, and which records every request it
//! receives.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::agent::{Agent, AgentProfile};
use crate::request::ConsultationRequest;
use crate::response::{GuidanceResponse, ResponseStatus};

/// How a scripted agent answers.
#[derive(Debug, Clone)]
enum Behaviour {
    Answer,
    Fail(String),
    Status(ResponseStatus),
    Panic(String),
}

/// Scripted agent for testing.
///
/// Clones share state, so a test can keep a handle while the registry owns
/// another.
#[derive(Clone)]
pub struct ScriptedAgent {
    profile: AgentProfile,
    available: Arc<RwLock<bool>>,
    delay: Arc<RwLock<Duration>>,
    guidance: Arc<RwLock<String>>,
    recommendations: Arc<RwLock<Vec<String>>>,
    confidence: Arc<RwLock<f64>>,
    behaviour: Arc<RwLock<Behaviour>>,
    calls: Arc<AtomicUsize>,
    received: Arc<RwLock<Vec<ConsultationRequest>>>,
}

impl ScriptedAgent {
    /// Create a scripted agent that answers every request successfully.
    pub fn new(id: impl Into<String>, domain: impl Into<String>) -> Self {
        let id = id.into();
        let domain = domain.into();
        Self {
            profile: AgentProfile::new(id.clone(), format!("Scripted {}", id), domain.clone()),
            available: Arc::new(RwLock::new(true)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
            guidance: Arc::new(RwLock::new(format!("Scripted guidance for {}", domain))),
            recommendations: Arc::new(RwLock::new(vec![format!("Follow {} conventions", domain)])),
            confidence: Arc::new(RwLock::new(0.9)),
            behaviour: Arc::new(RwLock::new(Behaviour::Answer)),
            calls: Arc::new(AtomicUsize::new(0)),
            received: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.profile = self.profile.with_capabilities(capabilities);
        self
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.profile = self.profile.with_dependencies(dependencies);
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.profile = self.profile.with_priority(priority);
        self
    }

    /// Set whether the agent reports as available.
    pub fn set_available(self, available: bool) -> Self {
        *self.available.write() = available;
        self
    }

    /// Toggle availability on a shared handle.
    pub fn toggle_available(&self, available: bool) {
        *self.available.write() = available;
    }

    /// Sleep before answering.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.write() = delay;
        self
    }

    pub fn with_guidance(self, guidance: impl Into<String>) -> Self {
        *self.guidance.write() = guidance.into();
        self
    }

    pub fn with_recommendations<I, S>(self, recommendations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.recommendations.write() = recommendations.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_confidence(self, confidence: f64) -> Self {
        *self.confidence.write() = confidence;
        self
    }

    /// Answer every request with a FAILURE carrying `message`.
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.behaviour.write() = Behaviour::Fail(message.into());
        self
    }

    /// Answer every request with the given non-success status.
    pub fn respond_with_status(self, status: ResponseStatus) -> Self {
        *self.behaviour.write() = Behaviour::Status(status);
        self
    }

    /// Panic inside `provide_guidance`.
    pub fn simulate_panic(self, message: impl Into<String>) -> Self {
        *self.behaviour.write() = Behaviour::Panic(message.into());
        self
    }

    /// Go back to answering successfully.
    pub fn recover(&self) {
        *self.behaviour.write() = Behaviour::Answer;
    }

    /// Number of consultations received.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Ids of the requests received, in arrival order.
    pub fn received_requests(&self) -> Vec<String> {
        self.received
            .read()
            .iter()
            .map(|r| r.request_id.clone())
            .collect()
    }

    /// The most recent request received.
    pub fn last_request(&self) -> Option<ConsultationRequest> {
        self.received.read().last().cloned()
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    fn is_available(&self) -> bool {
        *self.available.read()
    }

    async fn provide_guidance(&self, request: &ConsultationRequest) -> GuidanceResponse {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received.write().push(request.clone());

        let delay = *self.delay.read();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let behaviour = self.behaviour.read().clone();
        match behaviour {
            Behaviour::Answer => GuidanceResponse::success(
                &request.request_id,
                self.id(),
                self.guidance.read().clone(),
                *self.confidence.read(),
            )
            .with_recommendations(self.recommendations.read().clone())
            .with_processing_time(delay),
            Behaviour::Fail(message) => {
                GuidanceResponse::failure(&request.request_id, self.id(), message)
            }
            Behaviour::Status(status) => {
                let mut response = GuidanceResponse::failure(
                    &request.request_id,
                    self.id(),
                    format!("scripted {}", status),
                );
                response.status = status;
                response
            }
            Behaviour::Panic(message) => panic!("{}", message),
        }
    }
}

impl std::fmt::Debug for ScriptedAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedAgent")
            .field("id", &self.profile.id)
            .field("domain", &self.profile.domain)
            .field("calls", &self.call_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_agent_answers() {
        let agent = ScriptedAgent::new("arch-1", "architecture")
            .with_recommendations(["Map bounded contexts"])
            .with_confidence(0.93);
        let request = ConsultationRequest::new("architecture", "service boundaries");

        let response = agent.provide_guidance(&request).await;

        assert!(response.is_successful());
        assert_eq!(response.agent_id, "arch-1");
        assert_eq!(response.confidence, 0.93);
        assert_eq!(response.recommendations, vec!["Map bounded contexts"]);
        assert_eq!(agent.call_count(), 1);
        assert_eq!(agent.received_requests(), vec![request.request_id.clone()]);
    }

    #[tokio::test]
    async fn test_scripted_agent_failure_and_recovery() {
        let agent = ScriptedAgent::new("flaky", "testing").simulate_failure("boom");
        let request = ConsultationRequest::new("testing", "unit tests");

        let response = agent.provide_guidance(&request).await;
        assert_eq!(response.status, ResponseStatus::Failure);
        assert_eq!(response.error_message(), Some("boom"));

        agent.recover();
        assert!(agent.provide_guidance(&request).await.is_successful());
    }

    #[tokio::test]
    async fn test_shared_handle() {
        let agent = ScriptedAgent::new("devops-1", "deployment");
        let handle = agent.clone();
        handle.toggle_available(false);
        assert!(!agent.is_available());
    }
}
