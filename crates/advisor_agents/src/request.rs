//! Consultation requests and their validation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AgentError, AgentResult};

/// Free-form key/value context attached to a request.
pub type RequestContext = BTreeMap<String, serde_json::Value>;

/// Context key carrying the request type.
pub const TYPE_KEY: &str = "type";

/// Context key carrying the caller role.
pub const ROLE_KEY: &str = "role";

/// Context key set on requests sent to invited collaboration participants.
pub const COLLABORATION_KEY: &str = "collaboration";

/// Request types an agent understands when `type` is present in the context.
pub const RECOGNIZED_TYPES: &[&str] = &[
    "guidance",
    "review",
    "design",
    "implementation",
    "troubleshooting",
    "planning",
    "audit",
];

/// Request priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// A consultation request routed to one or more agents.
///
/// Requests are value objects: they are built once, then shared by
/// reference (or behind an `Arc`) for the duration of a consultation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationRequest {
    /// Unique id, generated at creation
    pub request_id: String,
    /// Routing key (primary specialty requested)
    pub domain: String,
    /// Free-text question
    pub query: String,
    /// Caller supplied context; `None` means no context was sent at all
    pub context: Option<RequestContext>,
    /// Calling client
    pub client_id: String,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Priority
    pub priority: Priority,
}

impl ConsultationRequest {
    /// Create a new request with an empty context and a fresh id.
    pub fn new(domain: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            domain: domain.into(),
            query: query.into(),
            context: Some(RequestContext::new()),
            client_id: "system".to_string(),
            timestamp: Utc::now(),
            priority: Priority::Normal,
        }
    }

    /// Replace the whole context.
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Add a single context entry.
    pub fn with_context_entry(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.context
            .get_or_insert_with(RequestContext::new)
            .insert(key.into(), value.into());
        self
    }

    /// Drop the context entirely.
    pub fn without_context(mut self) -> Self {
        self.context = None;
        self
    }

    /// Set the calling client.
    pub fn with_client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Get a context value.
    pub fn context_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.context.as_ref().and_then(|c| c.get(key))
    }

    /// Get a context value as a string.
    pub fn context_str(&self, key: &str) -> Option<&str> {
        self.context_value(key).and_then(|v| v.as_str())
    }

    /// The declared request type, if any.
    pub fn request_type(&self) -> Option<&str> {
        self.context_str(TYPE_KEY)
    }

    /// Whether the request was sent as part of a collaboration.
    pub fn is_collaborative(&self) -> bool {
        self.context_value(COLLABORATION_KEY)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Copy of this request marked as a collaboration request. A request
    /// without context stays without context.
    pub fn for_collaboration(&self) -> Self {
        let mut request = self.clone();
        if let Some(context) = request.context.as_mut() {
            context.insert(COLLABORATION_KEY.to_string(), true.into());
        }
        request
    }

    /// Validate the request.
    ///
    /// Domain and query must be non-blank, a context must be present, and a
    /// declared `type` must be one of [`RECOGNIZED_TYPES`].
    pub fn validate(&self, agent: &str) -> AgentResult<()> {
        if self.domain.trim().is_empty() {
            return Err(AgentError::invalid_request(agent, "domain must not be empty"));
        }
        if self.query.trim().is_empty() {
            return Err(AgentError::invalid_request(agent, "query must not be empty"));
        }
        let Some(context) = &self.context else {
            return Err(AgentError::MissingContext(format!(
                "request {} carries no context",
                self.request_id
            )));
        };
        if let Some(value) = context.get(TYPE_KEY) {
            let kind = value.as_str().unwrap_or_default().trim().to_lowercase();
            if !RECOGNIZED_TYPES.contains(&kind.as_str()) {
                return Err(AgentError::UnrecognizedType(value.to_string()));
            }
        }
        Ok(())
    }

    /// Check validity without the error detail.
    pub fn is_valid(&self) -> bool {
        self.validate("request").is_ok()
    }
}

/// Inbound request shape as received from an outer layer.
///
/// Everything except `domain` and `query` is optional and filled in when the
/// request is converted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundRequest {
    #[serde(default)]
    pub request_id: Option<String>,
    pub domain: String,
    pub query: String,
    #[serde(default)]
    pub context: Option<RequestContext>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

impl From<InboundRequest> for ConsultationRequest {
    fn from(inbound: InboundRequest) -> Self {
        let request_id = inbound
            .request_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Self {
            request_id,
            domain: inbound.domain,
            query: inbound.query,
            context: inbound.context,
            client_id: inbound.client_id.unwrap_or_else(|| "system".to_string()),
            timestamp: inbound.timestamp.unwrap_or_else(Utc::now),
            priority: inbound.priority.unwrap_or_default(),
        }
    }
}
