//! Caller roles and domain access policy.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use advisor_agents::request::ROLE_KEY;
use advisor_agents::ConsultationRequest;

use crate::error::{AdvisorError, AdvisorResult};

/// Caller roles, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerRole {
    Guest,
    #[default]
    Developer,
    Lead,
    Admin,
}

impl CallerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallerRole::Guest => "guest",
            CallerRole::Developer => "developer",
            CallerRole::Lead => "lead",
            CallerRole::Admin => "admin",
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            CallerRole::Guest,
            CallerRole::Developer,
            CallerRole::Lead,
            CallerRole::Admin,
        ]
    }
}

impl std::fmt::Display for CallerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CallerRole {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "guest" => Ok(CallerRole::Guest),
            "developer" | "dev" => Ok(CallerRole::Developer),
            "lead" => Ok(CallerRole::Lead),
            "admin" => Ok(CallerRole::Admin),
            other => Err(AdvisorError::Config(format!("unknown caller role: {}", other))),
        }
    }
}

/// Default restricted domains and the minimum role each requires.
pub fn default_restrictions() -> BTreeMap<String, CallerRole> {
    [
        ("security", CallerRole::Developer),
        ("configuration", CallerRole::Developer),
        ("deployment", CallerRole::Developer),
        ("cicd", CallerRole::Developer),
        ("governance", CallerRole::Lead),
    ]
    .into_iter()
    .map(|(domain, role)| (domain.to_string(), role))
    .collect()
}

/// Decides which caller roles may consult which domains.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessPolicy {
    default_role: CallerRole,
    restricted: BTreeMap<String, CallerRole>,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new(CallerRole::Developer, default_restrictions())
    }
}

impl AccessPolicy {
    pub fn new(default_role: CallerRole, restricted: BTreeMap<String, CallerRole>) -> Self {
        let restricted = restricted
            .into_iter()
            .map(|(domain, role)| (domain.trim().to_lowercase(), role))
            .collect();
        Self {
            default_role,
            restricted,
        }
    }

    /// A policy that lets everyone through.
    pub fn open() -> Self {
        Self::new(CallerRole::Guest, BTreeMap::new())
    }

    pub fn with_restriction(mut self, domain: impl Into<String>, role: CallerRole) -> Self {
        self.restricted
            .insert(domain.into().trim().to_lowercase(), role);
        self
    }

    pub fn default_role(&self) -> CallerRole {
        self.default_role
    }

    /// Caller role declared in the request context.
    ///
    /// Missing roles fall back to the default; unparseable ones are treated
    /// as guest.
    pub fn caller_role(&self, request: &ConsultationRequest) -> CallerRole {
        match request.context_str(ROLE_KEY) {
            Some(role) => role.parse().unwrap_or(CallerRole::Guest),
            None => self.default_role,
        }
    }

    /// Minimum role for a domain, if it is restricted.
    pub fn required_role(&self, domain: &str) -> Option<CallerRole> {
        self.restricted.get(&domain.trim().to_lowercase()).copied()
    }

    pub fn is_allowed(&self, role: CallerRole, domain: &str) -> bool {
        self.required_role(domain).map_or(true, |required| role >= required)
    }

    /// Check that `role` may consult `domain`.
    pub fn check(&self, role: CallerRole, domain: &str) -> AdvisorResult<()> {
        if self.is_allowed(role, domain) {
            Ok(())
        } else {
            Err(AdvisorError::unauthorized(role, domain))
        }
    }

    /// Check the request's caller against `domain`.
    pub fn authorize(&self, request: &ConsultationRequest, domain: &str) -> AdvisorResult<CallerRole> {
        let role = self.caller_role(request);
        self.check(role, domain)?;
        Ok(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ordering() {
        assert!(CallerRole::Guest < CallerRole::Developer);
        assert!(CallerRole::Lead < CallerRole::Admin);
        assert_eq!("Lead".parse::<CallerRole>().unwrap(), CallerRole::Lead);
        assert!("root".parse::<CallerRole>().is_err());
    }

    #[test]
    fn test_default_policy() {
        let policy = AccessPolicy::default();

        assert!(policy.is_allowed(CallerRole::Developer, "security"));
        assert!(!policy.is_allowed(CallerRole::Guest, "security"));
        assert!(!policy.is_allowed(CallerRole::Developer, "governance"));
        assert!(policy.is_allowed(CallerRole::Lead, "Governance"));
        assert!(policy.is_allowed(CallerRole::Guest, "documentation"));
    }

    #[test]
    fn test_caller_role_from_context() {
        let policy = AccessPolicy::default();

        let plain = ConsultationRequest::new("security", "jwt");
        assert_eq!(policy.caller_role(&plain), CallerRole::Developer);

        let guest = ConsultationRequest::new("security", "jwt").with_context_entry(ROLE_KEY, "guest");
        assert_eq!(policy.caller_role(&guest), CallerRole::Guest);
        assert!(matches!(
            policy.authorize(&guest, "security"),
            Err(AdvisorError::Unauthorized { .. })
        ));

        let bogus = ConsultationRequest::new("docs", "readme").with_context_entry(ROLE_KEY, "wizard");
        assert_eq!(policy.caller_role(&bogus), CallerRole::Guest);
    }

    #[test]
    fn test_open_policy() {
        let policy = AccessPolicy::open();
        assert!(policy.is_allowed(CallerRole::Guest, "governance"));
    }
}
