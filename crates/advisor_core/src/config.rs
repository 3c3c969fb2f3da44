//! Service configuration.
//!
//! Every threshold and budget used by the registry, routing and collaboration
//! layers lives here with its default. Configuration can be loaded from YAML
//! or TOML; missing keys keep their defaults.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AdvisorError, AdvisorResult};
use crate::security::{default_restrictions, AccessPolicy, CallerRole};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    pub registry: RegistryConfig,
    pub routing: RoutingConfig,
    pub collaboration: CollaborationConfig,
    pub confidence: ConfidenceConfig,
    pub failover: FailoverConfig,
    pub access: AccessConfig,
}

/// Registry lookups and single-agent consultations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Budget for candidate discovery; slower lookups are logged
    pub discovery_timeout_ms: u64,
    /// Budget for one `consult_best_agent` call
    pub consultation_timeout_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            discovery_timeout_ms: 1000,
            consultation_timeout_ms: 3000,
        }
    }
}

impl RegistryConfig {
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    pub fn consultation_timeout(&self) -> Duration {
        Duration::from_millis(self.consultation_timeout_ms)
    }
}

/// Priority routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Total budget for one routed request, dispatch included
    pub budget_ms: u64,
    /// How many top-ranked agents receive the request
    pub max_dispatch: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            budget_ms: 2000,
            max_dispatch: 3,
        }
    }
}

impl RoutingConfig {
    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.budget_ms)
    }
}

/// Multi-agent collaboration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaborationConfig {
    pub budget_ms: u64,
    /// Minimum consistency score for responses to count as consistent
    pub consistency_threshold: f64,
    pub max_participants: usize,
    /// Resolve conflicts automatically when responses are inconsistent
    pub enable_conflict_resolution: bool,
}

impl Default for CollaborationConfig {
    fn default() -> Self {
        Self {
            budget_ms: 3000,
            consistency_threshold: 0.8,
            max_participants: 5,
            enable_conflict_resolution: true,
        }
    }
}

impl CollaborationConfig {
    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.budget_ms)
    }
}

/// Confidence policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    /// Minimum confidence expected from a domain-matched answer
    pub domain_match_floor: f64,
    /// Highest confidence a conflict resolution may claim
    pub resolution_ceiling: f64,
    /// Responses below this are flagged as low confidence
    pub quality_threshold: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            domain_match_floor: 0.85,
            resolution_ceiling: 0.95,
            quality_threshold: 0.9,
        }
    }
}

/// Failover between primary and backup agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailoverConfig {
    pub enabled: bool,
    pub max_backups: usize,
    /// Consecutive failures before an agent is marked failed
    pub failure_threshold: u32,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_backups: 3,
            failure_threshold: 3,
        }
    }
}

/// Domain access control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Role assumed when a request declares none
    pub default_role: CallerRole,
    /// Restricted domain to minimum caller role
    pub restricted_domains: BTreeMap<String, CallerRole>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            default_role: CallerRole::Developer,
            restricted_domains: default_restrictions(),
        }
    }
}

impl AccessConfig {
    pub fn policy(&self) -> AccessPolicy {
        AccessPolicy::new(self.default_role, self.restricted_domains.clone())
    }
}

impl AdvisorConfig {
    /// Load configuration from a file, choosing the format by extension.
    pub fn from_file(path: &Path) -> AdvisorResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&content)?,
            Some("yaml") | Some("yml") => Self::from_yaml(&content)?,
            other => {
                return Err(AdvisorError::Config(format!(
                    "unsupported config format: {}",
                    other.unwrap_or("<none>")
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> AdvisorResult<Self> {
        serde_yaml::from_str(yaml).map_err(AdvisorError::from)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(source: &str) -> AdvisorResult<Self> {
        toml::from_str(source).map_err(AdvisorError::from)
    }

    /// Serialize the configuration to YAML.
    pub fn to_yaml(&self) -> AdvisorResult<String> {
        serde_yaml::to_string(self).map_err(AdvisorError::from)
    }

    /// Check value ranges.
    pub fn validate(&self) -> AdvisorResult<()> {
        let unit = |name: &str, value: f64| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(AdvisorError::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )))
            }
        };
        unit(
            "collaboration.consistency_threshold",
            self.collaboration.consistency_threshold,
        )?;
        unit("confidence.domain_match_floor", self.confidence.domain_match_floor)?;
        unit("confidence.resolution_ceiling", self.confidence.resolution_ceiling)?;
        unit("confidence.quality_threshold", self.confidence.quality_threshold)?;

        if self.routing.max_dispatch == 0 {
            return Err(AdvisorError::Config(
                "routing.max_dispatch must be at least 1".to_string(),
            ));
        }
        if self.collaboration.max_participants == 0 {
            return Err(AdvisorError::Config(
                "collaboration.max_participants must be at least 1".to_string(),
            ));
        }
        if self.routing.budget_ms == 0
            || self.collaboration.budget_ms == 0
            || self.registry.consultation_timeout_ms == 0
        {
            return Err(AdvisorError::Config("budgets must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn with_routing_budget(mut self, budget: Duration) -> Self {
        self.routing.budget_ms = duration_ms(budget);
        self
    }

    pub fn with_collaboration_budget(mut self, budget: Duration) -> Self {
        self.collaboration.budget_ms = duration_ms(budget);
        self
    }

    pub fn with_consultation_timeout(mut self, timeout: Duration) -> Self {
        self.registry.consultation_timeout_ms = duration_ms(timeout);
        self
    }

    pub fn with_consistency_threshold(mut self, threshold: f64) -> Self {
        self.collaboration.consistency_threshold = threshold;
        self
    }

    pub fn with_access(mut self, access: AccessConfig) -> Self {
        self.access = access;
        self
    }

    /// Disable every domain restriction.
    pub fn without_access_control(mut self) -> Self {
        self.access.restricted_domains.clear();
        self
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AdvisorConfig::default();
        assert_eq!(config.registry.discovery_timeout(), Duration::from_secs(1));
        assert_eq!(config.routing.budget(), Duration::from_secs(2));
        assert_eq!(config.collaboration.budget(), Duration::from_secs(3));
        assert_eq!(config.collaboration.consistency_threshold, 0.8);
        assert_eq!(config.confidence.resolution_ceiling, 0.95);
        assert_eq!(config.failover.max_backups, 3);
        assert_eq!(config.access.restricted_domains.get("governance"), Some(&CallerRole::Lead));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
routing:
  max_dispatch: 2
collaboration:
  consistency_threshold: 0.75
"#;
        let config = AdvisorConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.routing.max_dispatch, 2);
        assert_eq!(config.routing.budget_ms, 2000);
        assert_eq!(config.collaboration.consistency_threshold, 0.75);
        assert_eq!(config.collaboration.max_participants, 5);
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[failover]\nmax_backups = 1\n\n[access]\ndefault_role = \"guest\"\n"
        )
        .unwrap();

        let config = AdvisorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.failover.max_backups, 1);
        assert_eq!(config.access.default_role, CallerRole::Guest);
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(matches!(
            AdvisorConfig::from_file(file.path()),
            Err(AdvisorError::Config(_))
        ));
    }

    #[test]
    fn test_validate_ranges() {
        let config = AdvisorConfig::default().with_consistency_threshold(1.5);
        assert!(config.validate().is_err());

        let mut config = AdvisorConfig::default();
        config.routing.max_dispatch = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = AdvisorConfig::default().without_access_control();
        let yaml = config.to_yaml().unwrap();
        assert_eq!(AdvisorConfig::from_yaml(&yaml).unwrap(), config);
    }
}
