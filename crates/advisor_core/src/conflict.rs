//! Conflict resolution between disagreeing agent responses.

use std::collections::BTreeSet;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use advisor_agents::matching::same_domain;
use advisor_agents::{ConsultationRequest, GuidanceResponse};

use crate::config::AdvisorConfig;
use crate::consistency::{ConsistencyValidationResult, ConsistencyValidator};

/// Agent id carried by resolved responses.
pub const RESOLVER_AGENT_ID: &str = "conflict-resolver";

/// Default upper bound on the confidence of a resolved response.
pub const DEFAULT_RESOLUTION_CEILING: f64 = 0.95;

/// Coherence below which the most confident answer wins outright.
const LOW_COHERENCE: f64 = 0.5;

const ARCHITECTURAL_MARKERS: &[&str] = &["architecture", "governance"];

/// How a set of conflicting responses is turned into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolutionStrategy {
    /// Architecture and governance agents have the last word
    ArchitecturalPriority,
    /// The agent owning the request domain wins
    DomainExpertise,
    /// The most confident response wins
    HighestConfidence,
    /// Everything is merged, weighted by confidence
    WeightedMerge,
}

impl ConflictResolutionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictResolutionStrategy::ArchitecturalPriority => "architectural_priority",
            ConflictResolutionStrategy::DomainExpertise => "domain_expertise",
            ConflictResolutionStrategy::HighestConfidence => "highest_confidence",
            ConflictResolutionStrategy::WeightedMerge => "weighted_merge",
        }
    }

    pub fn all() -> [Self; 4] {
        [
            ConflictResolutionStrategy::ArchitecturalPriority,
            ConflictResolutionStrategy::DomainExpertise,
            ConflictResolutionStrategy::HighestConfidence,
            ConflictResolutionStrategy::WeightedMerge,
        ]
    }
}

impl std::fmt::Display for ConflictResolutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Responses that report no domain are judged by their agent id.
fn is_architectural(response: &GuidanceResponse) -> bool {
    match response.domain() {
        Some(domain) => ARCHITECTURAL_MARKERS.iter().any(|m| same_domain(domain, m)),
        None => {
            let id = response.agent_id.to_lowercase();
            ARCHITECTURAL_MARKERS.iter().any(|m| id.contains(m))
        }
    }
}

fn owns_domain(response: &GuidanceResponse, domain: &str) -> bool {
    let domain = domain.trim().to_lowercase();
    if domain.is_empty() {
        return false;
    }
    match response.domain() {
        Some(own) => same_domain(own, &domain),
        None => response.agent_id.to_lowercase().contains(&domain),
    }
}

fn most_confident<'a, I>(responses: I) -> Option<&'a GuidanceResponse>
where
    I: IntoIterator<Item = &'a GuidanceResponse>,
{
    // Ties go to the earlier response.
    responses.into_iter().fold(None, |best, r| match best {
        Some(b) if b.confidence >= r.confidence => Some(b),
        _ => Some(r),
    })
}

/// Merges conflicting responses into one authoritative response.
///
/// The resolved confidence is the best contributor's confidence capped at
/// the ceiling.
#[derive(Debug, Clone, Copy)]
pub struct ConflictResolver {
    ceiling: f64,
    validator: ConsistencyValidator,
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self::new(DEFAULT_RESOLUTION_CEILING)
    }
}

impl ConflictResolver {
    pub fn new(ceiling: f64) -> Self {
        Self {
            ceiling,
            validator: ConsistencyValidator::default(),
        }
    }

    /// Resolver using the configured ceiling and consistency threshold.
    pub fn from_config(config: &AdvisorConfig) -> Self {
        Self::new(config.confidence.resolution_ceiling)
            .with_validator(ConsistencyValidator::new(config.collaboration.consistency_threshold))
    }

    pub fn with_validator(mut self, validator: ConsistencyValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn ceiling(&self) -> f64 {
        self.ceiling
    }

    /// Pick a strategy from the detected conflicts and confidence spread.
    pub fn select_strategy(
        &self,
        request: &ConsultationRequest,
        responses: &[GuidanceResponse],
        consistency: &ConsistencyValidationResult,
    ) -> ConflictResolutionStrategy {
        let party = |agent: &str| responses.iter().find(|r| r.agent_id == agent);
        let architectural = consistency.conflicts.iter().any(|c| {
            [&c.first_agent, &c.second_agent]
                .into_iter()
                .filter_map(|agent| party(agent.as_str()))
                .any(is_architectural)
        });
        if architectural {
            return ConflictResolutionStrategy::ArchitecturalPriority;
        }

        let domain_owner = responses
            .iter()
            .any(|r| r.is_successful() && owns_domain(r, &request.domain));
        if consistency.has_conflicts() && domain_owner {
            return ConflictResolutionStrategy::DomainExpertise;
        }

        if consistency.confidence_coherence < LOW_COHERENCE {
            return ConflictResolutionStrategy::HighestConfidence;
        }
        ConflictResolutionStrategy::WeightedMerge
    }

    /// Resolve `responses` for `request`, detecting conflicts first.
    pub fn resolve(&self, request: &ConsultationRequest, responses: &[GuidanceResponse]) -> GuidanceResponse {
        let consistency = self.validator.validate(responses);
        self.resolve_with(request, responses, &consistency)
    }

    /// Resolve `responses` using an existing consistency result.
    pub fn resolve_with(
        &self,
        request: &ConsultationRequest,
        responses: &[GuidanceResponse],
        consistency: &ConsistencyValidationResult,
    ) -> GuidanceResponse {
        let started = Instant::now();
        let successful: Vec<&GuidanceResponse> =
            responses.iter().filter(|r| r.is_successful()).collect();

        let Some(best) = most_confident(successful.iter().copied()) else {
            warn!(request_id = %request.request_id, "No successful responses to resolve");
            return GuidanceResponse::failure(
                &request.request_id,
                RESOLVER_AGENT_ID,
                "No successful responses to resolve",
            );
        };

        let strategy = self.select_strategy(request, responses, consistency);
        let chosen = match strategy {
            ConflictResolutionStrategy::ArchitecturalPriority => {
                most_confident(successful.iter().copied().filter(|r| is_architectural(r)))
            }
            ConflictResolutionStrategy::DomainExpertise => most_confident(
                successful
                    .iter()
                    .copied()
                    .filter(|r| owns_domain(r, &request.domain)),
            ),
            ConflictResolutionStrategy::HighestConfidence => Some(best),
            ConflictResolutionStrategy::WeightedMerge => None,
        };

        let (guidance, recommendations, selected) = match chosen {
            Some(chosen) => (
                chosen.guidance.clone(),
                chosen.recommendations.clone(),
                Some(chosen.agent_id.clone()),
            ),
            None if strategy == ConflictResolutionStrategy::WeightedMerge => {
                let (guidance, recommendations) = weighted_merge(&successful, consistency);
                (guidance, recommendations, None)
            }
            None => (best.guidance.clone(), best.recommendations.clone(), Some(best.agent_id.clone())),
        };

        let guidance = if guidance.trim().is_empty() {
            format!("Resolved guidance for {}: {}", request.domain, request.query)
        } else {
            guidance
        };
        let confidence = best.confidence.min(self.ceiling);

        info!(
            request_id = %request.request_id,
            strategy = strategy.as_str(),
            conflicts = consistency.conflicts.len(),
            "Resolved conflicting guidance"
        );

        let mut response = GuidanceResponse::success(&request.request_id, RESOLVER_AGENT_ID, guidance, confidence)
            .with_recommendations(recommendations)
            .with_metadata("strategy", strategy.as_str())
            .with_metadata("conflicts", consistency.conflicts.len())
            .with_metadata("consistent", consistency.is_consistent)
            .with_metadata(
                "sources",
                successful
                    .iter()
                    .map(|r| r.agent_id.clone())
                    .collect::<Vec<_>>(),
            )
            .with_processing_time(started.elapsed());
        if let Some(selected) = selected {
            response = response.with_metadata("selected_agent", selected);
        }
        response
    }
}

/// Merge every response, strongest first. A recommendation that lost a
/// conflict against a more confident agent is dropped.
fn weighted_merge(
    responses: &[&GuidanceResponse],
    consistency: &ConsistencyValidationResult,
) -> (String, Vec<String>) {
    let total: f64 = responses.iter().map(|r| r.confidence).sum();
    let confidence_of = |agent: &str| {
        responses
            .iter()
            .find(|r| r.agent_id == agent)
            .map_or(0.0, |r| r.confidence)
    };

    let mut losers: BTreeSet<(String, String)> = BTreeSet::new();
    for conflict in &consistency.conflicts {
        if confidence_of(&conflict.first_agent) >= confidence_of(&conflict.second_agent) {
            losers.insert((conflict.second_agent.clone(), conflict.second.clone()));
        } else {
            losers.insert((conflict.first_agent.clone(), conflict.first.clone()));
        }
    }

    let mut ordered: Vec<&GuidanceResponse> = responses.to_vec();
    ordered.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut guidance = String::from("## Merged Guidance (Weighted by Confidence)\n");
    let mut recommendations: Vec<String> = Vec::new();
    for response in ordered {
        let weight = if total > 0.0 { response.confidence / total } else { 0.0 };
        guidance.push_str(&format!(
            "\n### {} (weight {:.2})\n{}\n",
            response.agent_id, weight, response.guidance
        ));
        for recommendation in &response.recommendations {
            let lost = losers.contains(&(response.agent_id.clone(), recommendation.clone()));
            if !lost && !recommendations.contains(recommendation) {
                recommendations.push(recommendation.clone());
            }
        }
    }
    (guidance, recommendations)
}
