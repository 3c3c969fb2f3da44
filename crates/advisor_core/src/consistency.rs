//! Consistency validation across the responses of several agents.
//!
//! Two responses contradict each other when their recommendations take
//! opposite sides of a known design choice (`sql` against `nosql`), or when
//! they talk about the same topic with opposite polarity ("Use optimistic
//! locking" against "Avoid optimistic locking"). The score combines the worst
//! pair of responses with how closely their confidences agree.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use advisor_agents::matching::{normalize_token, tokenize, TokenSet};
use advisor_agents::GuidanceResponse;

/// Default score a set of responses must reach to be consistent.
pub const DEFAULT_CONSISTENCY_THRESHOLD: f64 = 0.8;

/// Weight of the contradiction component in the final score.
const CONTRADICTION_WEIGHT: f64 = 0.7;
/// Weight of the confidence coherence component.
const COHERENCE_WEIGHT: f64 = 0.3;
/// Minimum topic overlap for a polarity mismatch to count.
const TOPIC_OVERLAP: f64 = 0.5;

/// Mutually exclusive design choices.
pub const OPPOSING_TERMS: &[(&str, &str)] = &[
    ("synchronous", "asynchronous"),
    ("sql", "nosql"),
    ("monolith", "microservices"),
    ("stateful", "stateless"),
    ("pessimistic", "optimistic"),
];

/// Words that flip the polarity of a recommendation.
pub const NEGATION_TERMS: &[&str] = &["avoid", "never", "not", "no", "don't", "dont", "without", "disable"];

const STOPWORDS: &[&str] = &["use", "the", "a", "an", "for", "to", "of", "and", "in", "on", "with", "all"];

/// Kind of contradiction between two responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Opposite sides of a design choice
    OpposingApproach,
    /// Same topic, opposite polarity
    Negation,
}

impl ConflictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::OpposingApproach => "opposing_approach",
            ConflictKind::Negation => "negation",
        }
    }
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A contradiction between the recommendations of two agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub first_agent: String,
    pub second_agent: String,
    pub kind: ConflictKind,
    /// Recommendation of the first agent involved
    pub first: String,
    /// Recommendation of the second agent involved
    pub second: String,
}

impl Conflict {
    /// Whether `agent_id` is one of the two parties.
    pub fn involves(&self, agent_id: &str) -> bool {
        self.first_agent == agent_id || self.second_agent == agent_id
    }

    /// Human readable summary.
    pub fn describe(&self) -> String {
        format!(
            "{} conflict between {} (\"{}\") and {} (\"{}\")",
            self.kind, self.first_agent, self.first, self.second_agent, self.second
        )
    }
}

/// Outcome of a consistency check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyValidationResult {
    /// Agreement in `[0, 1]`
    pub consistency_score: f64,
    pub is_consistent: bool,
    pub validation_time: Duration,
    /// Number of successful responses compared
    pub responses_compared: usize,
    /// `1 - min(1, 10 * variance)` of the compared confidences
    pub confidence_coherence: f64,
    pub conflicts: Vec<Conflict>,
    /// Recommendations given by more than one agent
    pub agreements: Vec<String>,
}

impl ConsistencyValidationResult {
    /// Result for a trivially consistent input.
    pub fn trivial(responses_compared: usize, validation_time: Duration) -> Self {
        Self {
            consistency_score: 1.0,
            is_consistent: true,
            validation_time,
            responses_compared,
            confidence_coherence: 1.0,
            conflicts: Vec::new(),
            agreements: Vec::new(),
        }
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    pub fn meets_threshold(&self, threshold: f64) -> bool {
        self.consistency_score >= threshold
    }
}

/// Scores agreement between agent responses.
#[derive(Debug, Clone, Copy)]
pub struct ConsistencyValidator {
    threshold: f64,
}

impl Default for ConsistencyValidator {
    fn default() -> Self {
        Self::new(DEFAULT_CONSISTENCY_THRESHOLD)
    }
}

impl ConsistencyValidator {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Validate the successful responses among `responses`.
    ///
    /// Non-successful responses carry no recommendations worth comparing and
    /// are skipped. Fewer than two successful responses are consistent.
    pub fn validate(&self, responses: &[GuidanceResponse]) -> ConsistencyValidationResult {
        let started = Instant::now();
        let compared: Vec<&GuidanceResponse> =
            responses.iter().filter(|r| r.is_successful()).collect();

        if compared.len() < 2 {
            return ConsistencyValidationResult::trivial(compared.len(), started.elapsed());
        }

        let mut conflicts = Vec::new();
        let mut worst_pair = 1.0_f64;
        for (i, first) in compared.iter().enumerate() {
            for second in &compared[i + 1..] {
                let found = pair_conflicts(first, second);
                worst_pair = worst_pair.min(1.0 / (1.0 + found.len() as f64));
                conflicts.extend(found);
            }
        }

        let coherence = confidence_coherence(&compared);
        let score = (CONTRADICTION_WEIGHT * worst_pair + COHERENCE_WEIGHT * coherence).clamp(0.0, 1.0);
        let result = ConsistencyValidationResult {
            consistency_score: score,
            is_consistent: score >= self.threshold,
            validation_time: started.elapsed(),
            responses_compared: compared.len(),
            confidence_coherence: coherence,
            conflicts,
            agreements: agreements(&compared),
        };
        debug!(
            "Consistency {:.3} over {} responses ({} conflicts)",
            result.consistency_score,
            result.responses_compared,
            result.conflicts.len()
        );
        result
    }
}

fn confidence_coherence(responses: &[&GuidanceResponse]) -> f64 {
    let n = responses.len() as f64;
    let mean = responses.iter().map(|r| r.confidence).sum::<f64>() / n;
    let variance = responses
        .iter()
        .map(|r| (r.confidence - mean).powi(2))
        .sum::<f64>()
        / n;
    1.0 - (variance * 10.0).min(1.0)
}

fn pair_conflicts(first: &GuidanceResponse, second: &GuidanceResponse) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    let conflict = |kind, a: &str, b: &str| Conflict {
        first_agent: first.agent_id.clone(),
        second_agent: second.agent_id.clone(),
        kind,
        first: a.to_string(),
        second: b.to_string(),
    };

    for (left, right) in OPPOSING_TERMS {
        let (left, right) = (normalize_token(left), normalize_token(right));
        let a_left = mentioning(first, &left);
        let a_right = mentioning(first, &right);
        let b_left = mentioning(second, &left);
        let b_right = mentioning(second, &right);

        let clash = match (a_left, a_right, b_left, b_right) {
            (Some(a), None, None, Some(b)) | (None, Some(a), Some(b), None) => Some((a, b)),
            _ => None,
        };
        if let Some((a, b)) = clash {
            conflicts.push(conflict(ConflictKind::OpposingApproach, a, b));
        }
    }

    for a in &first.recommendations {
        for b in &second.recommendations {
            if is_negated(a) != is_negated(b) && topic(a).jaccard(&topic(b)) >= TOPIC_OVERLAP {
                conflicts.push(conflict(ConflictKind::Negation, a.as_str(), b.as_str()));
            }
        }
    }
    conflicts
}

/// First recommendation of `response` mentioning the normalized `term`.
fn mentioning<'a>(response: &'a GuidanceResponse, term: &str) -> Option<&'a str> {
    response
        .recommendations
        .iter()
        .find(|r| TokenSet::from_text(r).contains(term))
        .map(String::as_str)
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace().map(|w| {
        w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
            .to_lowercase()
    })
}

fn is_negated(text: &str) -> bool {
    words(text).any(|w| NEGATION_TERMS.contains(&w.as_str()))
}

/// Topic tokens of a recommendation: negations and filler words removed.
fn topic(text: &str) -> TokenSet {
    let kept: Vec<String> = words(text)
        .filter(|w| !NEGATION_TERMS.contains(&w.as_str()))
        .flat_map(|w| tokenize(&w))
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect();
    TokenSet::from_text(&kept.join(" "))
}

fn normalize_recommendation(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches('.')
        .to_lowercase()
}

/// Recommendations shared by at least two agents, in first-seen order.
fn agreements(responses: &[&GuidanceResponse]) -> Vec<String> {
    let mut owners: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
    let mut order = Vec::new();
    for response in responses {
        for recommendation in &response.recommendations {
            let key = normalize_recommendation(recommendation);
            let agents = owners.entry(key.clone()).or_default();
            if agents.is_empty() {
                order.push((key, recommendation.clone()));
            }
            agents.insert(response.agent_id.as_str());
        }
    }
    order
        .into_iter()
        .filter(|(key, _)| owners.get(key).map_or(false, |a| a.len() > 1))
        .map(|(_, text)| text)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(agent: &str, confidence: f64, recommendations: &[&str]) -> GuidanceResponse {
        GuidanceResponse::success("req-1", agent, format!("{} guidance", agent), confidence)
            .with_recommendations(recommendations.iter().copied())
    }

    #[test]
    fn test_single_response_is_consistent() {
        let result = ConsistencyValidator::default().validate(&[response("a", 0.9, &["Use JWT"])]);
        assert_eq!(result.consistency_score, 1.0);
        assert!(result.is_consistent);
        assert_eq!(result.responses_compared, 1);
    }

    #[test]
    fn test_compatible_responses() {
        let responses = vec![
            response("arch-1", 0.95, &["Define service boundaries", "Document API contracts"]),
            response("spring-1", 0.92, &["Document API contracts", "Use constructor injection"]),
            response("security-1", 0.93, &["Validate JWT signatures"]),
        ];

        let result = ConsistencyValidator::default().validate(&responses);

        assert!(result.is_consistent);
        assert!(result.consistency_score >= 0.8);
        assert!(result.conflicts.is_empty());
        assert_eq!(result.agreements, vec!["Document API contracts"]);
    }

    #[test]
    fn test_opposing_approaches_conflict() {
        let responses = vec![
            response("data-a", 0.9, &["Store orders in a SQL database"]),
            response("data-b", 0.9, &["Store orders in a NoSQL document store"]),
        ];

        let result = ConsistencyValidator::default().validate(&responses);

        assert!(!result.is_consistent);
        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(result.conflicts[0].kind, ConflictKind::OpposingApproach);
        assert!(result.conflicts[0].involves("data-b"));
    }

    #[test]
    fn test_mentioning_both_sides_is_not_a_stance() {
        let responses = vec![
            response("a", 0.9, &["Compare synchronous and asynchronous calls"]),
            response("b", 0.9, &["Prefer asynchronous messaging"]),
        ];
        let result = ConsistencyValidator::default().validate(&responses);
        assert!(result.conflicts.is_empty());
    }

    #[test]
    fn test_negation_conflict() {
        let responses = vec![
            response("a", 0.9, &["Use optimistic locking"]),
            response("b", 0.9, &["Avoid optimistic locking."]),
        ];

        let result = ConsistencyValidator::default().validate(&responses);

        assert!(!result.is_consistent);
        assert!(result.conflicts.iter().any(|c| c.kind == ConflictKind::Negation));
    }

    #[test]
    fn test_one_bad_pair_breaks_consistency() {
        let responses = vec![
            response("a", 0.9, &["Enable request tracing"]),
            response("b", 0.9, &["Enable request tracing"]),
            response("c", 0.9, &["Enable request tracing"]),
            response("d", 0.9, &["Disable request tracing"]),
        ];
        let result = ConsistencyValidator::default().validate(&responses);
        assert!(!result.is_consistent);
        assert!(result.consistency_score < 0.8);
    }

    #[test]
    fn test_diverging_confidence_lowers_score() {
        let responses = vec![response("a", 1.0, &["Add retries"]), response("b", 0.2, &["Add timeouts"])];
        let result = ConsistencyValidator::default().validate(&responses);
        assert!(result.confidence_coherence < 0.5);
        assert!(!result.is_consistent);
    }

    #[test]
    fn test_failures_are_not_compared() {
        let responses = vec![
            response("a", 0.9, &["Use optimistic locking"]),
            GuidanceResponse::failure("req-1", "b", "Avoid optimistic locking"),
        ];
        let result = ConsistencyValidator::default().validate(&responses);
        assert_eq!(result.responses_compared, 1);
        assert!(result.is_consistent);
    }
}
