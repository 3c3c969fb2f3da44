//! Capability and keyword matching.
//!
//! A single scoring function decides whether an agent can handle a request
//! and how well it fits. Query text and capability tags are reduced to
//! normalized token sets; a capability hits when every one of its tokens
//! appears in the query.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::request::ConsultationRequest;

/// Broad-match terms that let any agent volunteer for a request.
pub const GENERIC_TRIGGERS: &[&str] = &["system", "architecture"];

/// Normalize a single token: lowercase, with a plural `s` stripped.
pub fn normalize_token(token: &str) -> String {
    let lower = token.to_lowercase();
    if lower.len() > 3 && lower.ends_with('s') && !lower.ends_with("ss") {
        lower[..lower.len() - 1].to_string()
    } else {
        lower
    }
}

/// Split text into normalized tokens. Anything that is not alphanumeric is a
/// separator, so `spring-boot` yields `spring` and `boot`.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(normalize_token)
        .collect()
}

/// Normalized token set of a piece of text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSet(BTreeSet<String>);

impl TokenSet {
    pub fn from_text(text: &str) -> Self {
        Self(tokenize(text).into_iter().collect())
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }

    /// True when every token of `phrase` is present.
    pub fn contains_phrase(&self, phrase: &str) -> bool {
        let tokens = tokenize(phrase);
        !tokens.is_empty() && tokens.iter().all(|t| self.0.contains(t))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    /// Jaccard similarity with another set; two empty sets are identical.
    pub fn jaccard(&self, other: &TokenSet) -> f64 {
        if self.0.is_empty() && other.0.is_empty() {
            return 1.0;
        }
        let intersection = self.0.intersection(&other.0).count() as f64;
        let union = self.0.union(&other.0).count() as f64;
        intersection / union
    }
}

/// How well an agent fits a request.
///
/// Ordering compares the domain match first, then the number of capability
/// hits, then the generic fallback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchScore {
    /// Request domain equals the agent domain
    pub domain_match: bool,
    /// Number of agent capabilities found in the query
    pub capability_hits: usize,
    /// Query contains a generic trigger term
    pub generic: bool,
}

impl MatchScore {
    /// Whether the agent can handle the request at all.
    pub fn is_match(&self) -> bool {
        self.domain_match || self.capability_hits > 0 || self.generic
    }

    /// Collapse the score into a single number for display and ranking.
    pub fn points(&self) -> u32 {
        let domain = if self.domain_match { 1000 } else { 0 };
        let generic = if self.generic { 1 } else { 0 };
        domain + (self.capability_hits as u32).saturating_mul(10) + generic
    }
}

impl Ord for MatchScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.domain_match
            .cmp(&other.domain_match)
            .then(self.capability_hits.cmp(&other.capability_hits))
            .then(self.generic.cmp(&other.generic))
    }
}

impl PartialOrd for MatchScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Case-insensitive domain equality.
pub fn same_domain(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Capabilities of an agent that appear in the query tokens.
pub fn matched_capabilities<'a>(query: &TokenSet, capabilities: &'a [String]) -> Vec<&'a str> {
    capabilities
        .iter()
        .filter(|cap| query.contains_phrase(cap))
        .map(String::as_str)
        .collect()
}

/// Score an agent described by `domain` and `capabilities` against a request.
pub fn score(request: &ConsultationRequest, domain: &str, capabilities: &[String]) -> MatchScore {
    let query = TokenSet::from_text(&request.query);
    MatchScore {
        domain_match: same_domain(&request.domain, domain),
        capability_hits: matched_capabilities(&query, capabilities).len(),
        generic: GENERIC_TRIGGERS.iter().any(|t| query.contains(t)),
    }
}

/// Whether a domain name is covered by a capability set, e.g. `performance`
/// by `performance-monitoring`.
pub fn domain_covered_by(domain: &str, capabilities: &[String]) -> bool {
    let domain_tokens = tokenize(domain);
    if domain_tokens.is_empty() {
        return false;
    }
    capabilities.iter().any(|cap| {
        let cap_tokens = tokenize(cap);
        domain_tokens.iter().all(|t| cap_tokens.contains(t))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_tokenize_normalizes() {
        assert_eq!(
            tokenize("Spring-Boot services, JWT!"),
            vec!["spring", "boot", "service", "jwt"]
        );
        assert_eq!(normalize_token("class"), "class");
        assert_eq!(normalize_token("ssl"), "ssl");
    }

    #[test]
    fn test_capability_phrase_hit() {
        let query = TokenSet::from_text("Configure spring boot actuator endpoints");
        assert!(query.contains_phrase("spring-boot"));
        assert!(!query.contains_phrase("spring-security"));
    }

    #[test]
    fn test_score_ordering() {
        let request = ConsultationRequest::new("security", "Implement JWT authentication");
        let security = score(&request, "security", &caps(&["jwt", "authentication"]));
        let gateway = score(&request, "integration-gateway", &caps(&["jwt", "api-gateway"]));

        assert!(security.domain_match);
        assert_eq!(security.capability_hits, 2);
        assert_eq!(gateway.capability_hits, 1);
        assert!(security > gateway);
        assert!(security.points() > gateway.points());
    }

    #[test]
    fn test_generic_trigger() {
        let request = ConsultationRequest::new("unknown", "Review the overall system");
        let s = score(&request, "testing", &caps(&["unit-testing"]));
        assert!(s.generic);
        assert!(s.is_match());

        let request = ConsultationRequest::new("unknown", "Bake a cake");
        assert!(!score(&request, "testing", &caps(&["unit-testing"])).is_match());
    }

    #[test]
    fn test_domain_covered_by_capability() {
        let capabilities = caps(&["metrics", "performance-monitoring"]);
        assert!(domain_covered_by("performance", &capabilities));
        assert!(!domain_covered_by("security", &capabilities));
        assert!(!domain_covered_by("", &capabilities));
    }

    #[test]
    fn test_jaccard() {
        let a = TokenSet::from_text("use event sourcing");
        let b = TokenSet::from_text("use event sourcing");
        let c = TokenSet::from_text("write docs");
        assert_eq!(a.jaccard(&b), 1.0);
        assert_eq!(a.jaccard(&c), 0.0);
    }
}
