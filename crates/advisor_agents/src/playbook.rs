//! Keyword-triggered guidance playbooks.

use crate::matching::TokenSet;
use crate::request::ConsultationRequest;

/// Maximum recommendations returned for one consultation.
pub const MAX_RECOMMENDATIONS: usize = 5;

/// One block of guidance, selected when any trigger appears in the query.
#[derive(Debug, Clone, Copy)]
pub struct Section {
    pub triggers: &'static [&'static str],
    pub heading: &'static str,
    pub points: &'static [&'static str],
    pub recommendations: &'static [&'static str],
}

impl Section {
    fn matches(&self, query: &TokenSet) -> bool {
        self.triggers.iter().any(|t| query.contains_phrase(t))
    }
}

/// The guidance an agent can give: triggered sections plus a fallback.
#[derive(Debug, Clone, Copy)]
pub struct Playbook {
    pub sections: &'static [Section],
    pub fallback: Section,
}

/// Guidance text and recommendations composed for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedGuidance {
    pub guidance: String,
    pub recommendations: Vec<String>,
    /// Headings of the sections that fired
    pub sections: Vec<&'static str>,
}

impl Playbook {
    /// Sections triggered by the request query, or the fallback.
    pub fn select(&self, request: &ConsultationRequest) -> Vec<&Section> {
        let query = TokenSet::from_text(&request.query);
        let matched: Vec<&Section> = self.sections.iter().filter(|s| s.matches(&query)).collect();
        if matched.is_empty() {
            vec![&self.fallback]
        } else {
            matched
        }
    }

    /// Compose guidance for a request on behalf of `agent_name`.
    pub fn compose(&self, agent_name: &str, request: &ConsultationRequest) -> ComposedGuidance {
        let selected = self.select(request);

        let mut guidance = format!(
            "{} guidance for {}: {}\n",
            agent_name,
            request.domain,
            request.query.trim()
        );
        let mut recommendations: Vec<String> = Vec::new();

        for section in &selected {
            guidance.push_str(&format!("\n{}:\n", section.heading));
            for point in section.points {
                guidance.push_str(&format!("- {}\n", point));
            }
            for rec in section.recommendations {
                if !recommendations.iter().any(|r| r == rec) {
                    recommendations.push(rec.to_string());
                }
            }
        }
        recommendations.truncate(MAX_RECOMMENDATIONS);

        ComposedGuidance {
            guidance,
            recommendations,
            sections: selected.iter().map(|s| s.heading).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYBOOK: Playbook = Playbook {
        sections: &[
            Section {
                triggers: &["jwt", "token"],
                heading: "Token Handling",
                points: &["Sign tokens with RS256"],
                recommendations: &["Rotate signing keys", "Keep token lifetimes short"],
            },
            Section {
                triggers: &["cors"],
                heading: "CORS",
                points: &["Allow-list origins explicitly"],
                recommendations: &["Rotate signing keys", "Restrict allowed origins"],
            },
        ],
        fallback: Section {
            triggers: &[],
            heading: "General",
            points: &["Start from a threat model"],
            recommendations: &["Run an OWASP review"],
        },
    };

    #[test]
    fn test_compose_matched_sections() {
        let request = ConsultationRequest::new("security", "JWT and CORS setup");
        let composed = PLAYBOOK.compose("Security Agent", &request);

        assert_eq!(composed.sections, vec!["Token Handling", "CORS"]);
        assert!(composed.guidance.contains("Sign tokens with RS256"));
        assert_eq!(
            composed.recommendations,
            vec!["Rotate signing keys", "Keep token lifetimes short", "Restrict allowed origins"]
        );
    }

    #[test]
    fn test_compose_fallback() {
        let request = ConsultationRequest::new("security", "Where do I start?");
        let composed = PLAYBOOK.compose("Security Agent", &request);

        assert_eq!(composed.sections, vec!["General"]);
        assert_eq!(composed.recommendations, vec!["Run an OWASP review"]);
        assert!(composed.guidance.starts_with("Security Agent guidance for security"));
    }
}
