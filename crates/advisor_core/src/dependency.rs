//! Agent dependency graph and cross-domain support rules.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, error};

use advisor_agents::Agent;

use crate::error::{AdvisorError, AdvisorResult};

/// Domains that support a primary domain in a consultation.
pub fn cross_domain_support(domain: &str) -> &'static [&'static str] {
    match domain.trim().to_lowercase().as_str() {
        "implementation" => &["security", "observability", "business"],
        "deployment" => &["security", "observability"],
        "integration" => &["security", "governance"],
        "testing" => &["security"],
        "architecture" | "system-architecture" => &["governance"],
        _ => &[],
    }
}

#[derive(Debug, Clone)]
struct Node {
    priority: u32,
    dependencies: Vec<String>,
}

/// Directed graph of "agent depends on agent" edges.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeMap<String, Node>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from agent profiles.
    pub fn from_agents(agents: &[Arc<dyn Agent>]) -> Self {
        let mut graph = Self::new();
        for agent in agents {
            let profile = agent.profile();
            graph.add(&profile.id, profile.priority, profile.dependencies.iter().cloned());
        }
        graph
    }

    /// Add or replace a node.
    pub fn add<I>(&mut self, id: &str, priority: u32, dependencies: I)
    where
        I: IntoIterator<Item = String>,
    {
        let dependencies: Vec<String> = dependencies.into_iter().collect();
        debug!("Registered agent {} with dependencies {:?}", id, dependencies);
        self.nodes.insert(
            id.to_string(),
            Node {
                priority,
                dependencies,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Direct dependencies of an agent.
    pub fn dependencies_of(&self, id: &str) -> Vec<String> {
        self.nodes
            .get(id)
            .map(|n| n.dependencies.clone())
            .unwrap_or_default()
    }

    /// Agents that directly depend on `id`.
    pub fn dependents_of(&self, id: &str) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.dependencies.iter().any(|d| d == id))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Fail on the first dependency that is not part of the graph.
    pub fn check_missing(&self) -> AdvisorResult<()> {
        for (id, node) in &self.nodes {
            if let Some(dep) = node.dependencies.iter().find(|d| !self.nodes.contains_key(*d)) {
                return Err(AdvisorError::MissingDependency {
                    agent: id.clone(),
                    dependency: dep.clone(),
                });
            }
        }
        Ok(())
    }

    /// Whether every dependency of `id` is in `available`.
    pub fn dependencies_satisfied(&self, id: &str, available: &BTreeSet<String>) -> bool {
        self.nodes
            .get(id)
            .map_or(true, |n| n.dependencies.iter().all(|d| available.contains(d)))
    }

    /// Kahn's algorithm over the whole graph; dependencies come first and
    /// ready nodes are taken by descending priority, then id.
    pub fn topological_order(&self) -> AdvisorResult<Vec<String>> {
        let ids: Vec<&str> = self.nodes.keys().map(String::as_str).collect();
        self.order_subset(&ids)
    }

    /// Order a subset of agents so dependencies come first. Edges to agents
    /// outside the subset are ignored; ids unknown to the graph keep
    /// priority zero.
    pub fn order_subset(&self, ids: &[&str]) -> AdvisorResult<Vec<String>> {
        let members: BTreeSet<&str> = ids.iter().copied().collect();
        let mut in_degree: BTreeMap<&str, usize> = members.iter().map(|id| (*id, 0)).collect();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

        for id in &members {
            if let Some(node) = self.nodes.get(*id) {
                for dep in &node.dependencies {
                    if members.contains(dep.as_str()) {
                        dependents.entry(dep.as_str()).or_default().push(*id);
                        *in_degree.entry(*id).or_default() += 1;
                    }
                }
            }
        }

        let priority = |id: &str| self.nodes.get(id).map_or(0, |n| n.priority);
        let mut ready: Vec<&str> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut order = Vec::with_capacity(members.len());

        while !ready.is_empty() {
            // Highest priority last so `pop` takes it; ties broken by id.
            ready.sort_by(|a, b| priority(*a).cmp(&priority(*b)).then(b.cmp(a)));
            let Some(current) = ready.pop() else { break };
            order.push(current.to_string());

            for next in dependents.get(current).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(next) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(*next);
                    }
                }
            }
        }

        if order.len() != members.len() {
            let mut remaining: Vec<String> = in_degree
                .into_iter()
                .filter(|(_, d)| *d > 0)
                .map(|(id, _)| id.to_string())
                .collect();
            remaining.sort();
            error!("Circular dependency detected in agent graph: {:?}", remaining);
            return Err(AdvisorError::DependencyCycle(remaining));
        }
        Ok(order)
    }

    /// Length of the longest dependency chain below `id`; roots are level 0.
    pub fn hierarchy_level(&self, id: &str) -> AdvisorResult<usize> {
        let mut visiting = BTreeSet::new();
        self.level(id, &mut visiting)
    }

    fn level(&self, id: &str, visiting: &mut BTreeSet<String>) -> AdvisorResult<usize> {
        let Some(node) = self.nodes.get(id) else {
            return Ok(0);
        };
        if !visiting.insert(id.to_string()) {
            return Err(AdvisorError::DependencyCycle(visiting.iter().cloned().collect()));
        }
        let mut level = 0;
        for dep in &node.dependencies {
            if self.nodes.contains_key(dep) {
                level = level.max(self.level(dep, visiting)? + 1);
            }
        }
        visiting.remove(id);
        Ok(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, u32, &[&str])]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for (id, priority, deps) in edges {
            graph.add(id, *priority, deps.iter().map(|d| d.to_string()));
        }
        graph
    }

    #[test]
    fn test_topological_order() {
        let graph = graph(&[
            ("testing", 70, &["implementation"]),
            ("implementation", 90, &["architecture"]),
            ("architecture", 100, &[]),
            ("security", 95, &[]),
        ]);

        let order = graph.topological_order().unwrap();
        assert_eq!(order, vec!["architecture", "security", "implementation", "testing"]);
    }

    #[test]
    fn test_cycle_detected() {
        let graph = graph(&[("a", 1, &["b"]), ("b", 1, &["c"]), ("c", 1, &["a"]), ("d", 1, &[])]);
        match graph.topological_order() {
            Err(AdvisorError::DependencyCycle(ids)) => assert_eq!(ids, vec!["a", "b", "c"]),
            other => panic!("expected cycle, got {:?}", other),
        }
        assert!(graph.hierarchy_level("a").is_err());
    }

    #[test]
    fn test_missing_dependency() {
        let graph = graph(&[("a", 1, &["ghost"])]);
        assert!(matches!(
            graph.check_missing(),
            Err(AdvisorError::MissingDependency { .. })
        ));
    }

    #[test]
    fn test_hierarchy_levels() {
        let graph = graph(&[
            ("architecture", 100, &[]),
            ("implementation", 90, &["architecture"]),
            ("pair", 80, &["implementation"]),
        ]);
        assert_eq!(graph.hierarchy_level("architecture").unwrap(), 0);
        assert_eq!(graph.hierarchy_level("pair").unwrap(), 2);
        assert_eq!(graph.dependents_of("architecture"), vec!["implementation"]);
    }

    #[test]
    fn test_order_subset_ignores_outside_edges() {
        let graph = graph(&[
            ("architecture", 100, &[]),
            ("implementation", 90, &["architecture"]),
            ("testing", 70, &["implementation"]),
        ]);
        let order = graph.order_subset(&["testing", "architecture"]).unwrap();
        assert_eq!(order, vec!["architecture", "testing"]);
    }

    #[test]
    fn test_cross_domain_support() {
        assert_eq!(cross_domain_support("Deployment"), &["security", "observability"]);
        assert!(cross_domain_support("documentation").is_empty());
    }
}
