//! Agents command - List registered agents.

use std::collections::BTreeMap;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tracing::info;

use advisor_agents::AgentProfile;
use advisor_core::RegistryHealth;

use super::Context;

#[derive(Args)]
pub struct AgentsArgs {
    /// Only list agents serving this domain
    #[arg(short, long)]
    domain: Option<String>,

    /// Only list agents declaring this capability
    #[arg(long)]
    capability: Option<String>,

    /// Show dependency order and health
    #[arg(long)]
    health: bool,
}

#[derive(Serialize)]
struct AgentListing {
    agents: Vec<AgentProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dependency_order: Option<Vec<String>>,
    /// Longest dependency chain below each agent
    #[serde(skip_serializing_if = "Option::is_none")]
    levels: Option<BTreeMap<String, usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    health: Option<RegistryHealth>,
}

pub async fn execute(args: AgentsArgs, ctx: &Context) -> Result<()> {
    let advisor = ctx.advisor()?;
    let registry = &advisor.registry;

    let agents = match (&args.domain, &args.capability) {
        (Some(domain), _) => registry.agents_for_domain(domain),
        (None, Some(capability)) => registry.find_agents_by_capability(capability),
        (None, None) => registry.all_agents(),
    };
    info!("Listing {} agent(s)", agents.len());

    let mut listing = AgentListing {
        agents: agents.iter().map(|a| a.profile().clone()).collect(),
        dependency_order: if args.health {
            Some(registry.validate_dependencies()?)
        } else {
            None
        },
        levels: None,
        health: args.health.then(|| registry.health()),
    };
    if args.health {
        let graph = registry.dependency_graph();
        let mut levels = BTreeMap::new();
        for profile in &listing.agents {
            levels.insert(profile.id.clone(), graph.hierarchy_level(&profile.id)?);
        }
        listing.levels = Some(levels);
    }
    if ctx.print_json(&listing)? {
        return Ok(());
    }

    if listing.agents.is_empty() {
        println!("⚠️  No agents match");
        return Ok(());
    }

    println!("🤖 {} agent(s)\n", listing.agents.len());
    for profile in &listing.agents {
        println!("  {} ({})", profile.id, profile.name);
        println!("     domain: {}  priority: {}", profile.domain, profile.priority);
        println!("     capabilities: {}", profile.capabilities.join(", "));
        if !profile.dependencies.is_empty() {
            println!("     depends on: {}", profile.dependencies.join(", "));
        }
        if let Some(level) = listing.levels.as_ref().and_then(|l| l.get(&profile.id)) {
            println!("     hierarchy level: {}", level);
        }
    }

    if let Some(order) = &listing.dependency_order {
        println!("\n🔗 Initialization order: {}", order.join(" → "));
    }
    if let Some(health) = &listing.health {
        println!(
            "\n💚 {}/{} available ({:.0}%)",
            health.available_agents,
            health.total_agents,
            health.availability_ratio * 100.0
        );
        for id in &health.unavailable {
            println!("   ❌ {} unavailable", id);
        }
    }
    Ok(())
}
