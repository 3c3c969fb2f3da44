//! Collaborate command - Consult several agents and reconcile them.

use anyhow::Result;
use clap::Args;
use tracing::info;

use super::{Context, RequestArgs};

#[derive(Args)]
pub struct CollaborateArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// Participating agent ids (defaults to the domain workflow)
    #[arg(short, long, value_delimiter = ',')]
    agents: Vec<String>,

    /// Take participants from a named workflow instead
    #[arg(short, long, conflicts_with = "agents")]
    workflow: Option<String>,
}

pub async fn execute(args: CollaborateArgs, ctx: &Context) -> Result<()> {
    let advisor = ctx.advisor()?;
    let request = args.request.to_request()?;

    let participants = if !args.agents.is_empty() {
        args.agents
    } else {
        let workflow = args.workflow.as_deref().unwrap_or(&request.domain);
        advisor.collaboration.get_collaboration_workflow(workflow)
    };
    if participants.is_empty() {
        anyhow::bail!("No agent available for a collaboration on {}", request.domain);
    }
    info!("Collaborating with {}", participants.join(", "));

    let result = advisor
        .collaboration
        .coordinate_consultation(&request, &participants)
        .await;

    if !ctx.print_json(&result)? {
        println!(
            "🤝 {} agent(s), status {} in {:?}",
            result.participants.len(),
            result.status,
            result.total_processing_time
        );
        for id in &result.dropped {
            println!("   ⚠️  {} skipped", id);
        }
        for id in &result.rejected {
            println!("   🔒 {} not permitted for this role", id);
        }
        for response in &result.responses {
            let mark = if response.is_successful() { "✅" } else { "❌" };
            println!("   {} {} ({:.2})", mark, response.agent_id, response.confidence);
        }
        let consistency = result.consistency_result();
        println!(
            "\n📏 Consistency {:.2} (coherence {:.2})",
            consistency.consistency_score, consistency.confidence_coherence
        );
        for conflict in &consistency.conflicts {
            println!("   ⚡ {}", conflict.describe());
        }
        if let Some(resolved) = &result.resolution {
            println!(
                "\n🧩 Resolved with {} ({:.2})",
                resolved
                    .metadata
                    .get("strategy")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown"),
                resolved.confidence
            );
        }
        println!();
        println!("{}", result.consolidated_guidance.trim_end());
        if !result.consolidated_recommendations.is_empty() {
            println!("\n📌 Recommendations:");
            for rec in &result.consolidated_recommendations {
                println!("   - {}", rec);
            }
        }
    }

    if !result.is_successful() {
        anyhow::bail!(
            "Collaboration {}: {}",
            result.status,
            result.reason.as_deref().unwrap_or("see agent responses")
        );
    }
    Ok(())
}
