//! Route command - Priority routing to the top-ranked agents.

use anyhow::Result;
use clap::Args;
use tracing::info;

use super::consult::print_response;
use super::{Context, RequestArgs};

#[derive(Args)]
pub struct RouteArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// Only show the ranked candidates, do not dispatch
    #[arg(long)]
    dry_run: bool,
}

pub async fn execute(args: RouteArgs, ctx: &Context) -> Result<()> {
    let advisor = ctx.advisor()?;
    let request = args.request.to_request()?;

    if args.dry_run {
        let candidates = advisor.routing.find_candidates(&request);
        if ctx.print_json(&candidates)? {
            return Ok(());
        }
        println!("🎯 {} candidate(s) for {}", candidates.len(), request.domain);
        for (rank, candidate) in candidates.iter().enumerate() {
            println!(
                "  {}. {} score {} keywords {} priority {}{}",
                rank + 1,
                candidate.agent_id,
                candidate.score.points(),
                candidate.keyword_hits,
                candidate.priority,
                if candidate.cross_domain { " (supporting)" } else { "" }
            );
        }
        return Ok(());
    }

    let result = advisor.routing.route_with_priority(&request).await;
    info!("Routing finished with {}", result.status);

    if !ctx.print_json(&result)? {
        let stages: Vec<&str> = result.stages.iter().map(|s| s.as_str()).collect();
        println!("🧭 {} in {:?}", stages.join(" → "), result.routing_time);
        println!("   dispatched: {}", result.dispatched_agents().join(", "));
        if let Some(consistency) = &result.consistency {
            println!(
                "   consistency: {:.2} ({} conflict(s))",
                consistency.consistency_score,
                consistency.conflicts.len()
            );
        }
        println!();
        if let Some(response) = result.final_response() {
            print_response(response);
        }
    }

    if !result.is_successful() {
        anyhow::bail!(
            "Routing failed ({}): {}",
            result.status,
            result.reason.as_deref().unwrap_or("no reason given")
        );
    }
    Ok(())
}
