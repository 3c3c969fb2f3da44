//! Consult command - Ask the best agent, falling back to its backups.

use anyhow::Result;
use clap::Args;
use tracing::info;

use advisor_agents::GuidanceResponse;

use super::{Context, RequestArgs};

#[derive(Args)]
pub struct ConsultArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// Consult only the best agent, without failover
    #[arg(long)]
    no_failover: bool,
}

pub async fn execute(args: ConsultArgs, ctx: &Context) -> Result<()> {
    let advisor = ctx.advisor()?;
    let request = args.request.to_request()?;
    info!("Consulting on {} ({})", request.domain, request.request_id);

    let response = if args.no_failover {
        advisor.registry.consult_best_agent(&request).await
    } else {
        advisor.failover.consult_with_failover(&request).await
    };

    if !ctx.print_json(&response)? {
        print_response(&response);
    }

    if !response.is_successful() {
        anyhow::bail!(
            "No agent answered: {}",
            response.error_message().unwrap_or(response.status.as_str())
        );
    }
    Ok(())
}

/// Human-readable rendering of one agent response.
pub fn print_response(response: &GuidanceResponse) {
    println!(
        "🤖 {} [{}] confidence {:.2} in {:?}",
        response.agent_id, response.status, response.confidence, response.processing_time
    );
    println!();
    println!("{}", response.guidance.trim_end());
    if !response.recommendations.is_empty() {
        println!();
        println!("📌 Recommendations:");
        for rec in &response.recommendations {
            println!("   - {}", rec);
        }
    }
}
