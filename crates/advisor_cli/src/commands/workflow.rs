//! Workflow command - Show which agents a domain consults.

use anyhow::Result;
use clap::Args;

use super::Context;

#[derive(Args)]
pub struct WorkflowArgs {
    /// Domain or workflow name, e.g. deployment-pipeline
    domain: String,
}

pub async fn execute(args: WorkflowArgs, ctx: &Context) -> Result<()> {
    let advisor = ctx.advisor()?;
    let agents = advisor.collaboration.get_collaboration_workflow(&args.domain);

    if ctx.print_json(&agents)? {
        return Ok(());
    }
    if agents.is_empty() {
        anyhow::bail!("No agent available for workflow {}", args.domain);
    }
    println!("🔀 {}: {}", args.domain, agents.join(" → "));
    Ok(())
}
