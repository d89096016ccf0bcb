//! lazy-aws
//!
//! Evaluates a plan and prints the policy document of every resource

use clap::Parser;
use lazy_aws::{MemoryProvisioner, Plan};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "lazy-aws")]
#[command(about = "Author KMS key and encrypted bucket policies from a plan")]
struct Args {
    /// Path to the plan file
    plan: PathBuf,

    /// Only print this resource
    #[arg(short = 'r', long)]
    resource: Option<String>,

    /// Indent JSON output
    #[arg(long)]
    pretty: bool,

    /// Print the full evaluation (addresses, attachments, encryption) instead
    /// of bare policy documents
    #[arg(long)]
    full: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args = Args::parse();

    info!("Loading plan: {:?}", args.plan);
    let plan = Plan::load(&args.plan)?;

    let provisioner = Arc::new(MemoryProvisioner::new(
        plan.partition.clone(),
        plan.region.clone(),
        plan.account_id.clone(),
    ));
    let mut output = plan.evaluate(provisioner)?;
    if let Some(ref only) = args.resource {
        output.retain_named(only);
    }

    if args.full {
        println!("{}", output.to_json_pretty()?);
        return Ok(());
    }

    let mut printed = 0;
    for resource in &output.resources {
        let Some(policy) = &resource.policy else {
            info!("{} has no grants, no policy attached", resource.target);
            continue;
        };

        let json = if args.pretty {
            policy.to_json_pretty()?
        } else {
            policy.to_json()?
        };
        println!("# {}", resource.target);
        println!("{}", json);
        printed += 1;
    }

    if printed == 0 {
        warn!("No policy documents matched");
    }

    Ok(())
}
