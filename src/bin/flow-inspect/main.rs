//! CLI tool to inspect and normalize exported workflow snapshots.
//!
//! Usage:
//!   flow-inspect --input workflow.json [--view list|tree] [--validate] [--stats] [--output normalized.json]

mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use outreach_flow::workflow::SnapshotInput;
use outreach_flow::{EditorContext, ListView, StepKind, TreeView, WorkflowManager};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum View {
    List,
    Tree,
}

#[derive(Parser, Debug)]
#[command(
    name = "flow-inspect",
    about = "Inspect a workflow {steps, stepConfigs} export",
    version
)]
struct Args {
    /// Input JSON file path
    #[arg(short, long)]
    input: PathBuf,

    /// Render the workflow as the list or tree editor shows it
    #[arg(long, value_enum)]
    view: Option<View>,

    /// Write the normalized snapshot here
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Check structural invariants after import
    #[arg(long, default_value = "false")]
    validate: bool,

    /// Print statistics about the workflow
    #[arg(long, default_value = "false")]
    stats: bool,

    /// Workflow name used for defaults the file leaves out
    #[arg(long, env = "FLOW_WORKFLOW_NAME", default_value = "")]
    workflow_name: String,

    /// Workflow date used for defaults the file leaves out
    #[arg(long, env = "FLOW_WORKFLOW_DATE", default_value = "")]
    workflow_date: String,

    #[arg(long, env = "FLOW_PROJECT_ID")]
    project_id: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,outreach_flow=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let input_path = &args.input;
    if !input_path.exists() {
        anyhow::bail!("Input file does not exist: {}", input_path.display());
    }

    let json_content =
        std::fs::read_to_string(input_path).context("Failed to read input file")?;
    let input = SnapshotInput::from_json(&json_content).context("Failed to parse JSON")?;

    let ctx = EditorContext {
        project_id: args.project_id.clone(),
        workflow_name: args.workflow_name.clone(),
        workflow_date: args.workflow_date.clone(),
    };
    let manager =
        WorkflowManager::from_snapshot(ctx, input).context("Failed to import workflow")?;
    tracing::info!(steps = manager.len(), "workflow loaded");

    if args.validate {
        manager
            .check_invariants()
            .context("Validation failed")?;
        println!("✓ Validation passed!");
    }

    match args.view {
        Some(View::List) => print!("{}", render::list(&ListView::build(&manager))),
        Some(View::Tree) => print!("{}", render::tree(&TreeView::build(&manager))),
        None => {}
    }

    if args.stats {
        let nested = manager.len() - manager.main_flow_ids().len();
        println!();
        println!("Workflow statistics:");
        println!("  Name:       {}", manager.context().workflow_name);
        println!("  Steps:      {}", manager.len());
        println!("  Main flow:  {}", manager.main_flow_ids().len());
        println!("  In branches:{:>3}", nested);
        println!();
        for kind in StepKind::ALL {
            let count = manager.steps().iter().filter(|s| s.kind == kind).count();
            if count > 0 {
                println!("  {:<20} {}", kind.default_label(), count);
            }
        }
    }

    if let Some(output_path) = &args.output {
        let normalized = manager
            .snapshot()
            .to_json()
            .context("Failed to serialize snapshot")?;
        std::fs::write(output_path, normalized).context("Failed to write output file")?;
        println!();
        println!(
            "Normalized {} → {}",
            input_path.display(),
            output_path.display()
        );
    }

    Ok(())
}
