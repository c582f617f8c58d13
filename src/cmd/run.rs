use clap::Args;
use color_eyre::eyre::{Result, WrapErr};
use rigger_commands::{CommandHandler, WorkflowRunId};
use rigger_workflow::{RunReport, WorkflowExecutor};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

const RUN_ID_ENV: &str = "RIGGER_RUN_ID";

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the JSON workflow to run
    pub file: PathBuf,

    /// Identifier for this run (defaults to $RIGGER_RUN_ID, then a fresh uuid)
    #[arg(long)]
    pub run_id: Option<String>,

    /// Print the run report as JSON instead of plain text
    #[arg(long)]
    pub json: bool,
}

fn resolve_run_id(explicit: Option<String>) -> WorkflowRunId {
    explicit
        .or_else(|| std::env::var(RUN_ID_ENV).ok())
        .filter(|id| !id.trim().is_empty())
        .map(WorkflowRunId::from)
        .unwrap_or_else(WorkflowRunId::generate)
}

pub async fn run_workflow(args: RunArgs) -> Result<()> {
    let input = super::read_workflow(&args.file)?;
    let run = resolve_run_id(args.run_id);
    info!(run = %run, file = %args.file.display(), "Running workflow");

    let executor = WorkflowExecutor::new(Arc::new(CommandHandler::new()));
    let command = executor
        .parser()
        .parse(&input)
        .wrap_err_with(|| format!("Invalid workflow in {}", args.file.display()))?;

    let report = tokio::select! {
        report = executor.execute(&command, &run) => report.wrap_err("Workflow aborted")?,
        _ = tokio::signal::ctrl_c() => {
            error!(run = %run, "Interrupted, abandoning running commands");
            eprintln!("Interrupted");
            std::process::exit(130);
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.success {
        std::process::exit(1);
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    let output = report.output.trim_end();
    if !output.is_empty() {
        println!("{}", output);
    }

    let elapsed = report.completed_at - report.started_at;
    if report.success {
        println!(
            "Workflow {} succeeded in {}ms",
            report.run_id,
            elapsed.num_milliseconds()
        );
    } else {
        println!(
            "Workflow {} failed in {}ms",
            report.run_id,
            elapsed.num_milliseconds()
        );
        if let Some(error) = &report.error {
            eprintln!("Error: {}", error);
        }
    }
}
