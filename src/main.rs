// Command-line entry point for running rigger workflows
use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use std::io::stderr;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

mod cmd;

use cmd::run::RunArgs;
use cmd::show::ShowArgs;

#[derive(Parser, Debug)]
#[command(author, version, about = "Rigger workflow engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output - shows more detailed logs
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs a JSON workflow and reports its result.
    Run(RunArgs),
    /// Parses a JSON workflow and prints its command tree.
    Show(ShowArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // RUST_LOG wins; otherwise only rigger's own crates log
    let level = if cli.verbose { "debug" } else { "info" };
    let default_directives = format!(
        "rigger={level},rigger_commands={level},rigger_workflow={level}",
        level = level
    );
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));
    registry()
        .with(filter)
        .with(fmt::layer().with_writer(stderr))
        .init();

    debug!("Global logger initialized.");

    match cli.command {
        Commands::Run(args) => cmd::run::run_workflow(args).await,
        Commands::Show(args) => cmd::show::show_workflow(args),
    }
}
