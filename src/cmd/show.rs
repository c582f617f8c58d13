use clap::Args;
use color_eyre::eyre::{Result, WrapErr};
use rigger_commands::CommandHandler;
use rigger_workflow::CommandParser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Path to the JSON workflow to print
    pub file: PathBuf,
}

pub fn show_workflow(args: ShowArgs) -> Result<()> {
    let input = super::read_workflow(&args.file)?;
    let parser = CommandParser::with_defaults(Arc::new(CommandHandler::new()));
    let command = parser
        .parse(&input)
        .wrap_err_with(|| format!("Invalid workflow in {}", args.file.display()))?;

    println!("{}", command.pretty_print(0));
    Ok(())
}
