//! Process execution command
//!
//! Runs an external program in the background. Every line the program
//! writes to stdout or stderr becomes a log entry for the command; the
//! captured stdout becomes the result output.
//!
//! Fields:
//! - `cmd` (required): Program to run
//! - `args` (optional): Arguments passed to the program

use super::{report, spawn_background};
use crate::error::{CommandError, Result};
use crate::handler::CommandHandler;
use crate::id::{CommandId, WorkflowRunId};
use crate::result::CommandResult;
use crate::traits::{AsyncCommand, CommandInfo};
use std::any::Any;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

pub struct Exec {
    id: CommandId,
    program: String,
    args: Vec<String>,
    handler: Arc<CommandHandler>,
}

impl Exec {
    pub fn new(handler: Arc<CommandHandler>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            id: CommandId::generate("exec"),
            program: program.into(),
            args,
            handler,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl CommandInfo for Exec {
    fn id(&self) -> &CommandId {
        &self.id
    }

    fn name(&self) -> &str {
        "exec"
    }

    fn describe(&self) -> String {
        format!("exec ({}): {}", self.id, self.command_line())
    }

    fn user_string(&self) -> String {
        format!("Running {}", self.command_line())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl AsyncCommand for Exec {
    fn start(&self, _run: &WorkflowRunId) -> Result<()> {
        if self.program.trim().is_empty() {
            return Err(CommandError::InvalidParameters(
                "exec requires a non-empty 'cmd'".to_string(),
            ));
        }

        let handler = self.handler.clone();
        let id = self.id.clone();
        let program = self.program.clone();
        let args = self.args.clone();
        let line = self.user_string();

        spawn_background(&self.id, async move {
            report(&handler, &id, &line);
            let (result, error) = match run_process(&handler, &id, &program, &args).await {
                Ok(mut result) => {
                    let error = result.error.take();
                    (result, error)
                }
                Err(e) => (CommandResult::failure(e.to_string()), Some(e)),
            };
            if let Err(e) = handler.finish_command(&id, result, error) {
                warn!(command = %id, error = %e, "Could not deliver exec result");
            }
        })
    }
}

async fn run_process(
    handler: &CommandHandler,
    id: &CommandId,
    program: &str,
    args: &[String],
) -> Result<CommandResult> {
    debug!(command = %id, program, ?args, "Spawning process");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| CommandError::InvalidState("stdout was not captured".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| CommandError::InvalidState("stderr was not captured".to_string()))?;

    let read_stdout = async {
        let mut lines = BufReader::new(stdout).lines();
        let mut captured = Vec::new();
        while let Some(line) = lines.next_line().await? {
            report(handler, id, &line);
            captured.push(line);
        }
        Ok::<_, std::io::Error>(captured)
    };
    let read_stderr = async {
        let mut lines = BufReader::new(stderr).lines();
        while let Some(line) = lines.next_line().await? {
            report(handler, id, &line);
        }
        Ok::<_, std::io::Error>(())
    };

    let (captured, ()) = tokio::try_join!(read_stdout, read_stderr)?;
    let status = child.wait().await?;
    let output = captured.join("\n");

    if status.success() {
        Ok(CommandResult::success(output))
    } else {
        let message = format!("{} exited with {}", program, status);
        Ok(CommandResult::failure(output).with_error(CommandError::ExecutionFailed(message)))
    }
}
