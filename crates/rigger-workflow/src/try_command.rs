//! Fallback composite command
//!
//! A `Try` runs its primary command and, only if that fails, runs the
//! `on_fail` command in its place. The composite's result is the
//! fallback's result whenever the fallback ran.

use crate::child::{forward_logs, run_child};
use async_trait::async_trait;
use rigger_commands::{
    Command, CommandHandler, CommandId, CommandInfo, CommandResult, Result, SyncCommand,
    WorkflowRunId,
};
use std::any::Any;
use std::sync::Arc;
use tracing::{info, warn};

pub struct Try {
    id: CommandId,
    description: String,
    command: Command,
    on_fail: Command,
    handler: Arc<CommandHandler>,
}

impl Try {
    pub fn new(
        handler: Arc<CommandHandler>,
        description: impl Into<String>,
        command: Command,
        on_fail: Command,
    ) -> Self {
        Self {
            id: CommandId::generate("try"),
            description: description.into(),
            command,
            on_fail,
            handler,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn on_fail(&self) -> &Command {
        &self.on_fail
    }
}

impl CommandInfo for Try {
    fn id(&self) -> &CommandId {
        &self.id
    }

    fn name(&self) -> &str {
        "try"
    }

    fn describe(&self) -> String {
        format!(
            "try ({}) {} else {}",
            self.id,
            self.command.describe(),
            self.on_fail.describe()
        )
    }

    fn pretty_print(&self, indent: usize) -> String {
        [
            format!(
                "{:indent$}try ({}): {}",
                "",
                self.id,
                self.description,
                indent = indent
            ),
            self.command.pretty_print(indent + 2),
            format!("{:indent$}on fail:", "", indent = indent),
            self.on_fail.pretty_print(indent + 2),
        ]
        .join("\n")
    }

    fn user_string(&self) -> String {
        if self.description.is_empty() {
            format!("Try {}", self.command.user_string())
        } else {
            self.description.clone()
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl SyncCommand for Try {
    async fn run(&self, run: &WorkflowRunId) -> Result<CommandResult> {
        info!(run = %run, command = %self.id, "Running try");
        let on_log = forward_logs(&self.handler, &self.id);

        let failure = match run_child(&self.handler, &self.command, run, on_log.clone()).await {
            Ok(done) => {
                let result = done.into_result();
                if result.success {
                    return Ok(CommandResult::success(result.output).no_show());
                }
                result
                    .error
                    .map(|e| e.to_string())
                    .unwrap_or(result.output)
            }
            Err(e) => e.to_string(),
        };

        warn!(run = %run, command = %self.id, primary = %self.command.id(), error = %failure, "Primary command failed, running fallback");
        let done = run_child(&self.handler, &self.on_fail, run, on_log).await?;
        Ok(done.into_result())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::Group;
    use rigger_commands::{CommandError, Fail, Logger};

    fn run_id() -> WorkflowRunId {
        WorkflowRunId::from("try-test")
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let handler = Arc::new(CommandHandler::new());
        let fallback = Command::new_sync(Logger::new(handler.clone(), "fallback ran"));
        let cmd = Try::new(
            handler.clone(),
            "",
            Command::new_sync(Logger::new(handler.clone(), "primary ran")),
            fallback,
        );

        let result = cmd.run(&run_id()).await.unwrap();

        assert!(result.is_success());
        assert!(!result.is_visible());
        assert_eq!(result.output, "primary ran");
        assert!(handler.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_success_recovers() {
        let handler = Arc::new(CommandHandler::new());
        let cmd = Try::new(
            handler.clone(),
            "",
            Command::new_async(Fail::new(handler.clone(), "mirror unreachable")),
            Command::new_sync(Logger::new(handler.clone(), "using cached image")),
        );

        let result = cmd.run(&run_id()).await.unwrap();

        assert!(result.is_success());
        assert_eq!(result.output, "using cached image");
    }

    #[tokio::test]
    async fn test_both_failing_returns_fallback_result() {
        let handler = Arc::new(CommandHandler::new());
        let cmd = Try::new(
            handler.clone(),
            "",
            Command::new_sync(Fail::new(handler.clone(), "primary")),
            Command::new_async(Fail::new(handler.clone(), "secondary")),
        );

        let result = cmd.run(&run_id()).await.unwrap();

        assert!(!result.is_success());
        assert_eq!(result.output, "secondary");
        assert!(matches!(
            result.error,
            Some(CommandError::ExecutionFailed(ref msg)) if msg == "secondary"
        ));
    }

    #[tokio::test]
    async fn test_primary_error_runs_fallback() {
        let handler = Arc::new(CommandHandler::new());
        let cmd = Try::new(
            handler.clone(),
            "",
            Command::new_sync(Group::new(handler.clone(), "empty", Vec::new())),
            Command::new_sync(Logger::new(handler.clone(), "recovered")),
        );

        let result = cmd.run(&run_id()).await.unwrap();

        assert!(result.is_success());
        assert_eq!(result.output, "recovered");
        assert!(handler.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_error_is_returned() {
        let handler = Arc::new(CommandHandler::new());
        let cmd = Try::new(
            handler.clone(),
            "",
            Command::new_sync(Fail::new(handler.clone(), "primary")),
            Command::new_sync(Group::new(handler.clone(), "empty", Vec::new())),
        );

        let err = cmd.run(&run_id()).await.unwrap_err();
        assert!(matches!(err, CommandError::CannotExecute(_)));
    }

    #[test]
    fn test_try_presentation() {
        let handler = Arc::new(CommandHandler::new());
        let cmd = Try::new(
            handler.clone(),
            "",
            Command::new_sync(Logger::new(handler.clone(), "a")),
            Command::new_sync(Logger::new(handler, "b")),
        );

        assert!(cmd.describe().starts_with("try ("));
        assert!(cmd.describe().contains(" else "));
        let printed = cmd.pretty_print(0);
        assert_eq!(printed.lines().count(), 4);
        assert!(printed.contains("on fail:"));
        assert_eq!(cmd.user_string(), "Try a");
    }
}
