//! Sequential composite command
//!
//! A `Group` runs its children one at a time, in order, and stops at the
//! first child whose result is unsuccessful. Async children are awaited
//! before the next child starts, so a group never has more than one
//! child in flight and its log lines stay in order.

use crate::child::{forward_logs, run_child};
use async_trait::async_trait;
use rigger_commands::{
    ChildFailure, Command, CommandError, CommandHandler, CommandId, CommandInfo, CommandResult,
    Result, SyncCommand, WorkflowRunId,
};
use std::any::Any;
use std::sync::Arc;
use tracing::{info, warn};

pub struct Group {
    id: CommandId,
    description: String,
    commands: Vec<Command>,
    handler: Arc<CommandHandler>,
}

impl Group {
    pub fn new(
        handler: Arc<CommandHandler>,
        description: impl Into<String>,
        commands: Vec<Command>,
    ) -> Self {
        Self {
            id: CommandId::generate("group"),
            description: description.into(),
            commands,
            handler,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }
}

impl CommandInfo for Group {
    fn id(&self) -> &CommandId {
        &self.id
    }

    fn name(&self) -> &str {
        "group"
    }

    fn describe(&self) -> String {
        let children = self
            .commands
            .iter()
            .map(Command::describe)
            .collect::<Vec<_>>()
            .join(", ");
        format!("group ({}) [{}]", self.id, children)
    }

    fn pretty_print(&self, indent: usize) -> String {
        let mut lines = vec![format!(
            "{:indent$}group ({}): {}",
            "",
            self.id,
            self.description,
            indent = indent
        )];
        lines.extend(self.commands.iter().map(|c| c.pretty_print(indent + 2)));
        lines.join("\n")
    }

    fn user_string(&self) -> String {
        if self.description.is_empty() {
            format!("Group of {} commands", self.commands.len())
        } else {
            self.description.clone()
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl SyncCommand for Group {
    async fn run(&self, run: &WorkflowRunId) -> Result<CommandResult> {
        if self.commands.is_empty() {
            return Err(CommandError::CannotExecute(self.id.to_string()));
        }

        info!(run = %run, command = %self.id, children = self.commands.len(), "Running group");
        let on_log = forward_logs(&self.handler, &self.id);

        let mut output = String::new();
        let mut failure = None;

        for child in &self.commands {
            let done = run_child(&self.handler, child, run, on_log.clone()).await?;
            let mut result = done.into_result();
            output.push_str(&format!("[{}] {}\n", child.id(), result.output));

            if let Some(err) = result.take_failure() {
                warn!(run = %run, command = %child.id(), error = %err, "Group child failed, skipping the rest");
                failure = Some(ChildFailure::new(child.id().clone(), err));
                break;
            }
        }

        match failure {
            None => Ok(CommandResult::success(output).no_show()),
            Some(failed) => {
                let result = CommandResult::failure(output);
                Ok(match CommandError::aggregate(vec![failed]) {
                    Some(err) => result.with_error(err),
                    None => result,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Probe, ProbeStats};
    use rigger_commands::{CollectingListener, Fail, Logger, Sleep};
    use std::time::Duration;

    fn run_id() -> WorkflowRunId {
        WorkflowRunId::from("group-test")
    }

    #[tokio::test]
    async fn test_empty_group_cannot_execute() {
        let handler = Arc::new(CommandHandler::new());
        let group = Group::new(handler, "nothing", Vec::new());

        let err = group.run(&run_id()).await.unwrap_err();
        assert!(matches!(err, CommandError::CannotExecute(_)));
    }

    #[tokio::test]
    async fn test_group_concatenates_outputs_in_order() {
        let handler = Arc::new(CommandHandler::new());
        let group = Group::new(
            handler.clone(),
            "three steps",
            vec![
                Command::new_sync(Logger::new(handler.clone(), "first")),
                Command::new_async(Sleep::new(handler.clone(), Duration::from_millis(5))),
                Command::new_sync(Logger::new(handler.clone(), "third")),
            ],
        );

        let result = group.run(&run_id()).await.unwrap();

        assert!(result.is_success());
        assert!(!result.is_visible());
        let first = result.output.find("first").unwrap();
        let slept = result.output.find("slept").unwrap();
        let third = result.output.find("third").unwrap();
        assert!(first < slept && slept < third);
        assert!(handler.is_empty());
    }

    #[tokio::test]
    async fn test_group_stops_at_first_failure() {
        let handler = Arc::new(CommandHandler::new());
        let after = ProbeStats::new();
        let fail = Command::new_async(Fail::new(handler.clone(), "k3s install failed"));
        let fail_id = fail.id().clone();
        let group = Group::new(
            handler.clone(),
            "",
            vec![
                Command::new_sync(Logger::new(handler.clone(), "ok")),
                fail,
                Command::new_sync(Probe::new(
                    handler.clone(),
                    after.clone(),
                    Duration::from_millis(1),
                )),
            ],
        );

        let result = group.run(&run_id()).await.unwrap();

        assert!(!result.is_success());
        assert!(result.is_visible());
        assert_eq!(after.runs(), 0);
        assert!(result.output.contains("ok"));
        let err = result.error.unwrap();
        assert_eq!(err.failures().len(), 1);
        assert_eq!(err.failures()[0].command, fail_id);
    }

    #[tokio::test]
    async fn test_group_children_never_overlap() {
        let handler = Arc::new(CommandHandler::new());
        let stats = ProbeStats::new();
        let children = (0..4)
            .map(|_| {
                Command::new_async(Probe::new(
                    handler.clone(),
                    stats.clone(),
                    Duration::from_millis(10),
                ))
            })
            .collect();
        let group = Group::new(handler.clone(), "", children);

        let result = group.run(&run_id()).await.unwrap();

        assert!(result.is_success());
        assert_eq!(stats.runs(), 4);
        assert_eq!(stats.max_active(), 1);
    }

    #[tokio::test]
    async fn test_group_propagates_sync_error() {
        let handler = Arc::new(CommandHandler::new());
        let nested = Command::new_sync(Group::new(handler.clone(), "empty", Vec::new()));
        let group = Group::new(
            handler.clone(),
            "",
            vec![Command::new_sync(Logger::new(handler.clone(), "before")), nested],
        );

        let err = group.run(&run_id()).await.unwrap_err();
        assert!(matches!(err, CommandError::CannotExecute(_)));
        assert!(handler.is_empty());
    }

    #[tokio::test]
    async fn test_group_forwards_child_logs_to_its_registration() {
        let handler = Arc::new(CommandHandler::new());
        let group = Group::new(
            handler.clone(),
            "",
            vec![Command::new_sync(Logger::new(handler.clone(), "hello from child"))],
        );
        let listener = Arc::new(CollectingListener::new());
        handler
            .add_command(
                group.id().clone(),
                Box::new(|_: rigger_commands::Completion| {}),
                Arc::new(|_: &CommandId, _: &str| {}),
            )
            .unwrap();
        handler
            .attach_log_listener(group.id(), listener.clone())
            .unwrap();

        group.run(&run_id()).await.unwrap();
        for _ in 0..50 {
            if !listener.entries().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(listener.lines(), vec!["hello from child".to_string()]);
    }

    #[test]
    fn test_group_pretty_print_nests_children() {
        let handler = Arc::new(CommandHandler::new());
        let group = Group::new(
            handler.clone(),
            "install",
            vec![Command::new_sync(Logger::new(handler, "hi"))],
        );

        let text = group.pretty_print(0);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("group ("));
        assert!(lines[1].starts_with("  logger ("));
        assert_eq!(group.user_string(), "install");
    }
}
