//! Command trait definitions
//!
//! Every executable unit of a workflow is a command. A command either
//! runs synchronously (the caller waits for its `CommandResult`) or
//! asynchronously (it only reports whether it could be launched and
//! delivers its outcome later through the `CommandHandler`, keyed by its
//! own `CommandId`).

use crate::error::Result;
use crate::id::{CommandId, WorkflowRunId};
use crate::result::CommandResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Execution capability of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Sync,
    Async,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Sync => "sync",
            CommandKind::Async => "async",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "sync" => Ok(CommandKind::Sync),
            "async" => Ok(CommandKind::Async),
            other => Err(format!("unknown command type '{}'", other)),
        }
    }
}

/// Identity and presentation shared by every command
///
/// The presentation methods are for logs and diagnostics only.
/// Composites implement them recursively over their children.
pub trait CommandInfo: Send + Sync {
    /// Unique id of this command instance
    fn id(&self) -> &CommandId;

    /// Type tag of the command (e.g. "sleep", "group")
    fn name(&self) -> &str;

    /// One-line description used in logs
    fn describe(&self) -> String {
        format!("{} ({})", self.name(), self.id())
    }

    /// Multi-line, indented rendering of the command tree
    fn pretty_print(&self, indent: usize) -> String {
        format!("{:indent$}{}", "", self.describe(), indent = indent)
    }

    /// Short text suitable for an end user
    fn user_string(&self) -> String {
        self.name().to_string()
    }

    /// Access to the concrete type, for inspecting parsed trees
    fn as_any(&self) -> &dyn Any;
}

/// A command whose caller blocks until the work completes
///
/// An `Err` means the command could not even be attempted. A command that
/// ran and failed returns `Ok` with an unsuccessful `CommandResult`.
#[async_trait]
pub trait SyncCommand: CommandInfo {
    async fn run(&self, run: &WorkflowRunId) -> Result<CommandResult>;
}

/// A command that runs in the background
///
/// `start` only reports launch failure. The spawned work must emit at
/// least one log entry and call `CommandHandler::finish_command` exactly
/// once with its own id.
pub trait AsyncCommand: CommandInfo {
    fn start(&self, run: &WorkflowRunId) -> Result<()>;
}

/// A command of either capability
#[derive(Clone)]
pub enum Command {
    Sync(Arc<dyn SyncCommand>),
    Async(Arc<dyn AsyncCommand>),
}

impl Command {
    pub fn new_sync<C: SyncCommand + 'static>(command: C) -> Self {
        Command::Sync(Arc::new(command))
    }

    pub fn new_async<C: AsyncCommand + 'static>(command: C) -> Self {
        Command::Async(Arc::new(command))
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Sync(_) => CommandKind::Sync,
            Command::Async(_) => CommandKind::Async,
        }
    }

    pub fn id(&self) -> &CommandId {
        match self {
            Command::Sync(c) => c.id(),
            Command::Async(c) => c.id(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Command::Sync(c) => c.name(),
            Command::Async(c) => c.name(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Command::Sync(c) => c.describe(),
            Command::Async(c) => c.describe(),
        }
    }

    pub fn pretty_print(&self, indent: usize) -> String {
        match self {
            Command::Sync(c) => c.pretty_print(indent),
            Command::Async(c) => c.pretty_print(indent),
        }
    }

    pub fn user_string(&self) -> String {
        match self {
            Command::Sync(c) => c.user_string(),
            Command::Async(c) => c.user_string(),
        }
    }

    pub fn as_any(&self) -> &dyn Any {
        match self {
            Command::Sync(c) => c.as_any(),
            Command::Async(c) => c.as_any(),
        }
    }

    /// Downcast to a concrete command type
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .field("id", self.id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Fail, Sleep};
    use crate::handler::CommandHandler;
    use std::time::Duration;

    #[test]
    fn test_kind_from_str() {
        assert_eq!("sync".parse::<CommandKind>(), Ok(CommandKind::Sync));
        assert_eq!("async".parse::<CommandKind>(), Ok(CommandKind::Async));
        assert!("batch".parse::<CommandKind>().is_err());
        assert_eq!(CommandKind::Async.to_string(), "async");
    }

    #[test]
    fn test_command_delegates_to_variant() {
        let handler = Arc::new(CommandHandler::new());
        let sleep = Sleep::new(handler.clone(), Duration::from_secs(2));
        let id = sleep.id().clone();

        let cmd = Command::new_async(sleep);
        assert_eq!(cmd.kind(), CommandKind::Async);
        assert_eq!(cmd.name(), "sleep");
        assert_eq!(cmd.id(), &id);
        assert!(cmd.to_string().contains(id.as_str()));
        assert!(cmd.downcast_ref::<Sleep>().is_some());
        assert!(cmd.downcast_ref::<Fail>().is_none());
    }

    #[test]
    fn test_default_pretty_print_indents() {
        let handler = Arc::new(CommandHandler::new());
        let cmd = Command::new_sync(Fail::new(handler, "nope"));

        let text = cmd.pretty_print(4);
        assert!(text.starts_with("    fail"));
    }

    #[test]
    fn test_command_debug() {
        let handler = Arc::new(CommandHandler::new());
        let cmd = Command::new_sync(Sleep::new(handler, Duration::from_millis(1)));

        let debug = format!("{:?}", cmd);
        assert!(debug.contains("Sync"));
        assert!(debug.contains("sleep"));
    }
}
