//! Error types for command execution
//!
//! This module provides the error type shared by the command handler,
//! leaf commands and the composite commands built on top of them.

use crate::id::CommandId;
use thiserror::Error;

/// Error type for command execution
#[derive(Debug, Error)]
pub enum CommandError {
    /// A command id was registered with the handler while still live
    #[error("command '{0}' is already registered")]
    AlreadyRegistered(CommandId),

    /// An operation referenced a command id with no live registration
    #[error("command '{0}' is not registered")]
    NotRegistered(CommandId),

    /// A completion was observed without the state that should accompany it
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A composite was asked to run without any children
    #[error("cannot execute '{0}': no commands to run")]
    CannotExecute(String),

    /// Invalid command parameters
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// The command ran but its work failed
    #[error("command execution failed: {0}")]
    ExecutionFailed(String),

    /// One or more children of a composite failed
    #[error("{} command(s) failed: {}", .failures.len(), join_failures(.failures))]
    AggregateExecutionFailed { failures: Vec<ChildFailure> },

    /// I/O error while running a command
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A failing child of a composite command, kept for error aggregation
#[derive(Debug)]
pub struct ChildFailure {
    pub command: CommandId,
    pub error: CommandError,
}

impl ChildFailure {
    pub fn new(command: CommandId, error: CommandError) -> Self {
        Self { command, error }
    }
}

impl CommandError {
    /// Build an aggregate error, or `None` when nothing failed
    pub fn aggregate(failures: Vec<ChildFailure>) -> Option<Self> {
        if failures.is_empty() {
            None
        } else {
            Some(Self::AggregateExecutionFailed { failures })
        }
    }

    /// Child failures carried by an aggregate error
    pub fn failures(&self) -> &[ChildFailure] {
        match self {
            Self::AggregateExecutionFailed { failures } => failures,
            _ => &[],
        }
    }
}

fn join_failures(failures: &[ChildFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("[{}] {}", f.command, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for command operations
pub type Result<T> = std::result::Result<T, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CommandError::AlreadyRegistered(CommandId::from("sleep-1"));
        assert_eq!(err.to_string(), "command 'sleep-1' is already registered");

        let err = CommandError::NotRegistered(CommandId::from("sleep-1"));
        assert_eq!(err.to_string(), "command 'sleep-1' is not registered");

        let err = CommandError::CannotExecute("group-7".to_string());
        assert_eq!(err.to_string(), "cannot execute 'group-7': no commands to run");
    }

    #[test]
    fn test_aggregate_display_lists_every_child() {
        let err = CommandError::aggregate(vec![
            ChildFailure::new(
                CommandId::from("fail-1"),
                CommandError::ExecutionFailed("disk full".to_string()),
            ),
            ChildFailure::new(
                CommandId::from("exec-2"),
                CommandError::ExecutionFailed("exit status 3".to_string()),
            ),
        ])
        .unwrap();

        let text = err.to_string();
        assert!(text.starts_with("2 command(s) failed"));
        assert!(text.contains("[fail-1] command execution failed: disk full"));
        assert!(text.contains("[exec-2]"));
        assert_eq!(err.failures().len(), 2);
    }

    #[test]
    fn test_aggregate_empty_is_none() {
        assert!(CommandError::aggregate(Vec::new()).is_none());
        assert!(CommandError::InvalidState("x".into()).failures().is_empty());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such program");
        let err: CommandError = io_err.into();
        assert!(matches!(err, CommandError::Io(_)));
    }
}
