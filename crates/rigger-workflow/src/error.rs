//! Error types for workflow parsing and execution
//!
//! This module provides error types for turning a JSON description into a
//! command tree and running it.

use rigger_commands::CommandError;
use thiserror::Error;

/// Error type for workflow operations
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// JSON could not be read into the expected shape
    #[error("malformed input: {0}")]
    MalformedInput(#[from] serde_json::Error),

    /// The `(type, name)` pair is not in the dispatch table
    #[error("unsupported command: type '{kind}', name '{name}'")]
    UnsupportedCommand { kind: String, name: String },

    /// A command failed at the function level
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Result type for workflow operations
pub type Result<T> = std::result::Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rigger_commands::CommandId;

    #[test]
    fn test_error_display() {
        let err = WorkflowError::UnsupportedCommand {
            kind: "async".to_string(),
            name: "group".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unsupported command: type 'async', name 'group'"
        );

        let err: WorkflowError = CommandError::NotRegistered(CommandId::from("x")).into();
        assert_eq!(err.to_string(), "command 'x' is not registered");
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: WorkflowError = json_err.into();
        assert!(matches!(err, WorkflowError::MalformedInput(_)));
    }
}
