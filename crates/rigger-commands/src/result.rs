//! Command result type
//!
//! A `CommandResult` is the immutable outcome of one command run. It is
//! data, not an error: composites inspect `success` to decide whether to
//! stop, stop launching, or fall back.

use crate::error::CommandError;

/// Result returned from command execution
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded
    pub success: bool,

    /// Human-readable output of the command
    pub output: String,

    /// Structured error describing the failure, if any
    pub error: Option<CommandError>,

    /// Whether the result should be rendered to the end user directly
    pub show: bool,
}

impl CommandResult {
    /// Create a successful, visible result
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
            show: true,
        }
    }

    /// Create a failed, visible result
    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            error: None,
            show: true,
        }
    }

    /// Attach a structured error
    pub fn with_error(mut self, error: CommandError) -> Self {
        self.error = Some(error);
        self
    }

    /// Mark the result as valid but not meant for direct display
    pub fn no_show(mut self) -> Self {
        self.show = false;
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn is_visible(&self) -> bool {
        self.show
    }

    /// Take the error out of a failed result, synthesizing one from the
    /// output when the command did not provide any.
    pub fn take_failure(&mut self) -> Option<CommandError> {
        if self.success {
            return None;
        }
        Some(
            self.error
                .take()
                .unwrap_or_else(|| CommandError::ExecutionFailed(self.output.clone())),
        )
    }
}

impl Default for CommandResult {
    fn default() -> Self {
        Self::success("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_success() {
        let result = CommandResult::success("k3s installed");

        assert!(result.is_success());
        assert!(result.is_visible());
        assert_eq!(result.output, "k3s installed");
        assert!(result.error.is_none());
    }

    #[test]
    fn test_result_no_show() {
        let result = CommandResult::success("aggregated").no_show();

        assert!(result.is_success());
        assert!(!result.is_visible());
    }

    #[test]
    fn test_take_failure_prefers_attached_error() {
        let mut result = CommandResult::failure("boom")
            .with_error(CommandError::InvalidParameters("time".into()));

        let err = result.take_failure().unwrap();
        assert!(matches!(err, CommandError::InvalidParameters(_)));
        assert!(result.error.is_none());
    }

    #[test]
    fn test_take_failure_synthesizes_from_output() {
        let mut result = CommandResult::failure("helm exited with 1");

        let err = result.take_failure().unwrap();
        assert_eq!(
            err.to_string(),
            "command execution failed: helm exited with 1"
        );
    }

    #[test]
    fn test_take_failure_on_success_is_none() {
        assert!(CommandResult::success("ok").take_failure().is_none());
    }
}
