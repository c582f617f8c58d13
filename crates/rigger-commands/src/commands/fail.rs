//! Fail command
//!
//! Always fails. Lets a workflow author exercise error paths: a `fail`
//! inside a `try` triggers the fallback, inside a `group` it stops the
//! remaining steps.

use super::{report, spawn_background};
use crate::error::{CommandError, Result};
use crate::handler::CommandHandler;
use crate::id::{CommandId, WorkflowRunId};
use crate::result::CommandResult;
use crate::traits::{AsyncCommand, CommandInfo, SyncCommand};
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;
use tracing::warn;

const DEFAULT_MESSAGE: &str = "deliberate failure";

pub struct Fail {
    id: CommandId,
    message: String,
    handler: Arc<CommandHandler>,
}

impl Fail {
    pub fn new(handler: Arc<CommandHandler>, message: impl Into<String>) -> Self {
        Self {
            id: CommandId::generate("fail"),
            message: message.into(),
            handler,
        }
    }

    pub fn with_default_message(handler: Arc<CommandHandler>) -> Self {
        Self::new(handler, DEFAULT_MESSAGE)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    fn failed_result(message: &str) -> CommandResult {
        CommandResult::failure(message).with_error(CommandError::ExecutionFailed(message.to_string()))
    }
}

impl CommandInfo for Fail {
    fn id(&self) -> &CommandId {
        &self.id
    }

    fn name(&self) -> &str {
        "fail"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl SyncCommand for Fail {
    async fn run(&self, _run: &WorkflowRunId) -> Result<CommandResult> {
        report(&self.handler, &self.id, &format!("failing: {}", self.message));
        Ok(Self::failed_result(&self.message))
    }
}

impl AsyncCommand for Fail {
    fn start(&self, _run: &WorkflowRunId) -> Result<()> {
        let handler = self.handler.clone();
        let id = self.id.clone();
        let message = self.message.clone();

        spawn_background(&self.id, async move {
            report(&handler, &id, &format!("failing: {}", message));
            let mut result = Self::failed_result(&message);
            let error = result.error.take();
            if let Err(e) = handler.finish_command(&id, result, error) {
                warn!(command = %id, error = %e, "Could not deliver fail result");
            }
        })
    }
}
