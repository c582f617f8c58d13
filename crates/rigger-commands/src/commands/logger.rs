//! Logger command
//!
//! Emits a message as a log entry and returns it as output.

use super::report;
use crate::error::Result;
use crate::handler::CommandHandler;
use crate::id::{CommandId, WorkflowRunId};
use crate::result::CommandResult;
use crate::traits::{CommandInfo, SyncCommand};
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

pub struct Logger {
    id: CommandId,
    message: String,
    handler: Arc<CommandHandler>,
}

impl Logger {
    pub fn new(handler: Arc<CommandHandler>, message: impl Into<String>) -> Self {
        Self {
            id: CommandId::generate("logger"),
            message: message.into(),
            handler,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl CommandInfo for Logger {
    fn id(&self) -> &CommandId {
        &self.id
    }

    fn name(&self) -> &str {
        "logger"
    }

    fn describe(&self) -> String {
        format!("logger ({}): {:?}", self.id, self.message)
    }

    fn user_string(&self) -> String {
        self.message.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl SyncCommand for Logger {
    async fn run(&self, _run: &WorkflowRunId) -> Result<CommandResult> {
        report(&self.handler, &self.id, &self.message);
        Ok(CommandResult::success(self.message.clone()))
    }
}
