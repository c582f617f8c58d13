//! Sleep command
//!
//! Waits for a fixed number of seconds. Used as a placeholder step and
//! for exercising the composites' waiting logic.

use super::{report, spawn_background};
use crate::error::Result;
use crate::handler::CommandHandler;
use crate::id::{CommandId, WorkflowRunId};
use crate::result::CommandResult;
use crate::traits::{AsyncCommand, CommandInfo, SyncCommand};
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub struct Sleep {
    id: CommandId,
    duration: Duration,
    handler: Arc<CommandHandler>,
}

impl Sleep {
    pub fn new(handler: Arc<CommandHandler>, duration: Duration) -> Self {
        Self {
            id: CommandId::generate("sleep"),
            duration,
            handler,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl CommandInfo for Sleep {
    fn id(&self) -> &CommandId {
        &self.id
    }

    fn name(&self) -> &str {
        "sleep"
    }

    fn describe(&self) -> String {
        format!("sleep ({}) for {:?}", self.id, self.duration)
    }

    fn user_string(&self) -> String {
        format!("Sleeping for {:?}", self.duration)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl SyncCommand for Sleep {
    async fn run(&self, _run: &WorkflowRunId) -> Result<CommandResult> {
        report(&self.handler, &self.id, &self.user_string());
        tokio::time::sleep(self.duration).await;
        Ok(CommandResult::success(format!("slept for {:?}", self.duration)))
    }
}

impl AsyncCommand for Sleep {
    fn start(&self, _run: &WorkflowRunId) -> Result<()> {
        let handler = self.handler.clone();
        let id = self.id.clone();
        let duration = self.duration;
        let line = self.user_string();

        spawn_background(&self.id, async move {
            report(&handler, &id, &line);
            tokio::time::sleep(duration).await;
            let result = CommandResult::success(format!("slept for {:?}", duration));
            if let Err(e) = handler.finish_command(&id, result, None) {
                warn!(command = %id, error = %e, "Could not deliver sleep result");
            }
        })
    }
}
