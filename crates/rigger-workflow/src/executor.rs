//! Workflow execution engine
//!
//! This module provides the WorkflowExecutor that runs a root command
//! tree against one shared `CommandHandler`, broadcasting progress
//! events and producing a report of the run.

use crate::child::run_child;
use crate::error::Result;
use crate::parser::CommandParser;
use chrono::{DateTime, Utc};
use rigger_commands::{Command, CommandHandler, CommandId, LogCallback, WorkflowRunId};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};

/// Event emitted during workflow execution
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    /// Root command started
    Started { run: WorkflowRunId, command: CommandId },
    /// A log line reached the root of the tree
    Log {
        run: WorkflowRunId,
        command: CommandId,
        line: String,
    },
    /// Root command completed
    Completed { run: WorkflowRunId, success: bool },
}

/// Outcome of one workflow run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: WorkflowRunId,
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Runs command trees and reports their progress
///
/// The executor owns the handler every command in a run shares. The
/// root command is registered like any other child, so its log lines
/// reach subscribers and its completion is awaited through the handler.
pub struct WorkflowExecutor {
    /// Registry shared by every command in a run
    handler: Arc<CommandHandler>,

    /// Parser bound to the same handler
    parser: CommandParser,

    /// Event sender for workflow events
    event_sender: broadcast::Sender<WorkflowEvent>,
}

impl WorkflowExecutor {
    /// Create an executor with the default dispatch table
    pub fn new(handler: Arc<CommandHandler>) -> Self {
        let parser = CommandParser::with_defaults(handler.clone());
        Self::with_parser(handler, parser)
    }

    /// Create an executor with a custom dispatch table
    pub fn with_parser(handler: Arc<CommandHandler>, parser: CommandParser) -> Self {
        let (event_sender, _) = broadcast::channel(1024);
        Self {
            handler,
            parser,
            event_sender,
        }
    }

    /// Subscribe to workflow events
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.event_sender.subscribe()
    }

    pub fn handler(&self) -> &Arc<CommandHandler> {
        &self.handler
    }

    pub fn parser(&self) -> &CommandParser {
        &self.parser
    }

    /// Parse a JSON workflow and run it
    pub async fn execute_json(&self, input: &str, run: &WorkflowRunId) -> Result<RunReport> {
        let command = self.parser.parse(input)?;
        self.execute(&command, run).await
    }

    /// Run a command tree to completion
    ///
    /// A function-level error from the root is returned as `Err`; a
    /// failed run is a report with `success == false`.
    pub async fn execute(&self, command: &Command, run: &WorkflowRunId) -> Result<RunReport> {
        let started_at = Utc::now();
        info!(run = %run, command = %command.id(), "Starting workflow execution");

        let _ = self.event_sender.send(WorkflowEvent::Started {
            run: run.clone(),
            command: command.id().clone(),
        });

        let done = match run_child(&self.handler, command, run, self.log_callback(run)).await {
            Ok(done) => done,
            Err(e) => {
                error!(run = %run, command = %command.id(), error = %e, "Workflow aborted");
                let _ = self.event_sender.send(WorkflowEvent::Completed {
                    run: run.clone(),
                    success: false,
                });
                return Err(e.into());
            }
        };

        let mut result = done.into_result();
        let error = result.take_failure().map(|e| e.to_string());

        if result.success {
            info!(run = %run, "Workflow completed successfully");
        } else {
            error!(run = %run, error = error.as_deref().unwrap_or_default(), "Workflow failed");
        }

        let _ = self.event_sender.send(WorkflowEvent::Completed {
            run: run.clone(),
            success: result.success,
        });

        Ok(RunReport {
            run_id: run.clone(),
            success: result.success,
            output: result.output,
            error,
            started_at,
            completed_at: Utc::now(),
        })
    }

    fn log_callback(&self, run: &WorkflowRunId) -> LogCallback {
        let sender = self.event_sender.clone();
        let run = run.clone();

        Arc::new(move |command: &CommandId, line: &str| {
            info!(run = %run, command = %command, "{}", line);
            let _ = sender.send(WorkflowEvent::Log {
                run: run.clone(),
                command: command.clone(),
                line: line.to_string(),
            });
        })
    }
}
