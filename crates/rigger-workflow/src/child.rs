//! Per-child execution shared by the composite commands
//!
//! Every child of a composite goes through the same steps: register with
//! the handler under a single-use completion signal, run or start it, and
//! wait for its completion. Sync children are finished through the
//! handler too, so the registration lifecycle is identical for both
//! kinds and a run of the same tree can be repeated.

use rigger_commands::{
    Command, CommandError, CommandHandler, CommandId, CommandResult, Completion, LogCallback,
    WorkflowRunId,
};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Run one child to completion
///
/// A sync child's function-level error is returned as `Err` after its
/// registration has been closed. An async child's launch error becomes a
/// failed completion carrying that error.
pub(crate) async fn run_child(
    handler: &Arc<CommandHandler>,
    child: &Command,
    run: &WorkflowRunId,
    on_log: LogCallback,
) -> Result<Completion, CommandError> {
    let id = child.id().clone();
    let (tx, rx) = oneshot::channel();

    handler.add_command(
        id.clone(),
        Box::new(move |done: Completion| {
            let _ = tx.send(done);
        }),
        on_log,
    )?;

    debug!(run = %run, command = %id, kind = %child.kind(), "Starting {}", child.describe());

    match child {
        Command::Sync(cmd) => match cmd.run(run).await {
            Ok(result) => handler.finish_command(&id, result, None)?,
            Err(e) => {
                handler.finish_command(&id, CommandResult::failure(e.to_string()), None)?;
                return Err(e);
            }
        },
        Command::Async(cmd) => {
            if let Err(e) = cmd.start(run) {
                warn!(run = %run, command = %id, error = %e, "Command failed to start");
                let result = CommandResult::failure(format!("failed to start: {}", e));
                handler.finish_command(&id, result, Some(e))?;
            }
        }
    }

    rx.await.map_err(|_| {
        CommandError::InvalidState(format!("completion for '{}' was never delivered", id))
    })
}

/// Log callback for the children of a composite
///
/// Lines are forwarded to the composite's own registration so they
/// bubble up to whoever is running it. A composite run directly, without
/// a registration, emits them through tracing.
pub(crate) fn forward_logs(handler: &Arc<CommandHandler>, parent: &CommandId) -> LogCallback {
    let handler = Arc::downgrade(handler);
    let parent = parent.clone();

    Arc::new(move |child: &CommandId, line: &str| {
        debug!(parent = %parent, command = %child, "{}", line);
        let forwarded = handler
            .upgrade()
            .map(|h| h.add_log_entry(&parent, line).is_ok())
            .unwrap_or(false);
        if !forwarded {
            info!(command = %child, "{}", line);
        }
    })
}
