//! Leaf command implementations
//!
//! Leaf commands perform a single unit of work and report back through
//! the `CommandHandler`. The installer's real leaves (cluster bring-up,
//! certificates, ingress) live outside this crate and satisfy the same
//! contract; the ones here are the built-in building blocks.
//!
//! # Available Commands
//!
//! - `sleep` - Wait for a number of seconds (sync or async)
//! - `fail` - Fail on purpose (sync or async)
//! - `logger` - Emit a log line (sync)
//! - `exec` - Run an external process, streaming its output (async)

mod exec;
mod fail;
mod logger;
mod sleep;

pub use exec::Exec;
pub use fail::Fail;
pub use logger::Logger;
pub use sleep::Sleep;

use crate::error::{CommandError, Result};
use crate::handler::CommandHandler;
use crate::id::CommandId;
use std::future::Future;
use tokio::runtime::Handle;
use tracing::info;

/// Report a log line for a command, falling back to tracing when the
/// command was run without being registered.
pub(crate) fn report(handler: &CommandHandler, id: &CommandId, line: &str) {
    if handler.add_log_entry(id, line).is_err() {
        info!(command = %id, "{}", line);
    }
}

/// Spawn the background half of an async command
pub(crate) fn spawn_background<F>(id: &CommandId, work: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let runtime = Handle::try_current().map_err(|_| {
        CommandError::InvalidState(format!("no async runtime to start '{}'", id))
    })?;
    runtime.spawn(work);
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::handler::{CommandHandler, Completion, LogCallback};
    use crate::id::CommandId;
    use std::sync::{Arc, Mutex};
    use tokio::sync::oneshot;

    /// Register `id` and return the completion receiver plus collected log lines
    pub fn register(
        handler: &CommandHandler,
        id: &CommandId,
    ) -> (oneshot::Receiver<Completion>, Arc<Mutex<Vec<String>>>) {
        let (tx, rx) = oneshot::channel();
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let on_log: LogCallback = Arc::new(move |_: &CommandId, line: &str| {
            sink.lock().unwrap().push(line.to_string());
        });
        handler
            .add_command(
                id.clone(),
                Box::new(move |done: Completion| {
                    let _ = tx.send(done);
                }),
                on_log,
            )
            .unwrap();
        (rx, lines)
    }
}
