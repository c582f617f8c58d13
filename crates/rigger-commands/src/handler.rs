//! Command handler
//!
//! The `CommandHandler` correlates an in-flight command's id with the
//! callbacks that consume its completion and its log lines. Composites
//! register each child before starting it; leaf commands report back
//! through `add_log_entry` and `finish_command`.
//!
//! All map mutations happen under one lock. Callbacks are always invoked
//! after the lock is released, on a delivery queue owned by the
//! registration, so a slow consumer never blocks registry operations for
//! unrelated ids.
//!
//! Deliveries for one id run in the order they were requested. Every log
//! line of a command has been handed to its log callback before the
//! result callback runs, which is what lets composites forward child
//! lines to their own registration without losing the last ones.

use crate::error::{CommandError, Result};
use crate::id::CommandId;
use crate::log::LogListener;
use crate::result::CommandResult;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Final outcome of a command, as delivered to its result callback
#[derive(Debug)]
pub struct Completion {
    pub id: CommandId,
    pub result: CommandResult,
    pub error: Option<CommandError>,
}

impl Completion {
    pub fn new(id: CommandId, result: CommandResult, error: Option<CommandError>) -> Self {
        Self { id, result, error }
    }

    /// Fold the delivered error into the result when it carries none
    pub fn into_result(self) -> CommandResult {
        let mut result = self.result;
        if result.error.is_none() {
            result.error = self.error;
        }
        result
    }
}

/// Consumer of a command's final outcome. Called at most once.
pub type ResultCallback = Box<dyn FnOnce(Completion) + Send + 'static>;

/// Consumer of a command's log lines
pub type LogCallback = Arc<dyn Fn(&CommandId, &str) + Send + Sync + 'static>;

type Delivery = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct Registrations {
    results: HashMap<CommandId, ResultCallback>,
    logs: HashMap<CommandId, LogCallback>,
    listeners: HashMap<CommandId, Arc<dyn LogListener>>,
    queues: HashMap<CommandId, DeliveryQueue>,
}

/// Serial executor for the callbacks of one registration
///
/// Backed by a task on the runtime that was current at registration
/// time. Without a runtime, deliveries run inline on the caller.
#[derive(Clone)]
struct DeliveryQueue {
    sender: Option<mpsc::UnboundedSender<Delivery>>,
}

impl DeliveryQueue {
    fn start(id: &CommandId) -> Self {
        let Ok(runtime) = Handle::try_current() else {
            trace!(command = %id, "No runtime, callbacks will run inline");
            return Self { sender: None };
        };

        let (sender, mut receiver) = mpsc::unbounded_channel::<Delivery>();
        runtime.spawn(async move {
            while let Some(delivery) = receiver.recv().await {
                delivery();
            }
        });
        Self {
            sender: Some(sender),
        }
    }

    fn push<F>(&self, delivery: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match &self.sender {
            Some(sender) => {
                if let Err(mpsc::error::SendError(delivery)) = sender.send(Box::new(delivery)) {
                    // Queue task is gone with its runtime
                    delivery();
                }
            }
            None => delivery(),
        }
    }
}

/// Registry of in-flight commands
///
/// One instance is created per running engine and shared as
/// `Arc<CommandHandler>` by every command in the tree.
///
/// # Example
///
/// ```ignore
/// let handler = Arc::new(CommandHandler::new());
/// handler.add_command(id.clone(), Box::new(|done| { /* ... */ }), on_log)?;
/// handler.add_log_entry(&id, "starting")?;
/// handler.finish_command(&id, CommandResult::success("done"), None)?;
/// ```
#[derive(Default)]
pub struct CommandHandler {
    registrations: Mutex<Registrations>,
}

impl CommandHandler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registrations> {
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register the result and log callbacks for `id`
    ///
    /// Fails with `AlreadyRegistered` if either callback is already
    /// present. Nothing is mutated in that case.
    pub fn add_command(
        &self,
        id: CommandId,
        on_result: ResultCallback,
        on_log: LogCallback,
    ) -> Result<()> {
        let mut regs = self.lock();
        if regs.results.contains_key(&id) || regs.logs.contains_key(&id) {
            return Err(CommandError::AlreadyRegistered(id));
        }

        trace!(command = %id, "Registering command");
        regs.queues.insert(id.clone(), DeliveryQueue::start(&id));
        regs.results.insert(id.clone(), on_result);
        regs.logs.insert(id, on_log);
        Ok(())
    }

    /// Deliver a log line to the log callback and listener of `id`
    ///
    /// Returns as soon as the line is queued; the callbacks run on the
    /// registration's delivery queue.
    pub fn add_log_entry(&self, id: &CommandId, line: impl Into<String>) -> Result<()> {
        let (on_log, listener, queue) = {
            let regs = self.lock();
            let on_log = regs
                .logs
                .get(id)
                .cloned()
                .ok_or_else(|| CommandError::NotRegistered(id.clone()))?;
            let queue = regs
                .queues
                .get(id)
                .cloned()
                .ok_or_else(|| CommandError::NotRegistered(id.clone()))?;
            (on_log, regs.listeners.get(id).cloned(), queue)
        };

        let id = id.clone();
        let line = line.into();
        queue.push(move || {
            if let Some(listener) = listener {
                listener.on_log(&id, &line);
            }
            on_log(&id, &line);
        });
        Ok(())
    }

    /// Install a secondary log sink for a registered command
    ///
    /// Replaces any listener previously attached to the same id. The
    /// primary log callback is left untouched.
    pub fn attach_log_listener(&self, id: &CommandId, listener: Arc<dyn LogListener>) -> Result<()> {
        let mut regs = self.lock();
        if !regs.logs.contains_key(id) {
            return Err(CommandError::NotRegistered(id.clone()));
        }
        regs.listeners.insert(id.clone(), listener);
        Ok(())
    }

    /// Deliver the final outcome of `id` and drop its registration
    ///
    /// The result callback, log callback and listener are removed in the
    /// same critical section, so a second call (or any later log entry)
    /// fails with `NotRegistered`.
    pub fn finish_command(
        &self,
        id: &CommandId,
        result: CommandResult,
        error: Option<CommandError>,
    ) -> Result<()> {
        let (on_result, queue) = {
            let mut regs = self.lock();
            if !regs.logs.contains_key(id) || !regs.queues.contains_key(id) {
                return Err(CommandError::NotRegistered(id.clone()));
            }
            let on_result = regs
                .results
                .remove(id)
                .ok_or_else(|| CommandError::NotRegistered(id.clone()))?;
            regs.logs.remove(id);
            regs.listeners.remove(id);
            (on_result, regs.queues.remove(id))
        };

        debug!(command = %id, success = result.success, "Command finished");
        let completion = Completion::new(id.clone(), result, error);
        // Runs after every line queued before it; dropping the queue
        // afterwards lets its task exit once the result is delivered
        match queue {
            Some(queue) => queue.push(move || on_result(completion)),
            None => on_result(completion),
        }
        Ok(())
    }

    /// Check whether `id` has a live registration
    pub fn is_registered(&self, id: &CommandId) -> bool {
        self.lock().results.contains_key(id)
    }

    /// Number of live registrations
    pub fn len(&self) -> usize {
        self.lock().results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let regs = self.lock();
        f.debug_struct("CommandHandler")
            .field("commands", &regs.results.keys().collect::<Vec<_>>())
            .field("listeners", &regs.listeners.len())
            .finish()
    }
}
