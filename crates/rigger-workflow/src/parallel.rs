//! Bounded-concurrency composite command
//!
//! A `Parallel` keeps up to `max_parallelism` children running at once
//! (all of them when `max_parallelism` is 0). Each time a child
//! completes, one pending child is launched in its place, for as long as
//! no child has failed.
//!
//! Once a failure is observed no new children are launched, but the
//! children already in flight are still awaited before the aggregate
//! result is built. No child task is ever left reporting to a
//! coordinator that has already returned.

use crate::child::{forward_logs, run_child};
use async_trait::async_trait;
use rigger_commands::{
    ChildFailure, Command, CommandError, CommandHandler, CommandId, CommandInfo, CommandResult,
    Completion, LogCallback, Result, SyncCommand, WorkflowRunId,
};
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Per-run accumulation state, shared by the child tasks of one run
#[derive(Default)]
struct RunState {
    results: HashMap<CommandId, CommandResult>,
    errors: HashMap<CommandId, CommandError>,
}

impl RunState {
    fn record(&mut self, id: CommandId, outcome: std::result::Result<Completion, CommandError>) {
        match outcome {
            Ok(done) => {
                let mut result = done.result;
                if let Some(err) = done.error.or_else(|| result.error.take()) {
                    self.errors.insert(id.clone(), err);
                }
                self.results.insert(id, result);
            }
            Err(err) => {
                self.results
                    .insert(id.clone(), CommandResult::failure(err.to_string()));
                self.errors.insert(id, err);
            }
        }
    }

    fn is_recorded(&self, id: &CommandId) -> bool {
        self.results.contains_key(id) || self.errors.contains_key(id)
    }

    fn has_failure(&self) -> bool {
        !self.errors.is_empty() || self.results.values().any(|r| !r.success)
    }
}

pub struct Parallel {
    id: CommandId,
    description: String,
    max_parallelism: usize,
    commands: Vec<Command>,
    handler: Arc<CommandHandler>,
}

impl Parallel {
    pub fn new(
        handler: Arc<CommandHandler>,
        description: impl Into<String>,
        max_parallelism: usize,
        commands: Vec<Command>,
    ) -> Self {
        Self {
            id: CommandId::generate("parallel"),
            description: description.into(),
            max_parallelism,
            commands,
            handler,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Upper bound on concurrently running children; 0 means unbounded
    pub fn max_parallelism(&self) -> usize {
        self.max_parallelism
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    fn initial_launch(&self) -> usize {
        if self.max_parallelism == 0 {
            self.commands.len()
        } else {
            self.max_parallelism.min(self.commands.len())
        }
    }

    /// Run one child as its own task and signal its id when recorded
    fn launch(
        &self,
        child: Command,
        run: &WorkflowRunId,
        state: &Arc<Mutex<RunState>>,
        on_log: &LogCallback,
        done_tx: &mpsc::UnboundedSender<CommandId>,
    ) {
        let handler = self.handler.clone();
        let run = run.clone();
        let state = state.clone();
        let on_log = on_log.clone();
        let done_tx = done_tx.clone();

        tokio::spawn(async move {
            let id = child.id().clone();
            let outcome = run_child(&handler, &child, &run, on_log).await;
            state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .record(id.clone(), outcome);
            let _ = done_tx.send(id);
        });
    }

    fn aggregate(&self, state: RunState) -> CommandResult {
        let RunState {
            mut results,
            mut errors,
        } = state;

        let mut output = String::new();
        let mut failures = Vec::new();
        let mut success = true;

        for child in &self.commands {
            let id = child.id();
            let Some(mut result) = results.remove(id) else {
                continue;
            };
            output.push_str(&format!("[{}] {}\n", id, result.output));
            success &= result.success;

            let error = errors.remove(id).or_else(|| result.take_failure());
            if let Some(err) = error {
                failures.push(ChildFailure::new(id.clone(), err));
            }
        }

        match CommandError::aggregate(failures) {
            Some(err) => CommandResult::failure(output).with_error(err),
            None if success => CommandResult::success(output).no_show(),
            None => CommandResult::failure(output),
        }
    }
}

impl CommandInfo for Parallel {
    fn id(&self) -> &CommandId {
        &self.id
    }

    fn name(&self) -> &str {
        "parallel"
    }

    fn describe(&self) -> String {
        let children = self
            .commands
            .iter()
            .map(Command::describe)
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "parallel ({}) max={} [{}]",
            self.id, self.max_parallelism, children
        )
    }

    fn pretty_print(&self, indent: usize) -> String {
        let mut lines = vec![format!(
            "{:indent$}parallel ({}, max {}): {}",
            "",
            self.id,
            self.max_parallelism,
            self.description,
            indent = indent
        )];
        lines.extend(self.commands.iter().map(|c| c.pretty_print(indent + 2)));
        lines.join("\n")
    }

    fn user_string(&self) -> String {
        if self.description.is_empty() {
            format!("{} commands in parallel", self.commands.len())
        } else {
            self.description.clone()
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl SyncCommand for Parallel {
    async fn run(&self, run: &WorkflowRunId) -> Result<CommandResult> {
        if self.commands.is_empty() {
            return Err(CommandError::CannotExecute(self.id.to_string()));
        }

        let total = self.commands.len();
        let initial = self.initial_launch();
        info!(run = %run, command = %self.id, children = total, initial, "Running parallel");

        let state = Arc::new(Mutex::new(RunState::default()));
        let on_log = forward_logs(&self.handler, &self.id);
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();

        let mut pending = self.commands.iter().cloned();
        let mut in_flight = 0usize;
        for child in pending.by_ref().take(initial) {
            self.launch(child, run, &state, &on_log, &done_tx);
            in_flight += 1;
        }

        let mut failed = false;
        while in_flight > 0 {
            let id = done_rx.recv().await.ok_or_else(|| {
                CommandError::InvalidState(format!(
                    "completion channel of '{}' closed with {} children in flight",
                    self.id, in_flight
                ))
            })?;
            in_flight -= 1;

            {
                let state = state.lock().unwrap_or_else(PoisonError::into_inner);
                if !state.is_recorded(&id) {
                    return Err(CommandError::InvalidState(format!(
                        "completion for '{}' arrived without a recorded result",
                        id
                    )));
                }
                if !failed && state.has_failure() {
                    warn!(run = %run, command = %self.id, failed_child = %id, in_flight, "Parallel child failed, no new children will start");
                    failed = true;
                }
            }

            if !failed {
                if let Some(next) = pending.next() {
                    debug!(run = %run, command = %self.id, next = %next.id(), "Slot freed, launching next child");
                    self.launch(next, run, &state, &on_log, &done_tx);
                    in_flight += 1;
                }
            }
        }

        let state = std::mem::take(&mut *state.lock().unwrap_or_else(PoisonError::into_inner));
        Ok(self.aggregate(state))
    }
}
