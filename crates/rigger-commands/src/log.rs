//! Log entries and listeners
//!
//! Commands report human-readable log lines through the command handler.
//! Besides the primary log callback registered with a command, a
//! `LogListener` can be attached to stream the same lines elsewhere
//! (an external viewer, a test collector).

use crate::id::CommandId;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

/// One log line reported by a command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    /// Command that reported the line
    pub command: CommandId,

    /// The line itself
    pub line: String,
}

impl LogEntry {
    pub fn new(command: CommandId, line: impl Into<String>) -> Self {
        Self {
            command,
            line: line.into(),
        }
    }
}

/// Trait for secondary log sinks
pub trait LogListener: Send + Sync {
    /// Receive one log line for a command
    fn on_log(&self, command: &CommandId, line: &str);
}

/// A listener that drops everything
#[derive(Debug, Default, Clone)]
pub struct NoopListener;

impl LogListener for NoopListener {
    fn on_log(&self, _command: &CommandId, _line: &str) {}
}

/// A listener that collects every line it receives
#[derive(Debug, Default)]
pub struct CollectingListener {
    entries: Mutex<Vec<LogEntry>>,
}

impl CollectingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.line).collect()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl LogListener for CollectingListener {
    fn on_log(&self, command: &CommandId, line: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LogEntry::new(command.clone(), line));
    }
}
