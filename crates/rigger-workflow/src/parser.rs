//! JSON workflow parser
//!
//! Every command is described by an envelope of the form
//! `{"type": "sync" | "async", "name": "<command>", ...}` with
//! command-specific fields alongside. Composites nest their children as
//! envelopes of the same shape, so parsing is a recursive descent that
//! dispatches each envelope on its `(type, name)` pair.

use crate::error::{Result, WorkflowError};
use crate::group::Group;
use crate::parallel::Parallel;
use crate::try_command::Try;
use rigger_commands::{Command, CommandHandler, CommandKind, Exec, Fail, Logger, Sleep};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Builds one command from its full envelope
pub type Constructor = Arc<dyn Fn(&CommandParser, Value) -> Result<Command> + Send + Sync>;

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    name: String,
}

#[derive(Deserialize)]
struct GroupSpec {
    #[serde(default)]
    description: String,
    commands: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParallelSpec {
    #[serde(default)]
    description: String,
    #[serde(default)]
    max_parallelism: usize,
    commands: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrySpec {
    #[serde(default)]
    description: String,
    cmd: Value,
    on_fail: Value,
}

#[derive(Deserialize)]
struct SleepSpec {
    #[serde(deserialize_with = "seconds")]
    time: Duration,
}

#[derive(Deserialize)]
struct FailSpec {
    msg: Option<String>,
}

#[derive(Deserialize)]
struct LoggerSpec {
    msg: String,
}

#[derive(Deserialize)]
struct ExecSpec {
    cmd: String,
    #[serde(default)]
    args: Vec<String>,
}

/// Accept a number of seconds written either as a JSON number or a string
fn seconds<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Number(f64),
        Text(String),
    }

    let secs = match Seconds::deserialize(deserializer)? {
        Seconds::Number(n) => n,
        Seconds::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| de::Error::custom(format!("invalid number of seconds '{}'", s)))?,
    };

    Duration::try_from_secs_f64(secs)
        .map_err(|_| de::Error::custom(format!("invalid number of seconds '{}'", secs)))
}

fn fields<T: DeserializeOwned>(value: Value) -> Result<T> {
    Ok(serde_json::from_value(value)?)
}

/// Dispatch table from `(type, name)` to command constructors
pub struct CommandParser {
    handler: Arc<CommandHandler>,
    constructors: HashMap<(CommandKind, String), Constructor>,
}

impl CommandParser {
    /// Create a parser with an empty dispatch table
    pub fn new(handler: Arc<CommandHandler>) -> Self {
        Self {
            handler,
            constructors: HashMap::new(),
        }
    }

    /// Create a parser that knows the composites and the built-in leaves
    pub fn with_defaults(handler: Arc<CommandHandler>) -> Self {
        let mut parser = Self::new(handler);
        parser.register_composites();
        parser.register_leaves();
        parser
    }

    /// Add or replace the constructor for a `(type, name)` pair
    pub fn register<F>(&mut self, kind: CommandKind, name: impl Into<String>, constructor: F)
    where
        F: Fn(&CommandParser, Value) -> Result<Command> + Send + Sync + 'static,
    {
        let name = name.into();
        debug!(kind = %kind, name = %name, "Registering command constructor");
        self.constructors.insert((kind, name), Arc::new(constructor));
    }

    /// Check whether a `(type, name)` pair can be parsed
    pub fn supports(&self, kind: CommandKind, name: &str) -> bool {
        self.constructors.contains_key(&(kind, name.to_string()))
    }

    /// Handler every parsed command is bound to
    pub fn handler(&self) -> &Arc<CommandHandler> {
        &self.handler
    }

    /// Parse a JSON document into a command tree
    pub fn parse(&self, input: &str) -> Result<Command> {
        let value: Value = serde_json::from_str(input)?;
        self.parse_value(value)
    }

    /// Parse an already decoded envelope into a command tree
    pub fn parse_value(&self, value: Value) -> Result<Command> {
        let envelope = Envelope::deserialize(&value)?;
        let unsupported = || WorkflowError::UnsupportedCommand {
            kind: envelope.kind.clone(),
            name: envelope.name.clone(),
        };

        let kind: CommandKind = envelope.kind.parse().map_err(|_| unsupported())?;
        let constructor = self
            .constructors
            .get(&(kind, envelope.name.clone()))
            .ok_or_else(unsupported)?;

        constructor(self, value)
    }

    fn parse_all(&self, values: Vec<Value>) -> Result<Vec<Command>> {
        values.into_iter().map(|v| self.parse_value(v)).collect()
    }

    fn register_composites(&mut self) {
        self.register(CommandKind::Sync, "group", |parser, value| {
            let spec: GroupSpec = fields(value)?;
            let commands = parser.parse_all(spec.commands)?;
            Ok(Command::new_sync(Group::new(
                parser.handler.clone(),
                spec.description,
                commands,
            )))
        });

        self.register(CommandKind::Sync, "parallel", |parser, value| {
            let spec: ParallelSpec = fields(value)?;
            let commands = parser.parse_all(spec.commands)?;
            Ok(Command::new_sync(Parallel::new(
                parser.handler.clone(),
                spec.description,
                spec.max_parallelism,
                commands,
            )))
        });

        self.register(CommandKind::Sync, "try", |parser, value| {
            let spec: TrySpec = fields(value)?;
            let command = parser.parse_value(spec.cmd)?;
            let on_fail = parser.parse_value(spec.on_fail)?;
            Ok(Command::new_sync(Try::new(
                parser.handler.clone(),
                spec.description,
                command,
                on_fail,
            )))
        });
    }

    fn register_leaves(&mut self) {
        self.register(CommandKind::Sync, "sleep", |parser, value| {
            let spec: SleepSpec = fields(value)?;
            Ok(Command::new_sync(Sleep::new(parser.handler.clone(), spec.time)))
        });
        self.register(CommandKind::Async, "sleep", |parser, value| {
            let spec: SleepSpec = fields(value)?;
            Ok(Command::new_async(Sleep::new(parser.handler.clone(), spec.time)))
        });

        self.register(CommandKind::Sync, "fail", |parser, value| {
            let spec: FailSpec = fields(value)?;
            Ok(Command::new_sync(fail_command(parser, spec)))
        });
        self.register(CommandKind::Async, "fail", |parser, value| {
            let spec: FailSpec = fields(value)?;
            Ok(Command::new_async(fail_command(parser, spec)))
        });

        self.register(CommandKind::Sync, "logger", |parser, value| {
            let spec: LoggerSpec = fields(value)?;
            Ok(Command::new_sync(Logger::new(parser.handler.clone(), spec.msg)))
        });

        self.register(CommandKind::Async, "exec", |parser, value| {
            let spec: ExecSpec = fields(value)?;
            Ok(Command::new_async(Exec::new(
                parser.handler.clone(),
                spec.cmd,
                spec.args,
            )))
        });
    }
}

fn fail_command(parser: &CommandParser, spec: FailSpec) -> Fail {
    match spec.msg {
        Some(msg) => Fail::new(parser.handler.clone(), msg),
        None => Fail::with_default_message(parser.handler.clone()),
    }
}

impl fmt::Debug for CommandParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut supported: Vec<String> = self
            .constructors
            .keys()
            .map(|(kind, name)| format!("{}/{}", kind, name))
            .collect();
        supported.sort();
        f.debug_struct("CommandParser")
            .field("constructors", &supported)
            .finish()
    }
}
