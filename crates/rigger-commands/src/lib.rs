//! Rigger Command Model
//!
//! This crate provides the building blocks every rigger workflow is made
//! of: the command traits, the immutable `CommandResult`, and the
//! `CommandHandler` that correlates asynchronously running commands with
//! the callbacks waiting for their logs and completion.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            CommandHandler                │
//! │  ┌─────────────────────────────────┐    │
//! │  │  CommandId → (on_result, on_log) │    │
//! │  │            + LogListener         │    │
//! │  └─────────────────────────────────┘    │
//! │        ▲                    │            │
//! │        │ add_log_entry      │ dispatch   │
//! │        │ finish_command     ▼            │
//! │  ┌───────────┐      ┌──────────────┐    │
//! │  │ Commands  │      │  Composites  │    │
//! │  │ sleep|exec│      │ (callbacks)  │    │
//! │  └───────────┘      └──────────────┘    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use rigger_commands::{Command, CommandHandler, Sleep};
//!
//! let handler = Arc::new(CommandHandler::new());
//! let cmd = Command::new_async(Sleep::new(handler.clone(), Duration::from_secs(2)));
//! ```

pub mod commands;
pub mod error;
pub mod handler;
pub mod id;
pub mod log;
pub mod result;
pub mod traits;

pub use commands::*;
pub use error::*;
pub use handler::*;
pub use id::*;
pub use log::*;
pub use result::*;
pub use traits::*;
