//! Rigger Workflow Engine
//!
//! This crate turns JSON workflow descriptions into command trees and
//! runs them. The composites (`Group`, `Parallel`, `Try`) are ordinary
//! sync commands whose children can be any command, leaf or composite.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │               WorkflowExecutor                 │
//! │  ┌──────────────┐        ┌─────────────────┐  │
//! │  │ CommandParser│──────▶ │  Command tree    │  │
//! │  │ (type, name) │        │ group / parallel │  │
//! │  └──────────────┘        │ try / leaves     │  │
//! │                          └─────────────────┘  │
//! │          │ events                 │ run_child  │
//! │          ▼                        ▼            │
//! │  ┌──────────────┐        ┌─────────────────┐  │
//! │  │  broadcast   │ ◀───── │ CommandHandler   │  │
//! │  └──────────────┘  logs  └─────────────────┘  │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use rigger_commands::{CommandHandler, WorkflowRunId};
//! use rigger_workflow::WorkflowExecutor;
//!
//! let executor = WorkflowExecutor::new(Arc::new(CommandHandler::new()));
//! let report = executor.execute_json(&json, &WorkflowRunId::generate()).await?;
//! ```

mod child;
pub mod error;
pub mod executor;
pub mod group;
pub mod parallel;
pub mod parser;
#[cfg(test)]
mod testing;
pub mod try_command;

pub use error::*;
pub use executor::*;
pub use group::*;
pub use parallel::*;
pub use parser::*;
pub use try_command::*;
