//! # `todo_assistant`
//!
//! Personal task tracking with categories, tags, priorities and due dates.
//!
//! The same [`tasks::TaskService`] backs two surfaces: the `todo` command line
//! and a tool layer ([`tools::ToolRegistry`]) that natural-language agents call,
//! served over MCP by the `todo-mcp` binary.

pub mod assistant;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod paths;
pub mod tasks;
pub mod templates;
pub mod tools;

pub use error::{Error, ErrorKind, Result};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
