//! Tool-call interface for finscope
//!
//! Collaborators that speak a tool-call protocol (an MCP server, an LLM agent
//! loop) drive the core through the [`Tool`] trait: a name, a description, a
//! JSON schema for the input and an async `execute` taking and returning JSON.

pub mod error;
pub mod registry;
pub mod tool;

pub use error::{Result, ToolError};
pub use registry::ToolRegistry;
pub use tool::Tool;
