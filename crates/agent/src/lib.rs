//! The agent side of the tool-provider boundary.
//!
//! An [`Agent`] receives connection handles for the tool providers that
//! survived the registry's probing, and turns one chat turn into a lazily
//! produced sequence of partial replies. The language model itself lives
//! behind the [`AgentRuntime`] trait, so the agent can run against any
//! runtime that reports its progress as [`RunNode`]s.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod agent;
mod error;
pub mod history;
mod runtime;
mod runtime_client;
mod toolset;

pub use agent::{Agent, AgentBuilder, Fragment};
pub use error::{Error, ErrorKind};
pub use history::{ChatMessage, ModelMessage, Role, convert_history};
pub use runtime::*;
pub use toolset::{DEFAULT_CONNECT_TIMEOUT, ToolResult, Toolset};

/// Re-exports of [`mcpdock_mcp`] crate.
pub mod mcp {
    pub use mcpdock_mcp::*;
}
