//! Discovery and health checking of configured tool providers.
//!
//! A [`ServerRegistry`] reads a JSON document listing tool-provider
//! processes, drops entries that are malformed or whose launcher is not
//! installed, probes the rest with a live handshake, and keeps only the
//! providers that answered. The retained set is handed to the agent runtime
//! as [`ServerHandle`]s.
//!
//! ```no_run
//! # async fn run() -> Result<(), mcpdock_registry::ConfigError> {
//! use mcpdock_registry::ServerRegistry;
//!
//! let mut registry = ServerRegistry::new("mcp_servers.json")?;
//! registry.initialize().await;
//! let handles = registry.get_all_servers();
//! # let _ = handles;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod adapter;
mod config;
mod descriptor;
mod error;
mod probe;
mod registry;
mod runtime;
mod timeout;

pub use adapter::to_handles;
pub use config::{Config, DEFAULT_CONFIG_PATH, SERVERS_KEY, ServerEntry};
pub use descriptor::{DEFAULT_DESCRIPTION, DescriptorBuilder, ServerDescriptor};
pub use error::{ConfigError, EntryError, TimeoutError};
pub use mcpdock_mcp::ServerHandle;
pub use probe::{Prober, Reachability, StdioProber, probe};
pub use registry::ServerRegistry;
pub use runtime::{Launcher, RuntimeFlags, is_on_path};
pub use timeout::{DEFAULT_TIMEOUT, Timeout};
