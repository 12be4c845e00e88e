//! A minimal client for tool-provider processes speaking the Model Context
//! Protocol over standard streams.
//!
//! The crate only covers what the rest of the workspace needs: spawning a
//! provider, performing the handshake, listing its tools and calling them.
//! Every session owns its child process, and the process is terminated
//! whenever the session goes away.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod error;
mod handle;
mod io;
pub mod proto;
mod session;

pub use error::{Error, ErrorKind};
pub use handle::ServerHandle;
pub use session::Session;
