use std::time::Duration;

use async_trait::async_trait;
use mcpdock_mcp::{Error as SessionError, Session};
use tokio::time;
use tracing::Instrument;

use crate::ServerDescriptor;
use crate::timeout::Timeout;

/// The outcome of probing one provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Reachability {
    /// The handshake completed.
    Reachable {
        /// Names of the tools the provider listed.
        tools: Vec<String>,
    },
    /// The provider could not be used.
    Unreachable {
        /// Why the probe failed.
        reason: String,
    },
}

impl Reachability {
    /// Returns whether the handshake completed.
    #[inline]
    pub fn is_reachable(&self) -> bool {
        matches!(self, Reachability::Reachable { .. })
    }
}

/// Checks whether a provider is usable.
///
/// Implementations report every failure as
/// [`Reachability::Unreachable`] and must not leave processes behind.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probes the provider, giving up after `timeout`.
    async fn probe(&self, descriptor: &ServerDescriptor, timeout: Duration) -> Reachability;
}

/// Probes providers by launching them and performing the handshake.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdioProber;

#[async_trait]
impl Prober for StdioProber {
    async fn probe(&self, descriptor: &ServerDescriptor, timeout: Duration) -> Reachability {
        probe(descriptor, timeout).await
    }
}

/// Launches the provider, initializes a session and lists its tools, all
/// within `timeout`.
///
/// The timeout may be given in any form [`Timeout`] accepts. The process is
/// terminated before this function returns, whatever the outcome; if the
/// returned future is dropped early, the process is killed as the session
/// drops.
pub async fn probe<T: Into<Timeout>>(descriptor: &ServerDescriptor, timeout: T) -> Reachability {
    let name = descriptor.name();
    let timeout = match timeout.into().to_duration() {
        Ok(timeout) => timeout,
        Err(err) => {
            warn!("cannot probe server `{name}`: {err}");
            return Reachability::Unreachable {
                reason: format!("{err}"),
            };
        }
    };

    let span = debug_span!("probe", server = name);
    async {
        let mut session = match Session::spawn(&descriptor.handle(), name) {
            Ok(session) => session,
            Err(err) => {
                warn!("failed to connect to server `{name}`: {err}");
                return Reachability::Unreachable {
                    reason: format!("{err}"),
                };
            }
        };

        let outcome = time::timeout(timeout, handshake(&mut session)).await;
        session.close().await;

        match outcome {
            Ok(Ok(tools)) => {
                debug!("server `{name}` answered with {} tools", tools.len());
                Reachability::Reachable { tools }
            }
            Ok(Err(err)) => {
                warn!(
                    "failed to connect to server `{name}` ({}): {err}",
                    descriptor.handle().cmdline()
                );
                Reachability::Unreachable {
                    reason: format!("{err}"),
                }
            }
            Err(_) => {
                let reason = format!(
                    "handshake did not complete within {}",
                    humantime::format_duration(timeout)
                );
                warn!("failed to connect to server `{name}`: {reason}");
                Reachability::Unreachable { reason }
            }
        }
    }
    .instrument(span)
    .await
}

async fn handshake(session: &mut Session) -> Result<Vec<String>, SessionError> {
    session.initialize().await?;
    let tools = session.list_tools().await?;
    Ok(tools.into_iter().map(|tool| tool.name).collect())
}
