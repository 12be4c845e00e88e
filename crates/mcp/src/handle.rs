use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::{Error, Session};

/// Everything needed to launch one tool provider.
///
/// Handles are cheap to clone and carry no live state; a connection is made
/// on demand with [`ServerHandle::connect`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerHandle {
    /// The executable or launcher to run.
    pub command: String,
    /// Arguments passed to the command.
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment overrides. `None` inherits the current environment
    /// unchanged.
    #[serde(default)]
    pub env: Option<BTreeMap<String, String>>,
}

impl ServerHandle {
    /// Creates a handle for the given command with no arguments.
    #[inline]
    pub fn new<S: Into<String>>(command: S) -> Self {
        Self {
            command: command.into(),
            args: vec![],
            env: None,
        }
    }

    /// Sets the arguments.
    #[inline]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Adds one environment override.
    #[inline]
    pub fn with_env<K: Into<String>, V: Into<String>>(
        mut self,
        key: K,
        value: V,
    ) -> Self {
        self.env
            .get_or_insert_with(Default::default)
            .insert(key.into(), value.into());
        self
    }

    /// Returns the command line as a single string, for display.
    pub fn cmdline(&self) -> String {
        let mut cmdline = self.command.clone();
        for arg in &self.args {
            cmdline.push(' ');
            cmdline.push_str(arg);
        }
        cmdline
    }

    /// Launches the provider and completes the handshake.
    ///
    /// The process is terminated again if the handshake fails.
    pub async fn connect(&self, label: &str) -> Result<Session, Error> {
        let span = debug_span!("connect", server = label);
        async {
            let mut session = Session::spawn(self, label)?;
            if let Err(err) = session.initialize().await {
                session.close().await;
                return Err(err);
            }
            Ok(session)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let handle = ServerHandle::new("uvx")
            .with_args(["mcp-server-time", "--local-timezone=UTC"])
            .with_env("TZ", "UTC");
        assert_eq!(handle.cmdline(), "uvx mcp-server-time --local-timezone=UTC");
        assert_eq!(handle.env.unwrap()["TZ"], "UTC");
        assert_eq!(ServerHandle::new("node").env, None);
    }
}
