use std::collections::BTreeMap;
use std::time::Duration;

use crate::timeout::DEFAULT_TIMEOUT;

/// Description used when an entry does not carry one.
pub const DEFAULT_DESCRIPTION: &str = "No description available.";

/// Launch specification of one tool provider.
///
/// Descriptors are immutable; build them with [`DescriptorBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ServerDescriptor {
    name: String,
    command: String,
    args: Vec<String>,
    env: Option<BTreeMap<String, String>>,
    timeout: Duration,
    description: String,
}

impl ServerDescriptor {
    /// Returns the unique name of the provider.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the executable or launcher.
    #[inline]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Returns the arguments.
    #[inline]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns the environment overrides, if any.
    #[inline]
    pub fn env(&self) -> Option<&BTreeMap<String, String>> {
        self.env.as_ref()
    }

    /// Returns the handshake bound.
    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the human readable description.
    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Builder for [`ServerDescriptor`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DescriptorBuilder {
    name: String,
    command: String,
    args: Vec<String>,
    env: Option<BTreeMap<String, String>>,
    timeout: Option<Duration>,
    description: Option<String>,
}

impl DescriptorBuilder {
    /// Creates a builder for a provider named `name` launched by `command`.
    #[inline]
    pub fn with_command<S1: Into<String>, S2: Into<String>>(
        name: S1,
        command: S2,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: vec![],
            env: None,
            timeout: None,
            description: None,
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

    /// Sets the environment overrides.
    #[inline]
    pub fn with_env(mut self, env: Option<BTreeMap<String, String>>) -> Self {
        self.env = env;
        self
    }

    /// Sets the handshake bound.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the description.
    #[inline]
    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builds the descriptor.
    #[inline]
    pub fn build(self) -> ServerDescriptor {
        ServerDescriptor {
            name: self.name,
            command: self.command,
            args: self.args,
            env: self.env,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            description: self
                .description
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let descriptor = DescriptorBuilder::with_command("time", "uvx").build();
        assert_eq!(descriptor.name(), "time");
        assert_eq!(descriptor.command(), "uvx");
        assert!(descriptor.args().is_empty());
        assert_eq!(descriptor.env(), None);
        assert_eq!(descriptor.timeout(), Duration::from_secs(30));
        assert_eq!(descriptor.description(), DEFAULT_DESCRIPTION);
    }
}
