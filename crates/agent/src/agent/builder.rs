use std::time::Duration;

use mcpdock_mcp::ServerHandle;

use super::Agent;
use crate::runtime::AgentRuntime;
use crate::runtime_client::RuntimeClient;
use crate::toolset::DEFAULT_CONNECT_TIMEOUT;

/// [`Agent`] builder.
pub struct AgentBuilder {
    client: RuntimeClient,
    system_prompt: String,
    servers: Vec<ServerHandle>,
    connect_timeout: Duration,
}

impl AgentBuilder {
    /// Creates a new builder with the specified runtime.
    #[inline]
    pub fn with_runtime<R: AgentRuntime + 'static>(runtime: R) -> Self {
        Self {
            client: RuntimeClient::new(runtime),
            system_prompt: String::new(),
            servers: vec![],
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Sets the system prompt sent before the history.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Adds tool providers.
    #[inline]
    pub fn with_servers<I: IntoIterator<Item = ServerHandle>>(
        mut self,
        servers: I,
    ) -> Self {
        self.servers.extend(servers);
        self
    }

    /// Sets how long each provider may take to connect at the start of a
    /// turn. Providers that take longer are left out of that turn.
    #[inline]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Builds the agent.
    #[inline]
    pub fn build(self) -> Agent {
        Agent {
            client: self.client,
            system_prompt: self.system_prompt.into(),
            servers: self.servers.into(),
            connect_timeout: self.connect_timeout,
        }
    }
}
