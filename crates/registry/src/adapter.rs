use mcpdock_mcp::ServerHandle;

use crate::ServerDescriptor;

impl From<&ServerDescriptor> for ServerHandle {
    /// Keeps only what is needed to launch the provider. Timeout and
    /// description stay behind: the agent runtime reconnects on every use.
    fn from(descriptor: &ServerDescriptor) -> Self {
        ServerHandle {
            command: descriptor.command().to_owned(),
            args: descriptor.args().to_vec(),
            env: descriptor.env().cloned(),
        }
    }
}

impl ServerDescriptor {
    /// Converts the descriptor into a connection handle.
    #[inline]
    pub fn handle(&self) -> ServerHandle {
        ServerHandle::from(self)
    }
}

/// Converts descriptors into the handles the agent runtime expects.
pub fn to_handles<'a, I>(descriptors: I) -> Vec<ServerHandle>
where
    I: IntoIterator<Item = &'a ServerDescriptor>,
{
    descriptors.into_iter().map(ServerHandle::from).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use super::*;
    use crate::DescriptorBuilder;

    #[test]
    fn test_narrowing() {
        let env = BTreeMap::from([("TZ".to_owned(), "UTC".to_owned())]);
        let descriptor = DescriptorBuilder::with_command("time", "uvx")
            .with_args(["mcp-server-time"])
            .with_env(Some(env.clone()))
            .with_timeout(Duration::from_secs(5))
            .with_description("Time zone conversions")
            .build();

        let handles = to_handles([&descriptor]);
        assert_eq!(
            handles,
            [ServerHandle {
                command: "uvx".to_owned(),
                args: vec!["mcp-server-time".to_owned()],
                env: Some(env),
            }]
        );
    }
}
