use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt::{self, Debug, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use mcpdock_mcp::proto::ToolInfo;
use mcpdock_mcp::{ServerHandle, Session};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time;

use crate::error::Error;
use crate::runtime::ToolCallRequest;

/// The result of a tool call.
pub type ToolResult = Result<String, Error>;

type ToolFuture = Pin<Box<dyn Future<Output = ToolResult> + Send>>;

/// How long [`Toolset::connect`] waits for each provider's handshake and
/// tool listing.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

struct ConnectedServer {
    label: String,
    session: Arc<Mutex<Option<Session>>>,
    tools: Vec<ToolInfo>,
}

/// Live sessions with a set of tool providers, and the tools they expose.
///
/// Calls are routed by tool name. When two providers expose a tool with the
/// same name, the one listed first keeps it.
#[derive(Default)]
pub struct Toolset {
    servers: Vec<ConnectedServer>,
    routes: HashMap<String, usize>,
}

impl Toolset {
    /// Connects to every handle and lists its tools, giving each one
    /// [`DEFAULT_CONNECT_TIMEOUT`].
    ///
    /// Handles that fail to connect are logged and skipped.
    #[inline]
    pub async fn connect(handles: &[ServerHandle]) -> Self {
        Self::connect_with_timeout(handles, DEFAULT_CONNECT_TIMEOUT).await
    }

    /// Like [`Toolset::connect`], but a handle that has not finished its
    /// handshake and tool listing within `timeout` is shut down and
    /// skipped.
    pub async fn connect_with_timeout(handles: &[ServerHandle], timeout: Duration) -> Self {
        let mut toolset = Self::default();
        for handle in handles {
            let label = handle.cmdline();
            let mut session = match Session::spawn(handle, &label) {
                Ok(session) => session,
                Err(err) => {
                    warn!("skipping tool server `{label}`: {err}");
                    continue;
                }
            };
            match time::timeout(timeout, handshake(&mut session)).await {
                Ok(Ok(tools)) => toolset.add(label, session, tools),
                Ok(Err(err)) => {
                    warn!("skipping tool server `{label}`: {err}");
                    session.close().await;
                }
                Err(_) => {
                    warn!("skipping tool server `{label}`: no answer within {timeout:?}");
                    session.close().await;
                }
            }
        }
        debug!(
            "connected to {} tool servers with {} tools",
            toolset.servers.len(),
            toolset.routes.len()
        );
        toolset
    }

    fn add(&mut self, label: String, session: Session, tools: Vec<ToolInfo>) {
        let idx = self.servers.len();
        for tool in &tools {
            match self.routes.entry(tool.name.clone()) {
                Entry::Vacant(entry) => {
                    entry.insert(idx);
                }
                Entry::Occupied(entry) => {
                    let owner = &self.servers[*entry.get()].label;
                    warn!(
                        "tool `{}` of `{label}` is shadowed by `{owner}`",
                        tool.name
                    );
                }
            }
        }
        self.servers.push(ConnectedServer {
            label,
            session: Arc::new(Mutex::new(Some(session))),
            tools,
        });
    }

    /// Returns the number of callable tools.
    #[inline]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns whether no tool is callable.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Returns the callable tools, in server order.
    pub fn definitions(&self) -> Vec<ToolInfo> {
        let routes = &self.routes;
        self.servers
            .iter()
            .enumerate()
            .flat_map(|(idx, server)| {
                server
                    .tools
                    .iter()
                    .filter(move |tool| routes.get(&tool.name) == Some(&idx))
            })
            .cloned()
            .collect()
    }

    /// Calls a tool and returns its text content.
    ///
    /// The returned future does not borrow the toolset. Calls to the same
    /// server are serialized.
    pub fn call(&self, name: &str, arguments: Value) -> ToolFuture {
        let Some(&idx) = self.routes.get(name) else {
            return Box::pin(ready(Err(Error::unknown_tool()
                .with_reason(format!("no server provides `{name}`")))));
        };
        let session = Arc::clone(&self.servers[idx].session);
        let name = name.to_owned();
        Box::pin(async move {
            let mut session = session.lock().await;
            let Some(session) = session.as_mut() else {
                return Err(Error::session()
                    .with_reason(format!("session for `{name}` is closed")));
            };
            let result = session.call_tool(&name, arguments).await?;
            let text = result.text();
            if result.is_error {
                return Err(Error::tool_failed().with_reason(text));
            }
            Ok(text)
        })
    }

    /// Hands one future per known tool call to `spawner`.
    pub fn handle_requests<S>(&self, requests: Vec<ToolCallRequest>, spawner: S)
    where
        S: FnMut(String, ToolFuture),
    {
        let mut spawner = spawner;

        let span = debug_span!("toolset");
        let _enter = span.enter();
        for req in requests {
            if !self.routes.contains_key(&req.name) {
                warn!("tool not found: {}", req.name);
                continue;
            }
            let id = req.id;
            trace!("spawning a tool ({id}) with args: {}", req.arguments);
            spawner(id, self.call(&req.name, req.arguments));
        }
    }

    /// Closes every session.
    ///
    /// Calls made afterwards fail with a session error.
    pub async fn close(&self) {
        for server in &self.servers {
            let session = server.session.lock().await.take();
            if let Some(session) = session {
                session.close().await;
            }
        }
    }
}

async fn handshake(session: &mut Session) -> Result<Vec<ToolInfo>, mcpdock_mcp::Error> {
    session.initialize().await?;
    session.list_tools().await
}

impl Debug for Toolset {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let servers: Vec<_> = self
            .servers
            .iter()
            .map(|server| &server.label)
            .collect();
        f.debug_struct("Toolset")
            .field("servers", &servers)
            .field("tools", &self.routes.len())
            .finish()
    }
}
