mod builder;
mod turn;

use std::sync::Arc;
use std::time::Duration;

use futures_util::{Stream, stream};
use mcpdock_mcp::ServerHandle;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::history::{ChatMessage, convert_history};
use crate::runtime_client::RuntimeClient;
pub use builder::AgentBuilder;
use turn::Turn;

/// A piece of a partial reply, as shown in a chat window.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Fragment {
    /// Text written by the model.
    Text(String),
    /// A tool the model decided to use.
    ToolUse {
        /// Names the tool.
        title: String,
        /// Shows the arguments.
        content: String,
    },
}

impl Fragment {
    /// Returns the text of a text fragment.
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Fragment::Text(text) => Some(text),
            Fragment::ToolUse { .. } => None,
        }
    }
}

/// An agent that answers chat messages with the help of tool providers.
///
/// The agent keeps no conversation state; the caller passes the history
/// with every message. Tool providers are connected at the start of each
/// turn and shut down when it ends.
#[derive(Clone)]
pub struct Agent {
    client: RuntimeClient,
    system_prompt: Arc<str>,
    servers: Arc<[ServerHandle]>,
    connect_timeout: Duration,
}

impl Agent {
    /// Returns the handles of the tool providers this agent uses.
    #[inline]
    pub fn servers(&self) -> &[ServerHandle] {
        &self.servers
    }

    /// Answers `message`.
    ///
    /// Nothing happens until the returned stream is polled. Every item is
    /// the complete list of fragments produced so far; the list only grows,
    /// except that a tool fragment is replaced once the tool is known. Each
    /// call starts an independent turn.
    pub fn chat(
        &self,
        message: &str,
        history: &[ChatMessage],
    ) -> impl Stream<Item = Result<Vec<Fragment>, Error>> + Send + 'static {
        let turn = Turn::new(
            self.client.clone(),
            Arc::clone(&self.servers),
            self.connect_timeout,
            message.to_owned(),
            convert_history(&self.system_prompt, history),
        );
        stream::unfold(turn, |mut turn| async move {
            let snapshot = turn.next_snapshot().await?;
            Some((snapshot, turn))
        })
    }
}
