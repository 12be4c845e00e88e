//! Chat history as seen by the UI and by the model.

use serde::{Deserialize, Serialize};

/// Who wrote a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person chatting.
    User,
    /// The agent.
    Assistant,
    /// System instructions.
    System,
    /// Anything else, such as tool output shown in the UI.
    #[serde(other)]
    Other,
}

/// One message of the chat history kept by the UI loop.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The author of the message.
    pub role: Role,
    /// The text of the message.
    pub content: String,
}

impl ChatMessage {
    /// Creates a message written by the user.
    #[inline]
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates a message written by the agent.
    #[inline]
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A complete message handed to the agent runtime.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelMessage {
    /// The system instructions.
    System(String),
    /// A user input text.
    User(String),
    /// An assistant text.
    Assistant(String),
}

/// Converts the UI history into model messages.
///
/// The system prompt always comes first. User and assistant turns follow in
/// order; every other role is dropped.
pub fn convert_history(
    system_prompt: &str,
    history: &[ChatMessage],
) -> Vec<ModelMessage> {
    trace!("history: {history:?}");
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ModelMessage::System(system_prompt.to_owned()));
    for msg in history {
        match msg.role {
            Role::User => messages.push(ModelMessage::User(msg.content.clone())),
            Role::Assistant => {
                messages.push(ModelMessage::Assistant(msg.content.clone()))
            }
            Role::System | Role::Other => {}
        }
    }
    messages
}
