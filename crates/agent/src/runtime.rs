use std::fmt::{self, Debug, Formatter};
use std::pin::Pin;
use std::sync::Arc;

use futures_util::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::history::ModelMessage;
use crate::toolset::Toolset;

/// A boxed stream of events belonging to one node of a run.
pub type NodeStream<T> = Pin<Box<dyn Stream<Item = Result<T, Error>> + Send>>;

/// Everything a runtime needs to run one chat turn.
#[derive(Clone, Debug)]
pub struct RunRequest {
    /// The new user message.
    pub prompt: String,
    /// The converted history, system prompt first.
    pub history: Vec<ModelMessage>,
    /// Tools the model may call during this turn.
    pub toolset: Arc<Toolset>,
}

/// A runtime that drives the model through one chat turn.
///
/// A run is reported as a sequence of nodes. Each call to
/// [`run`](AgentRuntime::run) must start a fresh, independent run.
pub trait AgentRuntime: Send + Sync {
    /// Starts a run.
    fn run(
        &self,
        request: RunRequest,
    ) -> impl Stream<Item = Result<RunNode, Error>> + Send + 'static;
}

/// One step of a run.
pub enum RunNode {
    /// The model is producing a response.
    ModelRequest(NodeStream<ResponseEvent>),
    /// The runtime is calling tools the model asked for.
    CallTools(NodeStream<ToolEvent>),
    /// The run is over.
    End {
        /// The final answer.
        output: String,
    },
}

impl Debug for RunNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RunNode::ModelRequest(_) => f.write_str("ModelRequest(..)"),
            RunNode::CallTools(_) => f.write_str("CallTools(..)"),
            RunNode::End { output } => {
                f.debug_struct("End").field("output", output).finish()
            }
        }
    }
}

/// An event from a model response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseEvent {
    /// A new part has started.
    PartStart(Part),
    /// An existing part has grown.
    PartDelta(PartDelta),
}

/// A part of a model response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Part {
    /// Text for the user.
    Text(String),
    /// A tool call request.
    ToolCall(ToolCallRequest),
}

/// An increment to a response part.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartDelta {
    /// More text.
    Text(String),
    /// More of a tool call's serialized arguments.
    ToolCallArgs(String),
}

/// An event from a tool-calling node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolEvent {
    /// A tool is about to be called.
    Call(ToolCallRequest),
    /// A tool call has finished.
    Result(ToolCallResult),
}

/// Describes a tool call request from the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// The unique identifier for the tool call request.
    pub id: String,
    /// The name of the tool to call.
    pub name: String,
    /// The arguments to pass to the tool.
    pub arguments: Value,
}

/// The result of calling a tool.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// The unique identifier for the tool call request.
    pub id: String,
    /// The result of the tool call.
    pub content: String,
}
