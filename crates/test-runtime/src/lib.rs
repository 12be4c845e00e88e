//! A local fake agent runtime for testing purpose.

mod paced;
mod preset;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::{Stream, StreamExt, stream};
use mcpdock_agent::{
    AgentRuntime, Error, ModelMessage, NodeStream, Part, PartDelta,
    ResponseEvent, RunNode, RunRequest, ToolCallRequest, ToolCallResult,
    ToolEvent,
};

pub use paced::Paced;
pub use preset::*;

/// What a run was started with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRun {
    /// The new user message.
    pub prompt: String,
    /// The converted history.
    pub history: Vec<ModelMessage>,
    /// Names of the tools that were callable.
    pub tools: Vec<String>,
}

/// A local fake runtime for testing purpose.
///
/// Every run replays the whole script. Tool nodes really call the tools
/// through the toolset of the request, so tool results come from the
/// connected servers.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestRuntime {
    script: Vec<PresetNode>,
    delay: Option<Duration>,
    runs: Arc<Mutex<Vec<RecordedRun>>>,
}

impl TestRuntime {
    #[inline]
    pub fn add_node(&mut self, node: PresetNode) {
        self.script.push(node);
    }

    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns the runs started so far, shared with every clone.
    pub fn runs(&self) -> Vec<RecordedRun> {
        self.runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn pace<T, S>(&self, stream: S) -> NodeStream<T>
    where
        S: Stream<Item = Result<T, Error>> + Send + 'static,
    {
        let delay = self.delay.unwrap_or(Duration::from_millis(1));
        Box::pin(Paced::new(stream, delay))
    }

    fn response_events(&self, events: Vec<PresetEvent>) -> NodeStream<ResponseEvent> {
        let events = events.into_iter().map(|event| {
            Ok(match event {
                PresetEvent::PartStart(text) => ResponseEvent::PartStart(Part::Text(text)),
                PresetEvent::TextDelta(delta) => {
                    ResponseEvent::PartDelta(PartDelta::Text(delta))
                }
                PresetEvent::ToolCall(req) => ResponseEvent::PartStart(Part::ToolCall(req)),
            })
        });
        self.pace(stream::iter(events))
    }

    fn tool_events(
        &self,
        request: &RunRequest,
        calls: Vec<ToolCallRequest>,
    ) -> NodeStream<ToolEvent> {
        let toolset = request.toolset.clone();
        let events = stream::iter(calls).flat_map(move |call| {
            let result = toolset.call(&call.name, call.arguments.clone());
            let id = call.id.clone();
            stream::once(async move { Ok(ToolEvent::Call(call)) }).chain(stream::once(
                async move {
                    let content = match result.await {
                        Ok(text) => text,
                        Err(err) => format!("{err}"),
                    };
                    Ok(ToolEvent::Result(ToolCallResult { id, content }))
                },
            ))
        });
        self.pace(events)
    }
}

impl AgentRuntime for TestRuntime {
    fn run(
        &self,
        request: RunRequest,
    ) -> impl Stream<Item = Result<RunNode, Error>> + Send + 'static {
        self.runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRun {
                prompt: request.prompt.clone(),
                history: request.history.clone(),
                tools: request
                    .toolset
                    .definitions()
                    .into_iter()
                    .map(|tool| tool.name)
                    .collect(),
            });

        let nodes: Vec<_> = self
            .script
            .iter()
            .cloned()
            .map(|node| match node {
                PresetNode::ModelRequest(events) => {
                    Ok(RunNode::ModelRequest(self.response_events(events)))
                }
                PresetNode::CallTools(calls) => {
                    Ok(RunNode::CallTools(self.tool_events(&request, calls)))
                }
                PresetNode::End(output) => Ok(RunNode::End { output }),
                PresetNode::Failure(reason) => {
                    Err(Error::runtime().with_reason(reason))
                }
            })
            .collect();
        stream::iter(nodes)
    }
}
