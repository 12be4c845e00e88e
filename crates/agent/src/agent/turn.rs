use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use mcpdock_mcp::ServerHandle;

use super::Fragment;
use crate::error::Error;
use crate::history::ModelMessage;
use crate::runtime::{
    NodeStream, Part, PartDelta, ResponseEvent, RunNode, RunRequest, ToolEvent,
};
use crate::runtime_client::{RunStream, RuntimeClient};
use crate::toolset::Toolset;

enum ActiveNode {
    Response(NodeStream<ResponseEvent>),
    Tools(NodeStream<ToolEvent>),
}

enum NodeEvent {
    Response(ResponseEvent),
    Tool(ToolEvent),
}

enum Stage {
    Pending { prompt: String, history: Vec<ModelMessage> },
    Running { run: RunStream, toolset: Arc<Toolset> },
    Done,
}

/// The state of one chat turn, folded into fragments.
pub(super) struct Turn {
    client: RuntimeClient,
    servers: Arc<[ServerHandle]>,
    connect_timeout: Duration,
    stage: Stage,
    node: Option<ActiveNode>,
    fragments: Vec<Fragment>,
}

impl Turn {
    pub fn new(
        client: RuntimeClient,
        servers: Arc<[ServerHandle]>,
        connect_timeout: Duration,
        prompt: String,
        history: Vec<ModelMessage>,
    ) -> Self {
        Self {
            client,
            servers,
            connect_timeout,
            stage: Stage::Pending { prompt, history },
            node: None,
            fragments: vec![],
        }
    }

    /// Advances the run until the fragments change or the run ends.
    pub async fn next_snapshot(&mut self) -> Option<Result<Vec<Fragment>, Error>> {
        if let Stage::Pending { .. } = self.stage {
            self.start().await;
        }

        loop {
            if let Some(node) = &mut self.node {
                let event = match node {
                    ActiveNode::Response(events) => {
                        events.next().await.map(|event| event.map(NodeEvent::Response))
                    }
                    ActiveNode::Tools(events) => {
                        events.next().await.map(|event| event.map(NodeEvent::Tool))
                    }
                };
                match event {
                    Some(Ok(NodeEvent::Response(event))) => self.apply_response(event),
                    Some(Ok(NodeEvent::Tool(event))) => self.apply_tool(event),
                    Some(Err(err)) => return Some(Err(self.fail(err).await)),
                    None => {
                        self.node = None;
                        continue;
                    }
                }
                return Some(Ok(self.fragments.clone()));
            }

            let Stage::Running { run, .. } = &mut self.stage else {
                return None;
            };
            match run.next().await {
                Some(Ok(RunNode::ModelRequest(events))) => {
                    self.fragments.push(Fragment::Text(String::new()));
                    self.node = Some(ActiveNode::Response(events));
                }
                Some(Ok(RunNode::CallTools(events))) => {
                    self.fragments.push(Fragment::Text(String::new()));
                    self.node = Some(ActiveNode::Tools(events));
                }
                Some(Ok(RunNode::End { output })) => {
                    info!("assistant replied:\n{output}");
                }
                Some(Err(err)) => return Some(Err(self.fail(err).await)),
                None => {
                    self.finish().await;
                    return None;
                }
            }
        }
    }

    async fn start(&mut self) {
        let Stage::Pending { prompt, history } =
            std::mem::replace(&mut self.stage, Stage::Done)
        else {
            return;
        };
        let toolset = Arc::new(
            Toolset::connect_with_timeout(&self.servers, self.connect_timeout).await,
        );
        let run = self.client.run(RunRequest {
            prompt,
            history,
            toolset: Arc::clone(&toolset),
        });
        self.stage = Stage::Running { run, toolset };
    }

    fn apply_response(&mut self, event: ResponseEvent) {
        let text = match event {
            ResponseEvent::PartStart(Part::Text(text)) => text,
            ResponseEvent::PartDelta(PartDelta::Text(delta)) => delta,
            ResponseEvent::PartStart(Part::ToolCall(_))
            | ResponseEvent::PartDelta(PartDelta::ToolCallArgs(_)) => return,
        };
        if let Some(Fragment::Text(current)) = self.fragments.last_mut() {
            current.push_str(&text);
        }
    }

    fn apply_tool(&mut self, event: ToolEvent) {
        let ToolEvent::Call(req) = event else {
            return;
        };
        if let Some(last) = self.fragments.last_mut() {
            *last = Fragment::ToolUse {
                title: format!("🛠️ Using tool: {}", req.name),
                content: format!("Arguments: {}", req.arguments),
            };
        }
    }

    async fn fail(&mut self, err: Error) -> Error {
        error!("chat turn failed: {err}");
        self.finish().await;
        err
    }

    async fn finish(&mut self) {
        self.node = None;
        if let Stage::Running { toolset, .. } =
            std::mem::replace(&mut self.stage, Stage::Done)
        {
            toolset.close().await;
        }
    }
}
