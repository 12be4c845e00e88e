use mcpdock_agent::ToolCallRequest;
use serde::{Deserialize, Serialize};

/// The events in a preset model response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    #[serde(rename = "part_start")]
    PartStart(String),
    #[serde(rename = "text_delta")]
    TextDelta(String),
    #[serde(rename = "tool_call")]
    ToolCall(ToolCallRequest),
}

/// One scripted node of a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetNode {
    /// The model answers with these events.
    #[serde(rename = "model_request")]
    ModelRequest(Vec<PresetEvent>),
    /// The runtime calls these tools through the request's toolset.
    #[serde(rename = "call_tools")]
    CallTools(Vec<ToolCallRequest>),
    /// The run ends with this output.
    #[serde(rename = "end")]
    End(String),
    /// The run fails with this reason.
    #[serde(rename = "failure")]
    Failure(String),
}

impl PresetNode {
    /// Creates a model response node from text chunks. The first chunk
    /// starts the part and the rest are deltas.
    pub fn text<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let events = chunks
            .into_iter()
            .enumerate()
            .map(|(idx, chunk)| {
                if idx == 0 {
                    PresetEvent::PartStart(chunk.into())
                } else {
                    PresetEvent::TextDelta(chunk.into())
                }
            })
            .collect();
        PresetNode::ModelRequest(events)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_serialize_deserialize() {
        let script = vec![
            PresetNode::text(["Let me ", "check."]),
            PresetNode::CallTools(vec![ToolCallRequest {
                id: "call:1".to_owned(),
                name: "get_current_time".to_owned(),
                arguments: json!({ "timezone": "Asia/Taipei" }),
            }]),
            PresetNode::End("It is noon.".to_owned()),
        ];

        let serialized = serde_json::to_string(&script).unwrap();
        let deserialized: Vec<PresetNode> =
            serde_json::from_str(&serialized).unwrap();
        assert_eq!(script, deserialized);

        let node: PresetNode =
            serde_json::from_value(json!({ "type": "end", "data": "done" }))
                .unwrap();
        assert_eq!(node, PresetNode::End("done".to_owned()));
    }
}
