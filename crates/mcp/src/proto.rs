//! Wire types of the protocol.
//!
//! Only the messages used by the handshake and by tool calls are modelled.
//! Everything else is kept as raw [`Value`]s.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Error;

/// The protocol revision sent on `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC code for an unknown method.
pub(crate) const METHOD_NOT_FOUND: i64 = -32601;

// ----------------------------
// Types sent to the provider
// ----------------------------

#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct Request<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

impl<'a> Request<'a> {
    #[inline]
    pub fn new(id: u64, method: &'a str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct Notification<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

impl<'a> Notification<'a> {
    #[inline]
    pub fn new(method: &'a str) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method,
            params: None,
        }
    }
}

/// A reply to a request issued by the provider.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct Reply {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

impl Reply {
    #[inline]
    pub fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    #[inline]
    pub fn error(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(error),
        }
    }
}

// ----------------------------------
// Types received from the provider
// ----------------------------------

/// The error object of a JSON-RPC response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    /// Error code.
    pub code: i64,
    /// Human readable message.
    pub message: String,
    /// Additional data, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

/// A message read from the provider.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Incoming {
    Response {
        id: Value,
        outcome: Result<Value, RpcError>,
    },
    Request {
        id: Value,
        method: String,
    },
    Notification {
        method: String,
        params: Option<Value>,
    },
}

impl Incoming {
    pub fn parse(line: &str) -> Result<Self, Error> {
        let raw: RawMessage = serde_json::from_str(line).map_err(|err| {
            Error::protocol().with_reason(format!("malformed message: {err}"))
        })?;
        let message = match (raw.id, raw.method) {
            (Some(id), Some(method)) => Incoming::Request { id, method },
            (None, Some(method)) => Incoming::Notification {
                method,
                params: raw.params,
            },
            (Some(id), None) => {
                let outcome = match raw.error {
                    Some(error) => Err(error),
                    None => Ok(raw.result.unwrap_or(Value::Null)),
                };
                Incoming::Response { id, outcome }
            }
            (None, None) => {
                return Err(Error::protocol()
                    .with_reason("message has neither an id nor a method"));
            }
        };
        Ok(message)
    }
}

/// Name and version of a protocol participant.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Implementation {
    /// Name of the program.
    pub name: String,
    /// Version of the program.
    #[serde(default)]
    pub version: String,
}

/// The result of the `initialize` request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// The protocol revision chosen by the provider.
    pub protocol_version: String,
    /// Capabilities announced by the provider.
    #[serde(default)]
    pub capabilities: Value,
    /// Identity of the provider.
    #[serde(default)]
    pub server_info: Option<Implementation>,
    /// Usage hints for the model.
    #[serde(default)]
    pub instructions: Option<String>,
}

/// Describes a tool exposed by a provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Description of the tool.
    #[serde(default)]
    pub description: Option<String>,
    /// A JSON schema describing the arguments.
    #[serde(default)]
    pub input_schema: Value,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListToolsResult {
    #[serde(default)]
    pub tools: Vec<ToolInfo>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// The result of a `tools/call` request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    /// Content items, kept as raw JSON.
    #[serde(default)]
    pub content: Vec<Value>,
    /// Whether the tool reported a failure.
    #[serde(default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// Joins every text content item with new lines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|item| item.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_request_wire_format() {
        let req = Request::new(1, "tools/list", None);
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#
        );

        let note = Notification::new("notifications/initialized");
        assert_eq!(
            serde_json::to_string(&note).unwrap(),
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#
        );
    }

    #[test]
    fn test_classify_incoming() {
        let msg = Incoming::parse(r#"{"jsonrpc":"2.0","id":3,"result":{}}"#)
            .unwrap();
        assert_eq!(
            msg,
            Incoming::Response {
                id: json!(3),
                outcome: Ok(json!({})),
            }
        );

        let msg = Incoming::parse(
            r#"{"jsonrpc":"2.0","id":4,"error":{"code":-1,"message":"no"}}"#,
        )
        .unwrap();
        let Incoming::Response { outcome, .. } = msg else {
            panic!("expected a response");
        };
        assert_eq!(outcome.unwrap_err().message, "no");

        let msg =
            Incoming::parse(r#"{"jsonrpc":"2.0","id":"a","method":"ping"}"#)
                .unwrap();
        assert!(matches!(msg, Incoming::Request { method, .. } if method == "ping"));

        let msg = Incoming::parse(
            r#"{"jsonrpc":"2.0","method":"notifications/message","params":{}}"#,
        )
        .unwrap();
        assert!(matches!(msg, Incoming::Notification { .. }));

        assert!(Incoming::parse(r#"{"jsonrpc":"2.0"}"#).is_err());
        assert!(Incoming::parse("not json").is_err());
    }

    #[test]
    fn test_call_result_text() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [
                { "type": "text", "text": "first" },
                { "type": "image", "data": "..", "mimeType": "image/png" },
                { "type": "text", "text": "second" }
            ],
            "isError": false
        }))
        .unwrap();
        assert_eq!(result.text(), "first\nsecond");
        assert!(!result.is_error);
    }
}
