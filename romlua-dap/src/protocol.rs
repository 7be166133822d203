// Debug Adapter Protocol message types
//
// Only the subset of DAP this adapter speaks. Bodies stay as JSON values;
// arguments that drive behavior get typed structs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProtocolMessage {
    Request(Request),
    Response(Response),
    Event(Event),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub seq: i64,
    pub command: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub seq: i64,
    pub request_seq: i64,
    pub success: bool,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub seq: i64,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Source {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceBreakpoint {
    pub line: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetBreakpointsArguments {
    pub source: Source,
    pub breakpoints: Option<Vec<SourceBreakpoint>>,
    /// Deprecated in DAP but still sent by some clients
    pub lines: Option<Vec<i32>>,
}

impl SetBreakpointsArguments {
    pub fn requested_lines(&self) -> Vec<i32> {
        match (&self.breakpoints, &self.lines) {
            (Some(bps), _) => bps.iter().map(|bp| bp.line).collect(),
            (None, Some(lines)) => lines.clone(),
            (None, None) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariablesArguments {
    pub variables_reference: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateArguments {
    pub expression: String,
    pub context: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_deserialize() {
        let msg: ProtocolMessage = serde_json::from_value(json!({
            "seq": 3,
            "type": "request",
            "command": "threads"
        }))
        .unwrap();

        assert_eq!(
            msg,
            ProtocolMessage::Request(Request {
                seq: 3,
                command: "threads".into(),
                arguments: Value::Null,
            })
        );
    }

    #[test]
    fn test_response_serialize_skips_empty_fields() {
        let msg = ProtocolMessage::Response(Response {
            seq: 1,
            request_seq: 2,
            success: true,
            command: "next".into(),
            message: None,
            body: None,
        });

        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "response", "seq": 1, "request_seq": 2, "success": true, "command": "next"})
        );
    }

    #[test]
    fn test_breakpoint_lines_prefer_breakpoints_field() {
        let args: SetBreakpointsArguments = serde_json::from_value(json!({
            "source": {"path": "/w/main.lua"},
            "breakpoints": [{"line": 4}, {"line": 9}],
            "lines": [1]
        }))
        .unwrap();
        assert_eq!(args.requested_lines(), vec![4, 9]);

        let legacy: SetBreakpointsArguments = serde_json::from_value(json!({
            "source": {"path": "/w/main.lua"},
            "lines": [1, 2]
        }))
        .unwrap();
        assert_eq!(legacy.requested_lines(), vec![1, 2]);
    }
}
