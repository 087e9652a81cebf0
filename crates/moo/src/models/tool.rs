use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The schema of a tool as advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    /// The name of the tool
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// A json schema of the function signature
    pub parameters: Value,
}

impl Tool {
    pub fn new<N, D>(name: N, description: D, parameters: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Tool {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A tool call the model asked for inside an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRequest {
    /// Provider issued token, echoed back on the matching tool result
    pub id: String,
    pub tool_name: String,
    /// Usually a JSON object; anything else is rejected at dispatch time
    pub arguments: Value,
}

impl ToolCallRequest {
    pub fn new<I, N>(id: I, tool_name: N, arguments: Value) -> Self
    where
        I: Into<String>,
        N: Into<String>,
    {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }
}
