use std::collections::HashSet;

use serde_json::{json, Map, Value};

use crate::errors::ProviderError;
use crate::models::message::{Message, Role};
use crate::models::objectid::create_object_id;
use crate::models::tool::{Tool, ToolCallRequest};

use super::base::Usage;

/// How a provider wants tool call arguments and tool results shaped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Arguments as a JSON-encoded string, results linked by `tool_call_id`
    OpenAi,
    /// Arguments as a JSON object, results linked by `tool_name`
    Ollama,
}

/// Convert internal messages to the chat-completion wire format
pub fn messages_to_spec(messages: &[Message], dialect: Dialect) -> Vec<Value> {
    messages
        .iter()
        .map(|message| message_to_spec(message, dialect))
        .collect()
}

fn message_to_spec(message: &Message, dialect: Dialect) -> Value {
    let mut converted = Map::new();
    converted.insert("role".to_string(), json!(message.role));

    if message.role == Role::Assistant && message.has_tool_calls() && message.content.is_empty()
    {
        // OpenAI expects null rather than "" next to tool calls
        let content = match dialect {
            Dialect::OpenAi => Value::Null,
            Dialect::Ollama => json!(""),
        };
        converted.insert("content".to_string(), content);
    } else {
        converted.insert("content".to_string(), json!(message.content));
    }

    if message.has_tool_calls() {
        let tool_calls: Vec<Value> = message
            .tool_calls
            .iter()
            .map(|call| tool_call_to_spec(call, dialect))
            .collect();
        converted.insert("tool_calls".to_string(), json!(tool_calls));
    }

    if message.role == Role::Tool {
        match dialect {
            Dialect::OpenAi => {
                if let Some(id) = &message.tool_call_id {
                    converted.insert("tool_call_id".to_string(), json!(id));
                }
            }
            Dialect::Ollama => {
                if let Some(name) = &message.tool_name {
                    converted.insert("tool_name".to_string(), json!(name));
                }
            }
        }
    }

    Value::Object(converted)
}

fn tool_call_to_spec(call: &ToolCallRequest, dialect: Dialect) -> Value {
    match dialect {
        Dialect::OpenAi => json!({
            "id": call.id,
            "type": "function",
            "function": {
                "name": call.tool_name,
                "arguments": call.arguments.to_string(),
            }
        }),
        Dialect::Ollama => json!({
            "function": {
                "name": call.tool_name,
                "arguments": call.arguments,
            }
        }),
    }
}

/// Convert the tool catalog to the function-calling specification
pub fn tools_to_spec(tools: &[Tool]) -> Result<Vec<Value>, ProviderError> {
    let mut tool_names = HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(ProviderError::InvalidRequest(format!(
                "Duplicate tool name: {}",
                tool.name
            )));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.parameters,
            }
        }));
    }

    Ok(result)
}

/// The request body shared by both providers
pub fn build_payload(
    model: &str,
    messages: &[Message],
    tools: &[Tool],
    dialect: Dialect,
) -> Result<Value, ProviderError> {
    let tools_spec = tools_to_spec(tools)?;

    let mut payload = json!({
        "model": model,
        "stream": false,
        "messages": messages_to_spec(messages, dialect),
    });

    if !tools_spec.is_empty() {
        if let Some(object) = payload.as_object_mut() {
            object.insert("tools".to_string(), json!(tools_spec));
            object.insert("tool_choice".to_string(), json!("auto"));
        }
    }

    Ok(payload)
}

/// Surface an `error` member that some servers return with a 2xx status
pub fn check_response_error(response: &Value) -> Result<(), ProviderError> {
    match response.get("error") {
        None | Some(Value::Null) => Ok(()),
        Some(error) => {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .or_else(|| error.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            Err(ProviderError::Api(message))
        }
    }
}

/// Unwrap an OpenAI response, which nests the message under `choices[0].message`
pub fn openai_response_to_message(response: &Value) -> Result<Message, ProviderError> {
    let original = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| {
            ProviderError::MalformedResponse("missing choices[0].message".to_string())
        })?;
    assistant_message_from_spec(original)
}

/// Unwrap an Ollama response, which carries the message directly under `message`
pub fn ollama_response_to_message(response: &Value) -> Result<Message, ProviderError> {
    let original = response
        .get("message")
        .ok_or_else(|| ProviderError::MalformedResponse("missing message".to_string()))?;
    assistant_message_from_spec(original)
}

fn assistant_message_from_spec(original: &Value) -> Result<Message, ProviderError> {
    if !original.is_object() {
        return Err(ProviderError::MalformedResponse(format!(
            "assistant message is not an object: {}",
            original
        )));
    }

    let mut message = Message::assistant();
    if let Some(text) = original.get("content").and_then(Value::as_str) {
        message = message.with_text(text);
    }

    let tool_calls = original
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for tool_call in tool_calls {
        let id = tool_call
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| create_object_id("call"));
        let function_name = tool_call["function"]["name"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        let arguments = parse_arguments(&tool_call["function"]["arguments"]);
        message = message.with_tool_call(id, function_name, arguments);
    }

    Ok(message)
}

/// Arguments arrive as an encoded string (OpenAI) or an object (Ollama).
/// A string that does not decode is kept as is and rejected at dispatch.
fn parse_arguments(arguments: &Value) -> Value {
    match arguments {
        Value::String(encoded) if encoded.trim().is_empty() => json!({}),
        Value::String(encoded) => {
            serde_json::from_str::<Value>(encoded).unwrap_or_else(|_| arguments.clone())
        }
        Value::Null => json!({}),
        other => other.clone(),
    }
}

fn count(data: &Value, key: &str) -> Option<i32> {
    data.get(key)
        .and_then(Value::as_i64)
        .and_then(|v| i32::try_from(v).ok())
}

fn usage_from_counts(
    input_tokens: Option<i32>,
    output_tokens: Option<i32>,
    total_tokens: Option<i32>,
) -> Usage {
    let total_tokens = total_tokens.or(match (input_tokens, output_tokens) {
        (Some(input), Some(output)) => Some(input.saturating_add(output)),
        _ => None,
    });
    Usage::new(input_tokens, output_tokens, total_tokens)
}

pub fn openai_usage(response: &Value) -> Usage {
    match response.get("usage") {
        Some(usage) => usage_from_counts(
            count(usage, "prompt_tokens"),
            count(usage, "completion_tokens"),
            count(usage, "total_tokens"),
        ),
        None => Usage::default(),
    }
}

pub fn ollama_usage(response: &Value) -> Usage {
    usage_from_counts(
        count(response, "prompt_eval_count"),
        count(response, "eval_count"),
        None,
    )
}
