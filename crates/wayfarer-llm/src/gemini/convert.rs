//! Message, tool and response conversion for the Gemini API

use super::types::*;
use crate::message::{Message, MessageRole};
use crate::tools::{ToolCall, ToolChoice, ToolDefinition};
use crate::turn::TurnReply;

/// JSON Schema keywords outside Gemini's OpenAPI subset
const UNSUPPORTED_SCHEMA_FIELDS: &[&str] = &["default", "additionalProperties", "$schema"];

/// Split messages into Gemini's system instruction and content turns.
///
/// Several system messages are joined into one instruction. Consecutive tool
/// responses share one user turn, matching the function calls they answer.
pub(crate) fn convert_messages(messages: &[Message]) -> (Option<GeminiContent>, Vec<GeminiContent>) {
    let mut system_parts: Vec<&str> = Vec::new();
    let mut contents: Vec<GeminiContent> = Vec::new();

    for msg in messages {
        match msg.role {
            MessageRole::System => system_parts.push(&msg.content),
            MessageRole::User => {
                if !msg.content.is_empty() {
                    contents.push(GeminiContent::text(Some("user"), msg.content.clone()));
                }
            }
            MessageRole::Assistant => {
                let mut parts = Vec::new();
                if !msg.content.is_empty() {
                    parts.push(GeminiPart::Text {
                        text: msg.content.clone(),
                    });
                }
                for call in &msg.tool_calls {
                    parts.push(GeminiPart::FunctionCall {
                        function_call: FunctionCall {
                            name: call.name.clone(),
                            args: call.arguments_value(),
                        },
                    });
                }
                if !parts.is_empty() {
                    contents.push(GeminiContent {
                        role: Some("model".to_string()),
                        parts,
                    });
                }
            }
            MessageRole::Tool => {
                let Some(name) = &msg.name else {
                    tracing::warn!("Dropping tool response without a tool name");
                    continue;
                };
                let response = match serde_json::from_str::<serde_json::Value>(&msg.content) {
                    Ok(value) if value.is_object() => value,
                    Ok(value) => serde_json::json!({ "result": value }),
                    Err(_) => serde_json::json!({ "result": msg.content }),
                };
                let part = GeminiPart::FunctionResponse {
                    function_response: FunctionResponse {
                        name: name.clone(),
                        response,
                    },
                };

                match contents.last_mut() {
                    Some(last)
                        if last.role.as_deref() == Some("user")
                            && last
                                .parts
                                .iter()
                                .all(|p| matches!(p, GeminiPart::FunctionResponse { .. })) =>
                    {
                        last.parts.push(part);
                    }
                    _ => contents.push(GeminiContent {
                        role: Some("user".to_string()),
                        parts: vec![part],
                    }),
                }
            }
        }
    }

    let system_instruction =
        (!system_parts.is_empty()).then(|| GeminiContent::text(None, system_parts.join("\n\n")));
    (system_instruction, contents)
}

/// Recursively remove schema keywords Gemini rejects with INVALID_ARGUMENT
pub(crate) fn strip_unsupported_schema_fields(value: &mut serde_json::Value) {
    if let Some(obj) = value.as_object_mut() {
        for field in UNSUPPORTED_SCHEMA_FIELDS {
            obj.remove(*field);
        }
        for (_, v) in obj.iter_mut() {
            strip_unsupported_schema_fields(v);
        }
    } else if let Some(arr) = value.as_array_mut() {
        for v in arr.iter_mut() {
            strip_unsupported_schema_fields(v);
        }
    }
}

/// Convert tool definitions into a single Gemini tool block
pub(crate) fn convert_tools(tools: &[ToolDefinition]) -> Vec<GeminiTool> {
    let function_declarations = tools
        .iter()
        .map(|tool| {
            let mut parameters = tool.parameters.clone();
            strip_unsupported_schema_fields(&mut parameters);
            FunctionDeclaration {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters,
            }
        })
        .collect();

    vec![GeminiTool {
        function_declarations,
    }]
}

pub(crate) fn convert_tool_choice(choice: ToolChoice) -> ToolConfig {
    let mode = match choice {
        ToolChoice::Auto => "AUTO",
        ToolChoice::None => "NONE",
    };
    ToolConfig {
        function_calling_config: FunctionCallingConfig { mode },
    }
}

/// Text and function calls of one candidate
pub(crate) fn extract_turn(candidate: &Candidate) -> TurnReply {
    let mut texts = Vec::new();
    let mut tool_calls = Vec::new();

    for part in &candidate.content.parts {
        match part {
            GeminiPart::Text { text } => texts.push(text.as_str()),
            GeminiPart::FunctionCall { function_call } => tool_calls.push(ToolCall {
                // Gemini does not assign call ids
                id: uuid::Uuid::new_v4().to_string(),
                name: function_call.name.clone(),
                arguments: function_call.args.to_string(),
            }),
            GeminiPart::FunctionResponse { .. } | GeminiPart::Other(_) => {}
        }
    }

    let text = texts.concat();
    TurnReply {
        content: (!text.is_empty()).then_some(text),
        tool_calls,
        finish_reason: candidate.finish_reason.clone(),
    }
}
