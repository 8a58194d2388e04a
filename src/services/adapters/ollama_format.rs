use crate::{
    messages::{ContentBlock, Message, Role},
    services::wire::{OllamaFunctionCall, OllamaMessage, OllamaToolCall},
};

/// Convert conversation history into Ollama chat messages.
///
/// - user tool results become separate `tool` messages, ahead of the user text
/// - images travel in the `images` field
/// - assistant tool uses become `tool_calls`
/// - thinking blocks are dropped
/// - messages left with no content are skipped
#[must_use]
pub fn convert_to_ollama_messages(messages: &[Message]) -> Vec<OllamaMessage> {
    let mut converted = Vec::with_capacity(messages.len());

    for msg in messages {
        match msg.role {
            Role::User => {
                for block in &msg.content {
                    if let ContentBlock::ToolResult {
                        content, is_error, ..
                    } = block
                    {
                        let content = if is_error.unwrap_or(false) {
                            format!("Error: {content}")
                        } else {
                            content.clone()
                        };
                        converted.push(OllamaMessage::new("tool", content));
                    }
                }
                push_if_not_empty(&mut converted, text_and_images("user", msg));
            }
            Role::System => {
                push_if_not_empty(&mut converted, text_and_images("system", msg));
            }
            Role::Assistant => {
                let mut out = text_and_images("assistant", msg);
                out.images.clear();
                out.tool_calls = msg
                    .content
                    .iter()
                    .filter_map(|block| match block {
                        ContentBlock::ToolUse { name, input, .. } => Some(OllamaToolCall {
                            function: OllamaFunctionCall {
                                name: name.clone(),
                                arguments: input.clone(),
                            },
                        }),
                        _ => None,
                    })
                    .collect();
                push_if_not_empty(&mut converted, out);
            }
        }
    }

    converted
}

fn text_and_images(role: &str, msg: &Message) -> OllamaMessage {
    let images = msg
        .content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Image { data, .. } => Some(data.clone()),
            _ => None,
        })
        .collect();

    let mut out = OllamaMessage::new(role, msg.text_content());
    out.images = images;
    out
}

fn push_if_not_empty(out: &mut Vec<OllamaMessage>, msg: OllamaMessage) {
    if !msg.content.is_empty() || !msg.images.is_empty() || !msg.tool_calls.is_empty() {
        out.push(msg);
    }
}
