pub mod openrouter;

use serde::Serialize;

use crate::config::prompt::SystemPrompt;
use crate::models::chat::{ ChatMessage, Conversation, Role };

pub use self::openrouter::OpenRouterChatClient;

/// Outbound body: `{model, messages}` with the system message first.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

impl ChatCompletionRequest {
    /// Prepends exactly one system message to the caller's history. The
    /// caller's messages are moved in untouched and in order.
    pub fn new(model: &str, system_prompt: &SystemPrompt, conversation: Conversation) -> Self {
        let history = conversation.into_messages();
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::new(Role::System, system_prompt.as_str()));
        messages.extend(history);
        Self {
            model: model.to_string(),
            messages,
        }
    }
}
