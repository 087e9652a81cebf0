use std::collections::HashSet;

use crate::errors::ConversationError;
use crate::models::message::{Message, Role};

/// The ordered message log of one session.
///
/// Entries are only ever appended. The log is replayed verbatim to the
/// provider on every round, so insertion order is conversation order.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
    issued_tool_call_ids: HashSet<String>,
}

impl Conversation {
    /// Start a conversation with its single system message
    pub fn new<S: Into<String>>(system_prompt: S) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
            issued_tool_call_ids: HashSet::new(),
        }
    }

    /// Add a message at the end of the log.
    ///
    /// Rejects a second system message, tool calls on anything but an
    /// assistant message, and tool results whose id no earlier assistant
    /// message issued.
    pub fn append(&mut self, message: Message) -> Result<(), ConversationError> {
        match message.role {
            Role::System => return Err(ConversationError::DuplicateSystemMessage),
            Role::Assistant => {}
            _ if message.has_tool_calls() => return Err(ConversationError::MisplacedToolCalls),
            Role::Tool => {
                let id = message.tool_call_id.clone().unwrap_or_default();
                if !self.issued_tool_call_ids.contains(&id) {
                    return Err(ConversationError::UnknownToolCallId(id));
                }
            }
            Role::User => {}
        }

        self.issued_tool_call_ids
            .extend(message.tool_calls.iter().map(|call| call.id.clone()));
        self.messages.push(message);
        Ok(())
    }

    /// The full ordered history, system message first
    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}
