// src/client/store.rs
use crate::models::ChatMessage;

pub const GREETING: &str = "Hi! I am the rate my professor bot. How can I help you today?";
pub const ERROR_MESSAGE: &str = "Sorry, there was an error processing your request.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Append(ChatMessage),
    /// Overwrites the trailing message; appends when the store is empty.
    ReplaceLast(ChatMessage),
}

/// Client-side transcript. Every change goes through `apply`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageStore {
    messages: Vec<ChatMessage>,
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageStore {
    /// Starts a conversation with the bot's greeting.
    pub fn new() -> Self {
        Self::from_messages(vec![ChatMessage::assistant(GREETING)])
    }

    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn apply(&mut self, event: StoreEvent) {
        match event {
            StoreEvent::Append(message) => self.messages.push(message),
            StoreEvent::ReplaceLast(message) => match self.messages.last_mut() {
                Some(last) => *last = message,
                None => self.messages.push(message),
            },
        }
    }
}
