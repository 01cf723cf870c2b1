use crate::state::{Message, Role};

/// Ordered, append-only list of messages. The single source of truth for
/// what a front end displays.
///
/// The only removal is [`ConversationStore::retract`], which takes back a
/// user message so it can be edited and sent again.
#[derive(Debug, Default, Clone)]
pub struct ConversationStore {
    messages: Vec<Message>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, returning its index
    pub fn push(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    /// Remove the user message at `index`. Assistant messages are never retracted.
    pub fn retract(&mut self, index: usize) -> Option<Message> {
        match self.messages.get(index) {
            Some(msg) if msg.is_user() => Some(self.messages.remove(index)),
            _ => None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Message> {
        self.messages.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Index of the most recent message with the given role
    pub fn last_of_role(&self, role: Role) -> Option<usize> {
        self.messages.iter().rposition(|m| m.role == role)
    }
}
