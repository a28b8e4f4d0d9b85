use super::types::{Message, NewMessage};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
struct LogInner {
    messages: Vec<Message>,
    next_id: u64,
}

/// Append-only conversation log
///
/// Ids are assigned under the same lock as the push, so they are strictly
/// increasing in arrival order even when two messages land in the same
/// millisecond.
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    inner: Arc<RwLock<LogInner>>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, message: NewMessage) -> Message {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        let message = Message::from_new(inner.next_id, message);
        debug!(
            "Appending message {} ({:?}, {})",
            message.id,
            message.sender,
            message.content_type.as_str()
        );
        inner.messages.push(message.clone());
        message
    }

    pub fn get_all(&self) -> Vec<Message> {
        self.inner.read().messages.clone()
    }

    /// Messages appended after `id`
    pub fn since(&self, id: u64) -> Vec<Message> {
        self.inner
            .read()
            .messages
            .iter()
            .filter(|m| m.id > id)
            .cloned()
            .collect()
    }

    pub fn last(&self) -> Option<Message> {
        self.inner.read().messages.last().cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Sender;

    #[test]
    fn test_ids_strictly_increase() {
        let log = ConversationLog::new();
        for i in 0..50 {
            log.append(NewMessage::bot_text(format!("m{}", i)));
        }
        let ids: Vec<u64> = log.get_all().iter().map(|m| m.id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn test_since_and_last() {
        let log = ConversationLog::new();
        let first = log.append(NewMessage::user_text("hello"));
        log.append(NewMessage::bot_text("hi"));

        let newer = log.since(first.id);
        assert_eq!(newer.len(), 1);
        assert_eq!(newer[0].sender, Sender::Bot);
        assert_eq!(log.last().map(|m| m.body), Some("hi".to_string()));
    }

    #[test]
    fn test_clones_share_storage() {
        let log = ConversationLog::new();
        let other = log.clone();
        other.append(NewMessage::user_text("x"));
        assert_eq!(log.len(), 1);
        assert!(!log.is_empty());
    }
}
