use crate::content::{parse_reply, ContentBlock};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Html,
    Image,
    Video,
}

impl ContentType {
    /// Parse the `type` field of an optional-response item
    pub fn from_wire(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Some(ContentType::Text),
            "html" => Some(ContentType::Html),
            "image" => Some(ContentType::Image),
            "video" => Some(ContentType::Video),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Html => "html",
            ContentType::Image => "image",
            ContentType::Video => "video",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Came in over the live audio session rather than the typed-text path
    pub is_speech: bool,
    /// Server-side turn the message belongs to, when known
    pub turn_id: Option<String>,
}

/// A message that has not been appended yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub sender: Sender,
    pub content_type: ContentType,
    pub body: String,
    pub metadata: MessageMetadata,
}

impl NewMessage {
    pub fn new(sender: Sender, content_type: ContentType, body: impl Into<String>) -> Self {
        Self {
            sender,
            content_type,
            body: body.into(),
            metadata: MessageMetadata::default(),
        }
    }

    pub fn user_text(body: impl Into<String>) -> Self {
        Self::new(Sender::User, ContentType::Text, body)
    }

    pub fn bot_text(body: impl Into<String>) -> Self {
        Self::new(Sender::Bot, ContentType::Text, body)
    }

    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Strictly increasing within one conversation log
    pub id: u64,
    pub sender: Sender,
    pub content_type: ContentType,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: MessageMetadata,
    /// Parsed body, only populated for text messages
    pub blocks: Vec<ContentBlock>,
}

impl Message {
    pub(crate) fn from_new(id: u64, new: NewMessage) -> Self {
        let blocks = match new.content_type {
            ContentType::Text => parse_reply(&new.body),
            _ => Vec::new(),
        };

        Self {
            id,
            sender: new.sender,
            content_type: new.content_type,
            body: new.body,
            timestamp: Utc::now(),
            metadata: new.metadata,
            blocks,
        }
    }
}
