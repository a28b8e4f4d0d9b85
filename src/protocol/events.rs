//! Control events and their wire format
//!
//! One control-channel frame is a JSON object carrying any subset of the
//! known keys. The text endpoint answers with the same shape.

use crate::audio::AudioClip;
use crate::messages::ContentType;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Barge-in discriminator sent when the user talks over a reply
pub const INTERRUPT_AUDIO: &str = "INTERRUPT_AUDIO";

/// Top-level keys that make an object a control payload
pub const KNOWN_KEYS: &[&str] = &[
    "transcription",
    "micro_agent",
    "reply_preview",
    "optional_response",
    "reply_audio_b64",
    "error",
];

/// One action item extracted from the user's utterance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionItem {
    pub description: String,
    pub assignee: Option<String>,
    pub due_date: Option<String>,
    pub priority: Option<String>,
}

/// One optional-response element; the type stays raw so unknown kinds can be
/// reported instead of failing the whole payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl ResponseItem {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    pub fn content_type(&self) -> Option<ContentType> {
        ContentType::from_wire(&self.kind)
    }
}

/// A decoded control event
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// Server stopped the current reply because the user started talking
    InterruptAudio,
    /// What the server heard; starts the loading indicator
    Transcription {
        text: String,
        lang_code: Option<String>,
        turn_id: Option<String>,
    },
    KeyPoints {
        text: String,
        turn_id: Option<String>,
    },
    ActionItems {
        items: Vec<ActionItem>,
        turn_id: Option<String>,
    },
    /// The assistant's reply; clears the loading indicator
    ReplyPreview {
        text: String,
        turn_id: Option<String>,
    },
    OptionalResponse {
        items: Vec<ResponseItem>,
        turn_id: Option<String>,
    },
    ProcessingError {
        error: String,
        detail: Option<String>,
    },
    /// Synthesized speech to play; never becomes a message
    ReplyAudio {
        clip: AudioClip,
        turn_id: Option<String>,
    },
    /// Payload that was not a control object, shown verbatim
    RawText(String),
}

impl ControlEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ControlEvent::InterruptAudio => "interrupt_audio",
            ControlEvent::Transcription { .. } => "transcription",
            ControlEvent::KeyPoints { .. } => "key_points",
            ControlEvent::ActionItems { .. } => "action_items",
            ControlEvent::ReplyPreview { .. } => "reply_preview",
            ControlEvent::OptionalResponse { .. } => "optional_response",
            ControlEvent::ProcessingError { .. } => "error",
            ControlEvent::ReplyAudio { .. } => "reply_audio",
            ControlEvent::RawText(_) => "raw_text",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct WireTranscription {
    pub original_text: String,
    pub lang_code: Option<String>,
}

/// `key_points` is either prose or a list of points
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireKeyPoints {
    Text(String),
    List(Vec<String>),
}

impl WireKeyPoints {
    pub fn into_text(self) -> String {
        match self {
            WireKeyPoints::Text(text) => text,
            WireKeyPoints::List(points) => points
                .iter()
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .map(|p| format!("- {}", p))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct WireMicroAgent {
    pub key_points: Option<WireKeyPoints>,
    pub action_items: Option<Vec<ActionItem>>,
}

/// `optional_response` element as sent; `value` is whatever the agent produced
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireResponseItem {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub value: Value,
}

impl WireResponseItem {
    /// Strings pass through, other values are shown as JSON, null is dropped
    pub fn into_item(self) -> Option<ResponseItem> {
        let value = match self.value {
            Value::Null => {
                warn!("Optional response of type {:?} has no value, skipped", self.kind);
                return None;
            }
            Value::String(text) => text,
            other => other.to_string(),
        };
        Some(ResponseItem::new(self.kind, value))
    }
}

/// A control object split into its keys
///
/// Each key is decoded on its own; a malformed key is logged and recorded in
/// `malformed` while the rest of the payload still counts.
#[derive(Debug, Clone, Default)]
pub(crate) struct WirePayload {
    pub kind: Option<String>,
    pub turn_id: Option<String>,
    pub transcription: Option<WireTranscription>,
    pub micro_agent: Option<WireMicroAgent>,
    pub reply_preview: Option<String>,
    pub optional_response: Option<Vec<ResponseItem>>,
    pub reply_audio_b64: Option<String>,
    pub reply_audio_mime: Option<String>,
    pub error: Option<String>,
    pub detail: Option<String>,
    pub malformed: Vec<String>,
}

impl WirePayload {
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let mut malformed = Vec::new();

        let micro_agent = match object.get("micro_agent") {
            None | Some(Value::Null) => None,
            Some(Value::Object(agent)) => Some(WireMicroAgent {
                key_points: field(agent, "key_points", &mut malformed),
                action_items: field(agent, "action_items", &mut malformed),
            }),
            Some(_) => {
                warn!("Control key micro_agent is not an object, skipped");
                malformed.push("micro_agent".to_string());
                None
            }
        };

        let optional_response = field::<Vec<Value>>(object, "optional_response", &mut malformed)
            .map(|items| {
                items
                    .into_iter()
                    .filter_map(|item| match serde_json::from_value::<WireResponseItem>(item) {
                        Ok(item) => item.into_item(),
                        Err(e) => {
                            warn!("Malformed optional response element skipped: {}", e);
                            None
                        }
                    })
                    .collect()
            });

        Self {
            kind: field(object, "type", &mut malformed),
            turn_id: field(object, "turn_id", &mut malformed),
            transcription: field(object, "transcription", &mut malformed),
            micro_agent,
            reply_preview: field(object, "reply_preview", &mut malformed),
            optional_response,
            reply_audio_b64: field(object, "reply_audio_b64", &mut malformed),
            reply_audio_mime: field(object, "reply_audio_mime", &mut malformed),
            error: field(object, "error", &mut malformed),
            detail: field(object, "detail", &mut malformed),
            malformed,
        }
    }

    pub fn is_interrupt(&self) -> bool {
        self.kind.as_deref() == Some(INTERRUPT_AUDIO)
    }
}

fn field<T: DeserializeOwned>(object: &Map<String, Value>, key: &str, malformed: &mut Vec<String>) -> Option<T> {
    match object.get(key) {
        None | Some(Value::Null) => None,
        Some(value) => match T::deserialize(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("Control key {} is malformed, skipped: {}", key, e);
                malformed.push(key.to_string());
                None
            }
        },
    }
}
