//! Control payload decoder
//!
//! Turns one raw payload into an ordered list of [`ControlEvent`]s. Decoding
//! never fails: anything that is not a control object becomes a single
//! [`ControlEvent::RawText`] carrying the payload verbatim.

use super::events::{ControlEvent, WirePayload, INTERRUPT_AUDIO, KNOWN_KEYS};
use crate::audio::{AudioClip, MIME_MPEG};
use crate::{Result, RiaError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;
use tracing::{debug, warn};

/// Decode a control-channel frame with the default audio MIME type
pub fn decode_payload(raw: &str) -> Vec<ControlEvent> {
    PayloadDecoder::default().decode(raw)
}

#[derive(Debug, Clone)]
pub struct PayloadDecoder {
    /// Used when a payload carries audio without `reply_audio_mime`
    default_mime: String,
}

impl Default for PayloadDecoder {
    fn default() -> Self {
        Self {
            default_mime: MIME_MPEG.to_string(),
        }
    }
}

impl PayloadDecoder {
    pub fn new(default_mime: impl Into<String>) -> Self {
        Self {
            default_mime: default_mime.into(),
        }
    }

    /// Decode one raw control-channel frame
    pub fn decode(&self, raw: &str) -> Vec<ControlEvent> {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => self.decode_value_or(&value, raw),
            Err(e) => {
                debug!("Payload is not JSON ({}), showing it as text", e);
                vec![ControlEvent::RawText(raw.to_string())]
            }
        }
    }

    /// Decode a reply object from the text endpoint
    ///
    /// The endpoint echoes a transcription of the typed text; the caller
    /// already logged that text, so it is dropped here.
    pub fn decode_reply(&self, value: &Value) -> Vec<ControlEvent> {
        self.decode_value_or(value, &value.to_string())
            .into_iter()
            .filter(|event| !matches!(event, ControlEvent::Transcription { .. }))
            .collect()
    }

    fn decode_value_or(&self, value: &Value, raw: &str) -> Vec<ControlEvent> {
        let Some(object) = value.as_object() else {
            debug!("Payload is not an object, showing it as text");
            return vec![ControlEvent::RawText(raw.to_string())];
        };

        let interrupt = object
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(|t| t == INTERRUPT_AUDIO);
        if !interrupt && !object.keys().any(|k| KNOWN_KEYS.contains(&k.as_str())) {
            debug!("Payload has no control keys, showing it as text");
            return vec![ControlEvent::RawText(raw.to_string())];
        }

        let wire = WirePayload::from_object(object);
        let malformed = wire.malformed.len();
        let events = self.events_from(wire);
        if events.is_empty() && malformed > 0 {
            warn!("No usable control keys in payload, showing it as text");
            return vec![ControlEvent::RawText(raw.to_string())];
        }
        events
    }

    fn events_from(&self, wire: WirePayload) -> Vec<ControlEvent> {
        let mut events = Vec::new();
        let turn_id = wire.turn_id.clone();

        if wire.is_interrupt() {
            events.push(ControlEvent::InterruptAudio);
        }

        if let Some(transcription) = wire.transcription {
            let text = transcription.original_text.trim();
            if text.is_empty() {
                debug!("Empty transcription skipped");
            } else {
                events.push(ControlEvent::Transcription {
                    text: text.to_string(),
                    lang_code: transcription.lang_code,
                    turn_id: turn_id.clone(),
                });
            }
        }

        if let Some(agent) = wire.micro_agent {
            if let Some(points) = agent.key_points {
                let text = points.into_text();
                if !text.trim().is_empty() {
                    events.push(ControlEvent::KeyPoints {
                        text,
                        turn_id: turn_id.clone(),
                    });
                }
            }
            if let Some(items) = agent.action_items {
                if !items.is_empty() {
                    events.push(ControlEvent::ActionItems {
                        items,
                        turn_id: turn_id.clone(),
                    });
                }
            }
        }

        if let Some(reply) = wire.reply_preview {
            if reply.trim().is_empty() {
                debug!("Empty reply preview skipped");
            } else {
                events.push(ControlEvent::ReplyPreview {
                    text: reply,
                    turn_id: turn_id.clone(),
                });
            }
        }

        if let Some(items) = wire.optional_response {
            if !items.is_empty() {
                events.push(ControlEvent::OptionalResponse {
                    items,
                    turn_id: turn_id.clone(),
                });
            }
        }

        if let Some(error) = wire.error {
            events.push(ControlEvent::ProcessingError {
                error,
                detail: wire.detail,
            });
        }

        if let Some(encoded) = wire.reply_audio_b64 {
            match self.decode_audio(&encoded, wire.reply_audio_mime) {
                Ok(clip) => events.push(ControlEvent::ReplyAudio { clip, turn_id }),
                Err(e) => warn!("Reply audio not played: {}", e),
            }
        }

        events
    }

    fn decode_audio(&self, encoded: &str, mime: Option<String>) -> Result<AudioClip> {
        let bytes = STANDARD.decode(encoded.trim())?;
        if bytes.is_empty() {
            return Err(RiaError::Decode("reply audio is empty".into()));
        }
        let mime = mime
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.default_mime.clone());
        Ok(AudioClip::new(bytes, mime))
    }
}
