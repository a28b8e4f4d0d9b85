//! Dispatch of decoded control events
//!
//! Each event becomes conversation messages, a loading-indicator change, a
//! playback request, or an interrupt. Events are applied in the order given,
//! so one payload's messages keep arrival order in the log.

use super::events::{ActionItem, ControlEvent, ResponseItem};
use crate::audio::AudioClip;
use crate::messages::{ContentType, ConversationLog, MessageMetadata, NewMessage, Sender};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Fixed header line of the action-items message
pub const ACTION_ITEMS_HEADER: &str = "Action items:";

/// "Waiting for the assistant" indicator
#[derive(Debug, Clone, Default)]
pub struct LoadingIndicator {
    since: Option<Instant>,
    turn_id: Option<String>,
}

impl LoadingIndicator {
    pub fn is_loading(&self) -> bool {
        self.since.is_some()
    }

    /// Turn the indicator is waiting on, when the server sent one
    pub fn turn_id(&self) -> Option<&str> {
        self.turn_id.as_deref()
    }

    pub fn start(&mut self, turn_id: Option<String>) {
        if self.is_loading() {
            debug!("Loading restarted for turn {:?}", turn_id);
        }
        self.since = Some(Instant::now());
        self.turn_id = turn_id;
    }

    /// Clear the indicator; returns whether it was showing
    ///
    /// A reply for another turn still clears it.
    pub fn clear(&mut self, turn_id: Option<&str>) -> bool {
        let Some(since) = self.since.take() else {
            return false;
        };
        if let (Some(waiting), Some(got)) = (self.turn_id.as_deref(), turn_id) {
            if waiting != got {
                debug!("Reply for turn {} clears loading of turn {}", got, waiting);
            }
        }
        self.turn_id = None;
        debug!("Loading cleared after {:?}", since.elapsed());
        true
    }
}

/// Side effects of one dispatch call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchOutcome {
    /// Ids of the appended messages, in append order
    pub appended: Vec<u64>,
    /// Speech to play, in arrival order
    pub playback: Vec<AudioClip>,
    /// Current speech must stop
    pub interrupt: bool,
}

impl DispatchOutcome {
    pub fn is_empty(&self) -> bool {
        self.appended.is_empty() && self.playback.is_empty() && !self.interrupt
    }
}

pub struct Dispatcher {
    log: ConversationLog,
    loading: LoadingIndicator,
}

impl Dispatcher {
    pub fn new(log: ConversationLog) -> Self {
        Self {
            log,
            loading: LoadingIndicator::default(),
        }
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn loading(&self) -> &LoadingIndicator {
        &self.loading
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }

    /// Typed text went out; wait for its reply
    pub fn begin_request(&mut self) {
        self.loading.start(None);
    }

    /// Drop the indicator without a reply (request failed, widget stopped)
    pub fn clear_loading(&mut self) -> bool {
        self.loading.clear(None)
    }

    /// Append a message outside the control protocol
    pub fn append(&mut self, message: NewMessage) -> u64 {
        self.log.append(message).id
    }

    /// Apply events in order
    ///
    /// `is_speech` marks messages that came in over the live session.
    pub fn dispatch(&mut self, events: Vec<ControlEvent>, is_speech: bool) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        for event in events {
            debug!("Dispatching {}", event.kind());
            self.dispatch_one(event, is_speech, &mut outcome);
        }
        outcome
    }

    fn dispatch_one(&mut self, event: ControlEvent, is_speech: bool, outcome: &mut DispatchOutcome) {
        let metadata = |turn_id: Option<String>| MessageMetadata { is_speech, turn_id };

        match event {
            ControlEvent::InterruptAudio => {
                info!("Barge-in, stopping speech");
                outcome.interrupt = true;
            }
            ControlEvent::Transcription { text, turn_id, .. } => {
                self.loading.start(turn_id.clone());
                let message = NewMessage::user_text(text).with_metadata(metadata(turn_id));
                outcome.appended.push(self.append(message));
            }
            ControlEvent::KeyPoints { text, turn_id } => {
                let message = NewMessage::bot_text(text).with_metadata(metadata(turn_id));
                outcome.appended.push(self.append(message));
            }
            ControlEvent::ActionItems { items, turn_id } => {
                if let Some(body) = action_items_body(&items) {
                    let message = NewMessage::bot_text(body).with_metadata(metadata(turn_id));
                    outcome.appended.push(self.append(message));
                }
            }
            ControlEvent::ReplyPreview { text, turn_id } => {
                self.loading.clear(turn_id.as_deref());
                let message = NewMessage::bot_text(text).with_metadata(metadata(turn_id));
                outcome.appended.push(self.append(message));
            }
            ControlEvent::OptionalResponse { items, turn_id } => {
                for item in items {
                    let message = response_message(item).with_metadata(metadata(turn_id.clone()));
                    outcome.appended.push(self.append(message));
                }
            }
            ControlEvent::ProcessingError { error, detail } => {
                warn!("Server failed to process the turn: {} ({:?})", error, detail);
                self.loading.clear(None);
                let body = "Sorry, something went wrong while processing that. Please try again.";
                outcome
                    .appended
                    .push(self.append(NewMessage::bot_text(body).with_metadata(metadata(None))));
            }
            ControlEvent::ReplyAudio { clip, .. } => {
                outcome.playback.push(clip);
            }
            ControlEvent::RawText(raw) => {
                self.loading.clear(None);
                let message = NewMessage::new(Sender::Bot, ContentType::Text, raw)
                    .with_metadata(metadata(None));
                outcome.appended.push(self.append(message));
            }
        }
    }
}

/// One bulleted body for all items, `None` for an empty list
pub fn action_items_body(items: &[ActionItem]) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    let mut body = String::from(ACTION_ITEMS_HEADER);
    for item in items {
        body.push_str("\n- ");
        body.push_str(item.description.trim());
    }
    Some(body)
}

fn response_message(item: ResponseItem) -> NewMessage {
    let content_type = item.content_type().unwrap_or_else(|| {
        warn!("Unknown optional response type '{}', showing it as text", item.kind);
        ContentType::Text
    });
    NewMessage::new(Sender::Bot, content_type, item.value)
}
