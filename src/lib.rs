pub mod audio;
pub mod client;
pub mod config;
pub mod content;
pub mod messages;
pub mod protocol;
pub mod session;
pub mod widget;

pub use audio::{AudioClip, AudioPlayer, DuckingCoordinator, PlaybackState};
pub use config::WidgetConfig;
pub use content::{parse_reply, ContentBlock, Span, SpanStyle};
pub use messages::{ContentType, ConversationLog, Message, Sender};
pub use protocol::{decode_payload, ControlEvent, Dispatcher};
pub use session::{LiveSession, SessionState};
pub use widget::{Collaborators, WidgetHandle};

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum RiaError {
    #[error("Media acquisition error: {0}")]
    MediaAcquisition(String),

    #[error("Signaling error: {0}")]
    Signaling(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Channel error: {0}")]
    Channel(String),
}

impl From<reqwest::Error> for RiaError {
    fn from(e: reqwest::Error) -> Self {
        RiaError::Http(e.to_string())
    }
}

impl From<serde_json::Error> for RiaError {
    fn from(e: serde_json::Error) -> Self {
        RiaError::Decode(e.to_string())
    }
}

impl From<base64::DecodeError> for RiaError {
    fn from(e: base64::DecodeError) -> Self {
        RiaError::Decode(format!("invalid base64 audio: {}", e))
    }
}

impl From<::config::ConfigError> for RiaError {
    fn from(e: ::config::ConfigError) -> Self {
        RiaError::Config(e.to_string())
    }
}

impl RiaError {
    /// Check if this error is recoverable without a fresh user action
    pub fn is_recoverable(&self) -> bool {
        match self {
            // The user has to grant access or plug in a device
            RiaError::MediaAcquisition(_) => false,
            // Session is torn down; a new toggle starts over
            RiaError::Signaling(_) => false,
            RiaError::Transport(_) => false,
            // Degrades to raw text
            RiaError::Decode(_) => true,
            // Microphone is re-enabled, conversation continues
            RiaError::Playback(_) => true,
            RiaError::Http(_) => true,
            RiaError::Config(_) => false,
            RiaError::InvalidState(_) => true,
            RiaError::Channel(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            RiaError::MediaAcquisition(_) => {
                "Microphone unavailable. Please check permissions and your input device.".to_string()
            }
            RiaError::Signaling(_) => {
                "Could not connect the voice session. Please try again.".to_string()
            }
            RiaError::Transport(_) => "The voice connection was lost.".to_string(),
            RiaError::Decode(_) => "Received a reply that could not be read.".to_string(),
            RiaError::Playback(_) => {
                "Audio playback failed. The reply is shown as text.".to_string()
            }
            RiaError::Http(_) => "The assistant could not be reached. Please try again.".to_string(),
            RiaError::Config(_) => "Configuration error. Please check settings.".to_string(),
            RiaError::InvalidState(_) => "Please wait for the current action to finish.".to_string(),
            RiaError::Channel(_) => {
                "Internal communication error. Please reload the assistant.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, RiaError>;
