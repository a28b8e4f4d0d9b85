use serde::Serialize;
use std::fmt;

/// Lifecycle of the live audio session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    /// Waiting on microphone permission
    RequestingMedia,
    /// Offer sent, waiting for the answer
    Negotiating,
    Connected {
        channel_open: bool,
    },
    Closed,
    Error,
}

impl SessionState {
    /// A session holds resources in these states
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SessionState::RequestingMedia | SessionState::Negotiating | SessionState::Connected { .. }
        )
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Connected { .. })
    }

    pub fn is_channel_open(&self) -> bool {
        matches!(self, SessionState::Connected { channel_open: true })
    }

    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Idle | Closed | Error, RequestingMedia) => true,
            (RequestingMedia, Negotiating | Error | Closed) => true,
            (Negotiating, Connected { .. } | Error | Closed) => true,
            (Connected { .. }, Connected { .. } | Error | Closed) => true,
            (Error, Closed) => true,
            _ => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::RequestingMedia => "requesting-media",
            SessionState::Negotiating => "negotiating",
            SessionState::Connected { .. } => "connected",
            SessionState::Closed => "closed",
            SessionState::Error => "error",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Connected { channel_open: true } => write!(f, "connected (channel open)"),
            other => f.write_str(other.name()),
        }
    }
}
