//! Real-time transport collaborators
//!
//! The live session drives a peer connection it does not implement itself.
//! Hosts plug in their media engine through these traits; everything the
//! engine reports back (candidates, tracks, channel state, payloads) arrives
//! on the channels of a [`Transport`].

use super::signaling::{IceCandidate, SessionDescription};
use crate::{Result, RiaError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Label of the auxiliary control channel
pub const CONTROL_CHANNEL_LABEL: &str = "text";

/// Captured microphone audio sent to the remote side
pub trait LocalAudioTrack: Send + Sync {
    fn id(&self) -> &str;

    fn is_enabled(&self) -> bool;

    /// Enable or disable sending without releasing the device
    fn set_enabled(&self, enabled: bool);

    /// Release the capture device; the track is dead afterwards
    fn stop(&self);
}

/// Source of microphone tracks
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Acquire an audio capture track. Suspends on the OS/user permission
    /// prompt; fails when permission is denied or no device exists.
    async fn acquire_microphone(&self) -> Result<Arc<dyn LocalAudioTrack>>;
}

/// Ordered, reliable data channel carried next to the media
#[async_trait]
pub trait ControlChannel: Send + Sync {
    fn label(&self) -> &str;

    async fn send(&self, text: &str) -> Result<()>;

    fn close(&self);
}

/// One peer connection
#[async_trait]
pub trait PeerConnection: Send + Sync {
    fn add_track(&self, track: Arc<dyn LocalAudioTrack>) -> Result<()>;

    fn create_control_channel(&self, label: &str) -> Result<Arc<dyn ControlChannel>>;

    async fn create_offer(&self) -> Result<SessionDescription>;

    /// Attach the local description; candidate gathering starts here
    async fn set_local_description(&self, description: &SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, description: &SessionDescription) -> Result<()>;

    /// Close the connection. Implementations drop their candidate and event
    /// senders so that the receiving ends finish.
    async fn close(&self) -> Result<()>;
}

/// Everything a peer connection reports besides candidates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Remote media arrived for a stream
    RemoteTrack { stream_id: String },
    ChannelOpen,
    ChannelClosed,
    /// One UTF-8 text frame from the control channel
    ChannelMessage(String),
    /// Unrecoverable transport failure
    ConnectionFailed(String),
}

/// A freshly created peer connection and its event streams
pub struct Transport {
    pub peer: Arc<dyn PeerConnection>,
    /// Locally gathered ICE candidates
    pub candidates: mpsc::UnboundedReceiver<IceCandidate>,
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Creates peer connections
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(&self) -> Result<Transport>;
}

/// Plays remote audio received on the transport
pub trait RemoteAudioSink: Send + Sync {
    fn attach(&self, stream_id: &str);
}

/// Stand-in for hosts without a media engine; live audio fails to start
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMediaEngine;

#[async_trait]
impl MediaDevices for NoMediaEngine {
    async fn acquire_microphone(&self) -> Result<Arc<dyn LocalAudioTrack>> {
        Err(RiaError::MediaAcquisition(
            "no capture device available on this host".to_string(),
        ))
    }
}

#[async_trait]
impl TransportFactory for NoMediaEngine {
    async fn create(&self) -> Result<Transport> {
        Err(RiaError::Transport("no real-time transport on this host".to_string()))
    }
}

impl RemoteAudioSink for NoMediaEngine {
    fn attach(&self, stream_id: &str) {
        tracing::warn!("Dropping remote stream {}, no audio sink", stream_id);
    }
}
