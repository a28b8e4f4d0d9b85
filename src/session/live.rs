//! Live audio session
//!
//! Owns one peer connection at a time: microphone capture, the control
//! channel, signaling and teardown. All methods take `&mut self` and run on
//! the widget's task; transport callbacks arrive as [`TransportEvent`]s and
//! are applied through [`LiveSession::handle_event`].

use super::signaling::{mint_session_id, CandidateMessage, IceCandidate, OfferRequest, SignalingClient};
use super::state::SessionState;
use super::transport::{
    ControlChannel, LocalAudioTrack, MediaDevices, PeerConnection, RemoteAudioSink, Transport,
    TransportEvent, TransportFactory, CONTROL_CHANNEL_LABEL,
};
use crate::audio::DuckingCoordinator;
use crate::{Result, RiaError};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Collaborators a live session needs
#[derive(Clone)]
pub struct SessionDeps {
    pub media: Arc<dyn MediaDevices>,
    pub transport: Arc<dyn TransportFactory>,
    pub signaling: Arc<dyn SignalingClient>,
    pub remote_audio: Arc<dyn RemoteAudioSink>,
    pub ducking: Arc<DuckingCoordinator>,
}

pub struct LiveSession {
    deps: SessionDeps,
    state: SessionState,
    session_id: Option<String>,
    peer: Option<Arc<dyn PeerConnection>>,
    local_track: Option<Arc<dyn LocalAudioTrack>>,
    channel: Option<Arc<dyn ControlChannel>>,
    events: Option<mpsc::UnboundedReceiver<TransportEvent>>,
    remote_stream: Option<String>,
    candidate_task: Option<JoinHandle<usize>>,
    last_error: Option<RiaError>,
    connections: u64,
}

impl LiveSession {
    pub fn new(deps: SessionDeps) -> Self {
        Self {
            deps,
            state: SessionState::Idle,
            session_id: None,
            peer: None,
            local_track: None,
            channel: None,
            events: None,
            remote_stream: None,
            candidate_task: None,
            last_error: None,
            connections: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn is_channel_open(&self) -> bool {
        self.state.is_channel_open()
    }

    /// Identifier of the current session, minted when the offer is created
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn last_error(&self) -> Option<&RiaError> {
        self.last_error.as_ref()
    }

    /// Number of times a session reached the connected state
    pub fn connections(&self) -> u64 {
        self.connections
    }

    pub fn local_track(&self) -> Option<&Arc<dyn LocalAudioTrack>> {
        self.local_track.as_ref()
    }

    /// Start a live session
    ///
    /// Any previous session is torn down first. On failure every acquired
    /// resource is released and the session ends in [`SessionState::Error`].
    pub async fn start(&mut self) -> Result<()> {
        if self.is_active() {
            info!("Restarting live session, tearing down the previous one");
            self.stop().await;
        }
        self.last_error = None;
        self.set_state(SessionState::RequestingMedia)?;

        let track = match self.deps.media.acquire_microphone().await {
            Ok(track) => track,
            Err(e) => {
                let e = match e {
                    RiaError::MediaAcquisition(_) => e,
                    other => RiaError::MediaAcquisition(other.to_string()),
                };
                return Err(self.fail(e).await);
            }
        };
        info!("Microphone acquired ({})", track.id());
        self.deps.ducking.attach_track(Arc::clone(&track));
        self.local_track = Some(Arc::clone(&track));

        if let Err(e) = self.negotiate(track).await {
            return Err(self.fail(e).await);
        }

        self.set_state(SessionState::Connected { channel_open: false })?;
        self.connections += 1;
        info!(
            "Live session {} connected",
            self.session_id.as_deref().unwrap_or_default()
        );
        Ok(())
    }

    async fn negotiate(&mut self, track: Arc<dyn LocalAudioTrack>) -> Result<()> {
        let Transport {
            peer,
            candidates,
            events,
        } = self.deps.transport.create().await.map_err(transport_error)?;
        self.peer = Some(Arc::clone(&peer));
        self.events = Some(events);

        peer.add_track(track).map_err(transport_error)?;
        let channel = peer
            .create_control_channel(CONTROL_CHANNEL_LABEL)
            .map_err(transport_error)?;
        debug!("Control channel '{}' created", channel.label());
        self.channel = Some(channel);

        self.set_state(SessionState::Negotiating)?;
        let offer = peer.create_offer().await.map_err(transport_error)?;
        let session_id = mint_session_id();
        peer.set_local_description(&offer)
            .await
            .map_err(transport_error)?;
        self.session_id = Some(session_id.clone());

        self.candidate_task = Some(spawn_candidate_forwarder(
            Arc::clone(&self.deps.signaling),
            session_id.clone(),
            candidates,
        ));

        let answer = self
            .deps
            .signaling
            .send_offer(&OfferRequest::new(&offer, session_id))
            .await
            .map_err(signaling_error)?;
        peer.set_remote_description(&answer)
            .await
            .map_err(transport_error)?;
        Ok(())
    }

    /// Tear the session down
    ///
    /// Safe to call any number of times and in any state. Order: local
    /// tracks, control channel, peer connection, session identifier.
    pub async fn stop(&mut self) {
        if self.state == SessionState::Idle && self.peer.is_none() && self.local_track.is_none() {
            debug!("Stop requested with no live session");
            return;
        }

        self.release_resources().await;
        if self.state != SessionState::Closed {
            self.set_state_unchecked(SessionState::Closed);
            info!("Live session closed");
        }
    }

    async fn fail(&mut self, e: RiaError) -> RiaError {
        error!("Live session failed: {}", e);
        self.release_resources().await;
        self.set_state_unchecked(SessionState::Error);
        self.last_error = Some(e.clone());
        e
    }

    async fn release_resources(&mut self) {
        if let Some(track) = self.local_track.take() {
            track.stop();
            debug!("Stopped local track {}", track.id());
        }
        self.deps.ducking.detach_track();

        if let Some(channel) = self.channel.take() {
            channel.close();
        }
        if let Some(peer) = self.peer.take() {
            if let Err(e) = peer.close().await {
                warn!("Error closing peer connection: {}", e);
            }
        }
        self.session_id = None;

        // The forwarder finishes on its own once the closed peer drops its
        // candidate sender.
        self.candidate_task = None;
        self.events = None;
        self.remote_stream = None;
    }

    /// Next transport event, or `None` when no session is running
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        match self.events.as_mut() {
            Some(events) => events.recv().await,
            None => None,
        }
    }

    /// Apply one transport event; returns a control payload to decode
    pub async fn handle_event(&mut self, event: TransportEvent) -> Option<String> {
        match event {
            TransportEvent::RemoteTrack { stream_id } => {
                if self.remote_stream.is_some() {
                    debug!("Remote stream {} already attached", stream_id);
                } else {
                    info!("Remote audio arrived ({})", stream_id);
                    self.deps.remote_audio.attach(&stream_id);
                    self.remote_stream = Some(stream_id);
                }
                None
            }
            TransportEvent::ChannelOpen => {
                self.set_channel_open(true);
                None
            }
            TransportEvent::ChannelClosed => {
                self.set_channel_open(false);
                None
            }
            TransportEvent::ChannelMessage(payload) => {
                debug!("Control payload ({} bytes)", payload.len());
                Some(payload)
            }
            TransportEvent::ConnectionFailed(reason) => {
                if self.is_active() {
                    self.fail(RiaError::Transport(reason)).await;
                } else {
                    debug!("Ignoring transport failure after teardown: {}", reason);
                }
                None
            }
        }
    }

    /// Send text over the control channel
    pub async fn send_control(&self, text: &str) -> Result<()> {
        match (&self.channel, self.state.is_channel_open()) {
            (Some(channel), true) => channel.send(text).await,
            _ => Err(RiaError::InvalidState("Control channel is not open".into())),
        }
    }

    fn set_channel_open(&mut self, open: bool) {
        if self.state.is_connected() {
            self.set_state_unchecked(SessionState::Connected { channel_open: open });
            if open {
                info!("Control channel open");
            } else {
                warn!("Control channel closed");
            }
        } else {
            debug!("Channel open={} ignored in state {}", open, self.state);
        }
    }

    fn set_state(&mut self, next: SessionState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(RiaError::InvalidState(format!(
                "Cannot move session from {} to {}",
                self.state, next
            )));
        }
        self.set_state_unchecked(next);
        Ok(())
    }

    fn set_state_unchecked(&mut self, next: SessionState) {
        if self.state != next {
            debug!("Session state: {} -> {}", self.state, next);
            self.state = next;
        }
    }
}

fn transport_error(e: RiaError) -> RiaError {
    match e {
        RiaError::Transport(_) => e,
        other => RiaError::Transport(other.to_string()),
    }
}

fn signaling_error(e: RiaError) -> RiaError {
    match e {
        RiaError::Signaling(_) => e,
        other => RiaError::Signaling(other.to_string()),
    }
}

/// Post every locally gathered candidate, one request each
///
/// Failures are logged and never fail the session. Returns the number of
/// candidates posted once the transport closes its candidate stream.
fn spawn_candidate_forwarder(
    signaling: Arc<dyn SignalingClient>,
    session_id: String,
    mut candidates: mpsc::UnboundedReceiver<IceCandidate>,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut sent = 0;
        while let Some(candidate) = candidates.recv().await {
            let message = CandidateMessage::new(candidate, session_id.clone());
            match signaling.send_candidate(&message).await {
                Ok(()) => sent += 1,
                Err(e) => warn!("Failed to post ICE candidate: {}", e),
            }
        }
        debug!("Candidate forwarder for {} done ({} posted)", session_id, sent);
        sent
    })
}
