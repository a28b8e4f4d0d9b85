//! In-memory collaborators shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use ria::audio::{AudioClip, AudioPlayer};
use ria::client::{SpeechEndpoint, TextEndpoint, TextRequest, TtsRequest};
use ria::session::{
    CandidateMessage, ControlChannel, IceCandidate, LocalAudioTrack, MediaDevices, OfferRequest,
    PeerConnection, RemoteAudioSink, SessionDeps, SessionDescription, SignalingClient, Transport,
    TransportEvent, TransportFactory,
};
use ria::widget::Collaborators;
use ria::{DuckingCoordinator, Result, RiaError};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

/// Ordered record of teardown-relevant calls
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub struct FakeTrack {
    enabled: AtomicBool,
    stopped: AtomicBool,
    journal: Journal,
}

impl FakeTrack {
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl LocalAudioTrack for FakeTrack {
    fn id(&self) -> &str {
        "mic-0"
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.journal.lock().push("track.stop".to_string());
    }
}

pub struct FakeMedia {
    deny: bool,
    journal: Journal,
    pub tracks: Mutex<Vec<Arc<FakeTrack>>>,
}

impl FakeMedia {
    pub fn new(journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            deny: false,
            journal,
            tracks: Mutex::new(Vec::new()),
        })
    }

    pub fn denied(journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            deny: true,
            journal,
            tracks: Mutex::new(Vec::new()),
        })
    }

    pub fn last_track(&self) -> Option<Arc<FakeTrack>> {
        self.tracks.lock().last().cloned()
    }
}

#[async_trait]
impl MediaDevices for FakeMedia {
    async fn acquire_microphone(&self) -> Result<Arc<dyn LocalAudioTrack>> {
        if self.deny {
            return Err(RiaError::MediaAcquisition("permission denied".into()));
        }
        let track = Arc::new(FakeTrack {
            enabled: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
            journal: Arc::clone(&self.journal),
        });
        self.tracks.lock().push(Arc::clone(&track));
        Ok(track)
    }
}

pub struct FakeChannel {
    journal: Journal,
    pub sent: Mutex<Vec<String>>,
}

#[async_trait]
impl ControlChannel for FakeChannel {
    fn label(&self) -> &str {
        "text"
    }

    async fn send(&self, text: &str) -> Result<()> {
        self.sent.lock().push(text.to_string());
        Ok(())
    }

    fn close(&self) {
        self.journal.lock().push("channel.close".to_string());
    }
}

pub struct FakePeer {
    journal: Journal,
    /// Candidates gathered as soon as the local description is attached
    early_candidates: usize,
    candidates: Mutex<Option<mpsc::UnboundedSender<IceCandidate>>>,
    events: Mutex<Option<mpsc::UnboundedSender<TransportEvent>>>,
    pub local: Mutex<Option<SessionDescription>>,
    pub remote: Mutex<Option<SessionDescription>>,
    pub channel: Mutex<Option<Arc<FakeChannel>>>,
    pub gathered: AtomicUsize,
    pub closed: AtomicBool,
}

impl FakePeer {
    /// Gather one more candidate
    pub fn gather(&self) {
        let n = self.gathered.fetch_add(1, Ordering::SeqCst);
        let candidate = IceCandidate::new(format!("candidate:{} 1 udp 2122260223 10.0.0.2 5000{} typ host", n, n))
            .with_sdp_mid("0")
            .with_sdp_mline_index(0);
        if let Some(tx) = self.candidates.lock().as_ref() {
            let _ = tx.send(candidate);
        }
    }

    pub fn emit(&self, event: TransportEvent) {
        if let Some(tx) = self.events.lock().as_ref() {
            let _ = tx.send(event);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PeerConnection for FakePeer {
    fn add_track(&self, _track: Arc<dyn LocalAudioTrack>) -> Result<()> {
        Ok(())
    }

    fn create_control_channel(&self, _label: &str) -> Result<Arc<dyn ControlChannel>> {
        let channel = Arc::new(FakeChannel {
            journal: Arc::clone(&self.journal),
            sent: Mutex::new(Vec::new()),
        });
        *self.channel.lock() = Some(Arc::clone(&channel));
        Ok(channel)
    }

    async fn create_offer(&self) -> Result<SessionDescription> {
        Ok(SessionDescription::offer("v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\n"))
    }

    async fn set_local_description(&self, description: &SessionDescription) -> Result<()> {
        *self.local.lock() = Some(description.clone());
        for _ in 0..self.early_candidates {
            self.gather();
        }
        Ok(())
    }

    async fn set_remote_description(&self, description: &SessionDescription) -> Result<()> {
        *self.remote.lock() = Some(description.clone());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.candidates.lock().take();
        self.events.lock().take();
        self.journal.lock().push("peer.close".to_string());
        Ok(())
    }
}

pub struct FakeTransport {
    journal: Journal,
    early_candidates: usize,
    pub peers: Mutex<Vec<Arc<FakePeer>>>,
}

impl FakeTransport {
    pub fn new(journal: Journal, early_candidates: usize) -> Arc<Self> {
        Arc::new(Self {
            journal,
            early_candidates,
            peers: Mutex::new(Vec::new()),
        })
    }

    pub fn last_peer(&self) -> Option<Arc<FakePeer>> {
        self.peers.lock().last().cloned()
    }

    pub fn created(&self) -> usize {
        self.peers.lock().len()
    }
}

#[async_trait]
impl TransportFactory for FakeTransport {
    async fn create(&self) -> Result<Transport> {
        let (candidate_tx, candidate_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let peer = Arc::new(FakePeer {
            journal: Arc::clone(&self.journal),
            early_candidates: self.early_candidates,
            candidates: Mutex::new(Some(candidate_tx)),
            events: Mutex::new(Some(event_tx)),
            local: Mutex::new(None),
            remote: Mutex::new(None),
            channel: Mutex::new(None),
            gathered: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        });
        self.peers.lock().push(Arc::clone(&peer));
        Ok(Transport {
            peer,
            candidates: candidate_rx,
            events: event_rx,
        })
    }
}

#[derive(Default)]
pub struct FakeSignaling {
    pub fail_offer: bool,
    pub fail_candidates: bool,
    pub offers: Mutex<Vec<OfferRequest>>,
    pub candidates: Mutex<Vec<CandidateMessage>>,
}

impl FakeSignaling {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_offer: true,
            ..Self::default()
        })
    }

    pub fn dropping_candidates() -> Arc<Self> {
        Arc::new(Self {
            fail_candidates: true,
            ..Self::default()
        })
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.lock().len()
    }

    /// Wait until `n` candidates were posted
    pub async fn wait_for_candidates(&self, n: usize) -> usize {
        let _ = tokio::time::timeout(Duration::from_secs(2), async {
            while self.candidate_count() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        self.candidate_count()
    }
}

#[async_trait]
impl SignalingClient for FakeSignaling {
    async fn send_offer(&self, offer: &OfferRequest) -> Result<SessionDescription> {
        self.offers.lock().push(offer.clone());
        if self.fail_offer {
            return Err(RiaError::Signaling("HTTP 503 Service Unavailable".into()));
        }
        Ok(SessionDescription::answer("v=0\r\no=- 1 1 IN IP4 127.0.0.1\r\n"))
    }

    async fn send_candidate(&self, message: &CandidateMessage) -> Result<()> {
        if self.fail_candidates {
            return Err(RiaError::Signaling("connection reset".into()));
        }
        self.candidates.lock().push(message.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeSink {
    pub attached: Mutex<Vec<String>>,
}

impl RemoteAudioSink for FakeSink {
    fn attach(&self, stream_id: &str) {
        self.attached.lock().push(stream_id.to_string());
    }
}

/// Player that records clips; optionally holds each clip until `stop`
#[derive(Default)]
pub struct FakePlayer {
    pub hold: bool,
    pub fail: bool,
    pub plays: Mutex<Vec<AudioClip>>,
    pub stops: AtomicUsize,
    release: Notify,
}

impl FakePlayer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn holding() -> Arc<Self> {
        Arc::new(Self {
            hold: true,
            ..Self::default()
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn play_count(&self) -> usize {
        self.plays.lock().len()
    }

    pub async fn wait_for_plays(&self, n: usize) -> usize {
        let _ = tokio::time::timeout(Duration::from_secs(2), async {
            while self.play_count() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        self.play_count()
    }
}

#[async_trait]
impl AudioPlayer for FakePlayer {
    async fn play(&self, clip: AudioClip) -> Result<()> {
        self.plays.lock().push(clip);
        if self.fail {
            return Err(RiaError::Playback("device lost".into()));
        }
        if self.hold {
            // Any stop after this clip started ends it, like a real output
            let started = self.stops.load(Ordering::SeqCst);
            loop {
                let notified = self.release.notified();
                if self.stops.load(Ordering::SeqCst) != started {
                    break;
                }
                notified.await;
            }
        }
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.release.notify_waiters();
    }
}

/// Text endpoint answering every request with the same reply
pub struct FakeText {
    reply: Option<Value>,
    pub requests: Mutex<Vec<TextRequest>>,
}

impl FakeText {
    pub fn replying(reply: Value) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl TextEndpoint for FakeText {
    async fn send_text(&self, request: &TextRequest) -> Result<Value> {
        self.requests.lock().push(request.clone());
        self.reply
            .clone()
            .ok_or_else(|| RiaError::Http("connection refused".into()))
    }
}

#[derive(Default)]
pub struct FakeSpeech {
    pub requests: Mutex<Vec<TtsRequest>>,
}

#[async_trait]
impl SpeechEndpoint for FakeSpeech {
    async fn synthesize(&self, request: &TtsRequest) -> Result<AudioClip> {
        self.requests.lock().push(request.clone());
        Ok(AudioClip::new(vec![0xff, 0xf3, 0x44, 0xc4], request.fmt.mime()))
    }
}

/// A wired set of fakes
pub struct Harness {
    pub journal: Journal,
    pub media: Arc<FakeMedia>,
    pub transport: Arc<FakeTransport>,
    pub signaling: Arc<FakeSignaling>,
    pub sink: Arc<FakeSink>,
    pub ducking: Arc<DuckingCoordinator>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(false, FakeSignaling::new(), 0)
    }

    pub fn build(deny_media: bool, signaling: Arc<FakeSignaling>, early_candidates: usize) -> Self {
        let journal = journal();
        let media = if deny_media {
            FakeMedia::denied(Arc::clone(&journal))
        } else {
            FakeMedia::new(Arc::clone(&journal))
        };
        Self {
            transport: FakeTransport::new(Arc::clone(&journal), early_candidates),
            media,
            signaling,
            sink: Arc::new(FakeSink::default()),
            ducking: DuckingCoordinator::new(),
            journal,
        }
    }

    pub fn deps(&self) -> SessionDeps {
        SessionDeps {
            media: self.media.clone(),
            transport: self.transport.clone(),
            signaling: self.signaling.clone(),
            remote_audio: self.sink.clone(),
            ducking: Arc::clone(&self.ducking),
        }
    }

    pub fn collaborators(
        &self,
        text: Arc<FakeText>,
        speech: Arc<FakeSpeech>,
        player: Arc<FakePlayer>,
    ) -> Collaborators {
        Collaborators {
            media: self.media.clone(),
            transport: self.transport.clone(),
            remote_audio: self.sink.clone(),
            signaling: self.signaling.clone(),
            text,
            speech,
            player,
        }
    }
}
