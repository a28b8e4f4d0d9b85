//! Widget handle
//!
//! [`WidgetHandle::start`] returns the one object hosts use to drive the
//! assistant: open/close/toggle the panel, send typed text, toggle live audio
//! and pump live-session events. It owns the conversation log, the live
//! session and every in-flight speech playback.

use crate::audio::{AudioClip, AudioPlayer, DuckingCoordinator, PlaybackState};
use crate::client::{SpeechClient, SpeechEndpoint, TextClient, TextEndpoint, TextRequest, TtsRequest};
use crate::config::WidgetConfig;
use crate::messages::{ConversationLog, Message, NewMessage};
use crate::protocol::{DispatchOutcome, Dispatcher, PayloadDecoder};
use crate::session::{
    HttpSignalingClient, LiveSession, MediaDevices, NoMediaEngine, RemoteAudioSink, SessionDeps,
    SessionState, SignalingClient, TransportFactory,
};
use crate::{Result, RiaError};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Everything the widget talks to
#[derive(Clone)]
pub struct Collaborators {
    pub media: Arc<dyn MediaDevices>,
    pub transport: Arc<dyn TransportFactory>,
    pub remote_audio: Arc<dyn RemoteAudioSink>,
    pub signaling: Arc<dyn SignalingClient>,
    pub text: Arc<dyn TextEndpoint>,
    pub speech: Arc<dyn SpeechEndpoint>,
    pub player: Arc<dyn AudioPlayer>,
}

impl Collaborators {
    /// HTTP endpoints from `config` plus the host's media engine
    pub fn with_http(
        config: &WidgetConfig,
        media: Arc<dyn MediaDevices>,
        transport: Arc<dyn TransportFactory>,
        remote_audio: Arc<dyn RemoteAudioSink>,
        player: Arc<dyn AudioPlayer>,
    ) -> Self {
        let signaling = HttpSignalingClient::new(config.endpoints.signaling_url())
            .with_timeout(config.endpoints.request_timeout());
        Self {
            media,
            transport,
            remote_audio,
            signaling: Arc::new(signaling),
            text: Arc::new(TextClient::from_config(config)),
            speech: Arc::new(SpeechClient::from_config(config)),
            player,
        }
    }

    /// HTTP endpoints without live audio
    pub fn text_only(config: &WidgetConfig, player: Arc<dyn AudioPlayer>) -> Self {
        Self::with_http(
            config,
            Arc::new(NoMediaEngine),
            Arc::new(NoMediaEngine),
            Arc::new(NoMediaEngine),
            player,
        )
    }
}

pub struct WidgetHandle {
    config: WidgetConfig,
    dispatcher: Dispatcher,
    decoder: PayloadDecoder,
    session: LiveSession,
    ducking: Arc<DuckingCoordinator>,
    player: Arc<dyn AudioPlayer>,
    text: Arc<dyn TextEndpoint>,
    speech: Arc<dyn SpeechEndpoint>,
    playback: JoinSet<Result<()>>,
    open: bool,
    greeted: bool,
    stopped: bool,
}

impl WidgetHandle {
    /// Validate `config` and build a closed widget
    pub fn start(config: WidgetConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;

        let ducking = DuckingCoordinator::new();
        let session = LiveSession::new(SessionDeps {
            media: collaborators.media,
            transport: collaborators.transport,
            signaling: collaborators.signaling,
            remote_audio: collaborators.remote_audio,
            ducking: Arc::clone(&ducking),
        });

        info!("Widget started against {}", config.endpoints.base_url);
        Ok(Self {
            decoder: PayloadDecoder::new(config.speech.format.mime()),
            config,
            dispatcher: Dispatcher::new(ConversationLog::new()),
            session,
            ducking,
            player: collaborators.player,
            text: collaborators.text,
            speech: collaborators.speech,
            playback: JoinSet::new(),
            open: false,
            greeted: false,
            stopped: false,
        })
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn log(&self) -> &ConversationLog {
        self.dispatcher.log()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.dispatcher.log().get_all()
    }

    pub fn is_loading(&self) -> bool {
        self.dispatcher.is_loading()
    }

    pub fn session(&self) -> &LiveSession {
        &self.session
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.ducking.state()
    }

    pub fn ducking(&self) -> &Arc<DuckingCoordinator> {
        &self.ducking
    }

    fn ensure_running(&self) -> Result<()> {
        if self.stopped {
            return Err(RiaError::InvalidState("Widget has been stopped".into()));
        }
        Ok(())
    }

    /// Show the panel; the first open greets
    pub fn open(&mut self) -> Result<()> {
        self.ensure_running()?;
        if self.open {
            return Ok(());
        }
        self.open = true;
        debug!("Panel opened");

        if !self.greeted {
            self.greeted = true;
            if let Some(greeting) = self.config.greeting.clone() {
                self.dispatcher.append(NewMessage::bot_text(greeting.as_str()));
                if self.config.speech.include_tts {
                    self.speak(greeting);
                }
            }
        }
        Ok(())
    }

    /// Hide the panel and stop live audio
    pub async fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        self.session.stop().await;
        debug!("Panel closed");
    }

    pub async fn toggle(&mut self) -> Result<()> {
        if self.open {
            self.close().await;
            Ok(())
        } else {
            self.open()
        }
    }

    /// Tear everything down; the handle is unusable afterwards
    pub async fn stop(&mut self) {
        if self.stopped {
            debug!("Widget already stopped");
            return;
        }
        self.open = false;
        self.session.stop().await;

        self.player.stop();
        self.playback.abort_all();
        while self.playback.join_next().await.is_some() {}

        self.dispatcher.clear_loading();
        self.stopped = true;
        info!("Widget stopped");
    }

    /// Send typed text and apply the reply
    pub async fn send_text(&mut self, text: &str) -> Result<DispatchOutcome> {
        self.ensure_running()?;
        let text = text.trim();
        if text.is_empty() {
            return Err(RiaError::InvalidState("Nothing to send".into()));
        }

        let user_id = self.dispatcher.append(NewMessage::user_text(text));
        self.dispatcher.begin_request();

        let request = TextRequest::from_config(text, &self.config);
        let reply = match self.text.send_text(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Text request failed: {}", e);
                self.dispatcher.clear_loading();
                self.dispatcher.append(NewMessage::bot_text(e.user_message()));
                return Err(e);
            }
        };

        let events = self.decoder.decode_reply(&reply);
        let mut outcome = self.dispatcher.dispatch(events, false);
        if self.dispatcher.clear_loading() {
            debug!("Text reply carried no reply_preview");
        }
        outcome.appended.insert(0, user_id);
        self.apply(&outcome);
        Ok(outcome)
    }

    /// Start live audio when idle, stop it when running
    pub async fn toggle_live_audio(&mut self) -> Result<SessionState> {
        self.ensure_running()?;
        if self.session.is_active() {
            self.session.stop().await;
            return Ok(self.session.state());
        }

        if let Err(e) = self.session.start().await {
            self.dispatcher.append(NewMessage::bot_text(e.user_message()));
            return Err(e);
        }
        Ok(self.session.state())
    }

    /// Wait for the next live-session event and apply it
    ///
    /// `None` once no session is running.
    pub async fn pump_live_event(&mut self) -> Option<DispatchOutcome> {
        let event = self.session.next_event().await?;
        let was_active = self.session.is_active();
        let payload = self.session.handle_event(event).await;

        let mut outcome = match payload {
            Some(payload) => {
                let events = self.decoder.decode(&payload);
                self.dispatcher.dispatch(events, true)
            }
            None => DispatchOutcome::default(),
        };

        if was_active && self.session.state() == SessionState::Error {
            if let Some(e) = self.session.last_error() {
                error!("Live session lost: {}", e);
                let alert = NewMessage::bot_text(e.user_message());
                outcome.appended.push(self.dispatcher.append(alert));
            }
        }

        self.apply(&outcome);
        Some(outcome)
    }

    /// Wait for every playback started so far
    pub async fn wait_for_playback(&mut self) -> Result<()> {
        while let Some(joined) = self.playback.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!("Playback ended with error: {}", e),
                Err(e) if e.is_cancelled() => {}
                Err(e) => return Err(RiaError::Channel(format!("Playback task failed: {}", e))),
            }
        }
        Ok(())
    }

    fn apply(&mut self, outcome: &DispatchOutcome) {
        self.reap_playback();
        if outcome.interrupt {
            self.player.stop();
        }
        for clip in &outcome.playback {
            self.play(clip.clone());
        }
    }

    fn play(&mut self, clip: AudioClip) {
        let ducking = Arc::clone(&self.ducking);
        let player = Arc::clone(&self.player);
        self.playback
            .spawn(async move { ducking.play(player.as_ref(), clip).await });
    }

    fn speak(&mut self, text: String) {
        let request = TtsRequest::from_config(text, &self.config);
        let speech = Arc::clone(&self.speech);
        let ducking = Arc::clone(&self.ducking);
        let player = Arc::clone(&self.player);
        self.playback.spawn(async move {
            let clip = match speech.synthesize(&request).await {
                Ok(clip) => clip,
                Err(e) => {
                    warn!("Greeting synthesis failed: {}", e);
                    return Err(e);
                }
            };
            ducking.play(player.as_ref(), clip).await
        });
    }

    fn reap_playback(&mut self) {
        while let Some(joined) = self.playback.try_join_next() {
            if let Err(e) = joined {
                if !e.is_cancelled() {
                    warn!("Playback task failed: {}", e);
                }
            }
        }
    }
}
