//! Audio ducking
//!
//! While synthesized speech plays, the local microphone track of the live
//! session (if any) is disabled so the assistant never hears itself and the
//! remote side never receives captured audio.
//!
//! Every playback holds a [`DuckGuard`]. The guard releases exactly once,
//! on completion, on error, or when the playback task is dropped. The
//! microphone comes back, at its pre-playback value, when the last in-flight
//! playback releases.

use super::player::{AudioClip, AudioPlayer};
use crate::session::transport::LocalAudioTrack;
use crate::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Audio playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No synthesized speech is playing
    Idle,
    /// At least one playback is in flight
    Speaking,
}

#[derive(Default)]
struct DuckState {
    in_flight: usize,
    track: Option<Arc<dyn LocalAudioTrack>>,
    /// Microphone enabled flag captured when ducking started
    restore_enabled: Option<bool>,
    releases: u64,
}

#[derive(Default)]
pub struct DuckingCoordinator {
    state: Mutex<DuckState>,
}

impl DuckingCoordinator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> PlaybackState {
        if self.state.lock().in_flight > 0 {
            PlaybackState::Speaking
        } else {
            PlaybackState::Idle
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.state() == PlaybackState::Speaking
    }

    /// Total number of released playbacks
    pub fn releases(&self) -> u64 {
        self.state.lock().releases
    }

    /// Register the live session's microphone track
    ///
    /// A track attached mid-playback is disabled right away.
    pub fn attach_track(&self, track: Arc<dyn LocalAudioTrack>) {
        let mut state = self.state.lock();
        if state.in_flight > 0 {
            state.restore_enabled = Some(track.is_enabled());
            track.set_enabled(false);
            debug!("Microphone {} attached while speaking, muted", track.id());
        }
        state.track = Some(track);
    }

    /// Forget the microphone track (session teardown)
    pub fn detach_track(&self) -> Option<Arc<dyn LocalAudioTrack>> {
        let mut state = self.state.lock();
        state.restore_enabled = None;
        state.track.take()
    }

    /// Enter the speaking state
    pub fn begin(self: &Arc<Self>) -> DuckGuard {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.in_flight += 1;
        if state.in_flight == 1 {
            if let Some(track) = &state.track {
                let enabled = track.is_enabled();
                track.set_enabled(false);
                state.restore_enabled = Some(enabled);
                debug!("Microphone {} ducked", track.id());
            }
        }
        debug!("Speaking ({} in flight)", state.in_flight);

        DuckGuard {
            coordinator: Arc::clone(self),
            released: false,
        }
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        state.releases += 1;

        if state.in_flight > 0 {
            debug!("Playback released, {} still in flight", state.in_flight);
            return;
        }

        let restore = state.restore_enabled.take().unwrap_or(true);
        if let Some(track) = &state.track {
            track.set_enabled(restore);
            debug!("Microphone {} restored (enabled: {})", track.id(), restore);
        }
    }

    /// Play a clip with the microphone ducked for its whole duration
    ///
    /// Playback failures are logged and returned; the microphone is restored
    /// either way.
    pub async fn play(self: &Arc<Self>, player: &dyn AudioPlayer, clip: AudioClip) -> Result<()> {
        let guard = self.begin();
        info!("Playing {} bytes of {}", clip.len(), clip.mime);

        let result = player.play(clip).await;
        guard.release();

        if let Err(e) = &result {
            warn!("Speech playback failed: {}", e);
        }
        result
    }
}

/// Releases one playback from the speaking state, exactly once
pub struct DuckGuard {
    coordinator: Arc<DuckingCoordinator>,
    released: bool,
}

impl DuckGuard {
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.coordinator.release();
        }
    }
}

impl Drop for DuckGuard {
    fn drop(&mut self) {
        self.release_once();
    }
}
