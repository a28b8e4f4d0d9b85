use super::player::{AudioClip, AudioPlayer};
use crate::{Result, RiaError};
use async_trait::async_trait;
use parking_lot::Mutex;
use rodio::{Decoder, OutputStream, Sink};
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, info};

/// Clips currently playing, with a stop generation
///
/// `stop_all` bumps the generation, so a clip whose playback thread had not
/// registered yet sees the stop and never starts.
struct ActiveSinks<S> {
    inner: Mutex<ActiveState<S>>,
}

struct ActiveState<S> {
    generation: u64,
    sinks: Vec<Arc<S>>,
}

impl<S> ActiveSinks<S> {
    fn new() -> Self {
        Self {
            inner: Mutex::new(ActiveState {
                generation: 0,
                sinks: Vec::new(),
            }),
        }
    }

    fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    fn len(&self) -> usize {
        self.inner.lock().sinks.len()
    }

    /// Register `sink` and run `start` under the lock, unless a stop arrived
    /// since `requested_at`
    fn register(&self, requested_at: u64, sink: &Arc<S>, start: impl FnOnce(&S)) -> bool {
        let mut state = self.inner.lock();
        if state.generation != requested_at {
            return false;
        }
        start(sink);
        state.sinks.push(Arc::clone(sink));
        true
    }

    fn finish(&self, sink: &Arc<S>) {
        self.inner.lock().sinks.retain(|s| !Arc::ptr_eq(s, sink));
    }

    fn stop_all(&self) -> Vec<Arc<S>> {
        let mut state = self.inner.lock();
        state.generation += 1;
        std::mem::take(&mut state.sinks)
    }
}

/// Speech playback on the default output device
///
/// Every clip opens its own output stream on a blocking thread, since the
/// stream handle is not `Send`. Clips may overlap; `stop` silences all of them.
pub struct AudioOutput {
    active: Arc<ActiveSinks<Sink>>,
    volume: f32,
}

impl AudioOutput {
    pub fn new() -> Self {
        Self {
            active: Arc::new(ActiveSinks::new()),
            volume: 1.0,
        }
    }

    /// Set the volume (0.0 to 1.0)
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume.clamp(0.0, 1.0);
        self
    }

    /// Check if any clip is currently playing
    pub fn is_playing(&self) -> bool {
        self.active.len() > 0
    }

    fn play_blocking(active: &ActiveSinks<Sink>, requested_at: u64, clip: AudioClip, volume: f32) -> Result<()> {
        let (_stream, handle) = OutputStream::try_default()
            .map_err(|e| RiaError::Playback(format!("No output device available: {}", e)))?;

        let sink = Arc::new(
            Sink::try_new(&handle)
                .map_err(|e| RiaError::Playback(format!("Failed to open sink: {}", e)))?,
        );

        let mime = clip.mime.clone();
        let source = Decoder::new(Cursor::new(clip.bytes))
            .map_err(|e| RiaError::Playback(format!("Cannot decode {}: {}", mime, e)))?;

        sink.set_volume(volume);
        let started = active.register(requested_at, &sink, |sink| sink.append(source));
        if !started {
            debug!("Playback of {} stopped before it started", mime);
            return Ok(());
        }

        info!("Started speech playback ({})", mime);
        sink.sleep_until_end();
        active.finish(&sink);
        debug!("Speech playback finished");
        Ok(())
    }
}

impl Default for AudioOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioPlayer for AudioOutput {
    async fn play(&self, clip: AudioClip) -> Result<()> {
        if clip.is_empty() {
            return Err(RiaError::Playback("Empty audio clip".into()));
        }

        let active = Arc::clone(&self.active);
        let requested_at = active.generation();
        let volume = self.volume;
        tokio::task::spawn_blocking(move || Self::play_blocking(&active, requested_at, clip, volume))
            .await
            .map_err(|e| RiaError::Playback(format!("Playback task failed: {}", e)))?
    }

    fn stop(&self) {
        let sinks = self.active.stop_all();
        if sinks.is_empty() {
            debug!("Stop requested with no clip playing");
            return;
        }
        for sink in &sinks {
            sink.stop();
        }
        info!("Stopped {} speech playback(s)", sinks.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::player::MIME_MPEG;

    #[test]
    fn test_volume_is_clamped() {
        let output = AudioOutput::new().with_volume(3.0);
        assert_eq!(output.volume, 1.0);
        assert!(!output.is_playing());
    }

    #[test]
    fn test_stop_reaches_every_active_sink() {
        let active = ActiveSinks::new();
        let greeting = Arc::new("greeting");
        let reply = Arc::new("reply");
        assert!(active.register(0, &greeting, |_| {}));
        assert!(active.register(0, &reply, |_| {}));

        let stopped = active.stop_all();
        assert_eq!(stopped.len(), 2);
        assert_eq!(active.len(), 0);
    }

    #[test]
    fn test_stop_before_start_wins() {
        let active = ActiveSinks::new();
        let requested_at = active.generation();
        active.stop_all();

        let mut started = false;
        assert!(!active.register(requested_at, &Arc::new("late"), |_| started = true));
        assert!(!started);
        assert_eq!(active.len(), 0);
    }

    #[test]
    fn test_finished_sink_is_forgotten() {
        let active = ActiveSinks::new();
        let clip = Arc::new("clip");
        active.register(active.generation(), &clip, |_| {});
        active.finish(&clip);
        assert!(active.stop_all().is_empty());
    }

    #[tokio::test]
    async fn test_empty_clip_is_rejected() {
        let output = AudioOutput::new();
        let result = output.play(AudioClip::new(Vec::new(), MIME_MPEG)).await;
        assert!(matches!(result, Err(RiaError::Playback(_))));
    }

    #[tokio::test]
    async fn test_garbage_fails_without_panicking() {
        // Fails on device or decode depending on the environment
        let output = AudioOutput::new();
        let result = output.play(AudioClip::new(vec![0u8; 64], MIME_MPEG)).await;
        assert!(result.is_err());
        assert!(!output.is_playing());
    }
}
