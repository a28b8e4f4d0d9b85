use crate::Result;
use async_trait::async_trait;
use tracing::debug;

pub const MIME_MPEG: &str = "audio/mpeg";
pub const MIME_WAV: &str = "audio/wav";

/// Encoded synthesized speech ready to be played
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioClip {
    /// Encoded audio (mp3 or wav)
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`
    pub mime: String,
}

impl AudioClip {
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
        }
    }

    /// MIME type for a speech format name (`mp3` or `wav`)
    pub fn mime_for_format(format: &str) -> &'static str {
        if format.eq_ignore_ascii_case("wav") {
            MIME_WAV
        } else {
            MIME_MPEG
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Plays synthesized speech
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    /// Play a clip, resolving once playback finished or failed
    async fn play(&self, clip: AudioClip) -> Result<()>;

    /// Stop the clip currently playing, if any. A pending `play` resolves.
    fn stop(&self);
}

/// Player that discards audio, for text-only hosts
#[derive(Debug, Clone, Copy, Default)]
pub struct MutedOutput;

#[async_trait]
impl AudioPlayer for MutedOutput {
    async fn play(&self, clip: AudioClip) -> Result<()> {
        debug!("Muted output dropping {} bytes of {}", clip.len(), clip.mime);
        Ok(())
    }

    fn stop(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_for_format() {
        assert_eq!(AudioClip::mime_for_format("mp3"), MIME_MPEG);
        assert_eq!(AudioClip::mime_for_format("WAV"), MIME_WAV);
        assert_eq!(AudioClip::mime_for_format("ogg"), MIME_MPEG);
    }

    #[tokio::test]
    async fn test_muted_output_completes() {
        let clip = AudioClip::new(vec![1, 2, 3], MIME_MPEG);
        assert!(MutedOutput.play(clip).await.is_ok());
    }
}
