pub mod ducking;
#[cfg(feature = "audio-io")]
pub mod output;
pub mod player;

pub use ducking::{DuckGuard, DuckingCoordinator, PlaybackState};
#[cfg(feature = "audio-io")]
pub use output::AudioOutput;
pub use player::{AudioClip, AudioPlayer, MutedOutput, MIME_MPEG, MIME_WAV};
