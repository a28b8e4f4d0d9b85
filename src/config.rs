//! Widget configuration
//!
//! Loaded from an optional file plus `RIA__`-prefixed environment variables
//! (`RIA__ENDPOINTS__BASE_URL=https://...`). Every section has defaults, so
//! a partial file only overrides what it names.

use crate::audio::AudioClip;
use crate::{Result, RiaError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the complete widget
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    pub endpoints: EndpointConfig,

    pub speech: SpeechConfig,

    /// Shown, and spoken when TTS is on, the first time the widget opens
    pub greeting: Option<String>,

    /// Presentation keys for the renderer; never read by the core
    pub style: StyleConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub base_url: String,
    pub signaling_path: String,
    pub text_path: String,
    pub tts_path: String,
    pub request_timeout_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            signaling_path: "/webrtc/offer".to_string(),
            text_path: "/api/v1/text".to_string(),
            tts_path: "/api/v1/tts".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl EndpointConfig {
    fn join(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn signaling_url(&self) -> String {
        self.join(&self.signaling_path)
    }

    pub fn text_url(&self) -> String {
        self.join(&self.text_path)
    }

    pub fn tts_url(&self) -> String {
        self.join(&self.tts_path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Encoding of synthesized speech
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechFormat {
    #[default]
    Mp3,
    Wav,
}

impl SpeechFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeechFormat::Mp3 => "mp3",
            SpeechFormat::Wav => "wav",
        }
    }

    pub fn mime(&self) -> &'static str {
        AudioClip::mime_for_format(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Ask the text endpoint to synthesize its reply
    pub include_tts: bool,
    pub need_action_items: bool,
    pub voice_id: Option<String>,
    pub model_id: Option<String>,
    pub format: SpeechFormat,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            include_tts: true,
            need_action_items: true,
            voice_id: None,
            model_id: None,
            format: SpeechFormat::Mp3,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetPosition {
    #[default]
    BottomRight,
    BottomLeft,
}

/// Presentation overrides
///
/// Colors are `#rrggbb` (or `#rgb`) strings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Corner the floating button sits in
    pub position: WidgetPosition,
    /// Launcher button and header
    pub primary_color: String,
    pub user_bubble_color: String,
    pub bot_bubble_color: String,
    pub font_family: String,
    pub font_size_px: u16,
    pub border_radius_px: u16,
    /// Panel header text
    pub title: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            position: WidgetPosition::BottomRight,
            primary_color: "#4f46e5".to_string(),
            user_bubble_color: "#e0e7ff".to_string(),
            bot_bubble_color: "#f3f4f6".to_string(),
            font_family: "system-ui, sans-serif".to_string(),
            font_size_px: 14,
            border_radius_px: 12,
            title: "Assistant".to_string(),
        }
    }
}

fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|hex| matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

impl WidgetConfig {
    /// Load from an optional file, then apply `RIA__` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                ::config::Environment::with_prefix("RIA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file only
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path.as_ref()).required(true))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.endpoints.base_url = base_url.into();
        self
    }

    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = Some(greeting.into());
        self
    }

    pub fn with_voice(mut self, voice_id: impl Into<String>) -> Self {
        self.speech.voice_id = Some(voice_id.into());
        self
    }

    pub fn with_format(mut self, format: SpeechFormat) -> Self {
        self.speech.format = format;
        self
    }

    /// Disable synthesized speech (text-only replies)
    pub fn without_tts(mut self) -> Self {
        self.speech.include_tts = false;
        self
    }

    pub fn without_action_items(mut self) -> Self {
        self.speech.need_action_items = false;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let endpoints = &self.endpoints;
        if !(endpoints.base_url.starts_with("http://") || endpoints.base_url.starts_with("https://")) {
            return Err(RiaError::Config(format!(
                "base_url must be an http(s) URL: {}",
                endpoints.base_url
            )));
        }

        for (name, path) in [
            ("signaling_path", &endpoints.signaling_path),
            ("text_path", &endpoints.text_path),
            ("tts_path", &endpoints.tts_path),
        ] {
            if !path.starts_with('/') {
                return Err(RiaError::Config(format!("{} must start with '/': {}", name, path)));
            }
        }

        if endpoints.request_timeout_secs == 0 {
            return Err(RiaError::Config("request_timeout_secs must be positive".to_string()));
        }

        for (name, color) in [
            ("primary_color", &self.style.primary_color),
            ("user_bubble_color", &self.style.user_bubble_color),
            ("bot_bubble_color", &self.style.bot_bubble_color),
        ] {
            if !is_hex_color(color) {
                return Err(RiaError::Config(format!("{} is not a hex color: {}", name, color)));
            }
        }

        if !(8..=48).contains(&self.style.font_size_px) {
            return Err(RiaError::Config(format!(
                "font_size_px out of range: {}",
                self.style.font_size_px
            )));
        }

        Ok(())
    }
}
