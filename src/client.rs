//! HTTP clients for the text and speech-synthesis endpoints

use crate::audio::AudioClip;
use crate::config::{SpeechFormat, WidgetConfig};
use crate::{Result, RiaError};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Body of a typed-text request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRequest {
    pub text: String,
    pub need_action_items: bool,
    pub include_tts: bool,
    pub tts_voice_id: Option<String>,
    pub tts_model_id: Option<String>,
    pub tts_format: SpeechFormat,
}

impl TextRequest {
    /// Request for `text` with the speech options of `config`
    pub fn from_config(text: impl Into<String>, config: &WidgetConfig) -> Self {
        Self {
            text: text.into(),
            need_action_items: config.speech.need_action_items,
            include_tts: config.speech.include_tts,
            tts_voice_id: config.speech.voice_id.clone(),
            tts_model_id: config.speech.model_id.clone(),
            tts_format: config.speech.format,
        }
    }
}

/// Body of a speech-synthesis request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TtsRequest {
    pub text: String,
    pub voice_id: Option<String>,
    pub model_id: Option<String>,
    pub fmt: SpeechFormat,
}

impl TtsRequest {
    pub fn from_config(text: impl Into<String>, config: &WidgetConfig) -> Self {
        Self {
            text: text.into(),
            voice_id: config.speech.voice_id.clone(),
            model_id: config.speech.model_id.clone(),
            fmt: config.speech.format,
        }
    }
}

/// Sends typed text, answers with a control-payload-shaped reply
#[async_trait]
pub trait TextEndpoint: Send + Sync {
    async fn send_text(&self, request: &TextRequest) -> Result<Value>;
}

/// Turns text into speech
#[async_trait]
pub trait SpeechEndpoint: Send + Sync {
    async fn synthesize(&self, request: &TtsRequest) -> Result<AudioClip>;
}

async fn check_status(response: reqwest::Response, url: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if !status.is_success() {
        let error_body = response.text().await.unwrap_or_default();
        return Err(RiaError::Http(format!(
            "{} returned {} - {}",
            url, status, error_body
        )));
    }
    Ok(response)
}

pub struct TextClient {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl TextClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            timeout,
        }
    }

    pub fn from_config(config: &WidgetConfig) -> Self {
        Self::new(config.endpoints.text_url(), config.endpoints.request_timeout())
    }
}

#[async_trait]
impl TextEndpoint for TextClient {
    async fn send_text(&self, request: &TextRequest) -> Result<Value> {
        info!("Sending {} chars of text to {}", request.text.len(), self.url);

        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await?;

        let reply: Value = check_status(response, &self.url).await?.json().await?;
        debug!("Text reply received");
        Ok(reply)
    }
}

pub struct SpeechClient {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl SpeechClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            timeout,
        }
    }

    pub fn from_config(config: &WidgetConfig) -> Self {
        Self::new(config.endpoints.tts_url(), config.endpoints.request_timeout())
    }
}

#[async_trait]
impl SpeechEndpoint for SpeechClient {
    async fn synthesize(&self, request: &TtsRequest) -> Result<AudioClip> {
        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await?;
        let response = check_status(response, &self.url).await?;

        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.starts_with("audio/"))
            .map(str::to_string)
            .unwrap_or_else(|| request.fmt.mime().to_string());

        let bytes = response.bytes().await?.to_vec();
        if bytes.is_empty() {
            return Err(RiaError::Http(format!("{} returned no audio", self.url)));
        }

        debug!("Synthesized {} bytes of {}", bytes.len(), mime);
        Ok(AudioClip::new(bytes, mime))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_request_wire_shape() {
        let config = WidgetConfig::default().with_voice("v1").without_action_items();
        let json = serde_json::to_value(TextRequest::from_config("hi", &config)).unwrap();
        assert_eq!(json["text"], "hi");
        assert_eq!(json["need_action_items"], false);
        assert_eq!(json["include_tts"], true);
        assert_eq!(json["tts_voice_id"], "v1");
        assert_eq!(json["tts_format"], "mp3");
    }

    #[test]
    fn test_tts_request_wire_shape() {
        let config = WidgetConfig::default().with_format(SpeechFormat::Wav);
        let json = serde_json::to_value(TtsRequest::from_config("hello", &config)).unwrap();
        assert_eq!(json["fmt"], "wav");
        assert!(json["voice_id"].is_null());
    }
}
