//! Signaling exchange
//!
//! Types for the SDP offer/answer exchange and ICE candidate posting, and an
//! HTTP client for the signaling endpoint. Offer and candidates are posted to
//! the same URL; candidates carry `type: "ice-candidate"`.

use crate::{Result, RiaError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

pub const ICE_CANDIDATE_TYPE: &str = "ice-candidate";

/// Session Description Protocol (SDP) message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    /// Type of SDP: "offer" or "answer"
    #[serde(rename = "type")]
    pub sdp_type: String,
    /// The SDP content
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: "offer".to_string(),
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: "answer".to_string(),
            sdp: sdp.into(),
        }
    }

    pub fn is_offer(&self) -> bool {
        self.sdp_type == "offer"
    }

    pub fn is_answer(&self) -> bool {
        self.sdp_type == "answer"
    }
}

/// ICE candidate gathered by the local peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(rename = "sdpMid")]
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex")]
    pub sdp_mline_index: Option<u16>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_mline_index: None,
        }
    }

    pub fn with_sdp_mid(mut self, mid: impl Into<String>) -> Self {
        self.sdp_mid = Some(mid.into());
        self
    }

    pub fn with_sdp_mline_index(mut self, index: u16) -> Self {
        self.sdp_mline_index = Some(index);
        self
    }
}

/// Offer posted to the signaling endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferRequest {
    pub sdp: String,
    #[serde(rename = "type")]
    pub sdp_type: String,
    pub session_id: String,
}

impl OfferRequest {
    pub fn new(offer: &SessionDescription, session_id: impl Into<String>) -> Self {
        Self {
            sdp: offer.sdp.clone(),
            sdp_type: offer.sdp_type.clone(),
            session_id: session_id.into(),
        }
    }
}

/// One candidate posted to the signaling endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateMessage {
    pub candidate: IceCandidate,
    pub session_id: String,
    #[serde(rename = "type")]
    pub message_type: String,
}

impl CandidateMessage {
    pub fn new(candidate: IceCandidate, session_id: impl Into<String>) -> Self {
        Self {
            candidate,
            session_id: session_id.into(),
            message_type: ICE_CANDIDATE_TYPE.to_string(),
        }
    }
}

/// Random opaque session token, minted client-side
pub fn mint_session_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Request/response side of the signaling exchange
#[async_trait]
pub trait SignalingClient: Send + Sync {
    /// Send the offer and wait for the remote answer
    async fn send_offer(&self, offer: &OfferRequest) -> Result<SessionDescription>;

    /// Post one candidate; no response body is expected
    async fn send_candidate(&self, message: &CandidateMessage) -> Result<()>;
}

/// Signaling over plain HTTP POST
pub struct HttpSignalingClient {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpSignalingClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post<T: Serialize + ?Sized>(&self, body: &T) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| RiaError::Signaling(format!("{} unreachable: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RiaError::Signaling(format!("HTTP {} - {}", status, error_text)));
        }
        Ok(response)
    }
}

#[async_trait]
impl SignalingClient for HttpSignalingClient {
    async fn send_offer(&self, offer: &OfferRequest) -> Result<SessionDescription> {
        info!("Sending offer for session {} to {}", offer.session_id, self.url);

        let answer: SessionDescription = self
            .post(offer)
            .await?
            .json()
            .await
            .map_err(|e| RiaError::Signaling(format!("Invalid answer: {}", e)))?;

        if !answer.is_answer() {
            return Err(RiaError::Signaling(format!(
                "Expected an answer, got type '{}'",
                answer.sdp_type
            )));
        }

        debug!("Received answer ({} bytes of SDP)", answer.sdp.len());
        Ok(answer)
    }

    async fn send_candidate(&self, message: &CandidateMessage) -> Result<()> {
        self.post(message).await?;
        debug!("Posted ICE candidate for session {}", message.session_id);
        Ok(())
    }
}
