//! Call registration with the voice-agent provider.
//!
//! Before the telephony leg can stream audio, the call has to be registered
//! for an agent. The returned `call_id` scopes the LLM WebSocket session.

use crate::error::RegistrarError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Audio negotiation fields sent with every registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSettings {
    pub encoding: String,
    pub sample_rate: u32,
    pub websocket_protocol: String,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            encoding: "s16le".to_string(),
            sample_rate: 16000,
            websocket_protocol: "twilio".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RegisterCallRequest<'a> {
    agent_id: &'a str,
    audio_encoding: &'a str,
    audio_websocket_protocol: &'a str,
    sample_rate: u32,
}

/// A call the provider has accepted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisteredCall {
    pub call_id: String,
    #[serde(default)]
    pub agent_id: String,
    #[serde(default)]
    pub audio_encoding: String,
    #[serde(default)]
    pub audio_websocket_protocol: String,
    #[serde(default)]
    pub call_status: String,
    #[serde(default)]
    pub sample_rate: u32,
    #[serde(default)]
    pub start_timestamp: i64,
}

/// Registers inbound calls with the voice-agent provider.
#[async_trait]
pub trait CallRegistrar: Send + Sync {
    async fn register_call(&self, agent_id: &str) -> Result<RegisteredCall, RegistrarError>;
}

/// `CallRegistrar` backed by the provider's `register-call` REST endpoint.
pub struct RetellRegistrar {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    audio: AudioSettings,
}

impl RetellRegistrar {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>, audio: AudioSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into(),
            api_key: api_key.into(),
            audio,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/register-call", self.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl CallRegistrar for RetellRegistrar {
    #[instrument(skip(self))]
    async fn register_call(&self, agent_id: &str) -> Result<RegisteredCall, RegistrarError> {
        let request = RegisterCallRequest {
            agent_id,
            audio_encoding: &self.audio.encoding,
            audio_websocket_protocol: &self.audio.websocket_protocol,
            sample_rate: self.audio.sample_rate,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistrarError::Status(status.as_u16(), body));
        }

        let call: RegisteredCall = response.json().await?;
        info!(call_id = %call.call_id, call_status = %call.call_status, "Call registered.");
        Ok(call)
    }
}
