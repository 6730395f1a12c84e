//! Speech-to-text HTTP client
//!
//! Client for a transcription service (e.g. a whisper server) that takes a
//! reference to a captured audio artifact and returns plain text. An empty
//! transcript is a valid response and flows through as "no intelligible
//! input".

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use callscreen_core::error::{Result, ScreenError};
use callscreen_core::ports::{AudioRef, TranscriptionPort};

/// Client for a transcription HTTP endpoint
pub struct HttpTranscriptionClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct TranscribeRequest<'a> {
    audio_ref: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    text: String,
}

impl HttpTranscriptionClient {
    /// Create a client for the given transcription service
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ScreenError::transcription(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl TranscriptionPort for HttpTranscriptionClient {
    async fn transcribe(&self, audio: &AudioRef, language_hint: Option<&str>) -> Result<String> {
        let request = TranscribeRequest {
            audio_ref: audio,
            language: language_hint,
        };

        let url = format!("{}/v1/transcribe", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ScreenError::transcription(format!("request to {} failed: {}", url, e)))?
            .error_for_status()
            .map_err(|e| ScreenError::transcription(format!("transcriber error: {}", e)))?;

        let body: TranscribeResponse = response
            .json()
            .await
            .map_err(|e| ScreenError::transcription(format!("malformed transcriber response: {}", e)))?;

        debug!("Transcribed {}: {}", audio, body.text);
        Ok(body.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = TranscribeRequest {
            audio_ref: "recordings/audio_call-1.wav",
            language: Some("en"),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["audio_ref"], "recordings/audio_call-1.wav");
        assert_eq!(value["language"], "en");
    }

    #[test]
    fn test_language_hint_is_omitted_when_absent() {
        let request = TranscribeRequest {
            audio_ref: "a.wav",
            language: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("language").is_none());
    }

    #[test]
    fn test_base_url_is_normalized() {
        let client =
            HttpTranscriptionClient::new("http://stt:9000///", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url, "http://stt:9000");
    }
}
