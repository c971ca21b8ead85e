//! HTTP transcription client for the audio side-flow.
//!
//! Uploads the recording to an OpenAI-compatible `/audio/transcriptions`
//! endpoint as a multipart form. Failures surface as errors, never as
//! fallback text — the pipeline decides what to do with a failed clip.

use async_trait::async_trait;
use reqwest::multipart;
use tracing::debug;

use denkitsu_core::error::Result;
use denkitsu_core::transcribe::{transcription_error, AudioClip, Transcriber};

/// Speech-to-text client against an OpenAI-compatible endpoint.
pub struct HttpTranscriber {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl HttpTranscriber {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    fn transcriptions_url(&self) -> String {
        format!("{}/audio/transcriptions", self.base_url)
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, clip: &AudioClip) -> Result<String> {
        let file_part = multipart::Part::bytes(clip.bytes.clone())
            .file_name(clip.name.clone())
            .mime_str(&clip.content_type)
            .map_err(|e| transcription_error(e.to_string()))?;

        let form = multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone());

        let resp = self
            .client
            .post(self.transcriptions_url())
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| transcription_error(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(transcription_error(format!("HTTP {}", resp.status())));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| transcription_error(e.to_string()))?;
        let trimmed = body.trim();

        debug!(clip = %clip.name, "Transcription succeeded");

        // Some providers return JSON {"text": "..."}, others plain text.
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
            if let Some(text) = json.get("text").and_then(|v| v.as_str()) {
                return Ok(text.to_string());
            }
        }

        Ok(trimmed.to_string())
    }
}
