//! HTTP implementation of the chat backend client.
//!
//! Talks to the Denkitsu backend's `/chat/completions` endpoint in both
//! modes: a plain JSON round-trip for routing passes, and SSE for dispatched
//! passes. Stream events are validated here, once, on ingress — the rest of
//! the pipeline never touches raw provider JSON.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use denkitsu_core::client::{AtomicResponse, ChatClient, ChatRequest, StreamDelta, StreamEvent};
use denkitsu_core::error::TransportError;

/// The HTTP chat backend client.
pub struct HttpChatClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpChatClient {
    /// Create a client for the given backend base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn to_wire_body(request: &ChatRequest, stream: bool) -> WireBody<'_> {
        WireBody {
            provider: &request.credentials.provider,
            api_key: &request.credentials.api_key,
            model: &request.model,
            models: &request.candidate_models,
            messages: &request.messages,
            agent: &request.agent,
            tools: &request.active_tools,
            stream,
        }
    }

    async fn post(
        &self,
        body: &WireBody<'_>,
        accept: &str,
    ) -> std::result::Result<reqwest::Response, TransportError> {
        let response = self
            .client
            .post(self.completions_url())
            .header("Content-Type", "application/json")
            .header("Accept", accept)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(e.to_string())
                } else {
                    TransportError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(TransportError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::AuthenticationFailed(if message.is_empty() {
                "Invalid API key or insufficient permissions".into()
            } else {
                extract_error_message(&message)
            }));
        }

        if status == 404 {
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::ModelNotFound(extract_error_message(
                &message,
            )));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Backend returned error");
            return Err(TransportError::ApiError {
                status_code: status,
                message: extract_error_message(&error_body),
            });
        }

        Ok(response)
    }
}

/// Pull the human-readable message out of a backend error body, falling
/// back to the raw body when it isn't the usual `{"error":{"message":...}}`
/// shape.
fn extract_error_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        for path in [&json["error"]["message"], &json["message"], &json["error"]] {
            if let Some(msg) = path.as_str() {
                return msg.to_string();
            }
        }
    }
    body.trim().to_string()
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn send_atomic(
        &self,
        request: ChatRequest,
    ) -> std::result::Result<AtomicResponse, TransportError> {
        debug!(model = %request.model, agent = %request.agent, "Sending atomic chat request");

        let body = Self::to_wire_body(&request, false);
        let response = self.post(&body, "application/json").await?;

        response
            .json::<AtomicResponse>()
            .await
            .map_err(|e| TransportError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })
    }

    async fn send_stream(
        &self,
        request: ChatRequest,
    ) -> std::result::Result<tokio::sync::mpsc::Receiver<StreamEvent>, TransportError> {
        debug!(model = %request.model, agent = %request.agent, "Sending streaming chat request");

        let body = Self::to_wire_body(&request, true);
        let response = self.post(&body, "text/event-stream").await?;

        let (tx, rx) = tokio::sync::mpsc::channel(64);

        // Read the SSE byte stream and parse delta events
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        // Terminal: partial content already delivered stays
                        // applied downstream
                        let _ = tx
                            .send(StreamEvent::Error {
                                message: e.to_string(),
                            })
                            .await;
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&bytes));

                // Process complete lines
                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim_end_matches('\r').to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    // Skip empty lines and SSE comments
                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }

                    let Some(data) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let data = data.trim();

                    // "[DONE]" signals end of stream
                    if data == "[DONE]" {
                        return;
                    }

                    match serde_json::from_str::<StreamResponse>(data) {
                        Ok(stream_resp) => {
                            for choice in stream_resp.choices {
                                if choice.delta.is_empty() {
                                    continue;
                                }
                                if tx.send(StreamEvent::Delta(choice.delta)).await.is_err() {
                                    return; // receiver dropped
                                }
                            }
                        }
                        Err(e) => {
                            trace!(data = %data, error = %e, "Ignoring unparseable SSE chunk");
                        }
                    }
                }
            }
        });

        Ok(rx)
    }
}

// --- Wire types (internal) ---

#[derive(Debug, Serialize)]
struct WireBody<'a> {
    provider: &'a str,
    api_key: &'a str,
    model: &'a str,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    models: &'a [String],
    messages: &'a [denkitsu_core::client::WireMessage],
    agent: &'a str,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    tools: &'a [String],
    stream: bool,
}

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}
