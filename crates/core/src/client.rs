//! Transport contract — the abstraction over the remote chat backend.
//!
//! A `ChatClient` knows how to send a projected transcript to the backend
//! and get a response back, either as a complete payload or as a stream of
//! delta events. The pipeline calls `send_atomic()` for routing passes and
//! `send_stream()` for dispatched passes without knowing which transport is
//! behind the trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::turn::{ConversationTurn, Role, ToolCallFragment, TurnContent};

/// Backend credentials, passed explicitly with every request.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Provider identifier (e.g., "openrouter", "groq")
    pub provider: String,
    /// API key forwarded to the backend
    pub api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("provider", &self.provider)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// One request to the chat-completion backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub credentials: Credentials,

    /// The model to use
    pub model: String,

    /// Candidate model list (catalogs concatenated, passed through unmodified)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidate_models: Vec<String>,

    /// The transcript projected to the wire shape
    pub messages: Vec<WireMessage>,

    /// The agent persona issuing this call
    pub agent: String,

    /// Tools the agent may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub active_tools: Vec<String>,
}

/// A turn projected to the wire: `{role, content}`.
///
/// Text parts of multi-part content are already in `{type:"text", text}`
/// shape and image parts pass through unchanged, so the projection is a
/// role/content extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: TurnContent,
}

impl WireMessage {
    /// Project a transcript snapshot to the wire shape.
    pub fn project(turns: &[ConversationTurn]) -> Vec<WireMessage> {
        turns
            .iter()
            .map(|t| WireMessage {
                role: t.role,
                content: t.content.clone(),
            })
            .collect()
    }
}

/// The complete (non-streamed) backend response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtomicResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,

    /// Tool calls, already assembled by the backend
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallFragment>,

    /// Directive for what the pipeline should do next (hand-off)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action: Option<NextAction>,
}

impl AtomicResponse {
    /// Content of the first choice, empty when the backend sent none.
    pub fn content(&self) -> &str {
        self.choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or("")
    }

    /// Reasoning of the first choice, if any.
    pub fn reasoning(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.reasoning.as_deref())
    }

    /// The hand-off target, when `next_action` is a `SWITCH_AGENT` directive
    /// naming one. Any other kind of directive is ignored.
    pub fn switch_agent_target(&self) -> Option<&str> {
        self.next_action
            .as_ref()
            .filter(|a| a.kind == "SWITCH_AGENT")
            .and_then(|a| a.agent.as_deref())
    }
}

/// One choice in an atomic response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: ChoiceMessage,
}

/// The message payload of a choice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// A next-action directive returned by a routing pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextAction {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

/// One event of a streamed response.
///
/// Validated once on ingress by the transport implementation; internal logic
/// never re-inspects raw provider JSON. `Error` is terminal — no further
/// events follow it.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Delta(StreamDelta),
    Error { message: String },
}

/// One incremental fragment of a streamed assistant response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamDelta {
    /// Thinking text to append
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,

    /// Content text to append
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Sparse tool-call fragments to fold in (indices may be non-contiguous)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallDelta>,
}

impl StreamDelta {
    /// Whether this delta carries nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.reasoning.as_deref().unwrap_or("").is_empty()
            && self.content.as_deref().unwrap_or("").is_empty()
            && self.tool_calls.is_empty()
    }
}

/// A tool-call fragment as delivered on the wire — arrives incrementally
/// across deltas, keyed by position.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolCallDelta {
    pub index: u32,

    #[serde(default)]
    pub function: FunctionDelta,
}

/// The incrementally-delivered function descriptor of a tool-call fragment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

/// The transport client trait.
///
/// The streamed variant yields its events through a channel; a failure that
/// happens after the stream opened arrives as a terminal
/// [`StreamEvent::Error`] rather than closing the channel with an error, so
/// partial content already folded into the transcript stays visible.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send a request and get the complete response (routing passes and the
    /// prompt-improvement side-flow).
    async fn send_atomic(
        &self,
        request: ChatRequest,
    ) -> std::result::Result<AtomicResponse, TransportError>;

    /// Send a request and get a stream of delta events, in delivery order.
    async fn send_stream(
        &self,
        request: ChatRequest,
    ) -> std::result::Result<tokio::sync::mpsc::Receiver<StreamEvent>, TransportError>;
}
