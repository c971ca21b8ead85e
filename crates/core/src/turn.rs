//! Conversation turn and transcript domain types.
//!
//! These are the core value objects that flow through the pipeline:
//! the user submits text/images → a turn is appended to the transcript →
//! the transport client projects the transcript to the wire → streamed
//! deltas mutate the in-flight assistant turn in place.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique, monotonically increasing identifier for a turn.
///
/// Seeded from the wall clock but strictly increasing within a process, so
/// two turns created in the same millisecond never collide. Orderable by
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnId(i64);

static LAST_ID: AtomicI64 = AtomicI64::new(0);

impl TurnId {
    /// Allocate the next turn id.
    pub fn next() -> Self {
        let now = Utc::now().timestamp_millis();
        let mut prev = LAST_ID.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev + 1);
            match LAST_ID.compare_exchange_weak(
                prev,
                candidate,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Self(candidate),
                Err(actual) => prev = actual,
            }
        }
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a turn in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions
    System,
    /// The end user
    User,
    /// The AI assistant
    Assistant,
}

/// One part of a multi-part turn content.
///
/// Serialized directly in the wire shape so image parts pass through to the
/// backend unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// A text fragment.
    Text { text: String },
    /// An image reference (URL or data URI).
    ImageUrl { image_url: ImageRef },
}

/// URL/URI reference carried by an image part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image(url: impl Into<String>) -> Self {
        Self::ImageUrl {
            image_url: ImageRef { url: url.into() },
        }
    }
}

/// Turn content: either a plain string or an ordered sequence of parts.
///
/// Multi-part content is only used for outbound user turns with image
/// attachments; streamed assistant content is always plain-string mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl TurnContent {
    /// Append a streamed fragment. Only meaningful in plain-string mode;
    /// a delta arriving for multi-part content is ignored.
    pub fn append(&mut self, fragment: &str) {
        if let TurnContent::Text(s) = self {
            s.push_str(fragment);
        }
    }

    /// Flattened text of this content (text parts joined, images skipped).
    pub fn as_text(&self) -> String {
        match self {
            TurnContent::Text(s) => s.clone(),
            TurnContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            TurnContent::Text(s) => s.is_empty(),
            TurnContent::Parts(parts) => parts.is_empty(),
        }
    }
}

/// A fragmented function-call descriptor assembled across stream deltas.
///
/// `arguments` is raw text concatenated in delivery order — it is frequently
/// split mid-JSON-token, so it must never be parsed or replaced until the
/// stream ends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallFragment {
    /// Position in the call list (stable key across streamed fragments).
    pub index: u32,
    /// Function name; empty until the first naming delta arrives.
    #[serde(default)]
    pub name: String,
    /// Raw argument text, append-only.
    #[serde(default)]
    pub arguments: String,
}

impl ToolCallFragment {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }
}

/// Recorded when an assistant turn was produced after a hand-off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingInfo {
    pub routed_to: String,
}

/// A single turn in the conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Unique, orderable turn id
    pub id: TurnId,

    /// Who produced this turn
    pub role: Role,

    /// The content (plain string, or parts for user turns with attachments)
    pub content: TurnContent,

    /// Accumulated "thinking" text, separate from content (assistant only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,

    /// Tool calls assembled from stream deltas (assistant only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallFragment>,

    /// Creation time — the stable secondary key used to find and remove a
    /// turn after a failed request
    pub timestamp: DateTime<Utc>,

    /// Set when this assistant turn was produced after a hand-off
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_info: Option<RoutingInfo>,
}

impl ConversationTurn {
    /// Create a user turn with plain text content.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: TurnId::next(),
            role: Role::User,
            content: TurnContent::Text(content.into()),
            reasoning: None,
            tool_calls: Vec::new(),
            timestamp: Utc::now(),
            routing_info: None,
        }
    }

    /// Create a user turn carrying text plus one part per image attachment.
    pub fn user_with_images(text: impl Into<String>, images: &[String]) -> Self {
        let mut parts = vec![ContentPart::text(text)];
        parts.extend(images.iter().map(|url| ContentPart::image(url.clone())));
        Self {
            id: TurnId::next(),
            role: Role::User,
            content: TurnContent::Parts(parts),
            reasoning: None,
            tool_calls: Vec::new(),
            timestamp: Utc::now(),
            routing_info: None,
        }
    }

    /// Create a system turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            id: TurnId::next(),
            role: Role::System,
            content: TurnContent::Text(content.into()),
            reasoning: None,
            tool_calls: Vec::new(),
            timestamp: Utc::now(),
            routing_info: None,
        }
    }

    /// Create a complete assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: TurnId::next(),
            role: Role::Assistant,
            content: TurnContent::Text(content.into()),
            reasoning: None,
            tool_calls: Vec::new(),
            timestamp: Utc::now(),
            routing_info: None,
        }
    }

    /// Create an empty assistant placeholder to be mutated in place while
    /// its originating stream is open.
    pub fn placeholder(routing_info: Option<RoutingInfo>) -> Self {
        Self {
            id: TurnId::next(),
            role: Role::Assistant,
            content: TurnContent::Text(String::new()),
            reasoning: None,
            tool_calls: Vec::new(),
            timestamp: Utc::now(),
            routing_info,
        }
    }

    /// Append a reasoning fragment.
    pub fn append_reasoning(&mut self, fragment: &str) {
        match &mut self.reasoning {
            Some(r) => r.push_str(fragment),
            None => self.reasoning = Some(fragment.to_string()),
        }
    }

    /// Whether this turn accumulated nothing at all.
    pub fn is_blank(&self) -> bool {
        self.content.is_empty()
            && self.reasoning.as_deref().unwrap_or("").is_empty()
            && self.tool_calls.is_empty()
    }
}

/// The ordered, externally-owned conversation transcript.
///
/// Append-only except for failure rollback (whole-turn removal matched by
/// timestamp) and replace-last-on-retry. The assistant placeholder created
/// by a streaming call is the only turn mutated in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    turns: Vec<ConversationTurn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    /// Locate a turn by id for in-place mutation.
    ///
    /// Looked up fresh on every delta — the accumulator never assumes the
    /// transcript is the same object it was when the placeholder was made.
    pub fn turn_mut(&mut self, id: TurnId) -> Option<&mut ConversationTurn> {
        self.turns.iter_mut().find(|t| t.id == id)
    }

    pub fn turn_by_id(&self, id: TurnId) -> Option<&ConversationTurn> {
        self.turns.iter().find(|t| t.id == id)
    }

    /// Remove every turn created at `timestamp`. Returns how many were
    /// removed (zero when the turn was already gone).
    pub fn remove_by_timestamp(&mut self, timestamp: DateTime<Utc>) -> usize {
        let before = self.turns.len();
        self.turns.retain(|t| t.timestamp != timestamp);
        before - self.turns.len()
    }

    /// Remove a turn by id. Returns whether a turn was removed.
    pub fn remove_by_id(&mut self, id: TurnId) -> bool {
        let before = self.turns.len();
        self.turns.retain(|t| t.id != id);
        before != self.turns.len()
    }

    /// Remove and return the last turn.
    pub fn pop(&mut self) -> Option<ConversationTurn> {
        self.turns.pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_ids_are_unique_and_ordered() {
        let a = TurnId::next();
        let b = TurnId::next();
        let c = TurnId::next();
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn user_turn_plain_text() {
        let turn = ConversationTurn::user("hello");
        assert_eq!(turn.role, Role::User);
        assert_eq!(turn.content, TurnContent::Text("hello".into()));
        assert!(turn.tool_calls.is_empty());
        assert!(turn.routing_info.is_none());
    }

    #[test]
    fn user_turn_with_images_builds_parts() {
        let turn =
            ConversationTurn::user_with_images("look", &["https://x/img.png".to_string()]);
        match &turn.content {
            TurnContent::Parts(parts) => {
                assert_eq!(parts.len(), 2);
                assert_eq!(parts[0], ContentPart::text("look"));
                assert_eq!(parts[1], ContentPart::image("https://x/img.png"));
            }
            other => panic!("Expected parts, got: {other:?}"),
        }
    }

    #[test]
    fn content_append_is_concatenation() {
        let mut content = TurnContent::Text(String::new());
        content.append("func");
        content.append("");
        content.append("tion(){}");
        assert_eq!(content, TurnContent::Text("function(){}".into()));
    }

    #[test]
    fn content_append_ignored_for_parts() {
        let mut content = TurnContent::Parts(vec![ContentPart::text("a")]);
        content.append("b");
        assert_eq!(content.as_text(), "a");
    }

    #[test]
    fn reasoning_appends_across_fragments() {
        let mut turn = ConversationTurn::placeholder(None);
        assert!(turn.reasoning.is_none());
        turn.append_reasoning("let me ");
        turn.append_reasoning("think");
        assert_eq!(turn.reasoning.as_deref(), Some("let me think"));
    }

    #[test]
    fn placeholder_starts_blank() {
        let turn = ConversationTurn::placeholder(Some(RoutingInfo {
            routed_to: "Coder".into(),
        }));
        assert!(turn.is_blank());
        assert_eq!(turn.routing_info.as_ref().unwrap().routed_to, "Coder");
    }

    #[test]
    fn transcript_remove_by_timestamp() {
        let mut transcript = Transcript::new();
        let turn = ConversationTurn::user("doomed");
        let ts = turn.timestamp;
        transcript.push(turn);
        transcript.push(ConversationTurn::assistant("kept"));

        assert_eq!(transcript.remove_by_timestamp(ts), 1);
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.last().unwrap().content.as_text(), "kept");

        // Removing again is a no-op
        assert_eq!(transcript.remove_by_timestamp(ts), 0);
    }

    #[test]
    fn transcript_locates_turn_by_id() {
        let mut transcript = Transcript::new();
        let placeholder = ConversationTurn::placeholder(None);
        let id = placeholder.id;
        transcript.push(placeholder);

        transcript.turn_mut(id).unwrap().content.append("partial");
        assert_eq!(
            transcript.turn_by_id(id).unwrap().content.as_text(),
            "partial"
        );
    }

    #[test]
    fn image_part_serializes_in_wire_shape() {
        let part = ContentPart::image("https://x/a.png");
        let json = serde_json::to_string(&part).unwrap();
        assert_eq!(
            json,
            r#"{"type":"image_url","image_url":{"url":"https://x/a.png"}}"#
        );
    }

    #[test]
    fn text_part_serializes_in_wire_shape() {
        let part = ContentPart::text("hi");
        let json = serde_json::to_string(&part).unwrap();
        assert_eq!(json, r#"{"type":"text","text":"hi"}"#);
    }

    #[test]
    fn turn_serialization_roundtrip() {
        let turn = ConversationTurn::user("round trip");
        let json = serde_json::to_string(&turn).unwrap();
        let parsed: ConversationTurn = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, turn.id);
        assert_eq!(parsed.content.as_text(), "round trip");
    }
}
