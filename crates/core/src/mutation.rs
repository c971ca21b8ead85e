//! Transcript mutations as explicit data.
//!
//! The orchestrator and the streaming accumulator never hold a live mutable
//! reference across an await point; they describe what should happen to the
//! transcript and a single owner applies the mutations in order.

use chrono::{DateTime, Utc};

use crate::turn::{ConversationTurn, ToolCallFragment, Transcript, TurnId};

/// One edit to the transcript.
#[derive(Debug, Clone)]
pub enum TranscriptMutation {
    /// Append a new turn at the end.
    Append(ConversationTurn),

    /// Append a content fragment to the turn with this id.
    AppendContent { id: TurnId, fragment: String },

    /// Append a reasoning fragment to the turn with this id.
    AppendReasoning { id: TurnId, fragment: String },

    /// Replace the plain-text content of the turn with this id.
    ReplaceContent { id: TurnId, content: String },

    /// Replace the tool-call list of the turn with this id.
    SetToolCalls {
        id: TurnId,
        tool_calls: Vec<ToolCallFragment>,
    },

    /// Remove every turn created at this timestamp (failure rollback).
    RemoveByTimestamp(DateTime<Utc>),

    /// Remove the turn with this id.
    RemoveById(TurnId),

    /// Remove the last turn (regenerate).
    RemoveLast,
}

impl Transcript {
    /// Apply one mutation. Mutations addressing a turn that is no longer
    /// present are silently dropped — the transcript may have been rolled
    /// back between the mutation's creation and its application.
    pub fn apply(&mut self, mutation: TranscriptMutation) {
        match mutation {
            TranscriptMutation::Append(turn) => self.push(turn),
            TranscriptMutation::AppendContent { id, fragment } => {
                if let Some(turn) = self.turn_mut(id) {
                    turn.content.append(&fragment);
                }
            }
            TranscriptMutation::AppendReasoning { id, fragment } => {
                if let Some(turn) = self.turn_mut(id) {
                    turn.append_reasoning(&fragment);
                }
            }
            TranscriptMutation::ReplaceContent { id, content } => {
                if let Some(turn) = self.turn_mut(id) {
                    turn.content = crate::turn::TurnContent::Text(content);
                }
            }
            TranscriptMutation::SetToolCalls { id, tool_calls } => {
                if let Some(turn) = self.turn_mut(id) {
                    turn.tool_calls = tool_calls;
                }
            }
            TranscriptMutation::RemoveByTimestamp(ts) => {
                self.remove_by_timestamp(ts);
            }
            TranscriptMutation::RemoveById(id) => {
                self.remove_by_id(id);
            }
            TranscriptMutation::RemoveLast => {
                self.pop();
            }
        }
    }

    /// Apply a batch of mutations in order.
    pub fn apply_all(&mut self, mutations: impl IntoIterator<Item = TranscriptMutation>) {
        for m in mutations {
            self.apply(m);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turn::TurnContent;

    #[test]
    fn append_and_patch() {
        let mut transcript = Transcript::new();
        let placeholder = ConversationTurn::placeholder(None);
        let id = placeholder.id;

        transcript.apply(TranscriptMutation::Append(placeholder));
        transcript.apply(TranscriptMutation::AppendContent {
            id,
            fragment: "hel".into(),
        });
        transcript.apply(TranscriptMutation::AppendContent {
            id,
            fragment: "lo".into(),
        });

        assert_eq!(transcript.turn_by_id(id).unwrap().content.as_text(), "hello");
    }

    #[test]
    fn patch_for_missing_turn_is_dropped() {
        let mut transcript = Transcript::new();
        let orphan = TurnId::next();
        transcript.apply(TranscriptMutation::AppendContent {
            id: orphan,
            fragment: "lost".into(),
        });
        assert!(transcript.is_empty());
    }

    #[test]
    fn replace_content_swaps_text() {
        let mut transcript = Transcript::new();
        let turn = ConversationTurn::user("[Audio: memo.ogg]");
        let id = turn.id;
        transcript.push(turn);

        transcript.apply(TranscriptMutation::ReplaceContent {
            id,
            content: "[Audio: memo.ogg]\n\nbuy milk".into(),
        });

        assert_eq!(
            transcript.turn_by_id(id).unwrap().content,
            TurnContent::Text("[Audio: memo.ogg]\n\nbuy milk".into())
        );
    }

    #[test]
    fn remove_last_pops_tail() {
        let mut transcript = Transcript::new();
        transcript.push(ConversationTurn::user("q"));
        transcript.push(ConversationTurn::assistant("a"));

        transcript.apply(TranscriptMutation::RemoveLast);
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.last().unwrap().content.as_text(), "q");
    }

    #[test]
    fn batch_applies_in_order() {
        let mut transcript = Transcript::new();
        let turn = ConversationTurn::user("x");
        let ts = turn.timestamp;
        transcript.apply_all([
            TranscriptMutation::Append(turn),
            TranscriptMutation::RemoveByTimestamp(ts),
        ]);
        assert!(transcript.is_empty());
    }
}
