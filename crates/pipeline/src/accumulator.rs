//! Streaming accumulator — translates deltas into transcript mutations.
//!
//! The transcript is externally owned and may be a different object than it
//! was when the placeholder was appended, so the turn is located by id on
//! every delta rather than held by reference. The accumulator never mutates
//! anything itself: it reads the current transcript state and returns the
//! [`TranscriptMutation`]s for the single owner to apply in arrival order.

use denkitsu_core::client::StreamDelta;
use denkitsu_core::mutation::TranscriptMutation;
use denkitsu_core::turn::{Transcript, TurnId};

use crate::collector::fold_tool_call_delta;

/// The mutations realizing one stream delta against the turn with this id.
///
/// Empty reasoning/content fragments contribute nothing. A delta for a turn
/// that is no longer present yields no mutations at all.
pub fn mutations_for_delta(
    transcript: &Transcript,
    id: TurnId,
    delta: &StreamDelta,
) -> Vec<TranscriptMutation> {
    let Some(turn) = transcript.turn_by_id(id) else {
        return Vec::new();
    };

    let mut mutations = Vec::new();

    if let Some(reasoning) = &delta.reasoning {
        if !reasoning.is_empty() {
            mutations.push(TranscriptMutation::AppendReasoning {
                id,
                fragment: reasoning.clone(),
            });
        }
    }

    if let Some(content) = &delta.content {
        if !content.is_empty() {
            mutations.push(TranscriptMutation::AppendContent {
                id,
                fragment: content.clone(),
            });
        }
    }

    if !delta.tool_calls.is_empty() {
        // Fold into a copy of the turn's current fragments so the emitted
        // mutation carries the full merged list
        let mut tool_calls = turn.tool_calls.clone();
        for fragment in &delta.tool_calls {
            fold_tool_call_delta(&mut tool_calls, fragment);
        }
        mutations.push(TranscriptMutation::SetToolCalls { id, tool_calls });
    }

    mutations
}

#[cfg(test)]
mod tests {
    use super::*;
    use denkitsu_core::client::{FunctionDelta, ToolCallDelta};
    use denkitsu_core::turn::ConversationTurn;

    fn content_delta(content: &str) -> StreamDelta {
        StreamDelta {
            content: Some(content.to_string()),
            ..StreamDelta::default()
        }
    }

    fn apply(transcript: &mut Transcript, id: TurnId, delta: &StreamDelta) {
        let mutations = mutations_for_delta(transcript, id, delta);
        transcript.apply_all(mutations);
    }

    fn transcript_with_placeholder() -> (Transcript, TurnId) {
        let mut transcript = Transcript::new();
        let placeholder = ConversationTurn::placeholder(None);
        let id = placeholder.id;
        transcript.push(placeholder);
        (transcript, id)
    }

    #[test]
    fn content_accumulates_regardless_of_chunk_boundaries() {
        let full = "The quick brown fox jumps over the lazy dog";

        // Several different splits of the same string must all converge
        for split_at in [1, 7, 19, full.len()] {
            let (mut transcript, id) = transcript_with_placeholder();
            let (head, tail) = full.split_at(split_at);
            apply(&mut transcript, id, &content_delta(head));
            apply(&mut transcript, id, &content_delta(""));
            apply(&mut transcript, id, &content_delta(tail));

            assert_eq!(transcript.turn_by_id(id).unwrap().content.as_text(), full);
        }
    }

    #[test]
    fn empty_delta_yields_no_mutations() {
        let (transcript, id) = transcript_with_placeholder();
        assert!(mutations_for_delta(&transcript, id, &StreamDelta::default()).is_empty());
        assert!(mutations_for_delta(&transcript, id, &content_delta("")).is_empty());
    }

    #[test]
    fn reasoning_and_content_accumulate_separately() {
        let (mut transcript, id) = transcript_with_placeholder();

        apply(
            &mut transcript,
            id,
            &StreamDelta {
                reasoning: Some("let me ".into()),
                ..StreamDelta::default()
            },
        );
        apply(
            &mut transcript,
            id,
            &StreamDelta {
                reasoning: Some("think".into()),
                content: Some("Answer: ".into()),
                ..StreamDelta::default()
            },
        );
        apply(&mut transcript, id, &content_delta("42"));

        let turn = transcript.turn_by_id(id).unwrap();
        assert_eq!(turn.reasoning.as_deref(), Some("let me think"));
        assert_eq!(turn.content.as_text(), "Answer: 42");
    }

    #[test]
    fn tool_call_mutations_preserve_earlier_fragments() {
        let (mut transcript, id) = transcript_with_placeholder();

        apply(
            &mut transcript,
            id,
            &StreamDelta {
                tool_calls: vec![ToolCallDelta {
                    index: 0,
                    function: FunctionDelta {
                        name: Some("search".into()),
                        arguments: Some("{\"q\"".into()),
                    },
                }],
                ..StreamDelta::default()
            },
        );
        apply(
            &mut transcript,
            id,
            &StreamDelta {
                tool_calls: vec![ToolCallDelta {
                    index: 0,
                    function: FunctionDelta {
                        name: None,
                        arguments: Some(":\"rust\"}".into()),
                    },
                }],
                ..StreamDelta::default()
            },
        );

        // The second SetToolCalls folds into the first's result, so the
        // arguments survive across mutation snapshots
        let turn = transcript.turn_by_id(id).unwrap();
        assert_eq!(turn.tool_calls.len(), 1);
        assert_eq!(turn.tool_calls[0].name, "search");
        assert_eq!(turn.tool_calls[0].arguments, "{\"q\":\"rust\"}");
    }

    #[test]
    fn delta_for_removed_turn_is_dropped() {
        let (mut transcript, id) = transcript_with_placeholder();
        transcript.remove_by_id(id);

        assert!(mutations_for_delta(&transcript, id, &content_delta("late")).is_empty());
        assert!(transcript.is_empty());
    }
}
