//! # Denkitsu Pipeline
//!
//! The streaming chat / agent-orchestration pipeline: the engineering core
//! of Denkitsu. Owns the conversation transcript and drives the two-hop
//! agent-routing protocol over a [`denkitsu_core::ChatClient`]:
//!
//! 1. A routing pass (always atomic) asks the triage persona which agent
//!    should answer.
//! 2. A dispatched pass (streamed) produces the answer, folding deltas into
//!    a placeholder assistant turn as they arrive.
//!
//! Side-flows: voice transcription submission, prompt improvement, and
//! regenerate-last-response. Every failure is converted to a notification
//! at the orchestration boundary; callers only observe the busy flag
//! returning to false and the transcript's final state.

pub mod accumulator;
pub mod collector;
pub mod orchestrator;
pub mod router;

pub use orchestrator::ChatPipeline;
pub use router::{Attempt, DispatchState};
