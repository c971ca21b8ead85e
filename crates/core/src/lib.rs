//! # Denkitsu Core
//!
//! Domain types, traits, and error definitions for the Denkitsu chat
//! pipeline. This crate has **zero framework dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator is defined as a trait here. Implementations live in
//! their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub collaborators
//! - Clean dependency graph (all crates depend inward on core)

pub mod client;
pub mod error;
pub mod mutation;
pub mod notify;
pub mod transcribe;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use client::{
    AtomicResponse, ChatClient, ChatRequest, Credentials, NextAction, StreamDelta, StreamEvent,
    ToolCallDelta, WireMessage,
};
pub use error::{Error, Result, TransportError};
pub use mutation::TranscriptMutation;
pub use notify::{Notifier, Severity};
pub use transcribe::{AudioClip, Transcriber};
pub use turn::{
    ContentPart, ConversationTurn, RoutingInfo, Role, ToolCallFragment, Transcript, TurnContent,
    TurnId,
};
