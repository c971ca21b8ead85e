//! HTTP transport for the Denkitsu chat pipeline.
//!
//! Implements the [`denkitsu_core::ChatClient`] trait against the Denkitsu
//! backend (an OpenAI-compatible chat-completion proxy that adds agent
//! routing directives), and the [`denkitsu_core::Transcriber`] trait against
//! an OpenAI-compatible `/audio/transcriptions` endpoint.

pub mod http;
pub mod transcriber;

pub use http::HttpChatClient;
pub use transcriber::HttpTranscriber;
