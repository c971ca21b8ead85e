//! Transcription collaborator — speech-to-text for the audio side-flow.

use async_trait::async_trait;

use crate::error::{Error, Result};

/// A named audio recording submitted by the user.
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Display name (e.g., "memo.ogg") — shown in the optimistic
    /// "[Audio: name]" placeholder while transcription runs
    pub name: String,
    /// Raw audio bytes
    pub bytes: Vec<u8>,
    /// MIME type (e.g., "audio/ogg")
    pub content_type: String,
}

impl AudioClip {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bytes,
            content_type: content_type.into(),
        }
    }

    /// The bracketed placeholder label for this clip.
    pub fn placeholder_label(&self) -> String {
        format!("[Audio: {}]", self.name)
    }
}

/// The transcription service collaborator.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the clip to text. Fails with [`Error::Transcription`] on
    /// network/service failure.
    async fn transcribe(&self, clip: &AudioClip) -> Result<String>;
}

/// Helper for implementations translating a transport failure.
pub fn transcription_error(message: impl Into<String>) -> Error {
    Error::Transcription(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_label_is_bracketed() {
        let clip = AudioClip::new("memo.ogg", vec![1, 2, 3], "audio/ogg");
        assert_eq!(clip.placeholder_label(), "[Audio: memo.ogg]");
    }
}
