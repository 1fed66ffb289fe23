pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::audio::NormalizedAudio;
use crate::error::ProviderError;

/// Result of transcribing one utterance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub language: Option<String>,
    pub text: String,
}

impl TranscriptionResult {
    /// The "nothing heard" outcome: empty text, never an error.
    pub fn empty(language: Option<String>) -> Self {
        Self {
            language,
            text: String::new(),
        }
    }
}

/// Capability interface over one transcription backend.
///
/// The regional and general backends are two configured instances behind
/// this trait; the router only ever depends on the interface.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Transcribes one complete normalized utterance.
    async fn transcribe(
        &self,
        audio: &NormalizedAudio,
        language_hint: Option<&str>,
    ) -> Result<TranscriptionResult, ProviderError>;
}
