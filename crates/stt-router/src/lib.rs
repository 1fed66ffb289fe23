//! Language-routing speech-to-text router.
//!
//! Given one utterance of audio at a time, the router normalizes it to mono
//! 16kHz PCM, detects the spoken language through an external detector,
//! commits to a language/backend pairing by majority vote once enough
//! detections have accumulated, and dispatches transcription to either the
//! regional or the general backend with a single sibling fallback on failure.

pub mod audio;
pub mod config;
pub mod detect;
pub mod error;
pub mod providers;
pub mod router;
pub mod vote;

pub use audio::{AudioFrame, NormalizedAudio, TARGET_SAMPLE_RATE, normalize};
pub use config::RouterConfig;
pub use detect::{DetectionVote, HttpDetectionClient, LanguageDetector};
pub use error::{DetectionError, ProviderError};
pub use providers::http::{HttpProviderAdapter, ProviderOptions, TranslateFlag};
pub use providers::{ProviderAdapter, TranscriptionResult};
pub use router::Router;
pub use vote::RoutingState;
