pub mod normalizer;

pub use normalizer::{AudioFrame, NormalizedAudio, TARGET_SAMPLE_RATE, normalize};
