use thiserror::Error;

/// Failure talking to the language-detection service.
///
/// Never surfaced to the caller: the router treats it as "no vote this turn"
/// and still routes the utterance through the fallback path.
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("detection request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("detection service returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed detection response: {0}")]
    Malformed(String),
}

/// Failure talking to a transcription backend.
///
/// Recovered locally by a single retry against the sibling adapter; if both
/// fail, the router returns an empty transcript instead of an error.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transcription request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("transcription service returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed transcription response: {0}")]
    Malformed(String),
}
