use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::audio::NormalizedAudio;
use crate::error::DetectionError;

/// One per-utterance language classification.
#[derive(Debug, Clone)]
pub struct DetectionVote {
    pub language: String,
    pub confidence: f64,
    /// Whether the language belongs to the curated regional set.
    pub is_regional: bool,
}

/// Capability interface for per-utterance language identification.
#[async_trait]
pub trait LanguageDetector: Send + Sync {
    async fn detect(&self, audio: &NormalizedAudio) -> Result<DetectionVote, DetectionError>;
}

/// Wire body of the detection service. The `is_indian` field names the
/// service's own regional-set membership flag.
#[derive(Debug, Deserialize)]
struct DetectResponse {
    language: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    is_indian: bool,
}

/// HTTP language-identification client.
///
/// Posts the utterance WAV to `{base_url}/detect-language` with a bounded
/// timeout shorter than transcription, since detection gates routing and
/// must not stall the turn. The regional classification of the returned
/// language is decided against the set configured at startup; the service's
/// own flag is logged for comparison.
pub struct HttpDetectionClient {
    base_url: String,
    regional_languages: Arc<HashSet<String>>,
    timeout: Duration,
    client: OnceLock<reqwest::Client>,
}

impl HttpDetectionClient {
    pub fn new(
        base_url: impl Into<String>,
        regional_languages: Arc<HashSet<String>>,
        timeout: Duration,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            regional_languages,
            timeout,
            client: OnceLock::new(),
        }
    }

    // Connection pool is created on first use and reused for the rest of the
    // session; dropping the client releases it on every exit path.
    fn client(&self) -> &reqwest::Client {
        self.client.get_or_init(reqwest::Client::new)
    }
}

#[async_trait]
impl LanguageDetector for HttpDetectionClient {
    async fn detect(&self, audio: &NormalizedAudio) -> Result<DetectionVote, DetectionError> {
        let file = reqwest::multipart::Part::bytes(audio.wav_bytes().to_vec())
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| DetectionError::Malformed(format!("mime: {}", e)))?;
        let form = reqwest::multipart::Form::new().part("file", file);

        debug!(
            duration_secs = audio.duration_secs(),
            "Sending audio for language detection"
        );

        let response = self
            .client()
            .post(format!("{}/detect-language", self.base_url))
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DetectionError::Status(response.status()));
        }

        let body = response.text().await?;
        let vote = parse_detect_body(&body, &self.regional_languages)?;

        info!(
            language = %vote.language,
            confidence = vote.confidence,
            is_regional = vote.is_regional,
            "Language detected"
        );
        Ok(vote)
    }
}

/// Parses a detection response body and classifies the language against the
/// configured regional set.
fn parse_detect_body(
    body: &str,
    regional_languages: &HashSet<String>,
) -> Result<DetectionVote, DetectionError> {
    let parsed: DetectResponse =
        serde_json::from_str(body).map_err(|e| DetectionError::Malformed(e.to_string()))?;

    let is_regional = regional_languages.contains(&parsed.language);
    if is_regional != parsed.is_indian {
        debug!(
            language = %parsed.language,
            service_flag = parsed.is_indian,
            "Detection service regional flag disagrees with configured set"
        );
    }

    Ok(DetectionVote {
        language: parsed.language,
        confidence: parsed.confidence,
        is_regional,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regional_set() -> HashSet<String> {
        ["hi", "kn", "ta"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_detect_body_regional() {
        let body = r#"{"language": "kn", "confidence": 0.92, "is_indian": true}"#;
        let vote = parse_detect_body(body, &regional_set()).unwrap();
        assert_eq!(vote.language, "kn");
        assert!((vote.confidence - 0.92).abs() < 1e-9);
        assert!(vote.is_regional);
    }

    #[test]
    fn test_parse_detect_body_general() {
        let body = r#"{"language": "en", "confidence": 0.7, "is_indian": false}"#;
        let vote = parse_detect_body(body, &regional_set()).unwrap();
        assert_eq!(vote.language, "en");
        assert!(!vote.is_regional);
    }

    #[test]
    fn test_configured_set_overrides_service_flag() {
        // The service claims "de" is regional; the configured set decides.
        let body = r#"{"language": "de", "confidence": 0.5, "is_indian": true}"#;
        let vote = parse_detect_body(body, &regional_set()).unwrap();
        assert!(!vote.is_regional);
    }

    #[test]
    fn test_parse_detect_body_missing_optional_fields() {
        let body = r#"{"language": "hi"}"#;
        let vote = parse_detect_body(body, &regional_set()).unwrap();
        assert_eq!(vote.language, "hi");
        assert_eq!(vote.confidence, 0.0);
        assert!(vote.is_regional);
    }

    #[test]
    fn test_parse_detect_body_malformed() {
        let err = parse_detect_body("not json", &regional_set()).unwrap_err();
        assert!(matches!(err, DetectionError::Malformed(_)));

        let err = parse_detect_body(r#"{"confidence": 0.5}"#, &regional_set()).unwrap_err();
        assert!(matches!(err, DetectionError::Malformed(_)));
    }
}
