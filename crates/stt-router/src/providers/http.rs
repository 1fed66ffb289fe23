use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::{ProviderAdapter, TranscriptionResult};
use crate::audio::NormalizedAudio;
use crate::error::ProviderError;

/// How a backend is asked for pivot-language translation.
///
/// The conformer-style service takes a boolean `translate` field; the
/// whisper-style service takes `task=translate`. Off omits the field
/// entirely and the adapter keeps the source-language text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslateFlag {
    Off,
    /// Send `translate=true`.
    Flag,
    /// Send `task=translate`.
    Task,
}

impl TranslateFlag {
    fn requested(self) -> bool {
        self != Self::Off
    }

    /// The multipart field this flag contributes, if any.
    fn form_field(self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::Off => None,
            Self::Flag => Some(("translate", "true")),
            Self::Task => Some(("task", "translate")),
        }
    }
}

/// Per-instance options for [`HttpProviderAdapter`].
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    pub base_url: String,
    /// Backend-specific decoding strategy, passed through opaquely.
    pub decode_type: String,
    pub translate: TranslateFlag,
    pub timeout: Duration,
    /// Name used in logs only.
    pub name: &'static str,
}

/// Wire body of the transcription services.
#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    text: String,
    #[serde(default)]
    translated_text: Option<String>,
}

/// HTTP transcription backend adapter.
///
/// Both the regional and the general backend speak the same wire shape
/// (`POST {base_url}/transcribe`, multipart WAV + options), so one adapter
/// type covers both; which one a given instance talks to is a matter of
/// configuration, not type.
pub struct HttpProviderAdapter {
    options: ProviderOptions,
    client: OnceLock<reqwest::Client>,
}

impl HttpProviderAdapter {
    pub fn new(options: ProviderOptions) -> Self {
        Self {
            options,
            client: OnceLock::new(),
        }
    }

    // Connection pool is created on first use and reused for the rest of the
    // session; dropping the adapter releases it on every exit path.
    fn client(&self) -> &reqwest::Client {
        self.client.get_or_init(reqwest::Client::new)
    }

    fn build_form(
        &self,
        audio: &NormalizedAudio,
        language: &str,
    ) -> Result<reqwest::multipart::Form, ProviderError> {
        let file = reqwest::multipart::Part::bytes(audio.wav_bytes().to_vec())
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| ProviderError::Malformed(format!("mime: {}", e)))?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", file)
            .text("language", language.to_string())
            .text("decode_type", self.options.decode_type.clone());

        if let Some((field, value)) = self.options.translate.form_field() {
            form = form.text(field, value);
        }

        Ok(form)
    }
}

#[async_trait]
impl ProviderAdapter for HttpProviderAdapter {
    async fn transcribe(
        &self,
        audio: &NormalizedAudio,
        language_hint: Option<&str>,
    ) -> Result<TranscriptionResult, ProviderError> {
        let language = language_hint.unwrap_or("auto");
        let form = self.build_form(audio, language)?;

        debug!(
            backend = self.options.name,
            language,
            duration_secs = audio.duration_secs(),
            "Sending audio for transcription"
        );

        let start = std::time::Instant::now();
        let response = self
            .client()
            .post(format!("{}/transcribe", self.options.base_url))
            .multipart(form)
            .timeout(self.options.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status()));
        }

        let body = response.text().await?;
        let text = parse_transcribe_body(&body, self.options.translate.requested())?;

        info!(
            backend = self.options.name,
            language,
            elapsed_ms = start.elapsed().as_millis() as u64,
            chars = text.len(),
            "Transcription completed"
        );

        Ok(TranscriptionResult {
            language: language_hint.map(|s| s.to_string()),
            text,
        })
    }
}

/// Parses a transcription response body.
///
/// `translated_text` is preferred over `text` only when translation was
/// requested and the backend actually returned a non-empty translation.
fn parse_transcribe_body(body: &str, translation_requested: bool) -> Result<String, ProviderError> {
    let parsed: TranscribeResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Malformed(e.to_string()))?;

    if translation_requested {
        if let Some(translated) = parsed.translated_text {
            if !translated.is_empty() {
                return Ok(translated);
            }
        }
    }
    Ok(parsed.text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_text() {
        let body = r#"{"text": "ನಮಸ್ಕಾರ"}"#;
        assert_eq!(parse_transcribe_body(body, false).unwrap(), "ನಮಸ್ಕಾರ");
    }

    #[test]
    fn test_translated_text_preferred_when_requested() {
        let body = r#"{"text": "ನಮಸ್ಕಾರ", "translated_text": "hello"}"#;
        assert_eq!(parse_transcribe_body(body, true).unwrap(), "hello");
    }

    #[test]
    fn test_translated_text_ignored_when_not_requested() {
        let body = r#"{"text": "ನಮಸ್ಕಾರ", "translated_text": "hello"}"#;
        assert_eq!(parse_transcribe_body(body, false).unwrap(), "ನಮಸ್ಕಾರ");
    }

    #[test]
    fn test_missing_translation_falls_back_to_text() {
        let body = r#"{"text": "hello there"}"#;
        assert_eq!(parse_transcribe_body(body, true).unwrap(), "hello there");

        let body = r#"{"text": "hello there", "translated_text": ""}"#;
        assert_eq!(parse_transcribe_body(body, true).unwrap(), "hello there");
    }

    #[test]
    fn test_translate_flag_form_field() {
        // Off must omit the field: the whisper-shaped service defines no
        // `translate` field, only `task=translate` when translation is on.
        assert_eq!(TranslateFlag::Off.form_field(), None);
        assert_eq!(
            TranslateFlag::Flag.form_field(),
            Some(("translate", "true"))
        );
        assert_eq!(
            TranslateFlag::Task.form_field(),
            Some(("task", "translate"))
        );
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(
            parse_transcribe_body("<html>busy</html>", false),
            Err(ProviderError::Malformed(_))
        ));
        // Missing the required "text" field.
        assert!(matches!(
            parse_transcribe_body(r#"{"translated_text": "x"}"#, true),
            Err(ProviderError::Malformed(_))
        ));
    }
}
