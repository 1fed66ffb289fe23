use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::audio::{AudioFrame, NormalizedAudio, normalize};
use crate::config::RouterConfig;
use crate::detect::{HttpDetectionClient, LanguageDetector};
use crate::providers::http::{HttpProviderAdapter, ProviderOptions, TranslateFlag};
use crate::providers::{ProviderAdapter, TranscriptionResult};
use crate::vote::RoutingState;

/// Per-session language-routing orchestrator.
///
/// One router is created per call session and owns that session's routing
/// state. Utterances are resolved strictly sequentially (`&mut self`), so no
/// interior locking is needed; a future concurrent design would have to turn
/// the lock transition into a compare-and-set region.
///
/// Every path returns a [`TranscriptionResult`]: empty audio and total
/// backend failure both come back as empty text, never as an error, because
/// losing one utterance must never end the call.
pub struct Router {
    detector: Arc<dyn LanguageDetector>,
    regional: Arc<dyn ProviderAdapter>,
    general: Arc<dyn ProviderAdapter>,
    state: RoutingState,
    quorum: usize,
}

impl Router {
    /// Creates a router over explicit detector/adapter instances.
    ///
    /// A fixed-language config locks the session immediately; no detection
    /// call is ever issued for its lifetime.
    pub fn new(
        config: &RouterConfig,
        detector: Arc<dyn LanguageDetector>,
        regional: Arc<dyn ProviderAdapter>,
        general: Arc<dyn ProviderAdapter>,
    ) -> Self {
        let state = match &config.language {
            Some(lang) => {
                let use_regional = config.is_regional_language(lang);
                info!(language = %lang, use_regional, "Fixed language mode");
                RoutingState::locked(lang.clone(), use_regional)
            }
            None => RoutingState::new(),
        };

        Self {
            detector,
            regional,
            general,
            state,
            quorum: config.quorum,
        }
    }

    /// Creates a router wired to the HTTP detection and transcription
    /// services named in the config.
    pub fn from_config(config: &RouterConfig) -> Self {
        let regional_set: Arc<HashSet<String>> =
            Arc::new(config.regional_languages.iter().cloned().collect());

        let detector = Arc::new(HttpDetectionClient::new(
            config.detection_url.clone(),
            regional_set,
            Duration::from_secs(config.detection_timeout_secs),
        ));

        let translate = |on: bool, flag: TranslateFlag| if on { flag } else { TranslateFlag::Off };
        let regional = Arc::new(HttpProviderAdapter::new(ProviderOptions {
            base_url: config.regional_url.clone(),
            decode_type: config.regional_decode_type.clone(),
            translate: translate(config.translate_to_english, TranslateFlag::Flag),
            timeout: Duration::from_secs(config.regional_timeout_secs),
            name: "regional",
        }));
        let general = Arc::new(HttpProviderAdapter::new(ProviderOptions {
            base_url: config.general_url.clone(),
            decode_type: config.general_decode_type.clone(),
            translate: translate(config.translate_to_english, TranslateFlag::Task),
            timeout: Duration::from_secs(config.general_timeout_secs),
            name: "general",
        }));

        Self::new(config, detector, regional, general)
    }

    /// The locked language, once the session has committed.
    pub fn locked_language(&self) -> Option<&str> {
        self.state.locked_language()
    }

    /// Whether the session is locked to the regional backend.
    pub fn uses_regional_backend(&self) -> bool {
        self.state.uses_regional_backend()
    }

    pub fn state(&self) -> &RoutingState {
        &self.state
    }

    /// Resolves one utterance: normalize, detect/vote while unlocked, and
    /// dispatch to a backend with a single sibling fallback.
    pub async fn transcribe_utterance(&mut self, frames: &[AudioFrame]) -> TranscriptionResult {
        let audio = match normalize(frames) {
            Ok(audio) => audio,
            Err(e) => {
                warn!(error = %e, "Audio normalization failed, returning empty transcript");
                return TranscriptionResult::empty(self.locked_language_owned());
            }
        };

        // Nothing heard is a normal conversational outcome, not an error.
        if audio.is_empty() {
            debug!("Empty utterance, skipping backends");
            return TranscriptionResult::empty(self.locked_language_owned());
        }

        // Steady state: the session has committed to one language/backend.
        if let RoutingState::Locked {
            language,
            use_regional,
        } = &self.state
        {
            let language = language.clone();
            let use_regional = *use_regional;
            return self
                .dispatch(use_regional, &audio, Some(&language))
                .await;
        }

        // Detection phase: ask for a vote, then route this utterance by its
        // own classification even before the session commits.
        match self.detector.detect(&audio).await {
            Ok(vote) => {
                self.state
                    .record_vote(&vote.language, vote.is_regional, self.quorum);

                if let RoutingState::Locked {
                    language,
                    use_regional,
                } = &self.state
                {
                    let language = language.clone();
                    let use_regional = *use_regional;
                    self.dispatch(use_regional, &audio, Some(&language)).await
                } else {
                    debug!(
                        language = %vote.language,
                        is_regional = vote.is_regional,
                        "Routing by live detection while unlocked"
                    );
                    self.dispatch(vote.is_regional, &audio, Some(&vote.language))
                        .await
                }
            }
            Err(e) => {
                // No vote this turn; route general-first with the usual
                // sibling fallback.
                warn!(error = %e, "Language detection failed, skipping vote");
                self.dispatch(false, &audio, None).await
            }
        }
    }

    fn locked_language_owned(&self) -> Option<String> {
        self.state.locked_language().map(|s| s.to_string())
    }

    /// Dispatches to the selected adapter, retrying exactly once against the
    /// sibling on failure. Both failing yields an empty transcript: bounded
    /// latency is preferred over exhaustive recovery on the live call path.
    async fn dispatch(
        &self,
        use_regional: bool,
        audio: &NormalizedAudio,
        language_hint: Option<&str>,
    ) -> TranscriptionResult {
        let (primary, sibling, primary_name, sibling_name) = if use_regional {
            (&self.regional, &self.general, "regional", "general")
        } else {
            (&self.general, &self.regional, "general", "regional")
        };

        match primary.transcribe(audio, language_hint).await {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    backend = primary_name,
                    fallback = sibling_name,
                    error = %e,
                    "Transcription backend failed, retrying sibling"
                );
                match sibling.transcribe(audio, language_hint).await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(
                            backend = sibling_name,
                            error = %e,
                            "Both transcription backends failed, returning empty transcript"
                        );
                        TranscriptionResult::empty(language_hint.map(|s| s.to_string()))
                    }
                }
            }
        }
    }
}
