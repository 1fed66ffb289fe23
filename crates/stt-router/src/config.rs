use serde::{Deserialize, Serialize};

/// Languages covered by the regional conformer backend (ISO 639 codes).
pub const DEFAULT_REGIONAL_LANGUAGES: &[&str] = &[
    "as", "bn", "brx", "doi", "gu", "hi", "kn", "kok", "ks", "mai", "ml", "mni", "mr", "ne", "or",
    "pa", "sa", "sat", "sd", "ta", "te", "ur",
];

/// Configuration for the language-routing STT router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Base URL of the general (broad-coverage) transcription service.
    pub general_url: String,
    /// Base URL of the regional transcription service.
    pub regional_url: String,
    /// Base URL of the language-detection service.
    pub detection_url: String,
    /// Curated set of regional language codes routed to the regional backend.
    pub regional_languages: Vec<String>,
    /// Number of detection votes required before locking the session language.
    pub quorum: usize,
    /// Fixed language override (e.g. "kn", "hi", "en"). None = auto-detect.
    ///
    /// When set, the session locks immediately at start and no detection
    /// calls are ever issued.
    pub language: Option<String>,
    /// Request pivot translation to English from the backends.
    pub translate_to_english: bool,
    /// Decoding strategy passed through to the regional backend.
    pub regional_decode_type: String,
    /// Decoding strategy passed through to the general backend.
    pub general_decode_type: String,
    /// Timeout for detection requests. Shorter than transcription since
    /// detection gates routing and must not stall the turn.
    pub detection_timeout_secs: u64,
    /// Timeout for general backend transcription requests.
    pub general_timeout_secs: u64,
    /// Timeout for regional backend transcription requests.
    pub regional_timeout_secs: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            general_url: "http://localhost:8003".to_string(),
            regional_url: "http://localhost:8002".to_string(),
            detection_url: "http://localhost:8002".to_string(),
            regional_languages: DEFAULT_REGIONAL_LANGUAGES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            quorum: 3,
            language: None,
            translate_to_english: true,
            regional_decode_type: "ctc".to_string(),
            general_decode_type: "default".to_string(),
            detection_timeout_secs: 10,
            general_timeout_secs: 30,
            regional_timeout_secs: 60,
        }
    }
}

impl RouterConfig {
    /// Returns true if `lang` belongs to the curated regional set.
    pub fn is_regional_language(&self, lang: &str) -> bool {
        self.regional_languages.iter().any(|l| l == lang)
    }
}
