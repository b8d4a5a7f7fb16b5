//! Configuration management for the Chime assistant
//!
//! Settings come from three layers: built-in defaults mirroring the tuned
//! values the assistant shipped with, an optional TOML file in the XDG config
//! directory, and `CHIME_*` environment variable overrides.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default wake phrase
pub const DEFAULT_WAKE_PHRASE: &str = "hey chime";

/// Accepted phonetic/typo variations of the wake phrase
const DEFAULT_WAKE_VARIATIONS: &[&str] = &["hi chime", "hello chime", "hey chimes", "hey time"];

/// Chime assistant configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Spoken name of the assistant
    pub assistant_name: String,

    /// Wake word detection tuning
    pub detection: DetectionConfig,

    /// Capture settings for the command that follows a wake
    pub command: ListenSettings,

    /// Speech-to-text service settings
    pub stt: SttConfig,

    /// Text-to-speech service settings
    pub tts: TtsConfig,
}

/// Wake word detection configuration
///
/// Immutable once constructed; owned by the detection loop for the lifetime
/// of the assistant.
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Base wake phrase (lowercase)
    pub wake_phrase: String,

    /// Accepted phrase variations (misheard/misspelled forms)
    pub variations: Vec<String>,

    /// Minimum RMS energy treated as speech onset; calibration raises this
    /// floor based on measured ambient noise
    pub energy_threshold: f32,

    /// Multiplier applied to the ambient RMS during calibration
    pub dynamic_energy_ratio: f32,

    /// Trailing silence that ends a captured phrase
    pub pause_threshold: Duration,

    /// Minimum voiced duration for a capture to count as a phrase
    pub phrase_threshold: Duration,

    /// Ambient noise measurement window, run once per detection session
    pub calibration: Duration,

    /// Per-attempt wait for speech onset
    pub listen_timeout: Duration,

    /// Maximum length of a captured wake utterance
    pub phrase_time_limit: Duration,

    /// Failed-attempt budget per detection session
    pub max_retries: u32,

    /// Give up when no capture succeeds for this long
    pub inactivity_timeout: Duration,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            wake_phrase: DEFAULT_WAKE_PHRASE.to_string(),
            variations: DEFAULT_WAKE_VARIATIONS
                .iter()
                .map(ToString::to_string)
                .collect(),
            energy_threshold: 0.03,
            dynamic_energy_ratio: 1.5,
            pause_threshold: Duration::from_millis(600),
            phrase_threshold: Duration::from_millis(300),
            calibration: Duration::from_secs(1),
            listen_timeout: Duration::from_secs(1),
            phrase_time_limit: Duration::from_millis(1500),
            max_retries: 50,
            inactivity_timeout: Duration::from_secs(60),
        }
    }
}

/// Capture settings for a single listen
#[derive(Debug, Clone)]
pub struct ListenSettings {
    /// Wait for speech onset
    pub timeout: Duration,

    /// Maximum phrase length
    pub phrase_time_limit: Duration,

    /// Trailing silence that ends the phrase
    pub pause_threshold: Duration,
}

impl Default for ListenSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            phrase_time_limit: Duration::from_secs(10),
            pause_threshold: Duration::from_millis(800),
        }
    }
}

/// Speech-to-text service settings
#[derive(Debug, Clone)]
pub struct SttConfig {
    /// Transcription endpoint URL
    pub endpoint: String,

    /// API key (from `CHIME_STT_API_KEY` or `OPENAI_API_KEY`)
    pub api_key: Option<String>,

    /// Model identifier sent to the service
    pub model: String,

    /// Optional language hint (e.g. "en")
    pub language: Option<String>,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/audio/transcriptions".to_string(),
            api_key: None,
            model: "whisper-1".to_string(),
            language: Some("en".to_string()),
        }
    }
}

/// Text-to-speech service settings
#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// Synthesis endpoint URL
    pub endpoint: String,

    /// Optional voice catalog endpoint; when set, the startup voice
    /// selection heuristic runs over the returned names
    pub voices_endpoint: Option<String>,

    /// API key (from `CHIME_TTS_API_KEY` or `OPENAI_API_KEY`)
    pub api_key: Option<String>,

    /// Model identifier sent to the service
    pub model: String,

    /// Explicit voice; overrides the selection heuristic
    pub voice: Option<String>,

    /// Speech rate multiplier (0.25 to 4.0)
    pub speed: f32,

    /// Playback volume gain (0.0 to 1.0)
    pub volume: f32,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/audio/speech".to_string(),
            voices_endpoint: None,
            api_key: None,
            model: "tts-1".to_string(),
            voice: None,
            speed: 1.0,
            volume: 0.9,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assistant_name: "Chime".to_string(),
            detection: DetectionConfig::default(),
            command: ListenSettings::default(),
            stt: SttConfig::default(),
            tts: TtsConfig::default(),
        }
    }
}

/// On-disk representation of the config file
///
/// Every field is optional; missing values fall back to defaults. Durations
/// are stored as seconds.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Spoken name of the assistant
    pub assistant_name: Option<String>,

    /// Wake phrase
    pub wake_phrase: Option<String>,

    /// Accepted wake phrase variations
    pub wake_variations: Option<Vec<String>>,

    /// Failed-attempt budget per detection session
    pub max_retries: Option<u32>,

    /// Inactivity timeout in seconds
    pub inactivity_timeout_secs: Option<f64>,

    /// STT endpoint URL
    pub stt_endpoint: Option<String>,

    /// STT model identifier
    pub stt_model: Option<String>,

    /// Language hint for transcription
    pub language: Option<String>,

    /// TTS endpoint URL
    pub tts_endpoint: Option<String>,

    /// TTS model identifier
    pub tts_model: Option<String>,

    /// Explicit TTS voice
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f32>,

    /// Playback volume gain
    pub tts_volume: Option<f32>,
}

/// Return the config file path (`~/.config/chime/config.toml` on Linux)
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "chime", "chime")
        .map(|d| d.config_dir().join("config.toml"))
}

/// Load the config file if present, or defaults otherwise
#[must_use]
pub fn load_config_file() -> ConfigFile {
    let Some(path) = config_file_path() else {
        return ConfigFile::default();
    };

    if !path.exists() {
        return ConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(file) => {
                tracing::debug!(path = %path.display(), "loaded config file");
                file
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                ConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read config file");
            ConfigFile::default()
        }
    }
}

/// Write a config file, creating the parent directory if needed
///
/// # Errors
///
/// Returns error if the path cannot be determined or written
pub fn save_config_file(file: &ConfigFile) -> Result<PathBuf> {
    let path = config_file_path()
        .ok_or_else(|| Error::Config("could not determine config directory".to_string()))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = toml::to_string_pretty(file)
        .map_err(|e| Error::Config(format!("failed to serialize config: {e}")))?;
    std::fs::write(&path, content)?;

    Ok(path)
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns error if an override value cannot be parsed
    pub fn load() -> Result<Self> {
        Self::from_file(&load_config_file())
    }

    /// Build configuration from a parsed file plus environment overrides
    ///
    /// # Errors
    ///
    /// Returns error if an override value cannot be parsed
    pub fn from_file(file: &ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(name) = &file.assistant_name {
            config.assistant_name.clone_from(name);
        }
        if let Some(phrase) = &file.wake_phrase {
            config.detection.wake_phrase = phrase.to_lowercase();
        }
        if let Some(variations) = &file.wake_variations {
            config.detection.variations = variations.iter().map(|v| v.to_lowercase()).collect();
        }
        if let Some(retries) = file.max_retries {
            config.detection.max_retries = retries;
        }
        if let Some(secs) = file.inactivity_timeout_secs {
            config.detection.inactivity_timeout = duration_from_secs(secs, "inactivity_timeout")?;
        }
        if let Some(endpoint) = &file.stt_endpoint {
            config.stt.endpoint.clone_from(endpoint);
        }
        if let Some(model) = &file.stt_model {
            config.stt.model.clone_from(model);
        }
        if let Some(language) = &file.language {
            config.stt.language = Some(language.clone());
        }
        if let Some(endpoint) = &file.tts_endpoint {
            config.tts.endpoint.clone_from(endpoint);
        }
        if let Some(model) = &file.tts_model {
            config.tts.model.clone_from(model);
        }
        if let Some(voice) = &file.tts_voice {
            config.tts.voice = Some(voice.clone());
        }
        if let Some(speed) = file.tts_speed {
            config.tts.speed = speed;
        }
        if let Some(volume) = file.tts_volume {
            config.tts.volume = volume.clamp(0.0, 1.0);
        }

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply `CHIME_*` environment overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(phrase) = std::env::var("CHIME_WAKE_PHRASE") {
            self.detection.wake_phrase = phrase.to_lowercase();
        }
        if let Ok(retries) = std::env::var("CHIME_MAX_RETRIES") {
            self.detection.max_retries = retries
                .parse()
                .map_err(|_| Error::Config(format!("invalid CHIME_MAX_RETRIES: {retries}")))?;
        }
        if let Ok(secs) = std::env::var("CHIME_INACTIVITY_TIMEOUT") {
            let value: f64 = secs
                .parse()
                .map_err(|_| Error::Config(format!("invalid CHIME_INACTIVITY_TIMEOUT: {secs}")))?;
            self.detection.inactivity_timeout = duration_from_secs(value, "inactivity_timeout")?;
        }
        if let Ok(endpoint) = std::env::var("CHIME_STT_URL") {
            self.stt.endpoint = endpoint;
        }
        if let Ok(endpoint) = std::env::var("CHIME_TTS_URL") {
            self.tts.endpoint = endpoint;
        }
        if let Ok(voice) = std::env::var("CHIME_TTS_VOICE") {
            self.tts.voice = Some(voice);
        }

        // API keys: service-specific var first, then the provider default
        self.stt.api_key = std::env::var("CHIME_STT_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .ok();
        self.tts.api_key = std::env::var("CHIME_TTS_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .ok();

        Ok(())
    }
}

/// Convert a positive seconds value into a `Duration`
fn duration_from_secs(secs: f64, field: &str) -> Result<Duration> {
    if secs.is_finite() && secs > 0.0 {
        Ok(Duration::from_secs_f64(secs))
    } else {
        Err(Error::Config(format!("{field} must be positive, got {secs}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_detection_matches_shipped_tuning() {
        let detection = DetectionConfig::default();

        assert_eq!(detection.wake_phrase, "hey chime");
        assert_eq!(detection.max_retries, 50);
        assert_eq!(detection.listen_timeout, Duration::from_secs(1));
        assert_eq!(detection.inactivity_timeout, Duration::from_secs(60));
        assert!(detection.variations.contains(&"hi chime".to_string()));
    }

    #[test]
    fn file_values_override_defaults() {
        let file = ConfigFile {
            wake_phrase: Some("Hey Aria".to_string()),
            max_retries: Some(10),
            inactivity_timeout_secs: Some(30.0),
            tts_volume: Some(2.0),
            ..ConfigFile::default()
        };

        let config = Config::from_file(&file).unwrap();

        assert_eq!(config.detection.wake_phrase, "hey aria");
        assert_eq!(config.detection.max_retries, 10);
        assert_eq!(config.detection.inactivity_timeout, Duration::from_secs(30));
        // Volume is clamped to unity gain
        assert!((config.tts.volume - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn rejects_non_positive_timeout() {
        let file = ConfigFile {
            inactivity_timeout_secs: Some(-1.0),
            ..ConfigFile::default()
        };

        assert!(Config::from_file(&file).is_err());
    }

    #[test]
    fn config_file_round_trip() {
        let file = ConfigFile {
            assistant_name: Some("Chime".to_string()),
            wake_variations: Some(vec!["hi chime".to_string()]),
            tts_speed: Some(1.2),
            ..ConfigFile::default()
        };

        let serialized = toml::to_string_pretty(&file).unwrap();
        let parsed: ConfigFile = toml::from_str(&serialized).unwrap();

        assert_eq!(parsed.assistant_name.as_deref(), Some("Chime"));
        assert_eq!(parsed.wake_variations.unwrap(), vec!["hi chime"]);
    }
}
