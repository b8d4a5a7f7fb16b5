//! Text-to-speech (TTS) processing
//!
//! Synthesis goes through a cloud API; the voice is resolved once at
//! startup, either explicitly from configuration or by the priority-keyword
//! heuristic over the service's voice catalog. All speaking funnels through
//! [`VoiceOutput`], which serializes callers behind a lock so interleaved
//! requests cannot corrupt playback.

use std::sync::Mutex;
use std::time::Duration;

use crate::config::TtsConfig;
use crate::voice::AudioPlayback;
use crate::{Error, Result};

/// HTTP timeout for a single synthesis request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Voice picked when nothing is configured and no catalog is available
const DEFAULT_VOICE: &str = "alloy";

/// Preferred voice keywords, in order
const VOICE_PRIORITIES: &[&str] = &[
    "samantha", "eva", "zira", "cortana", "hazel", "amy", "emma", "female",
];

/// Synthesizes speech from text
pub trait SpeechSynthesizer: Send {
    /// Synthesize text, returning MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Entry in the voice catalog response
#[derive(serde::Deserialize)]
struct VoiceInfo {
    name: String,
}

/// Voice catalog response
#[derive(serde::Deserialize)]
struct VoicesResponse {
    voices: Vec<VoiceInfo>,
}

/// Synthesizes speech through a cloud TTS API
pub struct CloudSynthesizer {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    voice: String,
    speed: f32,
}

impl CloudSynthesizer {
    /// Create a synthesizer, resolving the voice once
    ///
    /// An explicitly configured voice wins; otherwise the catalog (when an
    /// endpoint is configured) is scanned with [`select_voice`]; otherwise
    /// the service default is used.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &TtsConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Tts(format!("failed to build HTTP client: {e}")))?;

        let mut synthesizer = Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            voice: DEFAULT_VOICE.to_string(),
            speed: config.speed,
        };

        if let Some(voice) = &config.voice {
            synthesizer.voice.clone_from(voice);
            tracing::info!(voice = %synthesizer.voice, "using configured voice");
        } else if let Some(voices_endpoint) = &config.voices_endpoint {
            match synthesizer.list_voices(voices_endpoint) {
                Ok(available) => {
                    if let Some(voice) = select_voice(&available, VOICE_PRIORITIES) {
                        synthesizer.voice = voice.to_string();
                        tracing::info!(voice = %synthesizer.voice, "selected preferred voice");
                    } else {
                        tracing::warn!(
                            voices = available.len(),
                            fallback = DEFAULT_VOICE,
                            "no preferred voice found"
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, fallback = DEFAULT_VOICE, "voice catalog unavailable");
                }
            }
        }

        Ok(synthesizer)
    }

    /// The resolved voice
    #[must_use]
    pub fn voice(&self) -> &str {
        &self.voice
    }

    /// Fetch the voice catalog from the service
    fn list_voices(&self, endpoint: &str) -> Result<Vec<String>> {
        let mut request = self.client.get(endpoint);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request.send()?;
        let status = response.status();

        if !status.is_success() {
            return Err(Error::Tts(format!("voice catalog error {status}")));
        }

        let catalog: VoicesResponse = response.json()?;
        Ok(catalog.voices.into_iter().map(|v| v.name).collect())
    }
}

impl SpeechSynthesizer for CloudSynthesizer {
    fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let response = builder.send()?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::Tts(format!("TTS API error {status}: {body}")));
        }

        let audio = response.bytes()?;
        Ok(audio.to_vec())
    }
}

/// Pick the first available voice matching the priority keyword list
#[must_use]
pub fn select_voice<'a>(available: &'a [String], priorities: &[&str]) -> Option<&'a str> {
    for keyword in priorities {
        for voice in available {
            if voice.to_lowercase().contains(keyword) {
                return Some(voice);
            }
        }
    }
    None
}

/// Lock-guarded voice output
///
/// The single shared speech engine; `speak` is the only entry point, so
/// concurrent callers (wake acknowledgement vs. response speech) are
/// serialized and playback state cannot interleave.
pub struct VoiceOutput {
    inner: Mutex<VoiceInner>,
}

struct VoiceInner {
    synthesizer: Box<dyn SpeechSynthesizer>,
    playback: AudioPlayback,
    volume: f32,
}

impl VoiceOutput {
    /// Create a voice output around a synthesizer and playback device
    #[must_use]
    pub fn new(synthesizer: Box<dyn SpeechSynthesizer>, playback: AudioPlayback, volume: f32) -> Self {
        Self {
            inner: Mutex::new(VoiceInner {
                synthesizer,
                playback,
                volume,
            }),
        }
    }

    /// Speak text, blocking until playback completes
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    pub fn speak(&self, text: &str) -> Result<()> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| Error::Tts("voice engine lock poisoned".to_string()))?;

        tracing::info!(text, "speaking");
        let audio = inner.synthesizer.synthesize(text)?;
        inner.playback.play_mp3(&audio, inner.volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn select_voice_follows_priority_order() {
        let available = catalog(&["Brian", "Microsoft Zira Desktop", "Samantha Premium"]);

        // "samantha" outranks "zira" even though zira appears first
        assert_eq!(
            select_voice(&available, VOICE_PRIORITIES),
            Some("Samantha Premium")
        );
    }

    #[test]
    fn select_voice_falls_through_to_generic_keyword() {
        let available = catalog(&["Brian", "Generic Female Voice 2"]);

        assert_eq!(
            select_voice(&available, VOICE_PRIORITIES),
            Some("Generic Female Voice 2")
        );
    }

    #[test]
    fn select_voice_returns_none_when_nothing_matches() {
        let available = catalog(&["Brian", "Daniel"]);
        assert_eq!(select_voice(&available, VOICE_PRIORITIES), None);
    }

    #[test]
    fn select_voice_is_case_insensitive() {
        let available = catalog(&["ZIRA"]);
        assert_eq!(select_voice(&available, VOICE_PRIORITIES), Some("ZIRA"));
    }
}
