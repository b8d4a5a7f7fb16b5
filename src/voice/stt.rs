//! Speech-to-text (STT) processing
//!
//! Transcription failures are data, not exceptions: every call yields a
//! [`Transcription`] so the detection loop sees all branches at the call
//! site.

use std::time::Duration;

use crate::config::SttConfig;
use crate::voice::AudioClip;
use crate::{Error, Result};

/// HTTP timeout for a single transcription request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Response from a Whisper-style transcription API
#[derive(serde::Deserialize)]
struct TranscribeResponse {
    text: String,
}

/// Outcome of one transcription attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transcription {
    /// Recognized speech, lowercased transcript
    Text(String),

    /// The clip carried no recognizable speech
    Unintelligible,

    /// The service could not be reached or rejected the request
    ServiceUnavailable(String),
}

/// Converts a captured clip to text
///
/// The language hint, if any, is configured on the implementation.
pub trait SpeechToText {
    /// Transcribe one clip
    fn transcribe(&self, clip: &AudioClip) -> Transcription;
}

/// Transcribes speech through a cloud Whisper-compatible API
pub struct CloudTranscriber {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    language: Option<String>,
}

impl CloudTranscriber {
    /// Create a transcriber from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &SttConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Stt(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            language: config.language.clone(),
        })
    }

    /// Run the multipart upload and parse the transcript
    fn request(&self, wav: Vec<u8>) -> Result<String> {
        let part = reqwest::blocking::multipart::Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| Error::Stt(e.to_string()))?;

        let mut form = reqwest::blocking::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone());
        if let Some(lang) = &self.language {
            form = form.text("language", lang.clone());
        }

        let mut request = self.client.post(&self.endpoint).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request.send()?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::Stt(format!("transcription API error {status}: {body}")));
        }

        let result: TranscribeResponse = response.json()?;
        Ok(result.text)
    }
}

impl SpeechToText for CloudTranscriber {
    fn transcribe(&self, clip: &AudioClip) -> Transcription {
        let wav = match clip.to_wav() {
            Ok(wav) => wav,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode clip");
                return Transcription::ServiceUnavailable(e.to_string());
            }
        };

        tracing::debug!(
            audio_bytes = wav.len(),
            duration_ms = clip.duration().as_millis(),
            "starting transcription"
        );

        match self.request(wav) {
            Ok(text) => {
                let text = text.trim().to_lowercase();
                if text.is_empty() {
                    tracing::debug!("transcript empty, treating as unintelligible");
                    Transcription::Unintelligible
                } else {
                    tracing::info!(transcript = %text, "transcription complete");
                    Transcription::Text(text)
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "transcription request failed");
                Transcription::ServiceUnavailable(e.to_string())
            }
        }
    }
}
