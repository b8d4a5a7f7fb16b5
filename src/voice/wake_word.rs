//! Wake word detection
//!
//! Repeatedly captures short clips, transcribes them, and tests the
//! transcript against the configured wake phrase until a match is heard, the
//! retry budget runs out, or the inactivity window elapses.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::config::DetectionConfig;
use crate::events::{EventSender, UiEvent};
use crate::voice::capture::{AudioSource, ListenParams};
use crate::voice::stt::{SpeechToText, Transcription};

/// Matches transcripts against the wake phrase and its known variations
///
/// Pure function over two word lists: identical inputs always yield the
/// identical result.
#[derive(Debug, Clone)]
pub struct PhraseMatcher {
    variations: Vec<String>,
}

impl PhraseMatcher {
    /// Create a matcher for a base phrase plus accepted variations
    #[must_use]
    pub fn new(phrase: &str, variations: &[String]) -> Self {
        let mut all = Vec::with_capacity(variations.len() + 1);
        all.push(phrase.trim().to_lowercase());
        for variation in variations {
            let variation = variation.trim().to_lowercase();
            if !variation.is_empty() && !all.contains(&variation) {
                all.push(variation);
            }
        }

        Self { variations: all }
    }

    /// Test a transcript against every variation
    ///
    /// Two tiers: a word-set match that tolerates one extra or missing
    /// filler word (order-independent), then a whitespace-stripped substring
    /// fallback that tolerates misheard runs ("heychime" inside
    /// "heychimeplease"). Misspellings outside the variation list do not
    /// match.
    #[must_use]
    pub fn matches(&self, transcript: &str) -> bool {
        let transcript = transcript.to_lowercase();
        let transcript_words: Vec<&str> = transcript.split_whitespace().collect();

        for variation in &self.variations {
            let variation_words: Vec<&str> = variation.split_whitespace().collect();
            let word_count_diff = transcript_words.len().abs_diff(variation_words.len());

            if word_count_diff <= 1
                && variation_words.iter().all(|w| transcript_words.contains(w))
            {
                return true;
            }
        }

        let stripped: String = transcript.split_whitespace().collect();
        self.variations.iter().any(|variation| {
            let variation_stripped: String = variation.split_whitespace().collect();
            !variation_stripped.is_empty() && stripped.contains(&variation_stripped)
        })
    }

    /// All phrases the matcher accepts (base phrase first)
    #[must_use]
    pub fn variations(&self) -> &[String] {
        &self.variations
    }
}

/// Terminal outcome of one detection session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionOutcome {
    /// Wake phrase heard; the wake event fired
    Detected,

    /// Failed-attempt budget exhausted
    Exhausted,

    /// No successful capture within the inactivity window
    TimedOut,

    /// External stop observed at an iteration boundary
    Stopped,

    /// Audio device failed; session abandoned
    DeviceFailed,
}

impl DetectionOutcome {
    /// Whether the wake phrase was heard
    #[must_use]
    pub const fn is_detected(self) -> bool {
        matches!(self, Self::Detected)
    }
}

/// Runs wake word detection sessions
///
/// Owns the immutable [`DetectionConfig`]; per-session state (retry counter,
/// last-activity instant) lives inside [`detect`](Self::detect) and is
/// discarded on return.
pub struct WakeWordDetector {
    config: DetectionConfig,
    matcher: PhraseMatcher,
}

impl WakeWordDetector {
    /// Create a detector from configuration
    #[must_use]
    pub fn new(config: DetectionConfig) -> Self {
        let matcher = PhraseMatcher::new(&config.wake_phrase, &config.variations);
        tracing::debug!(phrases = ?matcher.variations(), "wake word detector initialized");
        Self { config, matcher }
    }

    /// The phrase matcher in use
    #[must_use]
    pub const fn matcher(&self) -> &PhraseMatcher {
        &self.matcher
    }

    /// The detection configuration
    #[must_use]
    pub const fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Run one detection session until a terminal outcome
    ///
    /// Calibrates the source exactly once, then cycles
    /// listen → transcribe → match. A silent or unintelligible attempt and a
    /// transcription service failure each consume one retry; a transcript
    /// that simply does not match consumes none. The inactivity window is
    /// measured from the last successful capture, regardless of what
    /// transcription made of it. The stop flag is honored at iteration
    /// boundaries only, so a stop can lag by up to one listen timeout.
    ///
    /// On a match the wake event fires exactly once, then the session
    /// returns. Collaborator failures never escape this function.
    pub fn detect<S, T>(
        &self,
        source: &mut S,
        stt: &T,
        running: &AtomicBool,
        events: &EventSender,
    ) -> DetectionOutcome
    where
        S: AudioSource + ?Sized,
        T: SpeechToText + ?Sized,
    {
        if let Err(e) = source.calibrate(self.config.calibration) {
            tracing::error!(error = %e, "ambient noise calibration failed");
            return DetectionOutcome::DeviceFailed;
        }

        let listen_params = ListenParams::from(&self.config);
        let mut retry_count: u32 = 0;
        let mut last_activity = Instant::now();

        tracing::info!(phrase = %self.config.wake_phrase, "listening for wake word");

        loop {
            if !running.load(Ordering::Relaxed) {
                tracing::debug!("stop requested");
                return DetectionOutcome::Stopped;
            }
            if retry_count >= self.config.max_retries {
                tracing::info!(retries = retry_count, "retry budget exhausted");
                return DetectionOutcome::Exhausted;
            }
            if last_activity.elapsed() > self.config.inactivity_timeout {
                tracing::info!("no capture within the inactivity window");
                return DetectionOutcome::TimedOut;
            }

            let clip = match source.listen(&listen_params) {
                Ok(clip) => clip,
                Err(e) => {
                    retry_count += 1;
                    tracing::trace!(error = %e, retry_count, "listen attempt failed");
                    continue;
                }
            };

            // A successful capture counts as activity whether or not the
            // transcription makes sense of it
            last_activity = Instant::now();

            match stt.transcribe(&clip) {
                Transcription::Text(transcript) => {
                    tracing::debug!(transcript = %transcript, "heard");

                    if self.matcher.matches(&transcript) {
                        tracing::info!(transcript = %transcript, "wake word detected");
                        events.send(UiEvent::WakeDetected);
                        return DetectionOutcome::Detected;
                    }
                    // Ordinary non-matching speech; no retry consumed
                }
                Transcription::Unintelligible => {
                    retry_count += 1;
                    tracing::trace!(retry_count, "unintelligible speech");
                }
                Transcription::ServiceUnavailable(reason) => {
                    retry_count += 1;
                    tracing::warn!(
                        reason = %reason,
                        retry_count,
                        "transcription service unavailable"
                    );
                }
            }
        }
    }
}
