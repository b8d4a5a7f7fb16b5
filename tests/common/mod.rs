//! Shared test utilities
//!
//! Scripted audio/STT doubles so detection sessions run without hardware.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use chime_assistant::Result;
use chime_assistant::config::DetectionConfig;
use chime_assistant::voice::{
    AudioClip, AudioSource, ListenError, ListenParams, SAMPLE_RATE, SpeechToText, Transcription,
};

/// One scripted listen attempt
pub enum ListenStep {
    /// Capture succeeds
    Clip,
    /// Attempt times out (silence)
    Timeout,
}

/// Audio source that replays a script; exhausted scripts keep timing out
pub struct ScriptedSource {
    steps: VecDeque<ListenStep>,
    /// Number of calibrate calls observed
    pub calibrations: u32,
    /// Wall-clock cost of each listen attempt
    pub listen_delay: Duration,
}

impl ScriptedSource {
    #[must_use]
    pub fn new(steps: Vec<ListenStep>) -> Self {
        Self {
            steps: steps.into(),
            calibrations: 0,
            listen_delay: Duration::ZERO,
        }
    }

    /// A short clip of non-silence
    #[must_use]
    pub fn clip() -> AudioClip {
        AudioClip {
            samples: vec![0.1; SAMPLE_RATE as usize / 10],
            sample_rate: SAMPLE_RATE,
        }
    }
}

impl AudioSource for ScriptedSource {
    fn calibrate(&mut self, _window: Duration) -> Result<()> {
        self.calibrations += 1;
        Ok(())
    }

    fn listen(&mut self, _params: &ListenParams) -> std::result::Result<AudioClip, ListenError> {
        if !self.listen_delay.is_zero() {
            std::thread::sleep(self.listen_delay);
        }
        match self.steps.pop_front() {
            Some(ListenStep::Clip) => Ok(Self::clip()),
            Some(ListenStep::Timeout) | None => Err(ListenError::Timeout),
        }
    }
}

/// Audio source whose device is gone
pub struct BrokenSource;

impl AudioSource for BrokenSource {
    fn calibrate(&mut self, _window: Duration) -> Result<()> {
        Err(chime_assistant::Error::Audio("device unplugged".to_string()))
    }

    fn listen(&mut self, _params: &ListenParams) -> std::result::Result<AudioClip, ListenError> {
        Err(ListenError::Timeout)
    }
}

/// Transcriber that replays a script; exhausted scripts are unintelligible
pub struct ScriptedStt {
    outcomes: Mutex<VecDeque<Transcription>>,
}

impl ScriptedStt {
    #[must_use]
    pub fn new(outcomes: Vec<Transcription>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
        }
    }

    /// Shorthand for a sequence of recognized transcripts
    #[must_use]
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(
            texts
                .iter()
                .map(|t| Transcription::Text((*t).to_string()))
                .collect(),
        )
    }
}

impl SpeechToText for ScriptedStt {
    fn transcribe(&self, _clip: &AudioClip) -> Transcription {
        self.outcomes
            .lock()
            .expect("stt script lock")
            .pop_front()
            .unwrap_or(Transcription::Unintelligible)
    }
}

/// Detection config with test-friendly timings
#[must_use]
pub fn test_detection_config() -> DetectionConfig {
    DetectionConfig {
        wake_phrase: "hey chime".to_string(),
        variations: vec!["hi chime".to_string()],
        calibration: Duration::ZERO,
        listen_timeout: Duration::from_millis(10),
        phrase_time_limit: Duration::from_millis(20),
        max_retries: 3,
        inactivity_timeout: Duration::from_secs(60),
        ..DetectionConfig::default()
    }
}
