//! Voice processing module
//!
//! Handles audio capture, wake word detection, speech-to-text, and
//! lock-guarded voice output. The GUI is fed through `crate::events`.

mod capture;
mod playback;
mod stt;
mod tts;
mod wake_word;

pub use capture::{
    AudioClip, AudioSource, ListenError, ListenParams, Microphone, SAMPLE_RATE, calculate_energy,
    samples_to_wav,
};
pub use playback::AudioPlayback;
pub use stt::{CloudTranscriber, SpeechToText, Transcription};
pub use tts::{CloudSynthesizer, SpeechSynthesizer, VoiceOutput, select_voice};
pub use wake_word::{DetectionOutcome, PhraseMatcher, WakeWordDetector};
