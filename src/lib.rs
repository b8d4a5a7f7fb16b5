//! Chime - wake-word driven desktop voice assistant
//!
//! This library provides the core functionality for the Chime assistant:
//! - Wake word detection (ambient-noise calibration, retry/timeout bookkeeping,
//!   fuzzy phrase matching)
//! - Speech capture and cloud transcription
//! - Keyword-based command dispatch
//! - Lock-guarded voice output
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Collaborators (external)                │
//! │   GUI window  │  Tray icon  │  STT API  │  TTS API  │
//! └────────────────────┬────────────────────────────────┘
//!                      │ events / HTTP
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Chime core                           │
//! │  Wake Loop  │  Phrase Matcher  │  Dispatcher  │ TTS │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! The detection loop runs on a dedicated worker thread (audio streams are
//! not `Send`); the caller consumes [`events::UiEvent`]s asynchronously and
//! stops the loop through a shared running flag.

pub mod assistant;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod setup;
pub mod voice;

pub use assistant::{Assistant, AssistantHandle, Stopper};
pub use commands::{CommandDispatcher, CommandOutcome};
pub use config::{Config, DetectionConfig};
pub use error::{Error, Result};
pub use events::{EventSender, UiEvent};
pub use voice::{
    AudioClip, AudioSource, DetectionOutcome, ListenError, Microphone, PhraseMatcher,
    SpeechToText, Transcription, VoiceOutput, WakeWordDetector,
};
