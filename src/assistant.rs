//! Assistant orchestration
//!
//! Runs the wake → listen → dispatch → speak cycle on a dedicated worker
//! thread (audio streams are not `Send`), so the caller's event loop stays
//! responsive. The caller consumes [`UiEvent`]s and stops the worker through
//! a shared flag; a stop can lag by up to one listen timeout because the
//! flag is only checked at iteration boundaries.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::commands::{CommandDispatcher, CommandOutcome};
use crate::config::Config;
use crate::events::{EventSender, UiEvent};
use crate::voice::{
    AudioPlayback, AudioSource, CloudSynthesizer, CloudTranscriber, DetectionOutcome,
    ListenParams, Microphone, SpeechToText, Transcription, VoiceOutput, WakeWordDetector,
};
use crate::Result;

/// Pause before reopening the microphone after a device failure
const DEVICE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Spoken acknowledgement after a wake
const WAKE_ACK: &str = "Yes, I'm listening";

/// Spoken farewell when the user ends the session
const FAREWELL: &str = "Goodbye! Call me when you need me.";

/// The assistant core: detector, dispatcher, and voice collaborators
pub struct Assistant {
    config: Config,
    detector: WakeWordDetector,
    dispatcher: CommandDispatcher,
    stt: Box<dyn SpeechToText + Send>,
    voice: VoiceOutput,
}

impl Assistant {
    /// Build the assistant and its collaborators from configuration
    ///
    /// # Errors
    ///
    /// Returns error if a collaborator cannot be initialized (no audio
    /// output device, bad HTTP client configuration)
    pub fn new(config: Config) -> Result<Self> {
        let detector = WakeWordDetector::new(config.detection.clone());
        let dispatcher = CommandDispatcher::with_system_defaults(&config.assistant_name);
        let stt: Box<dyn SpeechToText + Send> = Box::new(CloudTranscriber::new(&config.stt)?);

        let synthesizer = Box::new(CloudSynthesizer::new(&config.tts)?);
        let playback = AudioPlayback::new()?;
        let voice = VoiceOutput::new(synthesizer, playback, config.tts.volume);

        Ok(Self {
            config,
            detector,
            dispatcher,
            stt,
            voice,
        })
    }

    /// Start the assistant on a dedicated worker thread
    ///
    /// Collaborators are constructed on the worker: the blocking HTTP
    /// clients and audio devices must not be touched from an async context.
    /// Initialization failures are logged and surface as an immediate
    /// [`UiEvent::Stopped`].
    ///
    /// # Errors
    ///
    /// Returns error if the thread cannot be spawned
    pub fn spawn(config: Config) -> Result<AssistantHandle> {
        let (events, receiver) = EventSender::channel();
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let join = std::thread::Builder::new()
            .name("chime-assistant".to_string())
            .spawn(move || match Self::new(config) {
                Ok(assistant) => assistant.run(&flag, &events),
                Err(e) => {
                    tracing::error!(error = %e, "assistant initialization failed");
                    events.send(UiEvent::Stopped);
                }
            })?;

        Ok(AssistantHandle {
            events: receiver,
            running,
            join: Some(join),
        })
    }

    /// Run detection sessions until stopped
    ///
    /// Every collaborator failure is logged and degraded; the loop keeps
    /// running until the flag clears or the user ends the session by voice.
    pub fn run(&self, running: &AtomicBool, events: &EventSender) {
        let ready_prompt = format!("Say '{}' to start", self.config.detection.wake_phrase);
        tracing::info!(phrase = %self.config.detection.wake_phrase, "assistant ready");
        events.status(ready_prompt.clone());

        while running.load(Ordering::Relaxed) {
            // The microphone is scoped to one detection session and released
            // on every exit path below
            let mut mic = match Microphone::open(
                self.config.detection.energy_threshold,
                self.config.detection.dynamic_energy_ratio,
            ) {
                Ok(mic) => mic,
                Err(e) => {
                    tracing::error!(error = %e, "microphone unavailable");
                    std::thread::sleep(DEVICE_RETRY_DELAY);
                    continue;
                }
            };

            match self
                .detector
                .detect(&mut mic, self.stt.as_ref(), running, events)
            {
                DetectionOutcome::Detected => {
                    if !self.handle_wake(&mut mic, events) {
                        running.store(false, Ordering::Relaxed);
                        break;
                    }
                    events.status(ready_prompt.clone());
                }
                outcome @ (DetectionOutcome::Exhausted | DetectionOutcome::TimedOut) => {
                    tracing::debug!(?outcome, "detection session ended without a wake");
                }
                DetectionOutcome::Stopped => break,
                DetectionOutcome::DeviceFailed => {
                    std::thread::sleep(DEVICE_RETRY_DELAY);
                }
            }
        }

        events.send(UiEvent::Stopped);
        tracing::info!("assistant stopped");
    }

    /// Capture and execute one command after a wake
    ///
    /// Returns `false` when the user asked to stop listening.
    fn handle_wake(&self, mic: &mut Microphone, events: &EventSender) -> bool {
        events.status("Yes, I'm listening...");
        self.speak(WAKE_ACK);

        let params = ListenParams::from(&self.config.command);
        let clip = match mic.listen(&params) {
            Ok(clip) => clip,
            Err(e) => {
                tracing::debug!(error = %e, "no command captured");
                return true;
            }
        };

        match self.stt.transcribe(&clip) {
            Transcription::Text(command) => {
                tracing::info!(command = %command, "executing command");
                events.send(UiEvent::Heard(command.clone()));

                match self.dispatcher.dispatch(&command) {
                    CommandOutcome::Reply(reply) => {
                        if !reply.is_empty() {
                            events.send(UiEvent::Response(reply.clone()));
                            self.speak(&reply);
                        }
                    }
                    CommandOutcome::Exit => {
                        events.send(UiEvent::Response(FAREWELL.to_string()));
                        self.speak(FAREWELL);
                        return false;
                    }
                }
            }
            Transcription::Unintelligible => {
                tracing::info!("could not understand the command");
            }
            Transcription::ServiceUnavailable(reason) => {
                tracing::error!(reason = %reason, "transcription service failed");
            }
        }

        true
    }

    /// Speak, degrading output failures to a log line
    fn speak(&self, text: &str) {
        if let Err(e) = self.voice.speak(text) {
            tracing::error!(error = %e, "speech output failed");
        }
    }
}

/// Handle to a running assistant worker
pub struct AssistantHandle {
    events: mpsc::Receiver<UiEvent>,
    running: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

/// Cheap cloneable handle for requesting a stop
#[derive(Clone)]
pub struct Stopper(Arc<AtomicBool>);

impl Stopper {
    /// Ask the worker to stop
    ///
    /// Takes effect at the next iteration boundary, so up to one listen
    /// timeout may pass first.
    pub fn request_stop(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

impl AssistantHandle {
    /// Receive the next UI event; `None` once the worker has stopped
    pub async fn next_event(&mut self) -> Option<UiEvent> {
        self.events.recv().await
    }

    /// A stop handle usable independently of this handle
    #[must_use]
    pub fn stopper(&self) -> Stopper {
        Stopper(Arc::clone(&self.running))
    }

    /// Ask the worker to stop
    ///
    /// Takes effect at the next iteration boundary, so up to one listen
    /// timeout may pass first.
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Whether a stop has been requested or completed
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stop the worker and wait for it to finish
    pub fn join(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.join.take() {
            if handle.join().is_err() {
                tracing::error!("assistant thread panicked");
            }
        }
    }
}
