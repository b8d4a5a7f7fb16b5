//! Audio capture from microphone
//!
//! The microphone is a scoped resource: the stream is opened by
//! [`Microphone::open`] and released when the value is dropped, on every
//! exit path. At most one detection session holds it at a time.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};

use crate::config::{DetectionConfig, ListenSettings};
use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Interval between buffer polls while listening
const POLL_INTERVAL: Duration = Duration::from_millis(30);

/// A captured audio clip
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Mono f32 samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate of the clip
    pub sample_rate: u32,
}

impl AudioClip {
    /// Duration of the clip
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }

    /// Encode the clip as WAV bytes for the STT API
    ///
    /// # Errors
    ///
    /// Returns error if WAV encoding fails
    pub fn to_wav(&self) -> Result<Vec<u8>> {
        samples_to_wav(&self.samples, self.sample_rate)
    }
}

/// Tuning for a single listen attempt
#[derive(Debug, Clone)]
pub struct ListenParams {
    /// Wait for speech onset before giving up
    pub timeout: Duration,

    /// Maximum phrase length once speech has started
    pub phrase_time_limit: Duration,

    /// Trailing silence that ends the phrase
    pub pause_threshold: Duration,

    /// Minimum voiced duration for the capture to count
    pub phrase_threshold: Duration,
}

impl From<&DetectionConfig> for ListenParams {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            timeout: config.listen_timeout,
            phrase_time_limit: config.phrase_time_limit,
            pause_threshold: config.pause_threshold,
            phrase_threshold: config.phrase_threshold,
        }
    }
}

impl From<&ListenSettings> for ListenParams {
    fn from(settings: &ListenSettings) -> Self {
        Self {
            timeout: settings.timeout,
            phrase_time_limit: settings.phrase_time_limit,
            pause_threshold: settings.pause_threshold,
            phrase_threshold: Duration::ZERO,
        }
    }
}

/// Transient failure of a single listen attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ListenError {
    /// No speech onset before the timeout elapsed
    #[error("no speech before timeout")]
    Timeout,

    /// Speech started but ended before the phrase threshold
    #[error("phrase too short")]
    TooShort,
}

/// Source of audio clips for the detection loop
///
/// Implemented by [`Microphone`]; test doubles script their own clips.
pub trait AudioSource {
    /// Measure ambient noise and set the speech onset threshold
    ///
    /// # Errors
    ///
    /// Returns error if the device fails mid-measurement
    fn calibrate(&mut self, window: Duration) -> Result<()>;

    /// Block until a phrase is captured or the attempt times out
    fn listen(&mut self, params: &ListenParams) -> std::result::Result<AudioClip, ListenError>;
}

/// Captures audio from the default input device
pub struct Microphone {
    #[allow(dead_code)]
    device: Device,
    config: StreamConfig,
    buffer: Arc<Mutex<Vec<f32>>>,
    // Held for its side effect: dropping it releases the device
    _stream: Stream,
    energy_threshold: f32,
    dynamic_energy_ratio: f32,
}

impl Microphone {
    /// Open the default input device and start capturing
    ///
    /// # Errors
    ///
    /// Returns error if no device is available or the stream cannot start
    pub fn open(energy_threshold: f32, dynamic_energy_ratio: f32) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Audio("no suitable audio config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(SAMPLE_RATE))
            .config();

        let buffer = Arc::new(Mutex::new(Vec::new()));
        let stream_buffer = Arc::clone(&buffer);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = stream_buffer.lock() {
                        buf.extend_from_slice(data);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            channels = config.channels,
            "microphone opened"
        );

        Ok(Self {
            device,
            config,
            buffer,
            _stream: stream,
            energy_threshold,
            dynamic_energy_ratio,
        })
    }

    /// Current speech onset threshold (RMS)
    #[must_use]
    pub const fn energy_threshold(&self) -> f32 {
        self.energy_threshold
    }

    /// Take captured samples and clear the buffer
    fn take_buffer(&self) -> Vec<f32> {
        self.buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }

    /// Clear the capture buffer
    fn clear_buffer(&self) {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.clear();
        }
    }
}

impl AudioSource for Microphone {
    fn calibrate(&mut self, window: Duration) -> Result<()> {
        self.clear_buffer();
        std::thread::sleep(window);

        let samples = self.take_buffer();
        let ambient = calculate_energy(&samples);
        self.energy_threshold = (ambient * self.dynamic_energy_ratio).max(self.energy_threshold);

        tracing::debug!(
            ambient,
            threshold = self.energy_threshold,
            samples = samples.len(),
            "ambient noise calibration complete"
        );
        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    fn listen(&mut self, params: &ListenParams) -> std::result::Result<AudioClip, ListenError> {
        self.clear_buffer();

        let started = Instant::now();
        let mut clip: Vec<f32> = Vec::new();
        let mut phrase_started: Option<Instant> = None;
        let mut voiced = Duration::ZERO;
        let mut trailing_silence = Duration::ZERO;

        loop {
            std::thread::sleep(POLL_INTERVAL);
            let chunk = self.take_buffer();

            if chunk.is_empty() {
                if phrase_started.is_none() && started.elapsed() > params.timeout {
                    return Err(ListenError::Timeout);
                }
                continue;
            }

            let chunk_duration =
                Duration::from_secs_f64(chunk.len() as f64 / f64::from(SAMPLE_RATE));
            let is_speech = calculate_energy(&chunk) > self.energy_threshold;

            match phrase_started {
                None => {
                    if is_speech {
                        phrase_started = Some(Instant::now());
                        voiced += chunk_duration;
                        clip.extend(chunk);
                    } else if started.elapsed() > params.timeout {
                        return Err(ListenError::Timeout);
                    }
                }
                Some(phrase_start) => {
                    clip.extend(chunk);

                    if is_speech {
                        voiced += chunk_duration;
                        trailing_silence = Duration::ZERO;
                    } else {
                        trailing_silence += chunk_duration;
                    }

                    if trailing_silence >= params.pause_threshold
                        || phrase_start.elapsed() >= params.phrase_time_limit
                    {
                        break;
                    }
                }
            }
        }

        if voiced < params.phrase_threshold {
            return Err(ListenError::TooShort);
        }

        Ok(AudioClip {
            samples: clip,
            sample_rate: SAMPLE_RATE,
        })
    }
}

/// Calculate RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Convert f32 samples to WAV bytes for STT APIs
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            // Convert f32 [-1.0, 1.0] to i16
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}
