use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use chime_assistant::voice::{
    AudioPlayback, AudioSource, CloudSynthesizer, ListenParams, Microphone, SpeechSynthesizer,
    calculate_energy,
};
use chime_assistant::{Assistant, CommandDispatcher, CommandOutcome, Config, UiEvent};

/// Chime - wake-word driven desktop voice assistant
#[derive(Parser)]
#[command(name = "chime", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
    /// Dispatch a typed command without audio
    Say {
        /// Command text, as if transcribed
        text: String,
        /// Also speak the response
        #[arg(long)]
        speak: bool,
    },
    /// Interactive first-run setup
    Setup,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,chime_assistant=info",
        1 => "info,chime_assistant=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    // Subcommands run without a runtime: they drive the blocking HTTP
    // clients and audio devices directly
    let result = match cli.command {
        Some(Command::TestMic { duration }) => test_mic(duration),
        Some(Command::TestSpeaker) => test_speaker(),
        Some(Command::TestTts { text }) => test_tts(&text),
        Some(Command::Say { text, speak }) => say(&text, speak),
        Some(Command::Setup) => chime_assistant::setup::run_setup(),
        None => run_assistant(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Run the assistant with the main task rendering the event stream
fn run_assistant() -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing::info!(
        assistant = %config.assistant_name,
        wake_phrase = %config.detection.wake_phrase,
        "starting chime"
    );

    let assistant_name = config.assistant_name.clone();
    let mut handle = Assistant::spawn(config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        // Ctrl-C requests a stop; the worker notices at its next iteration
        // boundary
        let stopper = handle.stopper();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, stopping");
                stopper.request_stop();
            }
        });

        // The main task stands in for the GUI collaborators: it renders the
        // event stream until the worker stops
        while let Some(event) = handle.next_event().await {
            match event {
                UiEvent::Status(text) => println!("  {text}"),
                UiEvent::WakeDetected => println!("* wake phrase detected"),
                UiEvent::Heard(text) => println!("You said: {text}"),
                UiEvent::Response(text) => println!("{assistant_name}: {text}"),
                UiEvent::Stopped => break,
            }
        }
    });

    handle.join();
    Ok(())
}

/// Test microphone input by capturing phrases for a few seconds
fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let defaults = chime_assistant::config::DetectionConfig::default();
    let mut mic = Microphone::open(defaults.energy_threshold, defaults.dynamic_energy_ratio)?;

    print!("Calibrating for ambient noise... ");
    mic.calibrate(Duration::from_secs(1))?;
    println!("done (threshold {:.4})", mic.energy_threshold());
    println!("---");

    let deadline = Instant::now() + Duration::from_secs(duration);
    let params = ListenParams {
        timeout: Duration::from_secs(1),
        phrase_time_limit: Duration::from_secs(2),
        pause_threshold: Duration::from_millis(500),
        phrase_threshold: Duration::ZERO,
    };

    while Instant::now() < deadline {
        match mic.listen(&params) {
            Ok(clip) => {
                println!(
                    "captured {:4} ms, RMS {:.4}",
                    clip.duration().as_millis(),
                    calculate_energy(&clip.samples)
                );
            }
            Err(e) => println!("({e})"),
        }
    }

    println!("\n---");
    println!("If phrases were captured while you spoke, your mic is working!");
    println!("If everything timed out, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

/// Test speaker output with a sine wave
fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let playback = AudioPlayback::new()?;

    // Generate 2 seconds of 440Hz sine wave at 24kHz sample rate
    let sample_rate = 24000_i32;
    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let num_samples = (sample_rate as f32 * duration_secs) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    println!("Playing {} samples at {} Hz...", samples.len(), sample_rate);
    playback.play(samples, 1.0)?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");

    Ok(())
}

/// Test TTS synthesis and playback
fn test_tts(text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let config = Config::load()?;
    let synthesizer = CloudSynthesizer::new(&config.tts)?;
    println!("Voice: {}", synthesizer.voice());

    println!("Synthesizing speech...");
    let mp3_data = synthesizer.synthesize(text)?;
    println!("Got {} bytes of audio data", mp3_data.len());

    println!("Playing audio...");
    let playback = AudioPlayback::new()?;
    playback.play_mp3(&mp3_data, config.tts.volume)?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}

/// Dispatch a typed command, bypassing the audio path
fn say(text: &str, speak: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let dispatcher = CommandDispatcher::with_system_defaults(&config.assistant_name);

    match dispatcher.dispatch(text) {
        CommandOutcome::Reply(reply) => {
            println!("{}: {reply}", config.assistant_name);

            if speak {
                let synthesizer = CloudSynthesizer::new(&config.tts)?;
                let mp3_data = synthesizer.synthesize(&reply)?;
                AudioPlayback::new()?.play_mp3(&mp3_data, config.tts.volume)?;
            }
        }
        CommandOutcome::Exit => {
            println!("(session end requested)");
        }
    }

    Ok(())
}
