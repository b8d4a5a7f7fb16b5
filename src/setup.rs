//! Interactive first-run setup wizard (`chime setup`)

use dialoguer::{Confirm, Input};

use crate::config::{self, ConfigFile, DEFAULT_WAKE_PHRASE};

/// Run the interactive setup wizard
///
/// # Errors
///
/// Returns error if user input fails or the config cannot be written
pub fn run_setup() -> anyhow::Result<()> {
    println!("Chime Setup\n");

    // Load existing config if present
    let existing = config::load_config_file();
    if let Some(path) = config::config_file_path() {
        if path.exists() {
            println!("Existing config found at {}\n", path.display());
        }
    }

    // 1. Assistant name
    let name: String = Input::new()
        .with_prompt("Assistant name")
        .default(
            existing
                .assistant_name
                .clone()
                .unwrap_or_else(|| "Chime".to_string()),
        )
        .interact_text()?;

    // 2. Wake phrase + variations
    let wake_phrase: String = Input::new()
        .with_prompt("Wake phrase")
        .default(
            existing
                .wake_phrase
                .clone()
                .unwrap_or_else(|| DEFAULT_WAKE_PHRASE.to_string()),
        )
        .interact_text()?;

    let variations_default = existing
        .wake_variations
        .clone()
        .map_or_else(String::new, |v| v.join(", "));
    let variations_input: String = Input::new()
        .with_prompt("Accepted variations (comma separated, blank for defaults)")
        .default(variations_default)
        .allow_empty(true)
        .interact_text()?;
    let wake_variations: Vec<String> = variations_input
        .split(',')
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect();

    // 3. Speech services
    let stt_model: String = Input::new()
        .with_prompt("STT model")
        .default(existing.stt_model.clone().unwrap_or_else(|| "whisper-1".to_string()))
        .interact_text()?;

    let tts_voice: String = Input::new()
        .with_prompt("TTS voice (blank for automatic selection)")
        .default(existing.tts_voice.clone().unwrap_or_default())
        .allow_empty(true)
        .interact_text()?;

    let file = ConfigFile {
        assistant_name: Some(name),
        wake_phrase: Some(wake_phrase.to_lowercase()),
        wake_variations: (!wake_variations.is_empty()).then_some(wake_variations),
        stt_model: Some(stt_model),
        tts_voice: (!tts_voice.is_empty()).then_some(tts_voice),
        ..existing
    };

    if Confirm::new()
        .with_prompt("Write configuration?")
        .default(true)
        .interact()?
    {
        let path = config::save_config_file(&file)?;
        println!("\nConfiguration written to {}", path.display());
        println!("Set OPENAI_API_KEY (or CHIME_STT_API_KEY / CHIME_TTS_API_KEY) in your");
        println!("environment before running `chime`.");
    } else {
        println!("\nSetup aborted, nothing written.");
    }

    Ok(())
}
