//! Side-effecting collaborators for the dispatcher
//!
//! App launching and message sending happen behind trait seams; the
//! dispatcher only delegates.

use std::process::Command;

use crate::{Error, Result};

/// Launches applications and URLs on the local machine
pub trait AppLauncher: Send {
    /// Launch an application by spoken name
    ///
    /// # Errors
    ///
    /// Returns error if no matching executable can be found or spawned
    fn open_app(&self, name: &str) -> Result<()>;

    /// Open a URL in the default browser
    ///
    /// # Errors
    ///
    /// Returns error if the platform opener cannot be spawned
    fn open_url(&self, url: &str) -> Result<()>;
}

/// Launcher backed by the local PATH and the platform URL opener
pub struct SystemLauncher;

impl SystemLauncher {
    /// Candidate executables for a spoken app name
    fn candidates(name: &str) -> Vec<String> {
        match name {
            "chrome" => vec!["google-chrome", "google-chrome-stable", "chromium", "chrome"],
            "edge" => vec!["microsoft-edge", "msedge"],
            "whatsapp" => vec!["whatsapp", "whatsapp-desktop"],
            "settings" | "control panel" => vec!["gnome-control-center", "systemsettings"],
            "file explorer" | "explorer" => vec!["nautilus", "dolphin", "thunar", "explorer"],
            other => return vec![other.replace(' ', "-"), other.to_string()],
        }
        .into_iter()
        .map(ToString::to_string)
        .collect()
    }
}

impl AppLauncher for SystemLauncher {
    fn open_app(&self, name: &str) -> Result<()> {
        for candidate in Self::candidates(name) {
            if let Ok(path) = which::which(&candidate) {
                tracing::info!(app = name, path = %path.display(), "launching application");
                Command::new(path).spawn()?;
                return Ok(());
            }
        }

        Err(Error::Command(format!("no executable found for {name}")))
    }

    fn open_url(&self, url: &str) -> Result<()> {
        let opener = if cfg!(target_os = "macos") {
            "open"
        } else if cfg!(target_os = "windows") {
            "explorer"
        } else {
            "xdg-open"
        };

        tracing::info!(url, opener, "opening url");
        Command::new(opener).arg(url).spawn()?;
        Ok(())
    }
}

/// Sends messages on the user's behalf
pub trait Messenger: Send {
    /// Deliver a message to a named recipient
    ///
    /// # Errors
    ///
    /// Returns error if the transport fails or none is configured
    fn send_message(&self, recipient: &str, body: &str) -> Result<()>;
}

/// Placeholder messenger used until a transport is wired up
pub struct UnconfiguredMessenger;

impl Messenger for UnconfiguredMessenger {
    fn send_message(&self, recipient: &str, _body: &str) -> Result<()> {
        tracing::debug!(recipient, "no message transport configured");
        Err(Error::Command("no message transport configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_apps_expand_to_platform_candidates() {
        let candidates = SystemLauncher::candidates("chrome");
        assert!(candidates.contains(&"google-chrome".to_string()));
        assert!(candidates.len() > 1);
    }

    #[test]
    fn unknown_app_uses_its_spoken_name() {
        let candidates = SystemLauncher::candidates("code editor");
        assert_eq!(candidates[0], "code-editor");
        assert_eq!(candidates[1], "code editor");
    }

    #[test]
    fn unconfigured_messenger_always_errors() {
        let messenger = UnconfiguredMessenger;
        assert!(messenger.send_message("sam", "hello").is_err());
    }
}
