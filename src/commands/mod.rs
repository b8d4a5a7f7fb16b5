//! Command dispatch
//!
//! Maps a transcribed command to a response or a delegated side effect via
//! an ordered list of keyword predicates. The order is a priority list and
//! the first matching predicate wins. The dispatcher itself performs no I/O
//! beyond string matching and delegation, and it never fails: collaborator
//! errors become an apology reply so the user always hears an
//! acknowledgement.

mod actions;
mod answer;

use std::sync::LazyLock;

use regex::Regex;

pub use actions::{AppLauncher, Messenger, SystemLauncher, UnconfiguredMessenger};
pub use answer::{KnowledgeAnswerer, QuestionAnswerer};

/// Question words that route to the Q&A collaborator
const QUESTION_WORDS: &[&str] = &["what", "why", "how", "when", "where", "who"];

/// Default response when no predicate matches
const FALLBACK_RESPONSE: &str =
    "I'm not sure how to help with that yet. Is there something else I can do for you?";

/// Response when a collaborator fails
const APOLOGY_RESPONSE: &str = "I'm sorry, I couldn't process that command.";

/// Spoken app names with their display form, checked in order
const KNOWN_APPS: &[(&str, &str)] = &[
    ("whatsapp", "WhatsApp"),
    ("settings", "Settings"),
    ("chrome", "Chrome"),
    ("edge", "Microsoft Edge"),
    ("file explorer", "File Explorer"),
    ("explorer", "File Explorer"),
    ("control panel", "Control Panel"),
];

/// "send a message to <recipient> saying <body>"
static MESSAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"send (?:a )?message to (?P<recipient>.+?) saying (?P<body>.+)")
        .expect("valid regex")
});

/// Result of dispatching one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Response text for the caller to speak
    Reply(String),

    /// Terminate the assistant session
    Exit,
}

/// Routes free-text commands to collaborators
pub struct CommandDispatcher {
    answerer: Box<dyn QuestionAnswerer>,
    launcher: Box<dyn AppLauncher>,
    messenger: Box<dyn Messenger>,
}

impl CommandDispatcher {
    /// Create a dispatcher with explicit collaborators
    #[must_use]
    pub fn new(
        answerer: Box<dyn QuestionAnswerer>,
        launcher: Box<dyn AppLauncher>,
        messenger: Box<dyn Messenger>,
    ) -> Self {
        Self {
            answerer,
            launcher,
            messenger,
        }
    }

    /// Create a dispatcher with the stock collaborators
    #[must_use]
    pub fn with_system_defaults(assistant_name: &str) -> Self {
        Self::new(
            Box::new(KnowledgeAnswerer::new(assistant_name)),
            Box::new(SystemLauncher),
            Box::new(UnconfiguredMessenger),
        )
    }

    /// Dispatch one command
    ///
    /// Predicate order: questions, small talk, open app, play/search,
    /// send message, stop listening, fallback.
    #[must_use]
    pub fn dispatch(&self, input: &str) -> CommandOutcome {
        let command = input.trim().to_lowercase();
        let words: Vec<&str> = command.split_whitespace().collect();

        tracing::info!(command = %command, "dispatching command");

        // Questions first; an unanswered question falls through to the
        // keyword branches
        if QUESTION_WORDS.iter().any(|q| command.contains(q)) {
            match self.answerer.answer(&command) {
                Ok(Some(answer)) => return CommandOutcome::Reply(answer),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(error = %e, "question answering failed");
                    return CommandOutcome::Reply(APOLOGY_RESPONSE.to_string());
                }
            }
        }

        // Small talk. Matched on whole words so "hi" does not fire inside
        // unrelated words
        if words.contains(&"hello") || words.contains(&"hi") {
            return CommandOutcome::Reply("Hello! How can I help you today?".to_string());
        }
        if command.contains("how are you") {
            return CommandOutcome::Reply(
                "I'm doing well, thank you for asking! How can I assist you?".to_string(),
            );
        }
        if words.contains(&"goodbye") || words.contains(&"bye") {
            return CommandOutcome::Reply("Goodbye! Have a great day!".to_string());
        }
        if command.contains("thank you") || words.contains(&"thanks") {
            return CommandOutcome::Reply("You're welcome!".to_string());
        }

        if command.contains("open") {
            return self.handle_open(&command);
        }

        if let Some(query) = extract_after_word(&command, "play") {
            return self.handle_play(query);
        }
        if let Some(query) = extract_search_query(&command) {
            return self.handle_search(query);
        }

        if let Some(captures) = MESSAGE_RE.captures(&command) {
            let recipient = captures["recipient"].to_string();
            let body = captures["body"].to_string();
            return self.handle_message(&recipient, &body);
        }

        if (command.contains("close") || command.contains("stop") || command.contains("exit"))
            && command.contains("listening")
        {
            return CommandOutcome::Exit;
        }

        CommandOutcome::Reply(FALLBACK_RESPONSE.to_string())
    }

    /// Open a known or literally named application
    fn handle_open(&self, command: &str) -> CommandOutcome {
        for (token, display) in KNOWN_APPS {
            if command.contains(token) {
                return match self.launcher.open_app(token) {
                    Ok(()) => CommandOutcome::Reply(format!("Opening {display}")),
                    Err(e) => {
                        tracing::warn!(app = token, error = %e, "app launch failed");
                        CommandOutcome::Reply(format!(
                            "I couldn't find {display} on your system. Please make sure it's installed."
                        ))
                    }
                };
            }
        }

        // Unknown target: take the words after "open" literally
        if let Some((_, target)) = command.split_once("open ") {
            let target = target.trim();
            if !target.is_empty() {
                return match self.launcher.open_app(target) {
                    Ok(()) => CommandOutcome::Reply(format!("Opening {target}")),
                    Err(e) => {
                        tracing::warn!(app = target, error = %e, "app launch failed");
                        CommandOutcome::Reply(format!(
                            "I couldn't find {target} on your system. Please make sure it's installed."
                        ))
                    }
                };
            }
        }

        CommandOutcome::Reply(FALLBACK_RESPONSE.to_string())
    }

    /// Play media through a web search
    fn handle_play(&self, query: &str) -> CommandOutcome {
        let url = format!(
            "https://www.youtube.com/results?search_query={}",
            urlencoding::encode(query)
        );
        match self.launcher.open_url(&url) {
            Ok(()) => CommandOutcome::Reply(format!("Playing {query} on YouTube")),
            Err(e) => {
                tracing::error!(error = %e, "failed to open browser");
                CommandOutcome::Reply(APOLOGY_RESPONSE.to_string())
            }
        }
    }

    /// Run a web search in the browser
    fn handle_search(&self, query: &str) -> CommandOutcome {
        let url = format!("https://www.google.com/search?q={}", urlencoding::encode(query));
        match self.launcher.open_url(&url) {
            Ok(()) => CommandOutcome::Reply(format!("Searching for {query}")),
            Err(e) => {
                tracing::error!(error = %e, "failed to open browser");
                CommandOutcome::Reply(APOLOGY_RESPONSE.to_string())
            }
        }
    }

    /// Send a message through the messenger collaborator
    fn handle_message(&self, recipient: &str, body: &str) -> CommandOutcome {
        match self.messenger.send_message(recipient, body) {
            Ok(()) => CommandOutcome::Reply("Message sent successfully".to_string()),
            Err(e) => {
                tracing::error!(error = %e, recipient, "message send failed");
                CommandOutcome::Reply(APOLOGY_RESPONSE.to_string())
            }
        }
    }
}

/// Find `keyword` as a standalone word and return the trimmed text after it
fn extract_after_word<'a>(command: &'a str, keyword: &str) -> Option<&'a str> {
    let idx = command.find(keyword)?;
    let boundary_before = idx == 0 || command.as_bytes()[idx - 1] == b' ';
    let after = idx + keyword.len();
    let boundary_after = command.as_bytes().get(after).is_none_or(|b| *b == b' ');
    if !boundary_before || !boundary_after {
        return None;
    }

    let rest = command[after..].trim();
    (!rest.is_empty()).then_some(rest)
}

/// Pull the query out of a "search [for] ..." command
fn extract_search_query(command: &str) -> Option<&str> {
    let rest = extract_after_word(command, "search")?;
    let rest = rest.strip_prefix("for ").unwrap_or(rest).trim();
    (!rest.is_empty()).then_some(rest)
}
