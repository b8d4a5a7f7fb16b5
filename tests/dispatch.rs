//! Command dispatch priority tests
//!
//! Exercise the public dispatcher API with recording collaborators.

use std::sync::{Arc, Mutex};

use chime_assistant::commands::{
    AppLauncher, CommandDispatcher, CommandOutcome, KnowledgeAnswerer, Messenger,
    QuestionAnswerer, UnconfiguredMessenger,
};
use chime_assistant::{Error, Result};

/// Launcher recording every call through a shared handle
#[derive(Clone, Default)]
struct RecordingLauncher {
    apps: Arc<Mutex<Vec<String>>>,
    urls: Arc<Mutex<Vec<String>>>,
}

impl AppLauncher for RecordingLauncher {
    fn open_app(&self, name: &str) -> Result<()> {
        self.apps.lock().unwrap().push(name.to_string());
        Ok(())
    }

    fn open_url(&self, url: &str) -> Result<()> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

/// Messenger recording every call through a shared handle
#[derive(Clone, Default)]
struct RecordingMessenger {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl Messenger for RecordingMessenger {
    fn send_message(&self, recipient: &str, body: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), body.to_string()));
        Ok(())
    }
}

/// Answerer that panics if consulted
struct UnreachableAnswerer;

impl QuestionAnswerer for UnreachableAnswerer {
    fn answer(&self, question: &str) -> Result<Option<String>> {
        panic!("answerer must not be consulted for: {question}");
    }
}

/// Launcher that panics if consulted
struct PanickingLauncher;

impl AppLauncher for PanickingLauncher {
    fn open_app(&self, name: &str) -> Result<()> {
        panic!("launcher must not be consulted for app: {name}");
    }

    fn open_url(&self, url: &str) -> Result<()> {
        panic!("launcher must not be consulted for url: {url}");
    }
}

fn dispatcher() -> CommandDispatcher {
    CommandDispatcher::new(
        Box::new(KnowledgeAnswerer::new("Chime")),
        Box::new(RecordingLauncher::default()),
        Box::new(UnconfiguredMessenger),
    )
}

#[test]
fn time_question_routes_to_the_question_branch_first() {
    // "what time is it" must reach the Q&A collaborator before any keyword
    // branch gets a look
    let outcome = dispatcher().dispatch("what time is it");

    let CommandOutcome::Reply(reply) = outcome else {
        panic!("expected a reply");
    };
    assert!(reply.starts_with("The current time is"));
}

#[test]
fn open_chrome_reaches_the_launcher_with_a_nonempty_reply() {
    let launcher = RecordingLauncher::default();
    let dispatcher = CommandDispatcher::new(
        Box::new(KnowledgeAnswerer::new("Chime")),
        Box::new(launcher.clone()),
        Box::new(UnconfiguredMessenger),
    );

    let CommandOutcome::Reply(reply) = dispatcher.dispatch("open chrome") else {
        panic!("expected a reply");
    };
    assert!(!reply.is_empty());
    assert_eq!(reply, "Opening Chrome");
    assert_eq!(launcher.apps.lock().unwrap().as_slice(), ["chrome"]);
}

#[test]
fn stop_listening_returns_the_termination_sentinel() {
    assert_eq!(dispatcher().dispatch("stop listening"), CommandOutcome::Exit);
}

#[test]
fn question_words_outrank_keyword_branches() {
    // Contains "open", but the question word routes it to Q&A; the answerer
    // knows the answer so the launcher must never be consulted
    let dispatcher = CommandDispatcher::new(
        Box::new(KnowledgeAnswerer::new("Chime")),
        Box::new(PanickingLauncher),
        Box::new(UnconfiguredMessenger),
    );

    let CommandOutcome::Reply(reply) = dispatcher.dispatch("what time does the store open") else {
        panic!("expected a reply");
    };
    assert!(reply.starts_with("The current time is"));
}

#[test]
fn greeting_never_reaches_the_answerer() {
    let dispatcher = CommandDispatcher::new(
        Box::new(UnreachableAnswerer),
        Box::new(RecordingLauncher::default()),
        Box::new(UnconfiguredMessenger),
    );

    let outcome = dispatcher.dispatch("hello");
    assert_eq!(
        outcome,
        CommandOutcome::Reply("Hello! How can I help you today?".to_string())
    );
}

#[test]
fn message_command_delivers_recipient_and_body() {
    let messenger = RecordingMessenger::default();
    let dispatcher = CommandDispatcher::new(
        Box::new(KnowledgeAnswerer::new("Chime")),
        Box::new(RecordingLauncher::default()),
        Box::new(messenger.clone()),
    );

    let outcome = dispatcher.dispatch("send a message to alex saying see you at noon");

    assert_eq!(
        outcome,
        CommandOutcome::Reply("Message sent successfully".to_string())
    );
    assert_eq!(
        messenger.sent.lock().unwrap().as_slice(),
        [("alex".to_string(), "see you at noon".to_string())]
    );
}

#[test]
fn collaborator_failure_is_always_a_spoken_apology() {
    // The unconfigured messenger errors internally; the user still gets a
    // response, never an error
    let outcome = dispatcher().dispatch("send a message to alex saying running late");

    let CommandOutcome::Reply(reply) = outcome else {
        panic!("expected a reply");
    };
    assert!(reply.to_lowercase().contains("sorry"));
}

#[test]
fn unknown_input_gets_the_default_response() {
    let CommandOutcome::Reply(reply) = dispatcher().dispatch("juggle some oranges") else {
        panic!("expected a reply");
    };
    assert!(reply.contains("not sure how to help"));
}

#[test]
fn dispatch_errors_never_escape() {
    // A failing answerer is converted to an apology
    struct BrokenAnswerer;
    impl QuestionAnswerer for BrokenAnswerer {
        fn answer(&self, _question: &str) -> Result<Option<String>> {
            Err(Error::Command("backend offline".to_string()))
        }
    }

    let dispatcher = CommandDispatcher::new(
        Box::new(BrokenAnswerer),
        Box::new(RecordingLauncher::default()),
        Box::new(UnconfiguredMessenger),
    );

    let CommandOutcome::Reply(reply) = dispatcher.dispatch("why is the sky blue") else {
        panic!("expected a reply");
    };
    assert!(reply.to_lowercase().contains("sorry"));
}
