//! Question answering
//!
//! Clock questions are answered live; everything else is looked up in a
//! small topical knowledge base. A question the answerer cannot handle
//! yields `None` so the dispatcher can fall through to its keyword
//! branches.

use chrono::Local;

use crate::Result;

/// Answers free-text questions
pub trait QuestionAnswerer: Send {
    /// Answer a question, or `None` if it is out of scope
    ///
    /// # Errors
    ///
    /// Returns error if the answering backend fails
    fn answer(&self, question: &str) -> Result<Option<String>>;
}

/// Keyword-matched knowledge base answerer
pub struct KnowledgeAnswerer {
    name: String,
}

impl KnowledgeAnswerer {
    /// Create an answerer that introduces itself by `name`
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl QuestionAnswerer for KnowledgeAnswerer {
    fn answer(&self, question: &str) -> Result<Option<String>> {
        if question.contains("date") {
            let today = Local::now().format("%Y-%m-%d");
            return Ok(Some(format!("Today's date is {today}")));
        }
        if question.contains("time") {
            let now = Local::now().format("%H:%M");
            return Ok(Some(format!("The current time is {now}")));
        }
        if question.contains("weather") {
            return Ok(Some(
                "I can check the weather for you using online weather services.".to_string(),
            ));
        }
        if question.contains("your name") || question.contains("who are you") {
            return Ok(Some(format!(
                "I am an AI assistant called {}, designed to help with various tasks.",
                self.name
            )));
        }
        if question.contains("can you do") || question.contains("capabilities") {
            return Ok(Some(
                "I can answer questions, perform tasks, and help you with your computer."
                    .to_string(),
            ));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_question_is_answered_live() {
        let answerer = KnowledgeAnswerer::new("Chime");

        let answer = answerer.answer("what time is it").unwrap().unwrap();
        assert!(answer.starts_with("The current time is"));
    }

    #[test]
    fn date_question_is_answered_live() {
        let answerer = KnowledgeAnswerer::new("Chime");

        let answer = answerer.answer("what is the date today").unwrap().unwrap();
        assert!(answer.starts_with("Today's date is"));
    }

    #[test]
    fn identity_answer_uses_the_configured_name() {
        let answerer = KnowledgeAnswerer::new("Aria");

        let answer = answerer.answer("who are you").unwrap().unwrap();
        assert!(answer.contains("Aria"));
    }

    #[test]
    fn unknown_topic_yields_none() {
        let answerer = KnowledgeAnswerer::new("Chime");

        assert!(answerer.answer("why is the sky blue").unwrap().is_none());
    }
}
