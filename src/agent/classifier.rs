//! Completion classification
//!
//! Decides from the last message of a session whether the task is done or
//! the user has to say more. The default policy is a phrase heuristic; it
//! misfires when an answer happens to contain a trigger word (an unrelated
//! "which", say), and that is accepted behavior.

use super::progress::ProgressEvent;
use crate::session::Message;

/// Lowercase phrases that mark an answer as a request for more input
pub const INPUT_REQUIRED_PHRASES: [&str; 5] = [
    "need more",
    "please provide",
    "please specify",
    "which",
    "clarify",
];

pub const FALLBACK_CONTENT: &str =
    "We are unable to process your request at the moment. Please try again.";

/// Pluggable completion policy
pub trait CompletionPolicy: Send + Sync {
    /// Produce the terminal record for a turn whose last message is `last`
    fn classify(&self, last: Option<&Message>) -> ProgressEvent;
}

/// Case-insensitive substring match against a fixed phrase set
#[derive(Debug, Clone)]
pub struct PhraseClassifier {
    phrases: Vec<String>,
}

impl Default for PhraseClassifier {
    fn default() -> Self {
        Self::with_phrases(INPUT_REQUIRED_PHRASES)
    }
}

impl PhraseClassifier {
    pub fn with_phrases<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            phrases: phrases
                .into_iter()
                .map(|p| p.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn needs_input(&self, answer: &str) -> bool {
        let answer = answer.to_lowercase();
        self.phrases.iter().any(|p| answer.contains(p.as_str()))
    }
}

impl CompletionPolicy for PhraseClassifier {
    fn classify(&self, last: Option<&Message>) -> ProgressEvent {
        let Some(answer) = last.and_then(Message::agent_text) else {
            return ProgressEvent::input_required(FALLBACK_CONTENT);
        };

        if self.needs_input(answer) {
            ProgressEvent::input_required(answer)
        } else {
            ProgressEvent::completed(answer)
        }
    }
}
