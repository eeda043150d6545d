//! Conversation state types

use crate::config::{validate_max_messages, ConfigError};
use crate::scenario::Scenario;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

// ============================================================================
// Speaker
// ============================================================================

/// Who authors (or authored) a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Speaker {
    #[serde(rename = "HUMAN", alias = "USER")]
    Human,
    #[serde(rename = "AUTOMATED", alias = "CHATBOT")]
    Automated,
}

impl Speaker {
    /// The other party
    #[must_use]
    pub fn toggle(self) -> Self {
        match self {
            Speaker::Human => Speaker::Automated,
            Speaker::Automated => Speaker::Human,
        }
    }

    /// Tag used in snapshots
    pub fn tag(self) -> &'static str {
        match self {
            Speaker::Human => "HUMAN",
            Speaker::Automated => "AUTOMATED",
        }
    }

    /// Label used when rendering the transcript for a prompt
    pub fn label(self) -> &'static str {
        match self {
            Speaker::Human => "USER",
            Speaker::Automated => "CHATBOT",
        }
    }
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

// ============================================================================
// Conversation
// ============================================================================

/// Lifecycle phase. `Finished` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvPhase {
    Active,
    Finished,
}

/// One bounded exchange between the automated party and a human.
///
/// Fields are private so that every mutation goes through
/// [`Conversation::add_message`] or [`Conversation::set_evaluation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub(super) max_messages: u32,
    pub(super) transcript: Vec<String>,
    pub(super) current_turn: Speaker,
    pub(super) finished: bool,
    pub(super) true_context: String,
    pub(super) visible_context: String,
    pub(super) automated_turns_taken: u32,
    pub(super) evaluation: Option<String>,
}

impl Conversation {
    /// Start a conversation with the scenario's opener already sent.
    ///
    /// `max_messages` must be a positive even number: half of it is the
    /// automated party's budget, and the opener counts against that budget.
    pub fn create(scenario: &Scenario, max_messages: u32) -> Result<Self, ConfigError> {
        validate_max_messages(max_messages)?;
        Ok(Self {
            max_messages,
            transcript: vec![scenario.opener.clone()],
            current_turn: Speaker::Human,
            finished: false,
            true_context: scenario.true_context.clone(),
            visible_context: scenario.visible_context.clone(),
            automated_turns_taken: 1,
            evaluation: None,
        })
    }

    pub fn max_messages(&self) -> u32 {
        self.max_messages
    }

    #[allow(dead_code)] // Used in tests
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    pub fn current_turn(&self) -> Speaker {
        self.current_turn
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn phase(&self) -> ConvPhase {
        if self.finished {
            ConvPhase::Finished
        } else {
            ConvPhase::Active
        }
    }

    pub fn true_context(&self) -> &str {
        &self.true_context
    }

    pub fn visible_context(&self) -> &str {
        &self.visible_context
    }

    #[allow(dead_code)] // Used in tests
    pub fn automated_turns_taken(&self) -> u32 {
        self.automated_turns_taken
    }

    pub fn evaluation(&self) -> Option<&str> {
        self.evaluation.as_deref()
    }

    /// Automated messages still owed before the conversation ends.
    /// Goes negative once the budget is overspent.
    pub fn remaining_automated_turns(&self) -> i64 {
        i64::from(self.max_messages / 2) - i64::from(self.automated_turns_taken)
    }

    /// Author of the transcript entry at `index`.
    ///
    /// The opener belongs to the automated party and turns alternate
    /// strictly, so authorship is a function of position. Both rendering and
    /// the turn bookkeeping derive from this.
    pub fn author_of(index: usize) -> Speaker {
        if index % 2 == 0 {
            Speaker::Automated
        } else {
            Speaker::Human
        }
    }

    /// Transcript entries paired with their authors
    pub fn entries(&self) -> impl Iterator<Item = (Speaker, &str)> + '_ {
        self.transcript
            .iter()
            .enumerate()
            .map(|(i, text)| (Self::author_of(i), text.as_str()))
    }

    /// Render the transcript for prompt injection, one labeled line each:
    ///
    /// ```text
    /// <CHATBOT>: I was in the store today and saw a pigeon inside.
    /// <USER>: A pigeon, inside the store?
    /// ```
    pub fn render_transcript(&self) -> String {
        let mut out = String::new();
        for (speaker, text) in self.entries() {
            let _ = writeln!(out, "<{}>: {}", speaker.label(), text);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hello() -> Scenario {
        Scenario::new("Hello", "A neighbor says hi.", "Lonely since the move.")
    }

    #[test]
    fn test_toggle_alternates() {
        assert_eq!(Speaker::Human.toggle(), Speaker::Automated);
        assert_eq!(Speaker::Automated.toggle(), Speaker::Human);
        assert_eq!(Speaker::Human.toggle().toggle(), Speaker::Human);
    }

    #[test]
    fn test_speaker_serde_tags() {
        assert_eq!(serde_json::to_string(&Speaker::Human).unwrap(), "\"HUMAN\"");
        assert_eq!(
            serde_json::to_string(&Speaker::Automated).unwrap(),
            "\"AUTOMATED\""
        );
        // Legacy tags still load
        let legacy: Speaker = serde_json::from_str("\"CHATBOT\"").unwrap();
        assert_eq!(legacy, Speaker::Automated);
        let legacy: Speaker = serde_json::from_str("\"USER\"").unwrap();
        assert_eq!(legacy, Speaker::Human);
    }

    #[test]
    fn test_create_initial_state() {
        let conv = Conversation::create(&hello(), 20).unwrap();
        assert_eq!(conv.transcript(), ["Hello".to_string()]);
        assert_eq!(conv.current_turn(), Speaker::Human);
        assert_eq!(conv.automated_turns_taken(), 1);
        assert!(!conv.is_finished());
        assert_eq!(conv.phase(), ConvPhase::Active);
        assert_eq!(conv.evaluation(), None);
        assert_eq!(conv.remaining_automated_turns(), 9);
        assert_eq!(conv.true_context(), "Lonely since the move.");
        assert_eq!(conv.visible_context(), "A neighbor says hi.");
    }

    #[test]
    fn test_create_rejects_bad_max_messages() {
        assert_eq!(
            Conversation::create(&hello(), 0).unwrap_err(),
            ConfigError::InvalidMaxMessages(0)
        );
        assert_eq!(
            Conversation::create(&hello(), 5).unwrap_err(),
            ConfigError::InvalidMaxMessages(5)
        );
    }

    #[test]
    fn test_render_transcript_labels() {
        let mut conv = Conversation::create(&hello(), 20).unwrap();
        conv.add_message("Hi there").unwrap();
        conv.add_message("Nice weather").unwrap();
        assert_eq!(
            conv.render_transcript(),
            "<CHATBOT>: Hello\n<USER>: Hi there\n<CHATBOT>: Nice weather\n"
        );
    }

    #[test]
    fn test_render_is_repeatable() {
        let mut conv = Conversation::create(&hello(), 20).unwrap();
        conv.add_message("Hi").unwrap();
        let first = conv.render_transcript();
        let second = conv.render_transcript();
        assert_eq!(first, second);
    }

    #[test]
    fn test_entries_match_turn_bookkeeping() {
        let mut conv = Conversation::create(&hello(), 20).unwrap();
        for text in ["a", "b", "c", "d"] {
            let expected_author = conv.current_turn();
            let author = conv.add_message(text).unwrap();
            assert_eq!(author, expected_author);
            let (rendered_author, rendered_text) = conv.entries().last().unwrap();
            assert_eq!(rendered_author, author);
            assert_eq!(rendered_text, text);
        }
        assert_eq!(
            Conversation::author_of(conv.transcript().len()),
            conv.current_turn()
        );
    }
}
