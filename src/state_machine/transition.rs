//! State transitions
//!
//! Every mutation is atomic: it either applies fully or returns an error and
//! leaves the conversation untouched.

use super::state::{Conversation, Speaker};
use thiserror::Error;

/// Errors that can occur during transition
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Conversation is finished, no further messages are accepted")]
    Finished,
    #[error("Conversation is still active, it cannot be evaluated yet")]
    NotFinished,
    #[error("Conversation has already been evaluated")]
    AlreadyEvaluated,
}

impl Conversation {
    /// Accept the next message, authored by whoever holds the turn.
    ///
    /// Returns the author of the accepted message. The conversation finishes
    /// on the automated message that exhausts the automated budget
    /// (`remaining_automated_turns() <= 0`), so the automated party always
    /// has the last word.
    pub fn add_message(&mut self, text: impl Into<String>) -> Result<Speaker, TransitionError> {
        if self.finished {
            return Err(TransitionError::Finished);
        }

        let author = self.current_turn;
        self.transcript.push(text.into());

        if author == Speaker::Automated {
            self.automated_turns_taken += 1;
            if self.remaining_automated_turns() <= 0 {
                self.finished = true;
            }
        }

        self.current_turn = author.toggle();
        Ok(author)
    }

    /// Record the evaluation. Only valid once, and only after the finish.
    pub fn set_evaluation(&mut self, evaluation: impl Into<String>) -> Result<(), TransitionError> {
        if !self.finished {
            return Err(TransitionError::NotFinished);
        }
        if self.evaluation.is_some() {
            return Err(TransitionError::AlreadyEvaluated);
        }
        self.evaluation = Some(evaluation.into());
        Ok(())
    }
}
