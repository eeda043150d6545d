//! What the runtime has to do next

use super::state::{Conversation, Speaker};

/// Next action required to move a conversation forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Wait for the human to type something
    AwaitHuman,
    /// Ask the backend for the automated party's next message
    RequestReply,
    /// Finished but not yet evaluated
    RequestEvaluation,
    /// Finished and evaluated; hand off to the durable store
    Archive,
}

impl Conversation {
    /// Pure function of the current state
    pub fn next_effect(&self) -> Effect {
        match (self.is_finished(), self.evaluation().is_some()) {
            (true, true) => Effect::Archive,
            (true, false) => Effect::RequestEvaluation,
            (false, _) => match self.current_turn() {
                Speaker::Human => Effect::AwaitHuman,
                Speaker::Automated => Effect::RequestReply,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Scenario;

    #[test]
    fn test_effect_sequence() {
        let mut conv =
            Conversation::create(&Scenario::new("Hello", "visible", "hidden"), 2).unwrap();
        assert_eq!(conv.next_effect(), Effect::AwaitHuman);

        conv.add_message("Hi").unwrap();
        assert_eq!(conv.next_effect(), Effect::RequestReply);

        conv.add_message("Bye").unwrap();
        assert_eq!(conv.next_effect(), Effect::RequestEvaluation);

        conv.set_evaluation("ok").unwrap();
        assert_eq!(conv.next_effect(), Effect::Archive);
    }
}
