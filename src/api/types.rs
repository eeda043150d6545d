//! API request and response types

use crate::state_machine::{ConvPhase, Conversation, Speaker};
use serde::{Deserialize, Serialize};

/// Request to send a human message
#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

/// One transcript entry with its author
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
}

/// What the front end may show for a session.
///
/// The hidden motivation and the evaluation stay out of the payload until the
/// conversation is finished.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationView {
    pub session_id: String,
    pub visible_context: String,
    pub transcript: Vec<TranscriptEntry>,
    pub finished: bool,
    pub phase: ConvPhase,
    pub remaining_automated_turns: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub true_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<String>,
}

impl ConversationView {
    pub fn new(session_id: &str, conv: &Conversation) -> Self {
        let finished = conv.is_finished();
        Self {
            session_id: session_id.to_string(),
            visible_context: conv.visible_context().to_string(),
            transcript: conv
                .entries()
                .map(|(speaker, text)| TranscriptEntry {
                    speaker,
                    text: text.to_string(),
                })
                .collect(),
            finished,
            phase: conv.phase(),
            remaining_automated_turns: conv.remaining_automated_turns(),
            true_context: finished.then(|| conv.true_context().to_string()),
            evaluation: conv.evaluation().map(str::to_string),
        }
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Whether sending the same request again may succeed
    pub retryable: bool,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, retryable: bool) -> Self {
        Self {
            error: error.into(),
            retryable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Scenario;

    #[test]
    fn test_view_hides_true_context_until_finished() {
        let mut conv =
            Conversation::create(&Scenario::new("Ugh.", "A neighbour.", "Lost keys."), 2).unwrap();
        let view = serde_json::to_value(ConversationView::new("s", &conv)).unwrap();
        assert!(view.get("true_context").is_none());
        assert_eq!(view["transcript"][0]["speaker"], "AUTOMATED");
        assert_eq!(view["remaining_automated_turns"], 0);
        assert_eq!(view["phase"], "active");

        conv.add_message("Ugh?").unwrap();
        conv.add_message("Never mind.").unwrap();
        let view = ConversationView::new("s", &conv);
        assert!(view.finished);
        assert_eq!(view.phase, ConvPhase::Finished);
        assert_eq!(view.true_context.as_deref(), Some("Lost keys."));
        assert_eq!(view.transcript[1].speaker, Speaker::Human);
        assert_eq!(view.evaluation, None);
    }
}
