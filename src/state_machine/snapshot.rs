//! Storage-ready representation of a conversation
//!
//! Field names follow the persisted record layout, so snapshots written by
//! older deployments (`num_of_messages_sent_by_agent`, `USER`/`CHATBOT`)
//! still load.

use super::state::{Conversation, Speaker};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Flat, serializable record of a conversation's full state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    pub max_messages: u32,
    pub messages: Vec<String>,
    pub current_speaker: Speaker,
    pub finished: bool,
    /// Hidden motivation
    pub context: String,
    pub user_visible_context: String,
    #[serde(alias = "num_of_messages_sent_by_agent")]
    pub automated_turns_taken: u32,
    #[serde(default)]
    pub evaluation: Option<String>,
}

/// A snapshot that no sequence of transitions could have produced
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("max_messages must be a positive even number, got {0}")]
    InvalidMaxMessages(u32),
    #[error("Snapshot has no messages; the opener is always present")]
    EmptyTranscript,
    #[error("current_speaker is {actual} but {len} messages imply {expected}")]
    TurnMismatch {
        actual: Speaker,
        expected: Speaker,
        len: usize,
    },
    #[error("automated_turns_taken is {actual} but the transcript holds {expected} automated messages")]
    AutomatedCountMismatch { actual: u32, expected: u32 },
    #[error("finished flag is {actual} but the turn budget implies {expected}")]
    FinishedMismatch { actual: bool, expected: bool },
    #[error("{len} messages exceed what max_messages {max_messages} allows")]
    TranscriptTooLong { len: usize, max_messages: u32 },
    #[error("Evaluation present on an unfinished conversation")]
    PrematureEvaluation,
}

impl Conversation {
    pub fn to_snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            max_messages: self.max_messages,
            messages: self.transcript.clone(),
            current_speaker: self.current_turn,
            finished: self.finished,
            context: self.true_context.clone(),
            user_visible_context: self.visible_context.clone(),
            automated_turns_taken: self.automated_turns_taken,
            evaluation: self.evaluation.clone(),
        }
    }

    /// Rebuild a conversation, rejecting snapshots that break the invariants
    pub fn from_snapshot(snapshot: ConversationSnapshot) -> Result<Self, SnapshotError> {
        validate(&snapshot)?;
        Ok(Self {
            max_messages: snapshot.max_messages,
            transcript: snapshot.messages,
            current_turn: snapshot.current_speaker,
            finished: snapshot.finished,
            true_context: snapshot.context,
            visible_context: snapshot.user_visible_context,
            automated_turns_taken: snapshot.automated_turns_taken,
            evaluation: snapshot.evaluation,
        })
    }
}

fn validate(snapshot: &ConversationSnapshot) -> Result<(), SnapshotError> {
    let max = snapshot.max_messages;
    if max == 0 || max % 2 != 0 {
        return Err(SnapshotError::InvalidMaxMessages(max));
    }

    let len = snapshot.messages.len();
    if len == 0 {
        return Err(SnapshotError::EmptyTranscript);
    }

    let expected_turn = Conversation::author_of(len);
    if snapshot.current_speaker != expected_turn {
        return Err(SnapshotError::TurnMismatch {
            actual: snapshot.current_speaker,
            expected: expected_turn,
            len,
        });
    }

    // Even positions are automated: ceil(len / 2)
    let expected_automated = u32::try_from(len.div_ceil(2)).unwrap_or(u32::MAX);
    if snapshot.automated_turns_taken != expected_automated {
        return Err(SnapshotError::AutomatedCountMismatch {
            actual: snapshot.automated_turns_taken,
            expected: expected_automated,
        });
    }

    // The finishing automated message is the last one ever accepted
    let automated_budget = usize::try_from(max / 2).unwrap_or(usize::MAX).max(2);
    if len > 2 * automated_budget - 1 {
        return Err(SnapshotError::TranscriptTooLong {
            len,
            max_messages: max,
        });
    }

    // Only an accepted automated message (anything past the opener) can finish
    let budget_spent = i64::from(max / 2) - i64::from(expected_automated) <= 0;
    let expected_finished = len > 1 && expected_turn == Speaker::Human && budget_spent;
    if snapshot.finished != expected_finished {
        return Err(SnapshotError::FinishedMismatch {
            actual: snapshot.finished,
            expected: expected_finished,
        });
    }

    if snapshot.evaluation.is_some() && !snapshot.finished {
        return Err(SnapshotError::PrematureEvaluation);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Scenario;
    use serde_json::json;

    fn finished_conv() -> Conversation {
        let mut conv =
            Conversation::create(&Scenario::new("Hello", "visible", "hidden"), 2).unwrap();
        conv.add_message("Hi").unwrap();
        conv.add_message("Bye").unwrap();
        conv.set_evaluation("Solid reflections.").unwrap();
        conv
    }

    #[test]
    fn test_snapshot_json_layout() {
        let value = serde_json::to_value(finished_conv().to_snapshot()).unwrap();
        assert_eq!(
            value,
            json!({
                "max_messages": 2,
                "messages": ["Hello", "Hi", "Bye"],
                "current_speaker": "HUMAN",
                "finished": true,
                "context": "hidden",
                "user_visible_context": "visible",
                "automated_turns_taken": 2,
                "evaluation": "Solid reflections."
            })
        );
    }

    #[test]
    fn test_round_trip_through_json() {
        let conv = finished_conv();
        let text = serde_json::to_string(&conv.to_snapshot()).unwrap();
        let parsed: ConversationSnapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(Conversation::from_snapshot(parsed).unwrap(), conv);
    }

    #[test]
    fn test_legacy_record_loads() {
        let legacy = json!({
            "max_messages": 20,
            "messages": ["Guess who I bumped into at the gym today?", "Who?"],
            "current_speaker": "CHATBOT",
            "finished": false,
            "context": "Lonely.",
            "user_visible_context": "Your gym buddy.",
            "num_of_messages_sent_by_agent": 1,
            "evaluation": null
        });
        let snapshot: ConversationSnapshot = serde_json::from_value(legacy).unwrap();
        let conv = Conversation::from_snapshot(snapshot).unwrap();
        assert_eq!(conv.current_turn(), Speaker::Automated);
        assert_eq!(conv.remaining_automated_turns(), 9);
    }

    #[test]
    fn test_rejects_turn_mismatch() {
        let mut snapshot = finished_conv().to_snapshot();
        snapshot.current_speaker = Speaker::Automated;
        assert!(matches!(
            Conversation::from_snapshot(snapshot),
            Err(SnapshotError::TurnMismatch { len: 3, .. })
        ));
    }

    #[test]
    fn test_rejects_count_mismatch() {
        let mut snapshot = finished_conv().to_snapshot();
        snapshot.automated_turns_taken = 5;
        assert_eq!(
            Conversation::from_snapshot(snapshot),
            Err(SnapshotError::AutomatedCountMismatch {
                actual: 5,
                expected: 2
            })
        );
    }

    #[test]
    fn test_rejects_unfinished_with_evaluation() {
        let conv = Conversation::create(&Scenario::new("Hello", "v", "h"), 20).unwrap();
        let mut snapshot = conv.to_snapshot();
        snapshot.evaluation = Some("too soon".to_string());
        assert_eq!(
            Conversation::from_snapshot(snapshot),
            Err(SnapshotError::PrematureEvaluation)
        );
    }

    #[test]
    fn test_rejects_wrong_finished_flag() {
        let mut snapshot = finished_conv().to_snapshot();
        snapshot.finished = false;
        snapshot.evaluation = None;
        assert_eq!(
            Conversation::from_snapshot(snapshot),
            Err(SnapshotError::FinishedMismatch {
                actual: false,
                expected: true
            })
        );
    }

    #[test]
    fn test_rejects_overlong_transcript() {
        let snapshot = ConversationSnapshot {
            max_messages: 4,
            messages: vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()],
            current_speaker: Speaker::Human,
            finished: true,
            context: "h".into(),
            user_visible_context: "v".into(),
            automated_turns_taken: 3,
            evaluation: None,
        };
        assert_eq!(
            Conversation::from_snapshot(snapshot),
            Err(SnapshotError::TranscriptTooLong {
                len: 5,
                max_messages: 4
            })
        );
    }

    #[test]
    fn test_rejects_empty_and_odd() {
        let mut snapshot = finished_conv().to_snapshot();
        snapshot.messages.clear();
        assert_eq!(
            Conversation::from_snapshot(snapshot),
            Err(SnapshotError::EmptyTranscript)
        );

        let mut snapshot = finished_conv().to_snapshot();
        snapshot.max_messages = 3;
        assert_eq!(
            Conversation::from_snapshot(snapshot),
            Err(SnapshotError::InvalidMaxMessages(3))
        );
    }
}
