//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across arbitrary message sequences
//! and conversation sizes.

use super::*;
use crate::scenario::Scenario;
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_scenario() -> Scenario {
    Scenario::new(
        "Something funny happened at the store today",
        "Your close friend messages you.",
        "Wants to talk about trouble at home.",
    )
}

/// Feed messages until one is rejected; returns the number accepted
fn feed(conv: &mut Conversation, messages: &[String]) -> usize {
    let mut accepted = 0;
    for text in messages {
        if conv.add_message(text.clone()).is_err() {
            break;
        }
        accepted += 1;
    }
    accepted
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_max_messages() -> impl Strategy<Value = u32> {
    (1u32..=15).prop_map(|half| half * 2)
}

fn arb_message() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ,.!?']{0,40}"
}

fn arb_messages() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(arb_message(), 0..40)
}

/// Any conversation reachable from `create` by a prefix of messages
fn arb_reachable_conversation() -> impl Strategy<Value = Conversation> {
    (arb_max_messages(), arb_messages(), any::<bool>(), arb_message()).prop_map(
        |(max, messages, evaluate, evaluation)| {
            let mut conv = Conversation::create(&test_scenario(), max).unwrap();
            feed(&mut conv, &messages);
            if evaluate && conv.is_finished() {
                conv.set_evaluation(evaluation).unwrap();
            }
            conv
        },
    )
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Transcript length is accepted calls plus the opener
    #[test]
    fn prop_transcript_len_counts_accepted(max in arb_max_messages(), messages in arb_messages()) {
        let mut conv = Conversation::create(&test_scenario(), max).unwrap();
        let mut accepted = 0usize;
        for text in &messages {
            if conv.add_message(text.clone()).is_ok() {
                accepted += 1;
            }
            prop_assert_eq!(conv.transcript().len(), accepted + 1);
        }
    }

    // Turns strictly alternate
    #[test]
    fn prop_turns_alternate(max in arb_max_messages(), messages in arb_messages()) {
        let mut conv = Conversation::create(&test_scenario(), max).unwrap();
        let mut last_author = Speaker::Automated; // the opener
        for text in &messages {
            let before = conv.current_turn();
            match conv.add_message(text.clone()) {
                Ok(author) => {
                    prop_assert_eq!(author, before);
                    prop_assert_ne!(author, last_author);
                    prop_assert_eq!(conv.current_turn(), before.toggle());
                    last_author = author;
                }
                Err(_) => prop_assert_eq!(conv.current_turn(), before),
            }
        }
    }

    // Once finished, always finished, and nothing else gets in
    #[test]
    fn prop_finished_is_monotonic(max in arb_max_messages(), messages in arb_messages()) {
        let mut conv = Conversation::create(&test_scenario(), max).unwrap();
        let mut seen_finished = false;
        for text in &messages {
            let before = conv.clone();
            let result = conv.add_message(text.clone());
            if seen_finished {
                prop_assert_eq!(result, Err(TransitionError::Finished));
                prop_assert_eq!(&conv, &before);
            }
            seen_finished |= conv.is_finished();
            prop_assert!(!seen_finished || conv.is_finished());
        }
    }

    // Remaining budget drops by one per automated message, never on human ones
    #[test]
    fn prop_remaining_tracks_author(max in arb_max_messages(), messages in arb_messages()) {
        let mut conv = Conversation::create(&test_scenario(), max).unwrap();
        for text in &messages {
            let before = conv.remaining_automated_turns();
            match conv.add_message(text.clone()) {
                Ok(Speaker::Automated) => {
                    prop_assert_eq!(conv.remaining_automated_turns(), before - 1);
                }
                Ok(Speaker::Human) | Err(_) => {
                    prop_assert_eq!(conv.remaining_automated_turns(), before);
                }
            }
        }
    }

    // The finish lands exactly when the automated budget is used up
    #[test]
    fn prop_finish_on_budget(max in arb_max_messages(), messages in arb_messages()) {
        let mut conv = Conversation::create(&test_scenario(), max).unwrap();
        for text in &messages {
            if let Ok(author) = conv.add_message(text.clone()) {
                let exhausted = conv.remaining_automated_turns() <= 0;
                prop_assert_eq!(conv.is_finished(), author == Speaker::Automated && exhausted);
            }
        }
    }

    // Snapshots reproduce any reachable conversation field for field
    #[test]
    fn prop_snapshot_round_trip(conv in arb_reachable_conversation()) {
        let json = serde_json::to_string(&conv.to_snapshot()).unwrap();
        let snapshot: ConversationSnapshot = serde_json::from_str(&json).unwrap();
        let restored = Conversation::from_snapshot(snapshot).unwrap();
        prop_assert_eq!(restored, conv);
    }

    // Rendering is stable and emits one line per message
    #[test]
    fn prop_render_is_stable(conv in arb_reachable_conversation()) {
        let first = conv.render_transcript();
        prop_assert_eq!(&first, &conv.render_transcript());
        prop_assert_eq!(first.lines().count(), conv.transcript().len());
        prop_assert!(first.starts_with("<CHATBOT>: "));
    }

    // The pending effect always agrees with the state
    #[test]
    fn prop_effect_matches_state(conv in arb_reachable_conversation()) {
        let expected = match (conv.phase(), conv.evaluation(), conv.current_turn()) {
            (ConvPhase::Finished, Some(_), _) => Effect::Archive,
            (ConvPhase::Finished, None, _) => Effect::RequestEvaluation,
            (ConvPhase::Active, _, Speaker::Human) => Effect::AwaitHuman,
            (ConvPhase::Active, _, Speaker::Automated) => Effect::RequestReply,
        };
        prop_assert_eq!(conv.next_effect(), expected);
    }
}
