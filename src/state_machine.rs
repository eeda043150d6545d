//! Core conversation state machine
//!
//! Pure data and transition logic for one bounded exchange. No I/O happens
//! here; the runtime decides what to do next by asking for the pending
//! [`Effect`].

mod effect;
mod snapshot;
pub mod state;
mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use snapshot::{ConversationSnapshot, SnapshotError};
pub use state::{ConvPhase, Conversation, Speaker};
pub use transition::TransitionError;
