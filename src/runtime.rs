//! Runtime for driving conversations
//!
//! The state machine decides what happens next; the runtime performs it:
//! reading human input, calling the text backend, evaluating, archiving.

mod driver;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use driver::{DialogueDriver, DriverError, DriverSettings};
pub use traits::*;

use std::sync::Arc;

/// Driver over trait objects, shared by the HTTP and terminal front ends
pub type SharedDriver = DialogueDriver<Arc<dyn TextGenerator>, Arc<dyn ConversationStore>>;
