//! Opening scenarios
//!
//! A scenario is chosen once per conversation: the opener the automated party
//! sends, the framing the human sees, and the motivation revealed at the end.

mod catalog;

use crate::config::ConfigError;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One opening scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// First message, attributed to the automated party
    pub opener: String,
    /// Framing shown to the human before the conversation ends
    pub visible_context: String,
    /// Hidden motivation, revealed only once the conversation is finished
    pub true_context: String,
}

impl Scenario {
    pub fn new(
        opener: impl Into<String>,
        visible_context: impl Into<String>,
        true_context: impl Into<String>,
    ) -> Self {
        Self {
            opener: opener.into(),
            visible_context: visible_context.into(),
            true_context: true_context.into(),
        }
    }
}

/// Uniform random choice over a fixed, non-empty catalog
#[derive(Debug, Clone)]
pub struct ScenarioSelector {
    catalog: Vec<Scenario>,
}

impl ScenarioSelector {
    pub fn new(catalog: Vec<Scenario>) -> Result<Self, ConfigError> {
        if catalog.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }
        Ok(Self { catalog })
    }

    /// Selector over the built-in starters
    pub fn builtin() -> Self {
        Self {
            catalog: catalog::builtin_scenarios(),
        }
    }

    /// Pick a scenario. The caller owns the randomness so tests can seed it.
    pub fn select<R: Rng + ?Sized>(&self, rng: &mut R) -> &Scenario {
        // Non-empty is guaranteed by construction
        self.catalog
            .choose(rng)
            .unwrap_or_else(|| &self.catalog[0])
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    #[allow(dead_code)] // Pairs with len()
    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }
}
