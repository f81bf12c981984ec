//! Personality traits that bias dialogue and voting.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Four traits, each a float in a fixed band, rolled once per agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    /// Chance of speaking a second line in discussion. Range 0.3 to 0.9.
    pub talkativeness: f64,
    /// Willingness to pile onto accusations and vote noise. Range 0.1 to 0.6.
    pub paranoia: f64,
    /// Readiness to accuse on thin evidence. Range 0.3 to 0.8.
    pub confidence: f64,
    /// Weight given to alibi partners when voting. Range 0.2 to 0.8.
    pub loyalty: f64,
}

impl Personality {
    /// Roll a fresh personality.
    pub fn roll(rng: &mut impl Rng) -> Self {
        Self {
            talkativeness: 0.3 + rng.random::<f64>() * 0.6,
            paranoia: 0.1 + rng.random::<f64>() * 0.5,
            confidence: 0.3 + rng.random::<f64>() * 0.5,
            loyalty: 0.2 + rng.random::<f64>() * 0.6,
        }
    }
}

impl Default for Personality {
    fn default() -> Self {
        Self {
            talkativeness: 0.6,
            paranoia: 0.35,
            confidence: 0.55,
            loyalty: 0.5,
        }
    }
}
