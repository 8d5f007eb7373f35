//! # Generation Module
//!
//! Procedural floor generation and encounter scaling.
//!
//! A floor is built in a fixed order: layer geometry, node types under caps,
//! encounter attachment (each encounter scaled for the party), then the
//! layer-to-layer edges. Every step draws from one injected random source, so
//! a seed and a content library fully determine the floor.

pub mod budget;
pub mod connectivity;
pub mod floor;
pub mod node_types;
pub mod scaling;
pub mod stats;

pub use budget::*;
pub use connectivity::*;
pub use floor::*;
pub use node_types::*;
pub use scaling::*;
pub use stats::*;

use crate::config::TOTAL_FLOORS;
use crate::{DelveError, DelveResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameters for generating one floor.
///
/// Serializes to the camelCase JSON the CLI reads with `--config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Random seed for reproducible generation
    pub seed: u64,
    /// Layers above the start layer, boss layer included
    pub layers_per_floor: usize,
    /// Floor being generated, 1-based
    pub current_floor: u32,
    /// Map width in map units
    pub width: f64,
    /// Map height in map units
    pub height: f64,
    /// Per-type node caps by type name; [`NodeTypeCaps::default`] when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type_counts: Option<BTreeMap<String, u32>>,
    /// Party that encounters are scaled for
    #[serde(default)]
    pub party: PartyConfig,
}

impl GenerationConfig {
    /// Creates the standard configuration: fifteen layers on floor one for a
    /// party of four level-1 characters.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::GenerationConfig;
    ///
    /// let config = GenerationConfig::new(7);
    /// assert_eq!(config.layers_per_floor, 15);
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            layers_per_floor: 15,
            current_floor: 1,
            width: 800.0,
            height: 2000.0,
            node_type_counts: None,
            party: PartyConfig::default(),
        }
    }

    /// Creates a short floor with tight caps for tests.
    pub fn for_testing(seed: u64) -> Self {
        let counts = [("combat", 10), ("rest", 1), ("treasure", 1), ("social", 1), ("exploration", 1)]
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect();
        Self {
            layers_per_floor: 5,
            node_type_counts: Some(counts),
            ..Self::new(seed)
        }
    }

    pub fn with_party(mut self, party: PartyConfig) -> Self {
        self.party = party;
        self
    }

    /// Node caps after normalization.
    pub fn node_type_caps(&self) -> NodeTypeCaps {
        self.node_type_counts
            .as_ref()
            .map(NodeTypeCaps::from_counts)
            .unwrap_or_default()
    }

    /// Total layers including the dedicated start layer.
    pub fn layer_count(&self) -> usize {
        self.layers_per_floor + 1
    }

    /// Rejects parameters that would make a floor structurally impossible.
    pub fn validate(&self) -> DelveResult<()> {
        if self.layers_per_floor < 2 {
            return Err(DelveError::InvalidConfig(format!(
                "layersPerFloor must be at least 2, got {}",
                self.layers_per_floor
            )));
        }
        if !(1..=TOTAL_FLOORS).contains(&self.current_floor) {
            return Err(DelveError::InvalidConfig(format!(
                "currentFloor {} is outside 1..={TOTAL_FLOORS}",
                self.current_floor
            )));
        }
        if !(self.width.is_finite() && self.width > 0.0 && self.height.is_finite() && self.height > 0.0) {
            return Err(DelveError::InvalidConfig(format!(
                "map dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        self.party.validate()
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new(42)
    }
}

/// Trait for procedural generators.
pub trait Generator<T> {
    /// Generates content using the provided configuration and random number generator.
    fn generate<R: Rng>(&self, config: &GenerationConfig, rng: &mut R) -> DelveResult<T>;

    /// Validates that the generated content meets requirements.
    fn validate(&self, content: &T, config: &GenerationConfig) -> DelveResult<()>;

    /// Gets the generator type name for logging and debugging.
    fn generator_type(&self) -> &'static str;
}

/// Utility functions for generation algorithms.
pub mod utils {
    use super::GenerationConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Creates a seeded random number generator from the config.
    pub fn create_rng(config: &GenerationConfig) -> StdRng {
        StdRng::seed_from_u64(config.seed)
    }
}
