//! # Delve
//!
//! Procedural floor generation and encounter scaling for a layered dungeon-crawler map.
//!
//! ## Architecture Overview
//!
//! A run descends through floors. Each floor is a directed acyclic graph of
//! encounter nodes arranged in layers, from a single start node at the bottom
//! to a single boss node at the top. The crate is organised around a few
//! key pieces:
//!
//! - **Content**: encounter and monster libraries behind read-only lookup traits
//! - **Generation**: floor layout, node typing under caps, encounter attachment,
//!   and the scaler that rebalances encounters for a party
//! - **Map**: the generated node graph and its node status state machine
//! - **Run**: bookkeeping that drives a run across floors
//!
//! Generation and scaling are pure, synchronous computations. Every random draw
//! goes through an injected [`rand::Rng`], so a seeded generator replays exactly.

pub mod content;
pub mod generation;
pub mod map;
pub mod run;

// Core module re-exports
pub use content::*;
pub use generation::*;
pub use map::*;
pub use run::*;

/// Core error type for the Delve engine.
///
/// Missing content is never an error here: lookups return `None` and the
/// generator falls back to placeholder descriptions. Only misuse by the caller
/// surfaces as a `DelveError`.
#[derive(thiserror::Error, Debug)]
pub enum DelveError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Generation parameters are out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A generated floor broke a structural invariant
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// No node with this id exists on the floor
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    /// A node status transition was requested from the wrong state
    #[error("Cannot {action} node {node_id} while it is {status}")]
    InvalidTransition {
        node_id: String,
        status: NodeStatus,
        action: &'static str,
    },

    /// Run state does not allow the requested operation
    #[error("Invalid run state: {0}")]
    InvalidState(String),

    /// The run has already reached the last floor
    #[error("Run is complete: no floors left below floor {0}")]
    RunComplete(u32),
}

/// Result type used throughout the Delve codebase.
pub type DelveResult<T> = Result<T, DelveError>;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine-wide constants.
pub mod config {
    /// Floors in a complete dungeon
    pub const TOTAL_FLOORS: u32 = 21;

    /// Vertical padding above the boss node and below the start node
    pub const MAP_PADDING: f64 = 100.0;

    /// Share of the map width that interior nodes are spread across
    pub const LAYER_SPREAD: f64 = 0.8;

    /// Party size the authored encounters assume
    pub const BASE_PARTY_SIZE: u32 = 4;

    /// Highest character level
    pub const MAX_LEVEL: u8 = 20;

    /// Largest party the scaler accepts
    pub const MAX_PARTY_SIZE: u32 = 12;

    /// Monster count at which a swarm substitution is attempted
    pub const SWARM_THRESHOLD: u32 = 5;

    /// Individuals folded into one swarm unit
    pub const SWARM_BLOCK: u32 = 8;

    /// Fraction of the target XP below which minions are added
    pub const MINION_TOP_UP_RATIO: f64 = 0.8;

    /// Challenge rating ceiling for minion top-ups
    pub const MINION_MAX_CR: f64 = 0.25;

    /// XP range a minion must fall in
    pub const MINION_XP_RANGE: std::ops::RangeInclusive<u32> = 10..=50;

    /// Layers beneath the boss in which rest placement may begin
    pub const REST_START_WINDOW: usize = 2;
}
