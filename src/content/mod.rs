//! # Content Module
//!
//! Encounter and monster data plus the read-only sources the generator draws from.
//!
//! The libraries here are the static content of the game. The generator and the
//! scaler only see them through the [`EncounterSource`] and [`MonsterSource`]
//! traits, so tests and callers can substitute their own content.

pub mod encounter;
pub mod library;
pub mod mechanics;
pub mod monster;

pub use encounter::*;
pub use library::*;
pub use mechanics::*;
pub use monster::*;
