//! # XP Budgets
//!
//! The per-character XP budget table and the four level tiers.

use crate::config::MAX_LEVEL;
use crate::content::Difficulty;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// Per-character XP budget by level (row) and difficulty (low, moderate, high).
pub const XP_BUDGET_TABLE: [[u32; 3]; 20] = [
    [50, 75, 100],
    [100, 150, 200],
    [150, 225, 400],
    [250, 375, 500],
    [500, 750, 1_100],
    [600, 1_000, 1_400],
    [750, 1_300, 1_700],
    [1_000, 1_700, 2_100],
    [1_300, 2_000, 2_600],
    [1_600, 2_300, 3_100],
    [1_900, 2_900, 4_100],
    [2_200, 3_700, 4_700],
    [2_600, 4_200, 5_400],
    [2_900, 4_900, 6_200],
    [3_300, 5_400, 7_800],
    [3_800, 6_100, 9_800],
    [4_500, 7_200, 11_700],
    [5_000, 8_700, 14_200],
    [5_500, 10_700, 17_200],
    [6_400, 13_200, 22_000],
];

/// Level band encounters are authored for. Scaling never crosses a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    One,
    Two,
    Three,
    Four,
}

impl Tier {
    /// Tier of a character or encounter level. Levels outside 1..=20 clamp.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::Tier;
    ///
    /// assert_eq!(Tier::of(4), Tier::One);
    /// assert_eq!(Tier::of(5), Tier::Two);
    /// assert_eq!(Tier::of(16), Tier::Three);
    /// assert_eq!(Tier::of(17), Tier::Four);
    /// ```
    pub fn of(level: u8) -> Self {
        match level {
            0..=4 => Tier::One,
            5..=10 => Tier::Two,
            11..=16 => Tier::Three,
            _ => Tier::Four,
        }
    }

    pub fn levels(self) -> RangeInclusive<u8> {
        match self {
            Tier::One => 1..=4,
            Tier::Two => 5..=10,
            Tier::Three => 11..=16,
            Tier::Four => 17..=20,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let number = match self {
            Tier::One => 1,
            Tier::Two => 2,
            Tier::Three => 3,
            Tier::Four => 4,
        };
        write!(f, "tier {number}")
    }
}

/// Budget for one character of `level` at `difficulty`.
pub fn xp_budget_per_character(level: u8, difficulty: Difficulty) -> u32 {
    let row = usize::from(level.clamp(1, MAX_LEVEL)) - 1;
    XP_BUDGET_TABLE[row][difficulty.index()]
}

/// The three difficulty budgets for a whole party.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartyBudget {
    pub low: u32,
    pub moderate: u32,
    pub high: u32,
}

impl PartyBudget {
    pub fn for_party(size: u32, level: u8) -> Self {
        let total = |difficulty| xp_budget_per_character(level, difficulty).saturating_mul(size);
        Self {
            low: total(Difficulty::Low),
            moderate: total(Difficulty::Moderate),
            high: total(Difficulty::High),
        }
    }

    pub fn get(&self, difficulty: Difficulty) -> u32 {
        match difficulty {
            Difficulty::Low => self.low,
            Difficulty::Moderate => self.moderate,
            Difficulty::High => self.high,
        }
    }

    /// Difficulty whose budget `xp` sits closest to, split at the midpoints.
    pub fn best_fit(&self, xp: f64) -> Difficulty {
        let low_moderate = (f64::from(self.low) + f64::from(self.moderate)) / 2.0;
        let moderate_high = (f64::from(self.moderate) + f64::from(self.high)) / 2.0;
        if xp < low_moderate {
            Difficulty::Low
        } else if xp < moderate_high {
            Difficulty::Moderate
        } else {
            Difficulty::High
        }
    }
}
