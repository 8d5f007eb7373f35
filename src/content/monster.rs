//! # Monsters
//!
//! Monster statblock summaries and the read-only monster roster.

use crate::DelveResult;
use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::path::Path;

const BUILTIN_MONSTERS: &str = include_str!("../../data/monsters.json");

fn default_count() -> u32 {
    1
}

/// A monster entry. `count` is only meaningful inside an encounter roster;
/// library entries carry a count of one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Monster {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub cr: f64,
    pub exp: u32,
    pub pb: u8,
    #[serde(default)]
    pub mm_link: String,
    #[serde(default = "default_count")]
    pub count: u32,
}

impl Monster {
    /// Creates a single monster with no id or manual link.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::Monster;
    ///
    /// let goblins = Monster::new("Goblin", 0.25, 50, 2).with_count(4);
    /// assert_eq!(goblins.total_xp(), 200);
    /// ```
    pub fn new(name: impl Into<String>, cr: f64, exp: u32, pb: u8) -> Self {
        Self {
            id: None,
            name: name.into(),
            cr,
            exp,
            pb,
            mm_link: String::new(),
            count: 1,
        }
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// XP of every individual of this type together.
    pub fn total_xp(&self) -> u32 {
        self.exp.saturating_mul(self.count)
    }
}

/// Read-only lookups over a monster roster. Misses return `None` or an empty list.
pub trait MonsterSource {
    fn get_by_id(&self, id: &str) -> Option<&Monster>;

    /// Exact name match, ignoring case.
    fn get_by_name(&self, name: &str) -> Option<&Monster>;

    /// Monsters with `min_cr <= cr <= max_cr`.
    fn get_by_cr_range(&self, min_cr: f64, max_cr: f64) -> Vec<&Monster>;

    /// Monsters whose name contains `query`, ignoring case.
    fn search(&self, query: &str) -> Vec<&Monster>;
}

/// In-memory monster roster loaded from JSON.
#[derive(Debug, Clone, Default)]
pub struct MonsterLibrary {
    monsters: Vec<Monster>,
}

impl MonsterLibrary {
    pub fn new(monsters: Vec<Monster>) -> Self {
        Self { monsters }
    }

    /// The roster bundled with the crate.
    pub fn builtin() -> DelveResult<Self> {
        Self::from_json(BUILTIN_MONSTERS)
    }

    pub fn from_json(json: &str) -> DelveResult<Self> {
        let monsters: Vec<Monster> = serde_json::from_str(json)?;
        Ok(Self::new(monsters))
    }

    pub fn from_path(path: impl AsRef<Path>) -> DelveResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn monsters(&self) -> &[Monster] {
        &self.monsters
    }

    pub fn len(&self) -> usize {
        self.monsters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monsters.is_empty()
    }

    /// Merges entries by id: matching ids are replaced, new ones appended.
    pub fn update_monsters(&mut self, updates: impl IntoIterator<Item = Monster>) {
        for update in updates {
            let existing = update
                .id
                .as_deref()
                .and_then(|id| self.monsters.iter().position(|m| m.id.as_deref() == Some(id)));
            match existing {
                Some(index) => self.monsters[index] = update,
                None => self.monsters.push(update),
            }
        }
    }

    pub fn get_by_exp_range(&self, min_exp: u32, max_exp: u32) -> Vec<&Monster> {
        self.monsters
            .iter()
            .filter(|m| (min_exp..=max_exp).contains(&m.exp))
            .collect()
    }

    pub fn random_monster(&self, min_cr: f64, max_cr: f64, rng: &mut dyn RngCore) -> Option<&Monster> {
        self.get_by_cr_range(min_cr, max_cr).choose(rng).copied()
    }

    /// Monsters within two challenge ratings of the party level.
    pub fn monsters_for_party_level(&self, party_level: u8) -> Vec<&Monster> {
        let level = f64::from(party_level);
        self.get_by_cr_range((level - 2.0).max(0.0), level + 2.0)
    }

    /// XP of one of each named monster. Unknown names count as zero.
    pub fn total_xp<S: AsRef<str>>(&self, names: &[S]) -> u32 {
        names
            .iter()
            .filter_map(|name| self.get_by_name(name.as_ref()))
            .map(|monster| monster.exp)
            .sum()
    }
}

impl MonsterSource for MonsterLibrary {
    fn get_by_id(&self, id: &str) -> Option<&Monster> {
        self.monsters.iter().find(|m| m.id.as_deref() == Some(id))
    }

    fn get_by_name(&self, name: &str) -> Option<&Monster> {
        self.monsters.iter().find(|m| m.name.eq_ignore_ascii_case(name))
    }

    fn get_by_cr_range(&self, min_cr: f64, max_cr: f64) -> Vec<&Monster> {
        self.monsters
            .iter()
            .filter(|m| m.cr >= min_cr && m.cr <= max_cr)
            .collect()
    }

    fn search(&self, query: &str) -> Vec<&Monster> {
        let query = query.to_lowercase();
        self.monsters
            .iter()
            .filter(|m| m.name.to_lowercase().contains(&query))
            .collect()
    }
}
