//! # Encounters
//!
//! The encounter data model: a tagged union keyed by encounter category.
//!
//! Fields every encounter shares live on [`Encounter`]; the category-specific
//! payload lives in [`EncounterKind`]. In JSON the two are flattened into one
//! object and the `"type"` field selects the variant.

use super::mechanics::{render_placeholders, ScalingMechanic};
use super::monster::Monster;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Difficulty ladder for encounters. Ordered from easiest to hardest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Low,
    Moderate,
    High,
}

impl Difficulty {
    /// All difficulties, easiest first.
    pub const ALL: [Difficulty; 3] = [Difficulty::Low, Difficulty::Moderate, Difficulty::High];

    /// One step harder, saturating at `High`.
    pub fn step_up(self) -> Self {
        match self {
            Difficulty::Low => Difficulty::Moderate,
            Difficulty::Moderate | Difficulty::High => Difficulty::High,
        }
    }

    /// One step easier, saturating at `Low`.
    pub fn step_down(self) -> Self {
        match self {
            Difficulty::High => Difficulty::Moderate,
            Difficulty::Moderate | Difficulty::Low => Difficulty::Low,
        }
    }

    /// Column of this difficulty in the XP budget table.
    pub fn index(self) -> usize {
        match self {
            Difficulty::Low => 0,
            Difficulty::Moderate => 1,
            Difficulty::High => 2,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Difficulty::Low => "low",
            Difficulty::Moderate => "moderate",
            Difficulty::High => "high",
        };
        f.write_str(name)
    }
}

/// Encounter categories the content library is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncounterCategory {
    Combat,
    Boss,
    Social,
    Exploration,
    Rest,
    Treasure,
}

impl EncounterCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            EncounterCategory::Combat => "combat",
            EncounterCategory::Boss => "boss",
            EncounterCategory::Social => "social",
            EncounterCategory::Exploration => "exploration",
            EncounterCategory::Rest => "rest",
            EncounterCategory::Treasure => "treasure",
        }
    }
}

impl fmt::Display for EncounterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the creatures in an encounter regard the party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attitude {
    #[default]
    Hostile,
    Indifferent,
    Friendly,
}

/// Quality of the shelter a rest encounter offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShelterQuality {
    Poor,
    #[default]
    Fair,
    Good,
}

/// One way to resolve an encounter and what it pays out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinCondition {
    pub condition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<String>,
}

/// Roster and budget shared by combat and boss encounters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatDetails {
    pub xp_budget: u32,
    pub monsters: Vec<Monster>,
    #[serde(default)]
    pub attitude: Attitude,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality: Option<String>,
}

/// A boss fight: a combat roster plus boss-only mechanics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BossDetails {
    #[serde(flatten)]
    pub combat: CombatDetails,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub legendary_actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lair_actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialDetails {
    #[serde(default)]
    pub monsters: Vec<Monster>,
    #[serde(default)]
    pub attitude: Attitude,
    #[serde(default)]
    pub personality: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xp_budget: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorationDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xp_budget: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub puzzle_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dc: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub penalty: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestDetails {
    #[serde(default)]
    pub shelter_quality: ShelterQuality,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreasureDetails {
    #[serde(default)]
    pub xp_budget: u32,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub gold_value: u32,
    #[serde(default)]
    pub has_trap: bool,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub is_mimic: bool,
}

/// Category-specific encounter payload, tagged by `"type"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EncounterKind {
    Combat(CombatDetails),
    Boss(BossDetails),
    Social(SocialDetails),
    Exploration(ExplorationDetails),
    Rest(RestDetails),
    Treasure(TreasureDetails),
}

impl EncounterKind {
    pub fn category(&self) -> EncounterCategory {
        match self {
            EncounterKind::Combat(_) => EncounterCategory::Combat,
            EncounterKind::Boss(_) => EncounterCategory::Boss,
            EncounterKind::Social(_) => EncounterCategory::Social,
            EncounterKind::Exploration(_) => EncounterCategory::Exploration,
            EncounterKind::Rest(_) => EncounterCategory::Rest,
            EncounterKind::Treasure(_) => EncounterCategory::Treasure,
        }
    }

    /// The monster roster, if this kind fights with one.
    pub fn combat_details(&self) -> Option<&CombatDetails> {
        match self {
            EncounterKind::Combat(details) => Some(details),
            EncounterKind::Boss(boss) => Some(&boss.combat),
            EncounterKind::Social(_)
            | EncounterKind::Exploration(_)
            | EncounterKind::Rest(_)
            | EncounterKind::Treasure(_) => None,
        }
    }

    pub fn combat_details_mut(&mut self) -> Option<&mut CombatDetails> {
        match self {
            EncounterKind::Combat(details) => Some(details),
            EncounterKind::Boss(boss) => Some(&mut boss.combat),
            EncounterKind::Social(_)
            | EncounterKind::Exploration(_)
            | EncounterKind::Rest(_)
            | EncounterKind::Treasure(_) => None,
        }
    }
}

fn default_size() -> u32 {
    1
}

/// A single encounter as authored in the content library.
///
/// `level` is the level the encounter was written for; it decides the tier
/// the encounter belongs to and the baseline its mechanics scale from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encounter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub level: u8,
    pub difficulty: Difficulty,
    pub room_description: String,
    #[serde(default)]
    pub dm_description: Vec<String>,
    #[serde(default = "default_size")]
    pub size: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub win_conditions: Vec<WinCondition>,
    #[serde(default)]
    pub lair: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scaling_mechanics: Vec<ScalingMechanic>,
    #[serde(flatten)]
    pub kind: EncounterKind,
}

impl Encounter {
    pub fn category(&self) -> EncounterCategory {
        self.kind.category()
    }

    /// Authored XP value, when the category carries one.
    pub fn xp_budget(&self) -> Option<u32> {
        match &self.kind {
            EncounterKind::Combat(details) => Some(details.xp_budget),
            EncounterKind::Boss(boss) => Some(boss.combat.xp_budget),
            EncounterKind::Social(social) => social.xp_budget,
            EncounterKind::Exploration(exploration) => exploration.xp_budget,
            EncounterKind::Treasure(treasure) => Some(treasure.xp_budget),
            EncounterKind::Rest(_) => None,
        }
    }

    /// Monsters present in the encounter, empty for categories without any.
    pub fn monsters(&self) -> &[Monster] {
        match &self.kind {
            EncounterKind::Combat(details) => &details.monsters,
            EncounterKind::Boss(boss) => &boss.combat.monsters,
            EncounterKind::Social(social) => &social.monsters,
            EncounterKind::Exploration(_) | EncounterKind::Rest(_) | EncounterKind::Treasure(_) => &[],
        }
    }

    /// Replaces `{{id}}` placeholders in `text` with this encounter's mechanics.
    pub fn render_text(&self, text: &str) -> String {
        render_placeholders(text, &self.scaling_mechanics)
    }

    pub fn rendered_room_description(&self) -> String {
        self.render_text(&self.room_description)
    }

    pub fn rendered_dm_description(&self) -> Vec<String> {
        self.dm_description
            .iter()
            .map(|line| self.render_text(line))
            .collect()
    }
}
