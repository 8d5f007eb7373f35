//! # Encounter Library
//!
//! Tiered encounter content and the lookup contract the floor generator uses.

use super::encounter::{
    Attitude, CombatDetails, Difficulty, Encounter, EncounterCategory, EncounterKind, ExplorationDetails,
    RestDetails, ShelterQuality, SocialDetails, TreasureDetails,
};
use super::monster::{Monster, MonsterSource};
use crate::generation::Tier;
use crate::DelveResult;
use rand::seq::SliceRandom;
use rand::RngCore;
use std::collections::BTreeSet;
use std::path::Path;

const BUILTIN_ENCOUNTERS: &str = include_str!("../../data/encounters.json");

/// Name prefix shared by the stand-in encounters a library substitutes on a miss.
pub const DEFAULT_ENCOUNTER_PREFIX: &str = "Default ";

/// Optional filters for [`EncounterSource::random_encounter`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncounterQuery {
    pub difficulty: Option<Difficulty>,
    pub exclude_names: BTreeSet<String>,
    pub max_xp_budget: Option<u32>,
}

impl EncounterQuery {
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn excluding<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_names.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_max_xp_budget(mut self, max_xp_budget: u32) -> Self {
        self.max_xp_budget = Some(max_xp_budget);
        self
    }

    /// Whether `encounter` passes the difficulty, exclusion and XP filters.
    pub fn matches(&self, encounter: &Encounter) -> bool {
        self.difficulty.map_or(true, |d| encounter.difficulty == d)
            && !self.exclude_names.contains(&encounter.name)
            && match (self.max_xp_budget, encounter.xp_budget()) {
                (Some(max), Some(xp)) => xp <= max,
                _ => true,
            }
    }
}

/// Read-only source of encounter content.
///
/// A miss returns `None` rather than failing. Sources may instead hand back a
/// stand-in encounter for the category; callers must handle both.
pub trait EncounterSource {
    fn random_encounter(
        &self,
        level: u8,
        category: EncounterCategory,
        query: &EncounterQuery,
        rng: &mut dyn RngCore,
    ) -> Option<Encounter>;
}

/// In-memory encounter content, drawn from by tier.
#[derive(Debug, Clone, Default)]
pub struct EncounterLibrary {
    encounters: Vec<Encounter>,
    substitute_defaults: bool,
}

impl EncounterLibrary {
    /// A library that substitutes default encounters for non-combat misses.
    pub fn new(encounters: Vec<Encounter>) -> Self {
        Self {
            encounters,
            substitute_defaults: true,
        }
    }

    /// The content bundled with the crate.
    pub fn builtin() -> DelveResult<Self> {
        Self::from_json(BUILTIN_ENCOUNTERS)
    }

    pub fn from_json(json: &str) -> DelveResult<Self> {
        let encounters: Vec<Encounter> = serde_json::from_str(json)?;
        Ok(Self::new(encounters))
    }

    pub fn from_path(path: impl AsRef<Path>) -> DelveResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Disables default substitution so misses come back as `None`.
    pub fn without_defaults(mut self) -> Self {
        self.substitute_defaults = false;
        self
    }

    pub fn encounters(&self) -> &[Encounter] {
        &self.encounters
    }

    pub fn len(&self) -> usize {
        self.encounters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encounters.is_empty()
    }

    pub fn by_level(&self, level: u8) -> Vec<&Encounter> {
        self.encounters.iter().filter(|e| e.level == level).collect()
    }

    pub fn by_name(&self, name: &str) -> Option<&Encounter> {
        self.encounters.iter().find(|e| e.name == name)
    }

    pub fn by_category(&self, category: EncounterCategory) -> Vec<&Encounter> {
        self.encounters
            .iter()
            .filter(|e| e.category() == category)
            .collect()
    }

    /// Candidates in the same tier as `level`, authored at or below it.
    fn candidates(&self, level: u8, category: EncounterCategory, query: &EncounterQuery) -> Vec<&Encounter> {
        let tier = Tier::of(level);
        self.encounters
            .iter()
            .filter(|e| e.category() == category && Tier::of(e.level) == tier && e.level <= level)
            .filter(|e| query.matches(e))
            .collect()
    }
}

impl EncounterSource for EncounterLibrary {
    fn random_encounter(
        &self,
        level: u8,
        category: EncounterCategory,
        query: &EncounterQuery,
        rng: &mut dyn RngCore,
    ) -> Option<Encounter> {
        if let Some(encounter) = self.candidates(level, category, query).choose(rng) {
            return Some((*encounter).clone());
        }
        if self.substitute_defaults {
            default_encounter(category, level)
        } else {
            None
        }
    }
}

/// Stand-in encounter for a non-combat category. Combat and boss have none.
pub fn default_encounter(category: EncounterCategory, level: u8) -> Option<Encounter> {
    let (name, room_description, kind) = match category {
        EncounterCategory::Combat | EncounterCategory::Boss => return None,
        EncounterCategory::Social => (
            "Social Encounter",
            "A lone figure waits here, watching you approach.",
            EncounterKind::Social(SocialDetails {
                monsters: Vec::new(),
                attitude: Attitude::Indifferent,
                personality: "wary".to_string(),
                xp_budget: None,
            }),
        ),
        EncounterCategory::Exploration => (
            "Exploration",
            "An intricate mechanism or riddle bars the way forward.",
            EncounterKind::Exploration(ExplorationDetails::default()),
        ),
        EncounterCategory::Rest => (
            "Rest Stop",
            "A relatively safe spot to catch your breath and mend your wounds.",
            EncounterKind::Rest(RestDetails {
                shelter_quality: ShelterQuality::Fair,
            }),
        ),
        EncounterCategory::Treasure => (
            "Treasure Cache",
            "A glimmering chest lies half-buried in the shadows.",
            EncounterKind::Treasure(TreasureDetails::default()),
        ),
    };

    Some(Encounter {
        id: None,
        name: format!("{DEFAULT_ENCOUNTER_PREFIX}{name}"),
        level,
        difficulty: Difficulty::Low,
        room_description: room_description.to_string(),
        dm_description: Vec::new(),
        size: 1,
        win_conditions: Vec::new(),
        lair: false,
        scaling_mechanics: Vec::new(),
        kind,
    })
}

/// Builds a combat encounter from monster names, one individual per name.
///
/// Repeated names stack into a single roster entry. Unknown names are skipped;
/// if none resolve, returns `None`. Difficulty comes from XP per level:
/// above 400 is high, above 200 moderate, otherwise low.
pub fn build_custom_encounter<S: AsRef<str>>(
    monsters: &dyn MonsterSource,
    names: &[S],
    level: u8,
) -> Option<Encounter> {
    let mut roster: Vec<Monster> = Vec::new();
    for name in names {
        let Some(monster) = monsters.get_by_name(name.as_ref()) else {
            continue;
        };
        match roster.iter_mut().find(|m| m.name == monster.name) {
            Some(existing) => existing.count += 1,
            None => roster.push(monster.clone().with_count(1)),
        }
    }
    if roster.is_empty() {
        return None;
    }

    let total_xp: u32 = roster.iter().map(Monster::total_xp).sum();
    let xp_per_level = f64::from(total_xp) / f64::from(level.max(1));
    let difficulty = if xp_per_level > 400.0 {
        Difficulty::High
    } else if xp_per_level > 200.0 {
        Difficulty::Moderate
    } else {
        Difficulty::Low
    };
    let listing = names.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(", ");

    Some(Encounter {
        id: None,
        name: format!("Custom: {listing}"),
        level,
        difficulty,
        room_description: format!("A custom encounter featuring {listing}."),
        dm_description: vec![format!(
            "Custom encounter with {} monster type(s). Total XP: {total_xp}",
            roster.len()
        )],
        size: 1,
        win_conditions: Vec::new(),
        lair: false,
        scaling_mechanics: Vec::new(),
        kind: EncounterKind::Combat(CombatDetails {
            xp_budget: total_xp,
            monsters: roster,
            attitude: Attitude::Hostile,
            personality: None,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::MonsterLibrary;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn combat(name: &str, level: u8, difficulty: Difficulty, xp: u32) -> Encounter {
        Encounter {
            id: None,
            name: name.to_string(),
            level,
            difficulty,
            room_description: format!("{name} waits."),
            dm_description: Vec::new(),
            size: 1,
            win_conditions: Vec::new(),
            lair: false,
            scaling_mechanics: Vec::new(),
            kind: EncounterKind::Combat(CombatDetails {
                xp_budget: xp,
                monsters: vec![Monster::new("Goblin", 0.25, 50, 2).with_count(xp / 50)],
                attitude: Attitude::Hostile,
                personality: None,
            }),
        }
    }

    fn library() -> EncounterLibrary {
        EncounterLibrary::new(vec![
            combat("Ambush", 1, Difficulty::Low, 100),
            combat("Warband", 3, Difficulty::High, 400),
            combat("Ogre Den", 5, Difficulty::Moderate, 900),
        ])
    }

    #[test]
    fn test_random_encounter_stays_in_tier_and_level() {
        let library = library();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            let found = library
                .random_encounter(2, EncounterCategory::Combat, &EncounterQuery::default(), &mut rng)
                .unwrap();
            assert_eq!(found.name, "Ambush");
        }
        let found = library
            .random_encounter(6, EncounterCategory::Combat, &EncounterQuery::default(), &mut rng)
            .unwrap();
        assert_eq!(found.name, "Ogre Den");
    }

    #[test]
    fn test_query_filters() {
        let library = library();
        let mut rng = StdRng::seed_from_u64(2);

        let excluded = EncounterQuery::default().excluding(["Ambush"]);
        let found = library.random_encounter(4, EncounterCategory::Combat, &excluded, &mut rng);
        assert_eq!(found.map(|e| e.name), Some("Warband".to_string()));

        let capped = EncounterQuery::default().with_max_xp_budget(150);
        let found = library.random_encounter(4, EncounterCategory::Combat, &capped, &mut rng);
        assert_eq!(found.map(|e| e.name), Some("Ambush".to_string()));

        let high = EncounterQuery::default().with_difficulty(Difficulty::High);
        let found = library.random_encounter(4, EncounterCategory::Combat, &high, &mut rng);
        assert_eq!(found.map(|e| e.name), Some("Warband".to_string()));
    }

    #[test]
    fn test_misses_and_defaults() {
        let mut rng = StdRng::seed_from_u64(3);
        let query = EncounterQuery::default();

        let library = library();
        assert!(library
            .random_encounter(12, EncounterCategory::Combat, &query, &mut rng)
            .is_none());
        assert!(library
            .random_encounter(1, EncounterCategory::Boss, &query, &mut rng)
            .is_none());
        let rest = library
            .random_encounter(12, EncounterCategory::Rest, &query, &mut rng)
            .unwrap();
        assert!(rest.name.starts_with(DEFAULT_ENCOUNTER_PREFIX));
        assert_eq!(rest.level, 12);

        let strict = library.clone().without_defaults();
        assert!(strict
            .random_encounter(1, EncounterCategory::Rest, &query, &mut rng)
            .is_none());
    }

    #[test]
    fn test_catalog_queries() {
        let library = library();
        assert_eq!(library.len(), 3);
        assert_eq!(library.by_level(3).len(), 1);
        assert!(library.by_name("Ogre Den").is_some());
        assert_eq!(library.by_category(EncounterCategory::Combat).len(), 3);
        assert!(library.by_category(EncounterCategory::Social).is_empty());
    }

    #[test]
    fn test_build_custom_encounter() {
        let monsters = MonsterLibrary::new(vec![
            Monster::new("Goblin", 0.25, 50, 2),
            Monster::new("Goblin Boss", 1.0, 200, 2),
        ]);
        let custom = build_custom_encounter(&monsters, &["Goblin", "Goblin", "Goblin Boss", "Nobody"], 2).unwrap();
        assert_eq!(custom.xp_budget(), Some(300));
        assert_eq!(custom.difficulty, Difficulty::Low);
        assert_eq!(custom.monsters().len(), 2);
        assert_eq!(custom.monsters()[0].count, 2);

        let custom = build_custom_encounter(&monsters, &["Goblin Boss", "Goblin Boss", "Goblin Boss"], 1).unwrap();
        assert_eq!(custom.difficulty, Difficulty::High);

        assert!(build_custom_encounter(&monsters, &["Nobody"], 1).is_none());
    }

    #[test]
    fn test_builtin_content_loads() {
        let library = EncounterLibrary::builtin().unwrap();
        assert!(!library.is_empty());
        for category in [
            EncounterCategory::Combat,
            EncounterCategory::Boss,
            EncounterCategory::Social,
            EncounterCategory::Exploration,
            EncounterCategory::Rest,
            EncounterCategory::Treasure,
        ] {
            assert!(!library.by_category(category).is_empty(), "{category}");
        }
    }
}
