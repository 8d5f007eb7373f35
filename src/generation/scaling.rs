//! # Encounter Scaling
//!
//! Rebalances an authored encounter for a party of arbitrary size and level.
//!
//! Scaling never leaves the encounter's tier. Within a tier it does three things:
//! raises DCs and damage for over-leveled parties, resizes combat rosters for
//! the party size, and tops rosters up toward the XP budget of the difficulty
//! the encounter already best represents.

use super::budget::{PartyBudget, Tier};
use crate::config::{
    BASE_PARTY_SIZE, MAX_LEVEL, MAX_PARTY_SIZE, MINION_MAX_CR, MINION_TOP_UP_RATIO, MINION_XP_RANGE,
    SWARM_BLOCK, SWARM_THRESHOLD,
};
use crate::content::{scale_mechanics, CombatDetails, Difficulty, Encounter, Monster, MonsterSource};
use crate::{DelveError, DelveResult};
use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// The party an encounter is scaled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyConfig {
    pub size: u32,
    pub average_level: u8,
}

impl PartyConfig {
    pub fn new(size: u32, average_level: u8) -> Self {
        Self { size, average_level }
    }

    pub fn validate(&self) -> DelveResult<()> {
        if !(1..=MAX_PARTY_SIZE).contains(&self.size) {
            return Err(DelveError::InvalidConfig(format!(
                "party size {} is outside 1..={MAX_PARTY_SIZE}",
                self.size
            )));
        }
        if !(1..=MAX_LEVEL).contains(&self.average_level) {
            return Err(DelveError::InvalidConfig(format!(
                "average party level {} is outside 1..={MAX_LEVEL}",
                self.average_level
            )));
        }
        Ok(())
    }

    pub fn tier(&self) -> Tier {
        Tier::of(self.average_level)
    }
}

impl Default for PartyConfig {
    fn default() -> Self {
        Self::new(BASE_PARTY_SIZE, 1)
    }
}

/// Monster count multiplier relative to a party of four.
///
/// # Examples
///
/// ```
/// use delve::monster_multiplier;
///
/// assert_eq!(monster_multiplier(2), 0.5);
/// assert_eq!(monster_multiplier(8), 2.0);
/// ```
pub fn monster_multiplier(party_size: u32) -> f64 {
    f64::from(party_size) / f64::from(BASE_PARTY_SIZE)
}

/// One step harder when the party is two or more levels above the encounter,
/// one step easier when two or more below, unchanged otherwise.
pub fn adjust_difficulty_tier(base: Difficulty, encounter_level: u8, party_level: u8) -> Difficulty {
    let level_difference = i32::from(party_level) - i32::from(encounter_level);
    if level_difference >= 2 {
        base.step_up()
    } else if level_difference <= -2 {
        base.step_down()
    } else {
        base
    }
}

/// Total XP of a roster, counting every individual.
pub fn roster_xp(monsters: &[Monster]) -> u32 {
    monsters
        .iter()
        .map(Monster::total_xp)
        .fold(0, u32::saturating_add)
}

/// Whether scaling changed a combat encounter's difficulty or roster.
///
/// Always false for categories without a roster.
pub fn is_encounter_scaled(original: &Encounter, scaled: &Encounter) -> bool {
    let (Some(before), Some(after)) = (original.kind.combat_details(), scaled.kind.combat_details()) else {
        return false;
    };
    if original.difficulty != scaled.difficulty || before.monsters.len() != after.monsters.len() {
        return true;
    }
    before
        .monsters
        .iter()
        .zip(&after.monsters)
        .any(|(a, b)| a.name != b.name || a.count != b.count)
}

/// Rewrites encounters for a party, drawing extra monsters from a [`MonsterSource`].
#[derive(Clone, Copy)]
pub struct EncounterScaler<'a> {
    monsters: &'a dyn MonsterSource,
}

impl<'a> EncounterScaler<'a> {
    pub fn new(monsters: &'a dyn MonsterSource) -> Self {
        Self { monsters }
    }

    /// Returns a scaled copy of `encounter`. The input is never modified.
    ///
    /// Cross-tier requests return an unchanged copy. Otherwise the mechanics
    /// are scaled for every category, and combat and boss encounters also get
    /// a rebuilt roster, difficulty and XP budget.
    pub fn scale<R: Rng + ?Sized>(&self, encounter: &Encounter, party: &PartyConfig, rng: &mut R) -> Encounter {
        let mut scaled = encounter.clone();

        if party.tier() != Tier::of(encounter.level) {
            warn!(
                "Not scaling '{}': authored for level {} ({}) but party is level {} ({})",
                encounter.name,
                encounter.level,
                Tier::of(encounter.level),
                party.average_level,
                party.tier()
            );
            return scaled;
        }

        let level_difference = i32::from(party.average_level) - i32::from(encounter.level);
        scaled.scaling_mechanics = scale_mechanics(&encounter.scaling_mechanics, level_difference);

        let level = encounter.level;
        let difficulty = encounter.difficulty;
        if let Some(details) = scaled.kind.combat_details_mut() {
            scaled.difficulty = self.rebalance(details, level, difficulty, party, rng);
        }

        scaled
    }

    /// Rebuilds a combat roster in place and returns the difficulty it now targets.
    fn rebalance<R: Rng + ?Sized>(
        &self,
        details: &mut CombatDetails,
        encounter_level: u8,
        authored: Difficulty,
        party: &PartyConfig,
        rng: &mut R,
    ) -> Difficulty {
        let multiplier = monster_multiplier(party.size);
        let size_scaled_xp = f64::from(roster_xp(&details.monsters)) * multiplier;

        let max_difficulty = adjust_difficulty_tier(authored, encounter_level, party.average_level);
        let budget = PartyBudget::for_party(party.size, party.average_level);
        let difficulty = budget.best_fit(size_scaled_xp).min(max_difficulty);
        let target_xp = budget.get(difficulty);

        let mut roster: Vec<Monster> = details
            .monsters
            .iter()
            .map(|monster| {
                let count = (f64::from(monster.count) * multiplier).round().max(1.0) as u32;
                monster.clone().with_count(count)
            })
            .collect();

        if party.average_level > encounter_level {
            top_up_proportionally(&mut roster, target_xp);

            let xp = roster_xp(&roster);
            if f64::from(xp) < f64::from(target_xp) * MINION_TOP_UP_RATIO {
                self.top_up_with_minions(&mut roster, target_xp - xp, rng);
            }
        }

        self.substitute_swarms(&mut roster);

        details.xp_budget = roster_xp(&roster);
        details.monsters = roster;
        difficulty
    }

    fn top_up_with_minions<R: Rng + ?Sized>(&self, roster: &mut Vec<Monster>, missing_xp: u32, rng: &mut R) {
        let candidates: Vec<&Monster> = self
            .monsters
            .get_by_cr_range(0.0, MINION_MAX_CR)
            .into_iter()
            .filter(|m| MINION_XP_RANGE.contains(&m.exp))
            .collect();
        let Some(&minion) = candidates.choose(rng) else {
            debug!("No minions available to close a {missing_xp} XP gap");
            return;
        };

        let count = missing_xp.div_ceil(minion.exp);
        debug!("Adding {count} x {} to close a {missing_xp} XP gap", minion.name);
        merge_into(roster, minion.clone().with_count(count));
    }

    /// Folds every full block of individuals into one swarm unit where a swarm exists.
    fn substitute_swarms(&self, roster: &mut Vec<Monster>) {
        let mut result: Vec<Monster> = Vec::with_capacity(roster.len());
        for monster in roster.drain(..) {
            let blocks = monster.count / SWARM_BLOCK;
            let swarm = if monster.count >= SWARM_THRESHOLD && blocks > 0 {
                self.find_swarm_variant(&monster.name)
            } else {
                None
            };
            let Some(swarm) = swarm else {
                merge_into(&mut result, monster);
                continue;
            };

            debug!(
                "Folding {} x {} into {blocks} x {}",
                blocks * SWARM_BLOCK,
                monster.name,
                swarm.name
            );
            let remainder = monster.count % SWARM_BLOCK;
            if remainder > 0 {
                merge_into(&mut result, monster.with_count(remainder));
            }
            merge_into(&mut result, swarm.clone().with_count(blocks));
        }
        *roster = result;
    }

    /// Looks for a swarm statblock for `name` by naming convention.
    ///
    /// Tries "Swarm of <plural>", "<name> Swarm" and "<plural> Swarm", then any
    /// monster whose name mentions both "swarm" and the base name. Content that
    /// names swarms differently is simply not matched.
    pub fn find_swarm_variant(&self, name: &str) -> Option<&'a Monster> {
        if name.to_lowercase().contains("swarm") {
            return None;
        }

        let plurals = plural_forms(name);
        let mut candidates: Vec<String> = plurals.iter().map(|p| format!("Swarm of {p}")).collect();
        candidates.push(format!("{name} Swarm"));
        candidates.extend(plurals.iter().map(|p| format!("{p} Swarm")));

        let monsters: &'a dyn MonsterSource = self.monsters;
        candidates
            .iter()
            .find_map(|candidate| monsters.get_by_name(candidate))
            .or_else(|| {
                let base = name.to_lowercase();
                monsters
                    .search("swarm")
                    .into_iter()
                    .find(|m| m.name.to_lowercase().contains(&base))
            })
    }
}

fn top_up_proportionally(roster: &mut [Monster], target_xp: u32) {
    let current_xp = roster_xp(roster);
    if current_xp == 0 || current_xp >= target_xp {
        return;
    }

    let deficit = f64::from(target_xp - current_xp);
    for monster in roster.iter_mut().filter(|m| m.exp > 0) {
        let share = f64::from(monster.total_xp()) / f64::from(current_xp);
        let extra = (deficit * share / f64::from(monster.exp)).round().max(1.0) as u32;
        monster.count = monster.count.saturating_add(extra);
    }
}

/// Adds `monster` to the roster, stacking onto an entry with the same name.
fn merge_into(roster: &mut Vec<Monster>, monster: Monster) {
    match roster.iter_mut().find(|m| m.name == monster.name) {
        Some(existing) => existing.count = existing.count.saturating_add(monster.count),
        None => roster.push(monster),
    }
}

fn plural_forms(name: &str) -> Vec<String> {
    let mut forms = vec![format!("{name}s"), format!("{name}es")];
    if let Some(stem) = name.strip_suffix('y') {
        forms.push(format!("{stem}ies"));
    }
    if let Some(stem) = name.strip_suffix('f') {
        forms.push(format!("{stem}ves"));
    }
    forms.push(name.to_string());
    forms
}
