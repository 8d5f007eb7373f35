//! # Generation Statistics
//!
//! Tallies which encounters a configuration actually produces over many seeds.
//! Useful for spotting thin content: a high fallback share means the library
//! has little for that tier.

use super::floor::FloorGenerator;
use super::{GenerationConfig, Generator};
use crate::content::{EncounterCategory, DEFAULT_ENCOUNTER_PREFIX};
use crate::map::NodeType;
use crate::DelveResult;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::fmt;

/// Encounter counts gathered over a batch of generated floors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncounterStatistics {
    pub floor: u32,
    pub party_level: u8,
    pub runs: usize,
    /// Nodes that received an encounter
    pub total: usize,
    pub by_category: BTreeMap<EncounterCategory, usize>,
    pub by_name: BTreeMap<String, usize>,
    /// Encounters substituted by the library's default table
    pub fallbacks: usize,
    /// Nodes left with only a placeholder description
    pub placeholders: usize,
}

impl EncounterStatistics {
    /// Share of `count` in the total, as a percentage.
    fn percent(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 * 100.0 / self.total as f64
        }
    }

    /// The `limit` most frequent encounter names, most frequent first.
    pub fn top_encounters(&self, limit: usize) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self.by_name.iter().map(|(n, &c)| (n.as_str(), c)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(limit);
        ranked
    }
}

impl fmt::Display for EncounterStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "--- Floor {} (Party Level {}, {} runs) ---",
            self.floor, self.party_level, self.runs
        )?;
        writeln!(f, "Total Encounters Generated: {}", self.total)?;
        writeln!(
            f,
            "Fallbacks (Default *): {} ({:.2}%)",
            self.fallbacks,
            self.percent(self.fallbacks)
        )?;
        writeln!(f, "Placeholder nodes: {}", self.placeholders)?;

        writeln!(f, "\nBy Type:")?;
        let mut categories: Vec<_> = self.by_category.iter().collect();
        categories.sort_by(|a, b| b.1.cmp(a.1));
        for (category, &count) in categories {
            writeln!(f, "  {category}: {count} ({:.1}%)", self.percent(count))?;
        }

        writeln!(f, "\nTop 10 Encounters:")?;
        for (name, count) in self.top_encounters(10) {
            writeln!(f, "  {name}: {count}")?;
        }
        Ok(())
    }
}

/// Generates `runs` floors from `config`, seeding run `i` with `config.seed + i`.
pub fn collect_statistics(
    generator: &FloorGenerator<'_>,
    config: &GenerationConfig,
    runs: usize,
) -> DelveResult<EncounterStatistics> {
    let mut stats = EncounterStatistics {
        floor: config.current_floor,
        party_level: config.party.average_level,
        runs,
        ..EncounterStatistics::default()
    };

    for run in 0..runs {
        let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(run as u64));
        let map = generator.generate(config, &mut rng)?;

        for node in map.nodes.iter().filter(|n| n.node_type != NodeType::Start) {
            let Some(encounter) = &node.encounter else {
                stats.placeholders += 1;
                continue;
            };
            stats.total += 1;
            *stats.by_category.entry(encounter.category()).or_insert(0) += 1;
            *stats.by_name.entry(encounter.name.clone()).or_insert(0) += 1;
            if encounter.name.starts_with(DEFAULT_ENCOUNTER_PREFIX) {
                stats.fallbacks += 1;
            }
        }
    }

    Ok(stats)
}
