//! # Run Bookkeeping
//!
//! Drives one run through its floors: starting the run, entering and
//! completing nodes, recording encounter outcomes, reacting to party changes
//! and descending once a boss falls.
//!
//! The run owns every floor it generated. Storage is left to the caller; the
//! whole state serializes with serde.

use crate::config::TOTAL_FLOORS;
use crate::generation::{FloorGenerator, GenerationConfig, Generator, PartyConfig};
use crate::map::DungeonMapData;
use crate::{DelveError, DelveResult};
use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Outcome the table recorded for one node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterResult {
    pub xp: u32,
    pub gold: u32,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default, rename = "customXP")]
    pub custom_xp: u32,
    #[serde(default)]
    pub custom_gold: u32,
}

impl EncounterResult {
    pub fn new(xp: u32, gold: u32) -> Self {
        Self {
            xp,
            gold,
            ..Self::default()
        }
    }

    /// The result recorded for the start node when a run begins.
    pub fn entered_dungeon() -> Self {
        Self {
            conditions: vec!["Entered the Dungeon".to_string()],
            ..Self::default()
        }
    }

    pub fn total_xp(&self) -> u64 {
        u64::from(self.xp) + u64::from(self.custom_xp)
    }

    pub fn total_gold(&self) -> u64 {
        u64::from(self.gold) + u64::from(self.custom_gold)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorMetrics {
    pub gold_earned: u64,
    pub xp_earned: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FloorStatus {
    Active,
    Completed,
    Failed,
}

/// One generated floor and what happened on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorRecord {
    pub id: Uuid,
    pub floor_number: u32,
    pub map: DungeonMapData,
    pub status: FloorStatus,
    /// Node ids in the order they were entered
    pub visited_nodes: Vec<String>,
    pub metrics: FloorMetrics,
    pub encounter_results: BTreeMap<String, EncounterResult>,
}

impl FloorRecord {
    fn new(map: DungeonMapData) -> Self {
        Self {
            id: Uuid::new_v4(),
            floor_number: map.current_floor,
            map,
            status: FloorStatus::Active,
            visited_nodes: Vec::new(),
            metrics: FloorMetrics::default(),
            encounter_results: BTreeMap::new(),
        }
    }

    /// Re-derives the metrics from every recorded result, custom amounts included.
    pub fn recalculate_metrics(&mut self) {
        self.metrics = FloorMetrics {
            xp_earned: self.encounter_results.values().map(EncounterResult::total_xp).sum(),
            gold_earned: self.encounter_results.values().map(EncounterResult::total_gold).sum(),
        };
    }
}

/// State of a run in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    pub id: Uuid,
    pub party: PartyConfig,
    /// Configuration the floors are generated from; `current_floor` tracks the latest
    pub config: GenerationConfig,
    pub floors: Vec<FloorRecord>,
}

impl RunState {
    /// Starts a run on floor one. The start node counts as already completed.
    pub fn start<R: Rng>(generator: &FloorGenerator<'_>, config: GenerationConfig, rng: &mut R) -> DelveResult<Self> {
        let config = GenerationConfig {
            current_floor: 1,
            ..config
        };
        let map = generator.generate(&config, rng)?;

        let mut floor = FloorRecord::new(map);
        if let Some(start) = floor.map.start() {
            let start_id = start.id.clone();
            floor.visited_nodes.push(start_id.clone());
            floor.encounter_results.insert(start_id, EncounterResult::entered_dungeon());
        }
        floor.recalculate_metrics();

        let run = Self {
            id: Uuid::new_v4(),
            party: config.party,
            config,
            floors: vec![floor],
        };
        info!(
            "Started run {} for a party of {} at level {}",
            run.id, run.party.size, run.party.average_level
        );
        Ok(run)
    }

    pub fn current_floor(&self) -> DelveResult<&FloorRecord> {
        self.floors
            .last()
            .ok_or_else(|| DelveError::InvalidState("run has no floors".to_string()))
    }

    fn current_floor_mut(&mut self) -> DelveResult<&mut FloorRecord> {
        self.floors
            .last_mut()
            .ok_or_else(|| DelveError::InvalidState("run has no floors".to_string()))
    }

    fn active_floor_mut(&mut self) -> DelveResult<&mut FloorRecord> {
        let floor = self.current_floor_mut()?;
        if floor.status != FloorStatus::Active {
            return Err(DelveError::InvalidState(format!(
                "floor {} is no longer active",
                floor.floor_number
            )));
        }
        Ok(floor)
    }

    /// Moves onto an available node of the current floor.
    pub fn enter_node(&mut self, node_id: &str) -> DelveResult<()> {
        let floor = self.active_floor_mut()?;
        floor.map.enter_node(node_id)?;
        floor.visited_nodes.push(node_id.to_string());
        Ok(())
    }

    /// Completes the current node, returning the ids that became available.
    ///
    /// Completing the boss marks the floor completed.
    pub fn complete_node(&mut self, node_id: &str) -> DelveResult<Vec<String>> {
        let floor = self.active_floor_mut()?;
        let unlocked = floor.map.complete_node(node_id)?;
        if floor.map.is_cleared() {
            floor.status = FloorStatus::Completed;
            info!("Floor {} cleared", floor.floor_number);
        }
        Ok(unlocked)
    }

    /// Stores the outcome for a node on the current floor, replacing any earlier one.
    pub fn record_encounter_result(&mut self, node_id: &str, result: EncounterResult) -> DelveResult<()> {
        let floor = self.current_floor_mut()?;
        if floor.map.node(node_id).is_none() {
            return Err(DelveError::UnknownNode(node_id.to_string()));
        }
        floor.encounter_results.insert(node_id.to_string(), result);
        floor.recalculate_metrics();
        Ok(())
    }

    /// Switches to a new party and re-scales every floor's encounters for it.
    pub fn update_party<R: Rng>(&mut self, generator: &FloorGenerator<'_>, party: PartyConfig, rng: &mut R) -> DelveResult<()> {
        party.validate()?;
        self.party = party;
        self.config.party = party;
        for floor in &mut self.floors {
            floor.map.rescale_encounters(generator.scaler(), &party, rng);
        }
        Ok(())
    }

    /// Marks the current floor failed. The run accepts no further moves.
    pub fn fail_run(&mut self) -> DelveResult<()> {
        let floor = self.current_floor_mut()?;
        floor.status = FloorStatus::Failed;
        let floor_number = floor.floor_number;
        info!("Run {} failed on floor {floor_number}", self.id);
        Ok(())
    }

    /// Generates the next floor once the current boss has been defeated.
    pub fn descend<R: Rng>(&mut self, generator: &FloorGenerator<'_>, rng: &mut R) -> DelveResult<&FloorRecord> {
        let floor = self.current_floor()?;
        if floor.status != FloorStatus::Completed {
            return Err(DelveError::InvalidState(format!(
                "floor {} has not been cleared",
                floor.floor_number
            )));
        }
        if floor.floor_number >= TOTAL_FLOORS {
            return Err(DelveError::RunComplete(floor.floor_number));
        }

        let next = GenerationConfig {
            current_floor: floor.floor_number + 1,
            ..self.config.clone()
        };
        let map = generator.generate(&next, rng)?;
        let mut record = FloorRecord::new(map);
        if let Some(start) = record.map.start() {
            record.visited_nodes.push(start.id.clone());
        }
        self.config = next;
        self.floors.push(record);

        info!("Run {} descended to floor {}", self.id, self.config.current_floor);
        self.current_floor()
    }

    /// Metrics summed over every floor of the run.
    pub fn total_metrics(&self) -> FloorMetrics {
        self.floors.iter().fold(FloorMetrics::default(), |total, floor| FloorMetrics {
            gold_earned: total.gold_earned + floor.metrics.gold_earned,
            xp_earned: total.xp_earned + floor.metrics.xp_earned,
        })
    }

    /// Ids of nodes the party may enter next on the current floor.
    pub fn available_nodes(&self) -> Vec<&str> {
        self.floors
            .last()
            .map(|floor| floor.map.available_nodes().map(|n| n.id.as_str()).collect())
            .unwrap_or_default()
    }

    /// Whether the boss of the final floor has fallen.
    pub fn is_victorious(&self) -> bool {
        self.floors.last().is_some_and(|floor| {
            floor.floor_number == TOTAL_FLOORS && floor.status == FloorStatus::Completed
        })
    }
}
