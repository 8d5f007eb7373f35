//! # Floor Generation
//!
//! Builds one floor: a layered DAG from a single start node to a single boss.
//!
//! The generator:
//! 1. Lays out layers (one start, three nodes on layer 1, three to five on the
//!    rest, one boss) and places nodes across the map
//! 2. Assigns node types under the configured caps
//! 3. Draws an encounter for every interior and boss node and scales it
//! 4. Links each layer to the next by horizontal proximity
//! 5. Opens the first choice and validates the result

use super::budget::PartyBudget;
use super::connectivity::{apply_links, connect_layers};
use super::node_types::assign_types;
use super::scaling::{EncounterScaler, PartyConfig};
use super::{GenerationConfig, Generator};
use crate::config::{LAYER_SPREAD, MAP_PADDING, TOTAL_FLOORS};
use crate::content::{Difficulty, Encounter, EncounterCategory, EncounterQuery, EncounterSource, MonsterSource};
use crate::map::{DungeonMapData, DungeonNode, Edge, NodeStatus, NodeType};
use crate::{DelveError, DelveResult};
use log::{debug, info, warn};
use pathfinding::prelude::bfs_reach;
use rand::Rng;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Nodes on the first layer above the start.
pub const FIRST_LAYER_NODES: usize = 3;

/// Node count range for the remaining interior layers.
pub const MIN_LAYER_NODES: usize = 3;
pub const MAX_LAYER_NODES: usize = 5;

/// Generates floors from an encounter source, scaling encounters as they are attached.
#[derive(Clone, Copy)]
pub struct FloorGenerator<'a> {
    encounters: &'a dyn EncounterSource,
    scaler: EncounterScaler<'a>,
}

impl<'a> FloorGenerator<'a> {
    pub fn new(encounters: &'a dyn EncounterSource, monsters: &'a dyn MonsterSource) -> Self {
        Self {
            encounters,
            scaler: EncounterScaler::new(monsters),
        }
    }

    pub fn scaler(&self) -> &EncounterScaler<'a> {
        &self.scaler
    }

    /// Node count for each layer, start and boss included.
    fn layer_sizes<R: Rng>(&self, layer_count: usize, rng: &mut R) -> Vec<usize> {
        (0..layer_count)
            .map(|layer| {
                if layer == 0 || layer + 1 == layer_count {
                    1
                } else if layer == 1 {
                    FIRST_LAYER_NODES
                } else {
                    rng.gen_range(MIN_LAYER_NODES..=MAX_LAYER_NODES)
                }
            })
            .collect()
    }

    /// Places typed nodes on the map. Returns the nodes and their indices per layer.
    fn place_nodes<R: Rng>(
        &self,
        config: &GenerationConfig,
        types: &[Vec<NodeType>],
        rng: &mut R,
    ) -> (Vec<DungeonNode>, Vec<Vec<usize>>) {
        let boss_layer = types.len() - 1;
        let layer_height = (config.height - 2.0 * MAP_PADDING) / boss_layer as f64;
        let spread = config.width * LAYER_SPREAD;
        let margin = (config.width - spread) / 2.0;

        let mut nodes = Vec::new();
        let mut layers = Vec::with_capacity(types.len());
        for (layer, layer_types) in types.iter().enumerate() {
            let y = config.height - MAP_PADDING - layer as f64 * layer_height;
            let segment = spread / layer_types.len() as f64;
            let mut indices = Vec::with_capacity(layer_types.len());

            for (index, &node_type) in layer_types.iter().enumerate() {
                let x = match node_type {
                    NodeType::Start | NodeType::Boss => config.width / 2.0,
                    _ => {
                        let jitter = (rng.gen::<f64>() - 0.5) * segment * 0.5;
                        margin + segment * index as f64 + segment / 2.0 + jitter
                    }
                };
                indices.push(nodes.len());
                nodes.push(DungeonNode::new(layer, index, x, y, node_type));
            }
            layers.push(indices);
        }
        (nodes, layers)
    }

    /// Draws an encounter for a node type, excluding names already on the floor.
    ///
    /// A boss miss falls back to a high-difficulty combat encounter, then to any
    /// combat encounter at the level.
    fn pick_encounter<R: Rng>(
        &self,
        node_type: NodeType,
        level: u8,
        query: &EncounterQuery,
        rng: &mut R,
    ) -> Option<Encounter> {
        let category = node_type.encounter_category()?;
        let found = self.encounters.random_encounter(level, category, query, &mut *rng);
        if found.is_some() || node_type != NodeType::Boss {
            return found;
        }

        warn!("No boss encounter for level {level}; substituting a high-difficulty combat encounter");
        let high = query.clone().with_difficulty(Difficulty::High);
        let fallback = self
            .encounters
            .random_encounter(level, EncounterCategory::Combat, &high, &mut *rng)
            .or_else(|| {
                self.encounters.random_encounter(
                    level,
                    EncounterCategory::Combat,
                    &EncounterQuery::default(),
                    &mut *rng,
                )
            });
        if fallback.is_none() {
            warn!("Boss node left without an encounter: no combat content at level {level}");
        }
        fallback
    }

    /// Attaches scaled encounters to every node that takes one.
    fn attach_encounters<R: Rng>(&self, nodes: &mut [DungeonNode], party: &PartyConfig, rng: &mut R) {
        let max_xp_budget = PartyBudget::for_party(party.size, party.average_level)
            .high
            .saturating_mul(2);
        let mut used_names: BTreeSet<String> = BTreeSet::new();

        for node in nodes.iter_mut() {
            if node.node_type == NodeType::Start {
                node.description = Some(node.node_type.placeholder_description().to_string());
                continue;
            }

            let query = EncounterQuery {
                exclude_names: used_names.clone(),
                max_xp_budget: Some(max_xp_budget),
                ..EncounterQuery::default()
            };
            match self.pick_encounter(node.node_type, party.average_level, &query, rng) {
                Some(original) => {
                    let scaled = self.scaler.scale(&original, party, rng);
                    used_names.insert(original.name.clone());
                    node.description = Some(scaled.rendered_room_description());
                    node.encounter = Some(scaled);
                    node.original_encounter = Some(original);
                }
                None => {
                    debug!("No {} encounter for node {}; using placeholder", node.node_type, node.id);
                    node.description = Some(node.node_type.placeholder_description().to_string());
                }
            }
        }
    }

    /// Visits the start node and opens its children.
    fn open_start(nodes: &mut [DungeonNode]) {
        let children: Vec<String> = nodes
            .iter()
            .filter(|n| n.node_type == NodeType::Start)
            .flat_map(|n| n.connections.clone())
            .collect();
        for node in nodes.iter_mut() {
            if node.node_type == NodeType::Start {
                node.status = NodeStatus::Visited;
                node.revealed = true;
            } else if children.contains(&node.id) {
                node.status = NodeStatus::Available;
                node.revealed = true;
            }
        }
    }
}

impl Generator<DungeonMapData> for FloorGenerator<'_> {
    fn generate<R: Rng>(&self, config: &GenerationConfig, rng: &mut R) -> DelveResult<DungeonMapData> {
        config.validate()?;

        let layer_count = config.layer_count();
        let sizes = self.layer_sizes(layer_count, rng);
        let types = assign_types(&sizes, &config.node_type_caps(), rng);
        let (mut nodes, layers) = self.place_nodes(config, &types, rng);

        self.attach_encounters(&mut nodes, &config.party, rng);

        let links = connect_layers(&nodes, &layers, rng);
        let edges = apply_links(&mut nodes, &links);
        Self::open_start(&mut nodes);

        let boss_node_id = DungeonNode::node_id(layer_count - 1, 0);
        let map = DungeonMapData {
            nodes,
            edges,
            boss_node_id,
            current_floor: config.current_floor,
            total_floors: TOTAL_FLOORS,
            layers_per_floor: config.layers_per_floor,
        };
        self.validate(&map, config)?;

        info!(
            "Generated floor {} with {} nodes and {} edges across {} layers",
            map.current_floor,
            map.nodes.len(),
            map.edges.len(),
            layer_count
        );
        Ok(map)
    }

    /// Checks layer shape, edge symmetry and reachability from the start.
    fn validate(&self, map: &DungeonMapData, config: &GenerationConfig) -> DelveResult<()> {
        let fail = |message: String| Err(DelveError::GenerationFailed(message));
        let boss_layer = config.layer_count() - 1;

        let starts: Vec<&DungeonNode> = map.nodes.iter().filter(|n| n.node_type == NodeType::Start).collect();
        let [start] = starts.as_slice() else {
            return fail(format!("expected one start node, found {}", starts.len()));
        };
        if start.layer != 0 || map.nodes_in_layer(0).count() != 1 {
            return fail("layer 0 must hold only the start node".to_string());
        }

        let bosses = map.nodes.iter().filter(|n| n.node_type == NodeType::Boss).count();
        match map.boss() {
            Some(boss) if bosses == 1 && boss.node_type == NodeType::Boss && boss.layer == boss_layer => {}
            _ => return fail(format!("boss node {} is missing or misplaced", map.boss_node_id)),
        }
        if map.nodes_in_layer(boss_layer).count() != 1 {
            return fail(format!("boss layer {boss_layer} must hold only the boss"));
        }
        if map.nodes_in_layer(1).count() != FIRST_LAYER_NODES {
            return fail(format!("layer 1 must hold {FIRST_LAYER_NODES} nodes"));
        }

        let by_id: HashMap<&str, &DungeonNode> = map.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        if by_id.len() != map.nodes.len() {
            return fail("node ids are not unique".to_string());
        }

        let mut expected: HashSet<(&str, &str)> = HashSet::new();
        for node in &map.nodes {
            if node.node_type != NodeType::Start && node.parents.is_empty() {
                return fail(format!("node {} has no parent", node.id));
            }
            if node.node_type != NodeType::Boss && node.connections.is_empty() {
                return fail(format!("node {} has no outgoing connection", node.id));
            }
            for child in &node.connections {
                match by_id.get(child.as_str()) {
                    Some(target) if target.layer == node.layer + 1 && target.parents.contains(&node.id) => {}
                    _ => return fail(format!("edge {} -> {child} is not mirrored", node.id)),
                }
                expected.insert((node.id.as_str(), child.as_str()));
            }
            for parent in &node.parents {
                let mirrored = by_id
                    .get(parent.as_str())
                    .is_some_and(|source| source.connections.contains(&node.id));
                if !mirrored {
                    return fail(format!("parent {parent} of {} does not list it", node.id));
                }
            }
        }

        let listed: HashSet<(&str, &str)> = map
            .edges
            .iter()
            .map(|Edge { from, to }| (from.as_str(), to.as_str()))
            .collect();
        if listed != expected || listed.len() != map.edges.len() {
            return fail("edge list does not match node connections".to_string());
        }

        let reachable: HashSet<&str> = bfs_reach(start.id.as_str(), |id| {
            by_id
                .get(id)
                .copied()
                .map(|node| node.connections.iter().map(String::as_str))
                .into_iter()
                .flatten()
        })
        .collect();
        if reachable.len() != map.nodes.len() {
            return fail(format!(
                "{} of {} nodes are unreachable from the start",
                map.nodes.len() - reachable.len(),
                map.nodes.len()
            ));
        }

        Ok(())
    }

    fn generator_type(&self) -> &'static str {
        "FloorGenerator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{EncounterLibrary, MonsterLibrary};
    use crate::generation::utils;

    fn generate(config: &GenerationConfig) -> DungeonMapData {
        let encounters = EncounterLibrary::builtin().unwrap();
        let monsters = MonsterLibrary::builtin().unwrap();
        let generator = FloorGenerator::new(&encounters, &monsters);
        let mut rng = utils::create_rng(config);
        generator.generate(config, &mut rng).unwrap()
    }

    #[test]
    fn test_small_floor_shape() {
        let config = GenerationConfig::for_testing(12345);
        let map = generate(&config);

        assert_eq!(map.layer_count(), 6);
        assert_eq!(map.nodes_in_layer(0).count(), 1);
        assert_eq!(map.nodes_in_layer(1).count(), 3);
        assert_eq!(map.boss_node_id, "l5-n0");
        for layer in 2..5 {
            assert!((3..=5).contains(&map.nodes_in_layer(layer).count()));
        }
        let rests = map.nodes.iter().filter(|n| n.node_type == NodeType::Rest).count();
        assert_eq!(rests, 1);
    }

    #[test]
    fn test_geometry() {
        let config = GenerationConfig::for_testing(7);
        let map = generate(&config);
        let start = map.start().unwrap();
        let boss = map.boss().unwrap();
        assert_eq!((start.x, start.y), (400.0, 1900.0));
        assert_eq!((boss.x, boss.y), (400.0, 100.0));
        for node in &map.nodes {
            assert!(node.x >= 0.0 && node.x <= config.width);
            assert!((node.y - (1900.0 - node.layer as f64 * 360.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_initial_statuses() {
        let map = generate(&GenerationConfig::for_testing(3));
        let start = map.start().unwrap();
        assert_eq!(start.status, NodeStatus::Visited);
        for node in &map.nodes {
            if start.connections.contains(&node.id) {
                assert_eq!(node.status, NodeStatus::Available);
                assert!(node.revealed);
            } else if node.id != start.id {
                assert_eq!(node.status, NodeStatus::Locked);
                assert!(!node.revealed);
            }
        }
    }

    #[test]
    fn test_encounters_are_unique_and_scaled_from_baseline() {
        let map = generate(&GenerationConfig::new(99));
        let names: Vec<&str> = map
            .nodes
            .iter()
            .filter_map(|n| n.original_encounter.as_ref())
            .map(|e| e.name.as_str())
            .filter(|name| !name.starts_with(crate::content::DEFAULT_ENCOUNTER_PREFIX))
            .collect();
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(names.len(), unique.len());

        for node in &map.nodes {
            assert!(node.description.is_some());
            assert_eq!(node.encounter.is_some(), node.original_encounter.is_some());
            if let Some(encounter) = &node.encounter {
                assert_eq!(node.description.as_deref(), Some(encounter.rendered_room_description().as_str()));
            }
        }
        assert!(map.boss().unwrap().encounter.is_some());
    }

    #[test]
    fn test_seed_replays_exactly() {
        let config = GenerationConfig::new(2024);
        assert_eq!(generate(&config), generate(&config));
    }

    #[test]
    fn test_validate_rejects_broken_maps() {
        let config = GenerationConfig::for_testing(5);
        let encounters = EncounterLibrary::builtin().unwrap();
        let monsters = MonsterLibrary::builtin().unwrap();
        let generator = FloorGenerator::new(&encounters, &monsters);
        let map = generate(&config);
        assert!(generator.validate(&map, &config).is_ok());

        let mut dropped_edge = map.clone();
        dropped_edge.edges.pop();
        assert!(matches!(
            generator.validate(&dropped_edge, &config),
            Err(DelveError::GenerationFailed(_))
        ));

        let mut orphaned = map.clone();
        let victim = orphaned.nodes.iter().position(|n| n.layer == 2).unwrap();
        let victim_id = orphaned.nodes[victim].id.clone();
        orphaned.nodes[victim].parents.clear();
        for node in &mut orphaned.nodes {
            node.connections.retain(|c| *c != victim_id);
        }
        orphaned.edges.retain(|e| e.to != victim_id);
        assert!(generator.validate(&orphaned, &config).is_err());
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let encounters = EncounterLibrary::builtin().unwrap();
        let monsters = MonsterLibrary::builtin().unwrap();
        let generator = FloorGenerator::new(&encounters, &monsters);
        let config = GenerationConfig {
            layers_per_floor: 1,
            ..GenerationConfig::for_testing(1)
        };
        let mut rng = utils::create_rng(&config);
        assert!(matches!(
            generator.generate(&config, &mut rng),
            Err(DelveError::InvalidConfig(_))
        ));
        assert_eq!(generator.generator_type(), "FloorGenerator");
    }
}
