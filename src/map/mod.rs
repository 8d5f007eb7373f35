//! # Dungeon Map
//!
//! The generated floor graph and the node status state machine.
//!
//! A floor is produced once by the floor generator. After that only node
//! status, visibility and the scaled encounter change, and only through the
//! methods here, which keep the single-active-path rule intact.

use crate::content::{Encounter, EncounterCategory};
use crate::generation::{EncounterScaler, PartyConfig};
use crate::{DelveError, DelveResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a node holds. Drives both the icon and the encounter category looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Start,
    Boss,
    Combat,
    Rest,
    Treasure,
    Social,
    Exploration,
}

impl NodeType {
    /// Types that interior nodes can take.
    pub const INTERIOR: [NodeType; 5] = [
        NodeType::Combat,
        NodeType::Rest,
        NodeType::Treasure,
        NodeType::Social,
        NodeType::Exploration,
    ];

    /// Encounter category to request for this node, `None` for the start node.
    pub fn encounter_category(self) -> Option<EncounterCategory> {
        match self {
            NodeType::Start => None,
            NodeType::Boss => Some(EncounterCategory::Boss),
            NodeType::Combat => Some(EncounterCategory::Combat),
            NodeType::Rest => Some(EncounterCategory::Rest),
            NodeType::Treasure => Some(EncounterCategory::Treasure),
            NodeType::Social => Some(EncounterCategory::Social),
            NodeType::Exploration => Some(EncounterCategory::Exploration),
        }
    }

    /// Description shown when no encounter could be attached.
    pub fn placeholder_description(self) -> &'static str {
        match self {
            NodeType::Start => "The entrance to this floor of the dungeon.",
            NodeType::Boss => "A powerful foe guards the way down.",
            NodeType::Combat => "Hostile creatures lurk in the shadows.",
            NodeType::Rest => "A quiet place to catch your breath.",
            NodeType::Treasure => "Something glints in the darkness.",
            NodeType::Social => "Someone waits here, willing to talk.",
            NodeType::Exploration => "Strange markings cover the walls of this chamber.",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            NodeType::Start => "🚪",
            NodeType::Boss => "💀",
            NodeType::Combat => "⚔️",
            NodeType::Rest => "🔥",
            NodeType::Treasure => "💰",
            NodeType::Social => "💬",
            NodeType::Exploration => "🧭",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NodeType::Start => "Start",
            NodeType::Boss => "Boss",
            NodeType::Combat => "Combat",
            NodeType::Rest => "Rest",
            NodeType::Treasure => "Treasure",
            NodeType::Social => "Social",
            NodeType::Exploration => "Exploration",
        }
    }

    /// Parses a node type name, folding the legacy `puzzle` into exploration.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "start" => Some(NodeType::Start),
            "boss" => Some(NodeType::Boss),
            "combat" => Some(NodeType::Combat),
            "rest" => Some(NodeType::Rest),
            "treasure" => Some(NodeType::Treasure),
            "social" => Some(NodeType::Social),
            "exploration" | "puzzle" => Some(NodeType::Exploration),
            _ => None,
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Progress state of a node: `locked -> available -> current -> visited`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Locked,
    Available,
    Visited,
    Current,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeStatus::Locked => "locked",
            NodeStatus::Available => "available",
            NodeStatus::Visited => "visited",
            NodeStatus::Current => "current",
        };
        f.write_str(name)
    }
}

/// One encounter node on a floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DungeonNode {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub layer: usize,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Outgoing edges, all into `layer + 1`
    pub connections: Vec<String>,
    /// Incoming edges, all from `layer - 1`
    pub parents: Vec<String>,
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub revealed: bool,
    /// Encounter scaled for the current party
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter: Option<Encounter>,
    /// Unscaled baseline every rescale starts from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_encounter: Option<Encounter>,
}

impl DungeonNode {
    /// Deterministic id from layer and position within the layer.
    pub fn node_id(layer: usize, index: usize) -> String {
        format!("l{layer}-n{index}")
    }

    pub fn new(layer: usize, index: usize, x: f64, y: f64, node_type: NodeType) -> Self {
        Self {
            id: Self::node_id(layer, index),
            x,
            y,
            layer,
            node_type,
            connections: Vec::new(),
            parents: Vec::new(),
            status: NodeStatus::Locked,
            description: None,
            revealed: false,
            encounter: None,
            original_encounter: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

/// A generated floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DungeonMapData {
    pub nodes: Vec<DungeonNode>,
    pub edges: Vec<Edge>,
    pub boss_node_id: String,
    pub current_floor: u32,
    pub total_floors: u32,
    /// Layers between start and boss as requested, excluding the start layer
    pub layers_per_floor: usize,
}

impl DungeonMapData {
    pub fn node(&self, id: &str) -> Option<&DungeonNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut DungeonNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    fn index_of(&self, id: &str) -> DelveResult<usize> {
        self.nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| DelveError::UnknownNode(id.to_string()))
    }

    pub fn start(&self) -> Option<&DungeonNode> {
        self.nodes.iter().find(|n| n.node_type == NodeType::Start)
    }

    pub fn boss(&self) -> Option<&DungeonNode> {
        self.node(&self.boss_node_id)
    }

    pub fn current_node(&self) -> Option<&DungeonNode> {
        self.nodes.iter().find(|n| n.status == NodeStatus::Current)
    }

    pub fn layer_count(&self) -> usize {
        self.nodes.iter().map(|n| n.layer + 1).max().unwrap_or(0)
    }

    pub fn nodes_in_layer(&self, layer: usize) -> impl Iterator<Item = &DungeonNode> {
        self.nodes.iter().filter(move |n| n.layer == layer)
    }

    pub fn available_nodes(&self) -> impl Iterator<Item = &DungeonNode> {
        self.nodes.iter().filter(|n| n.status == NodeStatus::Available)
    }

    /// Whether the boss node has been completed.
    pub fn is_cleared(&self) -> bool {
        self.boss().is_some_and(|boss| boss.status == NodeStatus::Visited)
    }

    /// Moves an available node to current and locks its available siblings.
    pub fn enter_node(&mut self, id: &str) -> DelveResult<()> {
        let index = self.index_of(id)?;
        let node = &self.nodes[index];
        if node.status != NodeStatus::Available {
            return Err(DelveError::InvalidTransition {
                node_id: id.to_string(),
                status: node.status,
                action: "enter",
            });
        }

        let layer = node.layer;
        for (i, other) in self.nodes.iter_mut().enumerate() {
            if i != index && other.layer == layer && other.status == NodeStatus::Available {
                other.status = NodeStatus::Locked;
            }
        }
        let node = &mut self.nodes[index];
        node.status = NodeStatus::Current;
        node.revealed = true;
        Ok(())
    }

    /// Marks the current node visited and unlocks its locked children.
    ///
    /// Returns the ids of the nodes that became available.
    pub fn complete_node(&mut self, id: &str) -> DelveResult<Vec<String>> {
        let index = self.index_of(id)?;
        let node = &self.nodes[index];
        if node.status != NodeStatus::Current {
            return Err(DelveError::InvalidTransition {
                node_id: id.to_string(),
                status: node.status,
                action: "complete",
            });
        }

        let children = node.connections.clone();
        self.nodes[index].status = NodeStatus::Visited;

        let mut unlocked = Vec::new();
        for child in self
            .nodes
            .iter_mut()
            .filter(|n| children.contains(&n.id) && n.status == NodeStatus::Locked)
        {
            child.status = NodeStatus::Available;
            child.revealed = true;
            unlocked.push(child.id.clone());
        }
        Ok(unlocked)
    }

    /// Re-scales every attached encounter for `party`, always from the stored baseline.
    pub fn rescale_encounters<R: Rng + ?Sized>(
        &mut self,
        scaler: &EncounterScaler<'_>,
        party: &PartyConfig,
        rng: &mut R,
    ) {
        for node in &mut self.nodes {
            if let Some(original) = &node.original_encounter {
                let scaled = scaler.scale(original, party, rng);
                node.description = Some(scaled.rendered_room_description());
                node.encounter = Some(scaled);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// start -> {a, b} -> boss
    fn diamond() -> DungeonMapData {
        let mut start = DungeonNode::new(0, 0, 0.0, 0.0, NodeType::Start);
        let mut a = DungeonNode::new(1, 0, 0.0, 0.0, NodeType::Combat);
        let mut b = DungeonNode::new(1, 1, 0.0, 0.0, NodeType::Rest);
        let mut boss = DungeonNode::new(2, 0, 0.0, 0.0, NodeType::Boss);
        start.connections = vec![a.id.clone(), b.id.clone()];
        a.parents = vec![start.id.clone()];
        b.parents = vec![start.id.clone()];
        a.connections = vec![boss.id.clone()];
        b.connections = vec![boss.id.clone()];
        boss.parents = vec![a.id.clone(), b.id.clone()];

        start.status = NodeStatus::Visited;
        a.status = NodeStatus::Available;
        b.status = NodeStatus::Available;

        DungeonMapData {
            boss_node_id: boss.id.clone(),
            nodes: vec![start, a, b, boss],
            edges: Vec::new(),
            current_floor: 1,
            total_floors: 21,
            layers_per_floor: 2,
        }
    }

    #[test]
    fn test_node_type_names() {
        assert_eq!(NodeType::from_name("Puzzle"), Some(NodeType::Exploration));
        assert_eq!(NodeType::from_name("rest"), Some(NodeType::Rest));
        assert_eq!(NodeType::from_name("shop"), None);
        assert_eq!(NodeType::Boss.encounter_category(), Some(EncounterCategory::Boss));
        assert_eq!(NodeType::Start.encounter_category(), None);
        assert_eq!(NodeType::Treasure.to_string(), "Treasure");
    }

    #[test]
    fn test_enter_locks_siblings() {
        let mut map = diamond();
        map.enter_node("l1-n0").unwrap();
        assert_eq!(map.node("l1-n0").unwrap().status, NodeStatus::Current);
        assert_eq!(map.node("l1-n1").unwrap().status, NodeStatus::Locked);
        assert_eq!(map.current_node().map(|n| n.id.as_str()), Some("l1-n0"));
    }

    #[test]
    fn test_complete_unlocks_children() {
        let mut map = diamond();
        map.enter_node("l1-n1").unwrap();
        let unlocked = map.complete_node("l1-n1").unwrap();
        assert_eq!(unlocked, vec!["l2-n0".to_string()]);
        let boss = map.boss().unwrap();
        assert_eq!(boss.status, NodeStatus::Available);
        assert!(boss.revealed);
        assert!(!map.is_cleared());

        map.enter_node("l2-n0").unwrap();
        map.complete_node("l2-n0").unwrap();
        assert!(map.is_cleared());
    }

    #[test]
    fn test_invalid_transitions() {
        let mut map = diamond();
        assert!(matches!(
            map.complete_node("l1-n0"),
            Err(DelveError::InvalidTransition { action: "complete", .. })
        ));
        assert!(matches!(
            map.enter_node("l2-n0"),
            Err(DelveError::InvalidTransition {
                status: NodeStatus::Locked,
                ..
            })
        ));
        assert!(matches!(map.enter_node("nowhere"), Err(DelveError::UnknownNode(_))));

        map.enter_node("l1-n0").unwrap();
        let err = map.enter_node("l1-n1").unwrap_err();
        assert_eq!(err.to_string(), "Cannot enter node l1-n1 while it is locked");
    }
}
