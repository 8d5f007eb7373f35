//! # Node Type Assignment
//!
//! Decides which interior node holds what, under per-type caps.
//!
//! Rest nodes are placed first on spaced-out layers. Everything else is drawn
//! by a weighted sample that reweights as caps fill, with combat as the only
//! type allowed past its cap.

use crate::config::REST_START_WINDOW;
use crate::map::NodeType;
use log::warn;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};

const NON_COMBAT_WEIGHT: f64 = 2.0;
const COMBAT_WEIGHT: f64 = 1.0;
const COMBAT_OVERFLOW_WEIGHT: f64 = 0.5;

/// Maximum count of each interior node type on one floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeTypeCaps {
    pub combat: u32,
    pub rest: u32,
    pub treasure: u32,
    pub social: u32,
    pub exploration: u32,
}

impl NodeTypeCaps {
    pub const ZERO: NodeTypeCaps = NodeTypeCaps {
        combat: 0,
        rest: 0,
        treasure: 0,
        social: 0,
        exploration: 0,
    };

    /// Normalizes a name-to-count map.
    ///
    /// `puzzle` counts toward exploration, `start` and `boss` are ignored and
    /// unknown names are dropped with a warning. Types missing from the map get
    /// a cap of zero.
    pub fn from_counts(counts: &BTreeMap<String, u32>) -> Self {
        let mut caps = Self::ZERO;
        for (name, &count) in counts {
            match NodeType::from_name(name) {
                Some(NodeType::Start | NodeType::Boss) => {}
                Some(node_type) => {
                    if let Some(cap) = caps.cap_mut(node_type) {
                        *cap = cap.saturating_add(count);
                    }
                }
                None => warn!("Ignoring cap for unknown node type '{name}'"),
            }
        }
        caps
    }

    /// Cap for an interior type, `None` for start and boss.
    pub fn cap(&self, node_type: NodeType) -> Option<u32> {
        match node_type {
            NodeType::Start | NodeType::Boss => None,
            NodeType::Combat => Some(self.combat),
            NodeType::Rest => Some(self.rest),
            NodeType::Treasure => Some(self.treasure),
            NodeType::Social => Some(self.social),
            NodeType::Exploration => Some(self.exploration),
        }
    }

    fn cap_mut(&mut self, node_type: NodeType) -> Option<&mut u32> {
        match node_type {
            NodeType::Start | NodeType::Boss => None,
            NodeType::Combat => Some(&mut self.combat),
            NodeType::Rest => Some(&mut self.rest),
            NodeType::Treasure => Some(&mut self.treasure),
            NodeType::Social => Some(&mut self.social),
            NodeType::Exploration => Some(&mut self.exploration),
        }
    }

    pub fn total(&self) -> u32 {
        self.combat + self.rest + self.treasure + self.social + self.exploration
    }
}

impl Default for NodeTypeCaps {
    fn default() -> Self {
        Self {
            combat: 30,
            rest: 6,
            treasure: 5,
            social: 6,
            exploration: 12,
        }
    }
}

/// Picks the layers that get a rest node.
///
/// Starts in one of the [`REST_START_WINDOW`] layers just below the boss and
/// walks toward the start two or three layers at a time, so chosen layers are
/// never adjacent. Stops at `cap` layers or when interior layers run out.
pub fn place_rest_layers<R: Rng + ?Sized>(layer_count: usize, cap: u32, rng: &mut R) -> Vec<usize> {
    if layer_count < 3 || cap == 0 {
        return Vec::new();
    }

    let top = layer_count - 2;
    let lowest_start = top.saturating_sub(REST_START_WINDOW - 1).max(1);
    let mut layer = rng.gen_range(lowest_start..=top);

    let mut layers = Vec::new();
    loop {
        layers.push(layer);
        if layers.len() as u32 >= cap {
            break;
        }
        let step = rng.gen_range(2..=3);
        if layer < 1 + step {
            break;
        }
        layer -= step;
    }
    layers
}

/// Draws `count` non-rest types against the caps, returned in shuffled order.
///
/// Treasure, social and exploration weigh 2 while under cap and drop out once
/// full. Combat weighs 1 under cap and 0.5 over it, so it always remains as filler.
pub fn draw_other_types<R: Rng + ?Sized>(count: usize, caps: &NodeTypeCaps, rng: &mut R) -> Vec<NodeType> {
    let candidates = [
        NodeType::Combat,
        NodeType::Treasure,
        NodeType::Social,
        NodeType::Exploration,
    ];
    let mut used: BTreeMap<NodeType, u32> = BTreeMap::new();
    let mut drawn = Vec::with_capacity(count);

    for _ in 0..count {
        let weight = |node_type: &NodeType| {
            let used = used.get(node_type).copied().unwrap_or(0);
            let under_cap = used < caps.cap(*node_type).unwrap_or(0);
            match (node_type, under_cap) {
                (NodeType::Combat, true) => COMBAT_WEIGHT,
                (NodeType::Combat, false) => COMBAT_OVERFLOW_WEIGHT,
                (_, true) => NON_COMBAT_WEIGHT,
                (_, false) => 0.0,
            }
        };
        let node_type = candidates
            .choose_weighted(rng, weight)
            .copied()
            .unwrap_or(NodeType::Combat);
        *used.entry(node_type).or_insert(0) += 1;
        drawn.push(node_type);
    }

    drawn.shuffle(rng);
    drawn
}

/// Assigns a type to every node, given the size of each layer.
///
/// The first layer is the start and the last the boss. Every rest layer gets
/// exactly one rest node at a random index.
pub fn assign_types<R: Rng + ?Sized>(layer_sizes: &[usize], caps: &NodeTypeCaps, rng: &mut R) -> Vec<Vec<NodeType>> {
    let layer_count = layer_sizes.len();
    let rest_slots: BTreeSet<(usize, usize)> = place_rest_layers(layer_count, caps.rest, rng)
        .into_iter()
        .filter(|&layer| layer_sizes[layer] > 0)
        .map(|layer| (layer, rng.gen_range(0..layer_sizes[layer])))
        .collect();

    let interior: usize = layer_sizes
        .iter()
        .enumerate()
        .filter(|&(layer, _)| layer != 0 && layer + 1 != layer_count)
        .map(|(_, &size)| size)
        .sum();
    let mut others = draw_other_types(interior.saturating_sub(rest_slots.len()), caps, rng).into_iter();

    layer_sizes
        .iter()
        .enumerate()
        .map(|(layer, &size)| {
            (0..size)
                .map(|index| {
                    if layer == 0 {
                        NodeType::Start
                    } else if layer + 1 == layer_count {
                        NodeType::Boss
                    } else if rest_slots.contains(&(layer, index)) {
                        NodeType::Rest
                    } else {
                        others.next().unwrap_or(NodeType::Combat)
                    }
                })
                .collect()
        })
        .collect()
}
