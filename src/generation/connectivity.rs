//! # Layer Connectivity
//!
//! Edges between consecutive layers, chosen by horizontal proximity.
//!
//! Links are computed as index pairs first and only then written onto the
//! nodes, so `connections`, `parents` and the edge list are filled together.

use crate::map::{DungeonNode, Edge};
use rand::Rng;
use std::collections::BTreeSet;

/// Chooses links from each layer into the next.
///
/// `layers` holds node indices per layer, in order. Every node links to the 2
/// or 3 horizontally nearest nodes of the next layer (a fair coin decides),
/// or to the only node when the next layer has one. A sweep then attaches any
/// node left without a parent to its nearest predecessor.
pub fn connect_layers<R: Rng + ?Sized>(nodes: &[DungeonNode], layers: &[Vec<usize>], rng: &mut R) -> Vec<(usize, usize)> {
    let mut links = Vec::new();

    for pair in layers.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);
        let mut has_parent: BTreeSet<usize> = BTreeSet::new();

        for &from in current {
            let targets: Vec<usize> = if next.len() == 1 {
                next.clone()
            } else {
                let wanted = if rng.gen_bool(0.5) { 3 } else { 2 };
                nearest(nodes, nodes[from].x, next)
                    .into_iter()
                    .take(wanted)
                    .collect()
            };
            for to in targets {
                has_parent.insert(to);
                links.push((from, to));
            }
        }

        for &orphan in next.iter().filter(|&to| !has_parent.contains(to)) {
            if let Some(&from) = nearest(nodes, nodes[orphan].x, current).first() {
                links.push((from, orphan));
            }
        }
    }

    links
}

/// Candidates ordered by horizontal distance from `x`, ties kept in layer order.
fn nearest(nodes: &[DungeonNode], x: f64, candidates: &[usize]) -> Vec<usize> {
    let mut ranked = candidates.to_vec();
    ranked.sort_by(|&a, &b| (nodes[a].x - x).abs().total_cmp(&(nodes[b].x - x).abs()));
    ranked
}

/// Writes links onto both endpoints and returns the matching edge list.
pub fn apply_links(nodes: &mut [DungeonNode], links: &[(usize, usize)]) -> Vec<Edge> {
    let mut edges = Vec::with_capacity(links.len());
    for &(from, to) in links {
        let from_id = nodes[from].id.clone();
        let to_id = nodes[to].id.clone();
        if nodes[from].connections.contains(&to_id) {
            continue;
        }
        nodes[from].connections.push(to_id.clone());
        nodes[to].parents.push(from_id.clone());
        edges.push(Edge {
            from: from_id,
            to: to_id,
        });
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::NodeType;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn layered(xs: &[&[f64]]) -> (Vec<DungeonNode>, Vec<Vec<usize>>) {
        let mut nodes = Vec::new();
        let mut layers = Vec::new();
        for (layer, row) in xs.iter().enumerate() {
            let mut indices = Vec::new();
            for (i, &x) in row.iter().enumerate() {
                indices.push(nodes.len());
                nodes.push(DungeonNode::new(layer, i, x, 0.0, NodeType::Combat));
            }
            layers.push(indices);
        }
        (nodes, layers)
    }

    #[test]
    fn test_single_node_layers_connect_directly() {
        let (mut nodes, layers) = layered(&[&[400.0], &[100.0, 400.0, 700.0], &[400.0]]);
        let mut rng = StdRng::seed_from_u64(1);
        let links = connect_layers(&nodes, &layers, &mut rng);
        let edges = apply_links(&mut nodes, &links);

        assert_eq!(nodes[4].parents.len(), 3);
        assert!(nodes[1..4].iter().all(|n| n.connections == vec!["l2-n0".to_string()]));
        assert!(nodes[1..4].iter().all(|n| n.parents == vec!["l0-n0".to_string()]));
        assert_eq!(nodes[0].connections.len(), 3);
        assert_eq!(edges.len(), links.len());
    }

    #[test]
    fn test_orphans_are_swept() {
        // The far-right node is never among anyone's two or three nearest
        let (mut nodes, layers) = layered(&[&[0.0, 10.0, 20.0], &[0.0, 5.0, 10.0, 15.0, 1000.0]]);
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let links = connect_layers(&nodes, &layers, &mut rng);
            let mut fresh = nodes.clone();
            apply_links(&mut fresh, &links);
            assert!(fresh[3..].iter().all(|n| !n.parents.is_empty()));
            assert!(fresh[..3].iter().all(|n| !n.connections.is_empty()));
            assert_eq!(fresh[7].parents, vec!["l0-n2".to_string()]);
        }
        apply_links(&mut nodes, &[(0, 3), (0, 3)]);
        assert_eq!(nodes[0].connections.len(), 1);
    }

    #[test]
    fn test_links_only_go_up_one_layer() {
        let (nodes, layers) = layered(&[&[400.0], &[100.0, 400.0, 700.0], &[50.0, 300.0, 500.0, 750.0], &[400.0]]);
        let mut rng = StdRng::seed_from_u64(8);
        for (from, to) in connect_layers(&nodes, &layers, &mut rng) {
            assert_eq!(nodes[to].layer, nodes[from].layer + 1);
        }
    }
}
