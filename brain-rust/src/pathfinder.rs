//! Least-cost routing over the waypoint network.
//!
//! Standard Dijkstra over the undirected edge set. On top of the per-edge
//! weight a soft penalty is added to every edge that touches neither the
//! route start nor the mission end, so the planner prefers a direct segment
//! over hopping through extra junctions the vehicle would have to stop and
//! turn at. Disabled edges and nodes carry infinite weight and are excluded
//! from relaxation entirely.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use thiserror::Error;

use crate::constants::NODE_PENALTY_WEIGHT;
use crate::network::{Network, NodeKind, NodeLabel};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// The start is not part of the graph, or the end is not an end node.
    #[error("invalid endpoint {0}")]
    InvalidEndpoint(NodeLabel),
    #[error("no path from {from} to {to}")]
    NoPathFound { from: NodeLabel, to: NodeLabel },
}

struct HeapEntry {
    cost: f64,
    node: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed so the std max-heap pops the cheapest entry first.
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Shortest path from `start` to `end` under the current edge weights.
pub fn find_path(
    network: &Network,
    start: NodeLabel,
    end: NodeLabel,
) -> Result<Vec<NodeLabel>, PathError> {
    let nodes = network.nodes();
    let index_of = |label: NodeLabel| nodes.iter().position(|n| n.label == label);

    let istart = index_of(start).ok_or(PathError::InvalidEndpoint(start))?;
    let iend = index_of(end)
        .filter(|&i| nodes[i].kind == NodeKind::End)
        .ok_or(PathError::InvalidEndpoint(end))?;

    // Adjacency with the junction penalty folded in. Infinite-weight edges
    // are dropped here, which removes disabled topology from the search.
    let mut adjacency: Vec<Vec<(usize, f64)>> = vec![Vec::new(); nodes.len()];
    for edge in network.edges() {
        let mut weight = network.edge_weight(edge);
        if !weight.is_finite() {
            continue;
        }
        if !edge.touches(start) && !edge.touches(end) {
            weight += NODE_PENALTY_WEIGHT;
        }
        if let (Some(ia), Some(ib)) = (index_of(edge.a), index_of(edge.b)) {
            adjacency[ia].push((ib, weight));
            adjacency[ib].push((ia, weight));
        }
    }

    let mut dist = vec![f64::INFINITY; nodes.len()];
    let mut prev: Vec<Option<usize>> = vec![None; nodes.len()];
    let mut heap = BinaryHeap::new();
    dist[istart] = 0.0;
    heap.push(HeapEntry {
        cost: 0.0,
        node: istart,
    });

    while let Some(HeapEntry { cost, node }) = heap.pop() {
        if node == iend {
            break;
        }
        if cost > dist[node] {
            continue;
        }
        for &(neighbour, weight) in &adjacency[node] {
            let candidate = cost + weight;
            if candidate < dist[neighbour] {
                dist[neighbour] = candidate;
                prev[neighbour] = Some(node);
                heap.push(HeapEntry {
                    cost: candidate,
                    node: neighbour,
                });
            }
        }
    }

    if dist[iend].is_infinite() {
        return Err(PathError::NoPathFound {
            from: start,
            to: end,
        });
    }

    let mut path = vec![nodes[iend].label];
    let mut cursor = iend;
    while let Some(previous) = prev[cursor] {
        path.push(nodes[previous].label);
        cursor = previous;
    }
    path.reverse();
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::competition::create_network;
    use crate::network::NodeLabel::{Start, A, B, C, W, X, Y, Z};

    #[test]
    fn unmodified_network_routes_through_the_middle() {
        let network = create_network();
        let path = find_path(&network, Start, B).unwrap();
        assert_eq!(path, vec![Start, X, Y, B]);
    }

    #[test]
    fn disabled_node_forces_the_western_detour() {
        let mut network = create_network();
        network.node_mut(X).unwrap().disabled = true;
        let path = find_path(&network, Start, B).unwrap();
        assert_eq!(path, vec![Start, Z, Y, B]);
    }

    #[test]
    fn disabled_edge_reroutes_over_the_end_zone() {
        let mut network = create_network();
        network.edge_mut(X, Y).unwrap().disabled = true;
        let path = find_path(&network, Start, B).unwrap();
        assert_eq!(path, vec![Start, X, A, B]);
    }

    #[test]
    fn obstruction_outweighs_the_shorter_route() {
        let mut network = create_network();
        network.edge_mut(X, Y).unwrap().disabled = true;
        network.edge_mut(X, A).unwrap().obstructed = true;
        let path = find_path(&network, Start, B).unwrap();
        assert_eq!(path, vec![Start, Z, Y, B]);
    }

    #[test]
    fn combined_damage_leaves_only_the_eastern_route() {
        let mut network = create_network();
        network.edge_mut(X, Y).unwrap().disabled = true;
        network.edge_mut(X, A).unwrap().obstructed = true;
        network.node_mut(Z).unwrap().disabled = true;
        let path = find_path(&network, Start, B).unwrap();
        assert_eq!(path, vec![Start, W, A, B]);
    }

    #[test]
    fn replanning_mid_track_starts_from_the_current_node() {
        let network = create_network();
        let path = find_path(&network, Z, C).unwrap();
        assert_eq!(path.first(), Some(&Z));
        assert_eq!(path.last(), Some(&C));
        for pair in path.windows(2) {
            let edge = network.edge(pair[0], pair[1]).unwrap();
            assert!(network.edge_weight(edge).is_finite());
        }
    }

    #[test]
    fn fully_disabled_network_yields_no_path() {
        let mut network = create_network();
        let pairs: Vec<_> = network.edges().iter().map(|e| (e.a, e.b)).collect();
        for (a, b) in pairs {
            network.edge_mut(a, b).unwrap().disabled = true;
        }
        assert_eq!(
            find_path(&network, Start, B),
            Err(PathError::NoPathFound { from: Start, to: B })
        );
    }

    #[test]
    fn isolated_start_yields_no_path() {
        let mut network = create_network();
        for b in [W, X, Z] {
            network.edge_mut(Start, b).unwrap().disabled = true;
        }
        assert_eq!(
            find_path(&network, Start, B),
            Err(PathError::NoPathFound { from: Start, to: B })
        );
    }

    #[test]
    fn only_end_nodes_are_valid_targets() {
        let network = create_network();
        assert_eq!(
            find_path(&network, Start, W),
            Err(PathError::InvalidEndpoint(W))
        );
    }
}
