//! Weighted undirected waypoint graph.
//!
//! Nodes live in an arena keyed by their label; edges store label pairs plus
//! the runtime flags the event handlers and the vision updater toggle. The
//! node set is exactly the union of edge endpoints, added via [`Network::add_edge`].

mod edge;
mod node;

use std::sync::Arc;

use thiserror::Error;

pub use edge::Edge;
pub use node::{Node, NodeKind, NodeLabel};

use crate::constants::CLEAR_OBSTACLE_PENALTY_WEIGHT;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("node {0} not found")]
    NodeNotFound(NodeLabel),
    #[error("no edge between {0} and {1}")]
    EdgeNotFound(NodeLabel, NodeLabel),
    #[error("start node not found")]
    NoStartNode,
}

/// Nullary factory handing out fresh graph instances, so a reset never
/// aliases the mutated topology of the previous run.
pub type NetworkProvider = Arc<dyn Fn() -> Network + Send + Sync>;

#[derive(Debug, Clone, Default)]
pub struct Network {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an edge, inserting both endpoints into the node arena. The first
    /// definition of a node wins; later mentions only contribute the edge.
    pub fn add_edge(&mut self, a: Node, b: Node) {
        let edge = Edge::new(a.label, b.label);
        self.upsert_node(a);
        self.upsert_node(b);
        self.edges.push(edge);
    }

    fn upsert_node(&mut self, node: Node) {
        if !self.nodes.iter().any(|n| n.label == node.label) {
            self.nodes.push(node);
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, label: NodeLabel) -> Result<&Node, NetworkError> {
        self.nodes
            .iter()
            .find(|n| n.label == label)
            .ok_or(NetworkError::NodeNotFound(label))
    }

    pub fn node_mut(&mut self, label: NodeLabel) -> Result<&mut Node, NetworkError> {
        self.nodes
            .iter_mut()
            .find(|n| n.label == label)
            .ok_or(NetworkError::NodeNotFound(label))
    }

    /// The unique START node.
    pub fn start(&self) -> Result<&Node, NetworkError> {
        self.nodes
            .iter()
            .find(|n| n.kind == NodeKind::Start)
            .ok_or(NetworkError::NoStartNode)
    }

    /// All end nodes the mission can target.
    pub fn ends(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.kind == NodeKind::End)
    }

    pub fn edge(&self, a: NodeLabel, b: NodeLabel) -> Result<&Edge, NetworkError> {
        self.edges
            .iter()
            .find(|e| e.connects(a, b))
            .ok_or(NetworkError::EdgeNotFound(a, b))
    }

    pub fn edge_mut(&mut self, a: NodeLabel, b: NodeLabel) -> Result<&mut Edge, NetworkError> {
        self.edges
            .iter_mut()
            .find(|e| e.connects(a, b))
            .ok_or(NetworkError::EdgeNotFound(a, b))
    }

    /// Straight-line length of an edge.
    pub fn distance(&self, edge: &Edge) -> f64 {
        match (self.node(edge.a), self.node(edge.b)) {
            (Ok(a), Ok(b)) => ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt(),
            _ => f64::INFINITY,
        }
    }

    /// Traversal cost of an edge: infinite once the edge or either endpoint
    /// is disabled, distance plus the clearing penalty while obstructed,
    /// plain distance otherwise.
    pub fn edge_weight(&self, edge: &Edge) -> f64 {
        let endpoint_disabled = [edge.a, edge.b]
            .into_iter()
            .any(|label| self.node(label).map(|n| n.disabled).unwrap_or(true));
        if edge.disabled || endpoint_disabled {
            return f64::INFINITY;
        }
        if edge.obstructed {
            return self.distance(edge) + CLEAR_OBSTACLE_PENALTY_WEIGHT;
        }
        self.distance(edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::competition::create_network;
    use crate::constants::CLEAR_OBSTACLE_PENALTY_WEIGHT;

    #[test]
    fn nodes_are_the_union_of_edge_endpoints() {
        let network = create_network();
        assert_eq!(network.nodes().len(), 8);
        assert_eq!(network.edges().len(), 15);
        for edge in network.edges() {
            assert!(network.node(edge.a).is_ok());
            assert!(network.node(edge.b).is_ok());
        }
    }

    #[test]
    fn edge_lookup_ignores_direction() {
        let network = create_network();
        let forward = network.edge(NodeLabel::X, NodeLabel::Y).unwrap();
        let backward = network.edge(NodeLabel::Y, NodeLabel::X).unwrap();
        assert_eq!(forward, backward);
        assert!(network.edge(NodeLabel::W, NodeLabel::C).is_err());
    }

    #[test]
    fn weight_is_distance_while_the_edge_is_clear() {
        let network = create_network();
        let edge = network.edge(NodeLabel::Start, NodeLabel::X).unwrap();
        let expected = (0.5f64.powi(2) + 1.0).sqrt();
        assert!((network.edge_weight(edge) - expected).abs() < 1e-9);
    }

    #[test]
    fn weight_is_infinite_exactly_when_disabled() {
        let mut network = create_network();
        network.edge_mut(NodeLabel::X, NodeLabel::Y).unwrap().disabled = true;
        let edge = network.edge(NodeLabel::X, NodeLabel::Y).unwrap();
        assert!(network.edge_weight(edge).is_infinite());

        // a disabled endpoint takes every incident edge with it
        let mut network = create_network();
        network.node_mut(NodeLabel::X).unwrap().disabled = true;
        for edge in network.edges().iter().filter(|e| e.touches(NodeLabel::X)) {
            assert!(network.edge_weight(edge).is_infinite());
        }
        let clear = network.edge(NodeLabel::Y, NodeLabel::B).unwrap();
        assert!(network.edge_weight(clear).is_finite());
    }

    #[test]
    fn obstruction_adds_the_clearing_penalty() {
        let mut network = create_network();
        network
            .edge_mut(NodeLabel::X, NodeLabel::Y)
            .unwrap()
            .obstructed = true;
        let edge = network.edge(NodeLabel::X, NodeLabel::Y).unwrap();
        let distance = network.distance(edge);
        assert!((network.edge_weight(edge) - distance - CLEAR_OBSTACLE_PENALTY_WEIGHT).abs() < 1e-9);
    }
}
