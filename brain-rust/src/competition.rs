//! Competition track topology and the operator-editable network document.
//!
//! The embedded default mirrors the competition layout; `PUT /api/system/network`
//! stores overriding coordinates in `dynamic_network.json` and the provider
//! picks them up on the next mission reset.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::network::{Network, Node, NodeKind, NodeLabel};

pub const DYNAMIC_NETWORK_FILE: &str = "dynamic_network.json";

const DEFAULT_POSITIONS: [(NodeLabel, f64, f64); 8] = [
    (NodeLabel::Start, 0.0, 0.0),
    (NodeLabel::W, 2.0, 1.0),
    (NodeLabel::X, 0.5, 1.0),
    (NodeLabel::Y, 0.0, 2.5),
    (NodeLabel::Z, -2.0, 1.0),
    (NodeLabel::A, 2.0, 4.0),
    (NodeLabel::B, 0.0, 5.0),
    (NodeLabel::C, -2.0, 4.0),
];

const EDGES: [(NodeLabel, NodeLabel); 15] = [
    (NodeLabel::Start, NodeLabel::W),
    (NodeLabel::Start, NodeLabel::X),
    (NodeLabel::Start, NodeLabel::Z),
    (NodeLabel::W, NodeLabel::A),
    (NodeLabel::W, NodeLabel::X),
    (NodeLabel::X, NodeLabel::Y),
    (NodeLabel::X, NodeLabel::Z),
    (NodeLabel::X, NodeLabel::A),
    (NodeLabel::Y, NodeLabel::A),
    (NodeLabel::Y, NodeLabel::B),
    (NodeLabel::Y, NodeLabel::C),
    (NodeLabel::Y, NodeLabel::Z),
    (NodeLabel::Z, NodeLabel::C),
    (NodeLabel::A, NodeLabel::B),
    (NodeLabel::B, NodeLabel::C),
];

fn kind_of(label: NodeLabel) -> NodeKind {
    match label {
        NodeLabel::Start => NodeKind::Start,
        NodeLabel::A | NodeLabel::B | NodeLabel::C => NodeKind::End,
        _ => NodeKind::Normal,
    }
}

// ── Network document ──────────────────────────────────────────────────────────

/// One node position in the operator document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NodePosition {
    pub x: f64,
    pub y: f64,
}

/// The `dynamic_network.json` document: a position for every label.
pub type NetworkDocument = BTreeMap<NodeLabel, NodePosition>;

/// Build a graph from a position document. Every label must be present.
pub fn network_from_document(document: &NetworkDocument) -> Result<Network> {
    let mut positions = BTreeMap::new();
    for label in NodeLabel::ALL {
        let position = document
            .get(&label)
            .ok_or_else(|| anyhow!("node {label} missing from network document"))?;
        if !position.x.is_finite() || !position.y.is_finite() {
            return Err(anyhow!("node {label} has a non-finite position"));
        }
        positions.insert(label, *position);
    }
    Ok(assemble(&positions))
}

fn assemble(positions: &BTreeMap<NodeLabel, NodePosition>) -> Network {
    let node = |label: NodeLabel| {
        let position = positions[&label];
        Node::new(label, kind_of(label), position.x, position.y)
    };
    let mut network = Network::new();
    for (a, b) in EDGES {
        network.add_edge(node(a), node(b));
    }
    network
}

/// Persist an operator-supplied document for subsequent resets.
pub fn store_document(document: &NetworkDocument) -> Result<()> {
    let json = serde_json::to_string_pretty(document)?;
    std::fs::write(DYNAMIC_NETWORK_FILE, json)
        .with_context(|| format!("writing {DYNAMIC_NETWORK_FILE}"))?;
    info!("network document updated");
    Ok(())
}

// ── Providers ─────────────────────────────────────────────────────────────────

/// The embedded competition topology.
pub fn create_network() -> Network {
    let positions = DEFAULT_POSITIONS
        .into_iter()
        .map(|(label, x, y)| (label, NodePosition { x, y }))
        .collect();
    assemble(&positions)
}

/// Like [`create_network`], but with coordinates from `dynamic_network.json`
/// when the file exists and parses. Falls back to the embedded layout.
pub fn create_dynamic_network() -> Network {
    if !Path::new(DYNAMIC_NETWORK_FILE).exists() {
        return create_network();
    }
    let loaded = std::fs::read_to_string(DYNAMIC_NETWORK_FILE)
        .map_err(anyhow::Error::from)
        .and_then(|data| Ok(serde_json::from_str::<NetworkDocument>(&data)?))
        .and_then(|document| network_from_document(&document));
    match loaded {
        Ok(network) => network,
        Err(e) => {
            warn!("failed to load {DYNAMIC_NETWORK_FILE}: {e}, using default network");
            create_network()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_network_has_one_start_and_three_ends() {
        let network = create_network();
        assert_eq!(network.start().unwrap().label, NodeLabel::Start);
        let mut ends: Vec<_> = network.ends().map(|n| n.label).collect();
        ends.sort();
        assert_eq!(ends, vec![NodeLabel::A, NodeLabel::B, NodeLabel::C]);
    }

    #[test]
    fn document_round_trips_into_the_same_topology() {
        let document: NetworkDocument = DEFAULT_POSITIONS
            .into_iter()
            .map(|(label, x, y)| (label, NodePosition { x, y }))
            .collect();
        let network = network_from_document(&document).unwrap();
        assert_eq!(network.edges().len(), 15);
        let x = network.node(NodeLabel::X).unwrap();
        assert_eq!((x.x, x.y), (0.5, 1.0));
        assert_eq!(x.kind, NodeKind::Normal);
    }

    #[test]
    fn document_must_cover_every_label() {
        let mut document: NetworkDocument = DEFAULT_POSITIONS
            .into_iter()
            .map(|(label, x, y)| (label, NodePosition { x, y }))
            .collect();
        document.remove(&NodeLabel::Y);
        assert!(network_from_document(&document).is_err());
    }

    #[test]
    fn document_labels_serialize_as_plain_strings() {
        let document: NetworkDocument = DEFAULT_POSITIONS
            .into_iter()
            .map(|(label, x, y)| (label, NodePosition { x, y }))
            .collect();
        let json = serde_json::to_value(&document).unwrap();
        assert!(json.get("START").is_some());
        assert!(json.get("W").is_some());
    }
}
