use std::fmt;

use serde::{Deserialize, Serialize};

// ── Labels ────────────────────────────────────────────────────────────────────

/// Closed label set of the competition track. The label is a node's identity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeLabel {
    Start,
    W,
    X,
    Y,
    Z,
    A,
    B,
    C,
}

impl NodeLabel {
    pub const ALL: [NodeLabel; 8] = [
        NodeLabel::Start,
        NodeLabel::W,
        NodeLabel::X,
        NodeLabel::Y,
        NodeLabel::Z,
        NodeLabel::A,
        NodeLabel::B,
        NodeLabel::C,
    ];

    /// End nodes in wire order: the START event selects one by index.
    pub const ENDS: [NodeLabel; 3] = [NodeLabel::A, NodeLabel::B, NodeLabel::C];

    pub fn as_str(self) -> &'static str {
        match self {
            NodeLabel::Start => "START",
            NodeLabel::W => "W",
            NodeLabel::X => "X",
            NodeLabel::Y => "Y",
            NodeLabel::Z => "Z",
            NodeLabel::A => "A",
            NodeLabel::B => "B",
            NodeLabel::C => "C",
        }
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Nodes ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Start,
    End,
    #[default]
    Normal,
}

/// A waypoint of the track graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub label: NodeLabel,
    #[serde(rename = "type", default)]
    pub kind: NodeKind,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub disabled: bool,
}

impl Node {
    pub fn new(label: NodeLabel, kind: NodeKind, x: f64, y: f64) -> Self {
        Self {
            label,
            kind,
            x,
            y,
            disabled: false,
        }
    }

    pub fn normal(label: NodeLabel, x: f64, y: f64) -> Self {
        Self::new(label, NodeKind::Normal, x, y)
    }
}

// Identity is the label alone; position and flags are mutable state.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
    }
}

impl Eq for Node {}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.label)
    }
}
