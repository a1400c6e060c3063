use std::fmt;

use serde::{Deserialize, Serialize};

use super::node::NodeLabel;

/// Undirected track segment between two waypoints, identified by the
/// unordered endpoint pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub a: NodeLabel,
    pub b: NodeLabel,
    /// Semantically removed: the pathfinder treats it as infinite weight.
    #[serde(default)]
    pub disabled: bool,
    /// Traversable, but clearing the obstacle costs extra time.
    #[serde(default)]
    pub obstructed: bool,
}

impl Edge {
    pub fn new(a: NodeLabel, b: NodeLabel) -> Self {
        Self {
            a,
            b,
            disabled: false,
            obstructed: false,
        }
    }

    /// Endpoint test that ignores direction.
    pub fn connects(&self, a: NodeLabel, b: NodeLabel) -> bool {
        (self.a == a && self.b == b) || (self.a == b && self.b == a)
    }

    pub fn touches(&self, node: NodeLabel) -> bool {
        self.a == node || self.b == node
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.connects(other.a, other.b)
    }
}

impl Eq for Edge {}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Edge({} -> {})", self.a, self.b)
    }
}
