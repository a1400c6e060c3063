//! Mission algorithms selectable via the control plane.

mod road_sense;

pub use road_sense::RoadSense;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmKind {
    RoadSense,
}

impl AlgorithmKind {
    pub const ALL: [AlgorithmKind; 1] = [AlgorithmKind::RoadSense];

    pub fn name(self) -> &'static str {
        match self {
            AlgorithmKind::RoadSense => RoadSense::NAME,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}
