//! Track timing constants shared by the pathfinder and its callers.

pub const SPEED_M_PER_S: f64 = 1.0;
pub const CLEAR_OBSTACLE_PENALTY_S: f64 = 5.0;
pub const NODE_PENALTY_S: f64 = 2.0;

/// Extra weight on an obstructed edge: the time the vehicle loses clearing
/// the obstacle, expressed in meters at nominal speed.
pub const CLEAR_OBSTACLE_PENALTY_WEIGHT: f64 = SPEED_M_PER_S * CLEAR_OBSTACLE_PENALTY_S;

/// Extra weight per intermediate junction: the cost of stopping and turning.
pub const NODE_PENALTY_WEIGHT: f64 = SPEED_M_PER_S * NODE_PENALTY_S;

pub const VERSION: &str = concat!("linescout ", env!("CARGO_PKG_VERSION"));
