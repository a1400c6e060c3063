//! Map-frame heading math.
//!
//! The vehicle's map frame has 0° pointing straight up the track (+y) and
//! positive angles turning to the right, which is why the x component is
//! negated before `atan2` and the result shifted by −90°.

use crate::network::Node;

/// Absolute heading from `on` towards `to`, in degrees.
pub fn angle_deg(on: &Node, to: &Node) -> f64 {
    let dx = -(to.x - on.x);
    let dy = to.y - on.y;
    dy.atan2(dx).to_degrees() - 90.0
}

/// Replace `current` by whichever of `current`, `current + 360` or
/// `current − 360` lies closest to `target`, so the turn delta
/// `target − current` never winds the long way around.
pub fn optimise_for_next_angle(current: f64, target: f64) -> f64 {
    let diff = (target - current).abs();
    let diff_plus_360 = (target - (current + 360.0)).abs();
    let diff_min_360 = (target - (current - 360.0)).abs();

    if diff < diff_plus_360 {
        if diff < diff_min_360 {
            current
        } else {
            current - 360.0
        }
    } else if diff_plus_360 < diff_min_360 {
        current + 360.0
    } else {
        current - 360.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Node, NodeLabel};

    fn at(x: f64, y: f64) -> Node {
        Node::normal(NodeLabel::W, x, y)
    }

    #[test]
    fn straight_up_is_zero() {
        assert_eq!(angle_deg(&at(0.0, 0.0), &at(0.0, 1.0)), 0.0);
    }

    #[test]
    fn straight_down_is_half_turn() {
        let angle = angle_deg(&at(0.0, 0.0), &at(0.0, -1.0));
        assert!(angle == 180.0 || angle == -180.0);
    }

    #[test]
    fn straight_right_is_quarter_turn() {
        assert_eq!(angle_deg(&at(0.0, 0.0), &at(1.0, 0.0)), 90.0);
    }

    #[test]
    fn straight_left_is_negative_quarter_turn() {
        assert_eq!(angle_deg(&at(0.0, 0.0), &at(-1.0, 0.0)), -90.0);
    }

    #[test]
    fn optimise_keeps_an_already_optimal_angle() {
        assert_eq!(optimise_for_next_angle(180.0, 180.0), 180.0);
        assert_eq!(optimise_for_next_angle(270.0, 270.0), 270.0);
    }

    #[test]
    fn optimise_wraps_across_the_360_boundary() {
        assert_eq!(optimise_for_next_angle(0.0, 350.0), 360.0);
        assert_eq!(optimise_for_next_angle(360.0, 10.0), 0.0);
        assert_eq!(optimise_for_next_angle(360.0, -10.0), 0.0);
    }

    #[test]
    fn optimise_picks_the_nearer_representative() {
        assert_eq!(optimise_for_next_angle(0.0, 190.0), 360.0);
        assert_eq!(optimise_for_next_angle(90.0, -100.0), -270.0);
        assert_eq!(optimise_for_next_angle(-80.0, 270.0), 280.0);
    }
}
