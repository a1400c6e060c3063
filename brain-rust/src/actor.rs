//! Heading-aware motion actor.
//!
//! Tracks the vehicle's logical heading and last-reached waypoint so graph
//! moves can be translated into relative turn commands. The firmware only
//! understands "turn by Δ degrees", so the model heading must stay in sync
//! with every physical rotation, including the autonomous about-turn the
//! vehicle performs when its way is blocked.

use anyhow::Result;
use tracing::debug;

use crate::heading;
use crate::network::{Node, NodeLabel};
use crate::uart::Sender;

pub struct Actor {
    sender: Sender,
    heading_deg: f64,
    current_or_last_node: NodeLabel,
}

impl Actor {
    pub fn new(sender: Sender, start_node: NodeLabel) -> Self {
        Self {
            sender,
            heading_deg: 0.0,
            current_or_last_node: start_node,
        }
    }

    pub fn current_or_last_node(&self) -> NodeLabel {
        self.current_or_last_node
    }

    pub fn set_current_or_last_node(&mut self, node: NodeLabel) {
        self.current_or_last_node = node;
    }

    pub fn heading_deg(&self) -> f64 {
        self.heading_deg
    }

    /// Back to a known pose: the given waypoint, facing straight up.
    pub fn reset(&mut self, start_node: NodeLabel) {
        self.heading_deg = 0.0;
        self.current_or_last_node = start_node;
    }

    /// The vehicle turned around on its own to drive back; mirror the
    /// rotation in the model. No command is sent.
    pub fn on_next_node_blocked(&mut self) {
        debug!(
            "next node blocked, turning 180 degrees from {:.0}",
            self.heading_deg
        );
        self.heading_deg += 180.0;
    }

    /// Rotate on `on` until the vehicle faces `to`.
    pub async fn turn_on_node(&mut self, on: &Node, to: &Node) -> Result<()> {
        let target = heading::angle_deg(on, to);
        let current = heading::optimise_for_next_angle(self.heading_deg, target);
        debug!(
            "turning on node from {:.0} to {:.0} degrees (current: {:.0})",
            self.heading_deg, target, current
        );
        let delta = (target - current).round() as i16;
        self.sender.turn(delta, true).await?;
        self.heading_deg = target;
        Ok(())
    }

    pub async fn follow_to_next_node(&self) -> Result<()> {
        self.sender.follow_line().await
    }

    pub async fn destination_reached(&self) -> Result<()> {
        self.sender.destination_reached().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Node;
    use crate::uart::UartLink;
    use tokio::io::{duplex, AsyncReadExt};

    fn actor_with_wire() -> (Actor, tokio::io::ReadHalf<tokio::io::DuplexStream>) {
        let (brain_side, vehicle_side) = duplex(256);
        let (r, w) = tokio::io::split(brain_side);
        let link = UartLink::new(r, w);
        let actor = Actor::new(Sender::new(link), NodeLabel::Start);
        let (vr, _vw) = tokio::io::split(vehicle_side);
        (actor, vr)
    }

    async fn read_turn(reader: &mut (impl AsyncReadExt + Unpin)) -> (i16, u8) {
        let mut frame = [0u8; 5];
        reader.read_exact(&mut frame).await.unwrap();
        assert_eq!(frame[0], 0x01);
        (i16::from_le_bytes([frame[1], frame[2]]), frame[3])
    }

    #[tokio::test]
    async fn turn_delta_is_relative_to_the_tracked_heading() {
        let (mut actor, mut wire) = actor_with_wire();
        let on = Node::normal(NodeLabel::Start, 0.0, 0.0);
        let right = Node::normal(NodeLabel::W, 1.0, 0.0);
        let up = Node::normal(NodeLabel::X, 1.0, 1.0);

        actor.turn_on_node(&on, &right).await.unwrap();
        let (delta, snap) = read_turn(&mut wire).await;
        assert_eq!((delta, snap), (90, 1));
        assert_eq!(actor.heading_deg(), 90.0);

        // straight up from here: the delta is the difference, not the
        // absolute angle
        actor.turn_on_node(&right, &up).await.unwrap();
        let (delta, _) = read_turn(&mut wire).await;
        assert_eq!(delta, -90);
    }

    #[tokio::test]
    async fn blocked_node_flips_the_model_heading_without_a_command() {
        let (mut actor, _wire) = actor_with_wire();
        actor.on_next_node_blocked();
        assert_eq!(actor.heading_deg(), 180.0);
    }
}
