//! RoadSense: the autonomous mission state machine.
//!
//! One mission runs from a START event to the destination-reached
//! announcement. The vehicle first follows the line out of the start zone to
//! the physical START marker, then alternates between turning towards the
//! next waypoint and following the line to it. Every obstacle report mutates
//! the graph and triggers a replan from the waypoint the vehicle currently
//! sits on.
//!
//! The vehicle can report trouble in three distinct ways, with different
//! timing semantics:
//! - `NO_LINE_FOUND` while standing on a waypoint: the segment ahead is
//!   gone; disable the edge and replan immediately.
//! - `NEXT_POINT_BLOCKED` while standing: the waypoint ahead is occupied;
//!   disable it and replan immediately.
//! - `NEXT_POINT_BLOCKED` while moving: the firmware turns around and drives
//!   back on its own, so only flip the model heading and wait. A `RETURNING`
//!   plus `POINT_REACHED` will follow, and the replan happens on arrival.

use std::time::{Duration, Instant};

use anyhow::Result;
use futures_util::future::BoxFuture;
use tracing::{debug, error, info, warn};

use crate::actor::Actor;
use crate::listener::MissionListener;
use crate::mission_log::{LogLevel, MissionLog};
use crate::network::{Network, NetworkError, NetworkProvider, NodeLabel};
use crate::pathfinder::find_path;
use crate::uart::Sender;

pub const DEFAULT_NO_LINE_DEBOUNCE: Duration = Duration::from_millis(100);

/// State of a single navigation run, present only between START and
/// destination reached.
struct Mission {
    target: NodeLabel,
    path: Vec<NodeLabel>,
    /// Index into `path` of the node the vehicle currently sits on.
    node_index: usize,
    started_at: Instant,
}

pub struct RoadSense {
    provider: NetworkProvider,
    network: Network,
    actor: Actor,
    log: MissionLog,
    mission: Option<Mission>,
    in_start_zone: bool,
    is_moving: bool,
    recalculation_required: bool,
    no_line_debounce: Duration,
}

impl RoadSense {
    pub const NAME: &'static str = "RoadSense";

    pub fn new(
        provider: NetworkProvider,
        sender: Sender,
        log: MissionLog,
    ) -> Result<Self, NetworkError> {
        let network = provider();
        let start = network.start()?.label;
        Ok(Self {
            provider,
            network,
            actor: Actor::new(sender, start),
            log,
            mission: None,
            in_start_zone: true,
            is_moving: false,
            recalculation_required: false,
            no_line_debounce: DEFAULT_NO_LINE_DEBOUNCE,
        })
    }

    /// Grace period between a missing-line report and the replan, covering
    /// the firmware's event/alignment race. Tune per environment.
    pub fn set_no_line_debounce(&mut self, debounce: Duration) {
        self.no_line_debounce = debounce;
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    /// Discard any running mission and fetch a pristine graph from the
    /// provider; the old one was mutated in place during the run.
    pub fn reset(&mut self) -> Result<(), NetworkError> {
        self.network = (self.provider)();
        let start = self.network.start()?.label;
        self.actor.reset(start);
        self.mission = None;
        self.in_start_zone = true;
        self.is_moving = false;
        self.recalculation_required = false;
        Ok(())
    }

    fn abort_mission(&mut self, reason: &str) {
        error!("{reason}, aborting mission");
        self.log
            .push(LogLevel::Error, format!("mission aborted: {reason}"));
        self.mission = None;
        self.recalculation_required = false;
    }

    /// Label of the node after the current one in the planned path.
    fn next_node_label(&self) -> Option<NodeLabel> {
        let mission = self.mission.as_ref()?;
        mission.path.get(mission.node_index + 1).copied()
    }

    /// Re-plan from the waypoint the vehicle sits on and turn towards the
    /// first hop. A planning failure ends the mission; the operator has to
    /// intervene.
    async fn restart(&mut self) -> Result<()> {
        let Some(target) = self.mission.as_ref().map(|m| m.target) else {
            warn!("restart without an active mission");
            return Ok(());
        };
        let from = self.actor.current_or_last_node();
        match find_path(&self.network, from, target) {
            Ok(path) => {
                debug!("new path: {path:?}");
                if let Some(mission) = self.mission.as_mut() {
                    mission.path = path;
                    mission.node_index = 0;
                }
                self.turn_to_next_node().await
            }
            Err(e) => {
                self.abort_mission(&e.to_string());
                Ok(())
            }
        }
    }

    async fn turn_to_next_node(&mut self) -> Result<()> {
        let pair = self.mission.as_ref().and_then(|m| {
            Some((
                *m.path.get(m.node_index)?,
                *m.path.get(m.node_index + 1)?,
            ))
        });
        let Some((on, to)) = pair else {
            self.abort_mission("no next node in path");
            return Ok(());
        };
        let on = self.network.node(on)?.clone();
        let to = self.network.node(to)?.clone();
        self.actor.turn_on_node(&on, &to).await?;
        debug!("turn on {} to {}", on.label, to.label);
        Ok(())
    }

    async fn finish_mission(&mut self) -> Result<()> {
        self.actor.destination_reached().await?;
        if let Some(mission) = self.mission.take() {
            let elapsed = mission.started_at.elapsed();
            info!("destination {} reached in {elapsed:.1?}", mission.target);
            self.log.push(
                LogLevel::Info,
                format!("destination {} reached in {elapsed:.1?}", mission.target),
            );
        }
        Ok(())
    }

    async fn handle_start(&mut self, target: NodeLabel) -> Result<()> {
        // a repeated START recycles whatever mission was running
        self.mission = Some(Mission {
            target,
            path: Vec::new(),
            node_index: 0,
            started_at: Instant::now(),
        });
        self.in_start_zone = true;
        self.recalculation_required = false;
        self.log
            .push(LogLevel::Info, format!("navigating to {target}"));
        // the leg out of the start zone is a plain line-follow
        self.actor.follow_to_next_node().await?;
        self.is_moving = true;
        debug!("started navigation to {target}");
        Ok(())
    }

    async fn handle_point_reached(&mut self) -> Result<()> {
        self.is_moving = false;

        if self.mission.is_none() {
            warn!("POINT_REACHED with no active mission");
            return Ok(());
        }

        if self.in_start_zone {
            debug!("start point reached");
            self.in_start_zone = false;
            let start = self.network.start()?.label;
            self.actor.set_current_or_last_node(start);
            return self.restart().await;
        }

        if self.recalculation_required {
            debug!("recalculating path");
            self.recalculation_required = false;
            return self.restart().await;
        }

        let advance = {
            let Some(mission) = self.mission.as_mut() else {
                return Ok(());
            };
            mission.node_index += 1;
            mission
                .path
                .get(mission.node_index)
                .copied()
                .map(|reached| (reached, mission.target))
        };
        let Some((reached, target)) = advance else {
            self.abort_mission("ran past the end of the planned path");
            return Ok(());
        };

        self.actor.set_current_or_last_node(reached);
        debug!("reached node {reached}");

        if reached == target {
            self.finish_mission().await
        } else {
            self.turn_to_next_node().await
        }
    }

    async fn handle_next_point_blocked(&mut self) -> Result<()> {
        self.actor.on_next_node_blocked();
        if self.is_moving {
            debug!("next point blocked, handle after returning");
            return Ok(());
        }
        debug!("next point blocked, recalculating path");
        let Some(next) = self.next_node_label() else {
            self.abort_mission("blocked without a next node");
            return Ok(());
        };
        self.network.node_mut(next)?.disabled = true;
        self.restart().await
    }

    async fn handle_no_line_found(&mut self) -> Result<()> {
        let pair = self.mission.as_ref().and_then(|m| {
            Some((
                *m.path.get(m.node_index)?,
                *m.path.get(m.node_index + 1)?,
            ))
        });
        let Some((from, to)) = pair else {
            warn!("NO_LINE_FOUND with no segment to disable");
            return Ok(());
        };
        self.network.edge_mut(from, to)?.disabled = true;
        debug!("line {from} -> {to} is missing, recalculating");
        // let the firmware finish its own recovery before commanding a turn
        tokio::time::sleep(self.no_line_debounce).await;
        self.restart().await
    }

    async fn handle_returning(&mut self) -> Result<()> {
        let Some(next) = self.next_node_label() else {
            warn!("RETURNING with no next node");
            return Ok(());
        };
        self.network.node_mut(next)?.disabled = true;
        self.recalculation_required = true;
        Ok(())
    }

    async fn handle_aligned(&mut self, hold: bool) -> Result<()> {
        debug!("aligned, {}", if hold { "holding" } else { "proceeding" });
        if hold {
            return Ok(());
        }
        self.actor.follow_to_next_node().await?;
        self.is_moving = true;
        Ok(())
    }
}

impl MissionListener for RoadSense {
    fn on_start(&mut self, target: NodeLabel) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.handle_start(target))
    }

    fn on_point_reached(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.handle_point_reached())
    }

    fn on_no_line_found(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.handle_no_line_found())
    }

    fn on_next_point_blocked(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.handle_next_point_blocked())
    }

    fn on_aligned(&mut self, hold: bool) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.handle_aligned(hold))
    }

    fn on_returning(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.handle_returning())
    }

    // OBSTACLE_DETECTED is an extension hook; the base algorithm ignores it.
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tokio::io::DuplexStream;

    use crate::competition::create_network;
    use crate::uart::UartLink;

    fn road_sense() -> (RoadSense, DuplexStream) {
        let (brain_side, vehicle_side) = tokio::io::duplex(256);
        let (reader, writer) = tokio::io::split(brain_side);
        let link = UartLink::new(reader, writer);
        let provider: NetworkProvider = Arc::new(create_network);
        let algorithm =
            RoadSense::new(provider, Sender::new(link), MissionLog::new()).unwrap();
        (algorithm, vehicle_side)
    }

    #[tokio::test]
    async fn reset_restores_a_pristine_graph() {
        let (mut algorithm, _wire) = road_sense();
        algorithm
            .network_mut()
            .node_mut(NodeLabel::X)
            .unwrap()
            .disabled = true;
        algorithm.reset().unwrap();
        assert!(!algorithm.network().node(NodeLabel::X).unwrap().disabled);
        assert!(algorithm.mission.is_none());
    }

    #[tokio::test]
    async fn planning_failure_aborts_the_mission() {
        let (mut algorithm, _wire) = road_sense();
        // cut the start node off before the mission begins
        for neighbour in [NodeLabel::W, NodeLabel::X, NodeLabel::Z] {
            algorithm
                .network_mut()
                .edge_mut(NodeLabel::Start, neighbour)
                .unwrap()
                .disabled = true;
        }
        algorithm.handle_start(NodeLabel::B).await.unwrap();
        assert!(algorithm.mission.is_some());

        // reaching the start marker triggers planning, which cannot succeed
        algorithm.handle_point_reached().await.unwrap();
        assert!(algorithm.mission.is_none());
    }

    #[tokio::test]
    async fn stray_events_outside_a_mission_are_ignored() {
        let (mut algorithm, _wire) = road_sense();
        algorithm.handle_point_reached().await.unwrap();
        assert!(algorithm.mission.is_none());
        algorithm.handle_no_line_found().await.unwrap();
        algorithm.handle_returning().await.unwrap();
    }
}
