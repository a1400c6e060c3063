//! Engine: owns the link, the sender/receiver pair, and the algorithm slot.
//!
//! The receiver is wired once, at construction, to two listeners: the
//! mission log (operator stream) and the [`AlgorithmHost`]. Swapping the
//! algorithm only replaces what lives inside the host's mutex, so detaching
//! never leaves stale handlers behind on the receiver.

use std::sync::Arc;

use anyhow::{bail, Result};
use futures_util::future::BoxFuture;
use tokio::sync::Mutex;
use tracing::info;

use crate::algorithm::{AlgorithmKind, RoadSense};
use crate::listener::{self, MissionListener};
use crate::mission_log::{MissionLog, MissionLogListener};
use crate::network::{Network, NetworkProvider, NodeLabel};
use crate::uart::{Receiver, Sender, UartLink};
use crate::vision::SceneUpdate;

// ── Algorithm slot ────────────────────────────────────────────────────────────

/// The receiver-attached slot algorithms are swapped in and out of. An empty
/// slot means manual control: events are logged but nothing reacts.
pub struct AlgorithmHost {
    current: Option<RoadSense>,
}

impl MissionListener for AlgorithmHost {
    fn on_start(&mut self, target: NodeLabel) -> BoxFuture<'_, Result<()>> {
        match self.current.as_mut() {
            Some(algorithm) => algorithm.on_start(target),
            None => Box::pin(async { Ok(()) }),
        }
    }

    fn on_point_reached(&mut self) -> BoxFuture<'_, Result<()>> {
        match self.current.as_mut() {
            Some(algorithm) => algorithm.on_point_reached(),
            None => Box::pin(async { Ok(()) }),
        }
    }

    fn on_no_line_found(&mut self) -> BoxFuture<'_, Result<()>> {
        match self.current.as_mut() {
            Some(algorithm) => algorithm.on_no_line_found(),
            None => Box::pin(async { Ok(()) }),
        }
    }

    fn on_next_point_blocked(&mut self) -> BoxFuture<'_, Result<()>> {
        match self.current.as_mut() {
            Some(algorithm) => algorithm.on_next_point_blocked(),
            None => Box::pin(async { Ok(()) }),
        }
    }

    fn on_obstacle_detected(&mut self) -> BoxFuture<'_, Result<()>> {
        match self.current.as_mut() {
            Some(algorithm) => algorithm.on_obstacle_detected(),
            None => Box::pin(async { Ok(()) }),
        }
    }

    fn on_aligned(&mut self, hold: bool) -> BoxFuture<'_, Result<()>> {
        match self.current.as_mut() {
            Some(algorithm) => algorithm.on_aligned(hold),
            None => Box::pin(async { Ok(()) }),
        }
    }

    fn on_returning(&mut self) -> BoxFuture<'_, Result<()>> {
        match self.current.as_mut() {
            Some(algorithm) => algorithm.on_returning(),
            None => Box::pin(async { Ok(()) }),
        }
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

pub struct Engine {
    sender: Sender,
    receiver: Receiver,
    provider: NetworkProvider,
    log: MissionLog,
    host: Arc<Mutex<AlgorithmHost>>,
}

impl Engine {
    pub fn new(provider: NetworkProvider, link: Arc<UartLink>, log: MissionLog) -> Self {
        let sender = Sender::new(link.clone());
        let receiver = Receiver::new(&link);

        // the operator stream sees every event, before the algorithm acts
        listener::attach(
            &receiver,
            Arc::new(Mutex::new(MissionLogListener::new(log.clone()))),
        );
        let host = Arc::new(Mutex::new(AlgorithmHost { current: None }));
        listener::attach(&receiver, host.clone());

        Self {
            sender,
            receiver,
            provider,
            log,
            host,
        }
    }

    /// Bring the engine up. Unless `manual`, this instantiates the default
    /// algorithm with a fresh graph.
    pub async fn init(&self, manual: bool) -> Result<()> {
        if manual {
            info!("manual mode, no algorithm attached");
        } else {
            info!("starting algorithm");
            self.change_algorithm(Some(AlgorithmKind::RoadSense))
                .await?;
        }
        info!("engine initialised");
        Ok(())
    }

    /// Swap the running algorithm; `None` enables manual control.
    pub async fn change_algorithm(&self, kind: Option<AlgorithmKind>) -> Result<()> {
        let mut host = self.host.lock().await;
        if host.current.is_some() {
            info!("stopping current algorithm");
        }
        host.current = match kind {
            None => {
                info!("no algorithm specified, manual control enabled");
                None
            }
            Some(kind) => {
                info!("changing algorithm to {}", kind.name());
                match kind {
                    AlgorithmKind::RoadSense => Some(RoadSense::new(
                        self.provider.clone(),
                        self.sender.clone(),
                        self.log.clone(),
                    )?),
                }
            }
        };
        Ok(())
    }

    pub async fn algorithm_name(&self) -> Option<&'static str> {
        self.host
            .lock()
            .await
            .current
            .as_ref()
            .map(|_| RoadSense::NAME)
    }

    /// Forwarded to the algorithm: drop mission state and start over on a
    /// pristine graph.
    pub async fn reset(&self) -> Result<()> {
        info!("resetting engine");
        if let Some(algorithm) = self.host.lock().await.current.as_mut() {
            algorithm.reset()?;
        }
        info!("engine reset complete");
        Ok(())
    }

    /// Apply a vision update to the live graph. Holding the algorithm lock
    /// for the whole write-back guarantees a pathfinder run never sees a
    /// half-applied update.
    pub async fn apply_scene_update(&self, update: &SceneUpdate) -> Result<()> {
        let mut host = self.host.lock().await;
        match host.current.as_mut() {
            Some(algorithm) => {
                update.apply(algorithm.network_mut());
                Ok(())
            }
            None => bail!("no algorithm running"),
        }
    }

    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    /// A fresh graph from the configured provider.
    pub fn create_network(&self) -> Network {
        (self.provider)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::DuplexStream;

    use crate::competition::create_network;

    fn engine() -> (Engine, DuplexStream) {
        let (brain_side, vehicle_side) = tokio::io::duplex(256);
        let (reader, writer) = tokio::io::split(brain_side);
        let link = UartLink::new(reader, writer);
        let provider: NetworkProvider = Arc::new(create_network);
        (Engine::new(provider, link, MissionLog::new()), vehicle_side)
    }

    #[tokio::test]
    async fn the_algorithm_slot_swaps_and_empties() {
        let (engine, _wire) = engine();
        engine.init(true).await.unwrap();
        assert_eq!(engine.algorithm_name().await, None);

        engine
            .change_algorithm(Some(AlgorithmKind::RoadSense))
            .await
            .unwrap();
        assert_eq!(engine.algorithm_name().await, Some("RoadSense"));

        engine.change_algorithm(None).await.unwrap();
        assert_eq!(engine.algorithm_name().await, None);
    }

    #[tokio::test]
    async fn scene_updates_need_a_running_algorithm() {
        let (engine, _wire) = engine();
        let update = SceneUpdate::default();
        assert!(engine.apply_scene_update(&update).await.is_err());

        engine.init(false).await.unwrap();
        assert!(engine.apply_scene_update(&update).await.is_ok());
    }
}
