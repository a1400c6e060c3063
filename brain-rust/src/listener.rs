//! Typed demultiplexing of raw vehicle events.
//!
//! A [`MissionListener`] gets one callback per event kind, with the START
//! target index and the ALIGNED hold flag already decoded. Every method has
//! a no-op default so listeners only spell out what they care about.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use futures_util::future::BoxFuture;
use tokio::sync::Mutex;

use uart_proto::Event;

use crate::network::NodeLabel;
use crate::uart::{Handler, Receiver};

pub trait MissionListener: Send + 'static {
    fn on_start(&mut self, _target: NodeLabel) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn on_point_reached(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn on_no_line_found(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn on_next_point_blocked(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn on_obstacle_detected(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn on_aligned(&mut self, _hold: bool) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn on_returning(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}

/// Wire a listener to the receiver. The listener stays attached for the
/// lifetime of the receiver; swap behaviour by swapping what lives inside
/// the mutex.
pub fn attach<L: MissionListener>(receiver: &Receiver, listener: Arc<Mutex<L>>) {
    {
        let listener = listener.clone();
        receiver.on(
            Event::Start,
            Handler::event_and_payload(move |_, payload| {
                let listener = listener.clone();
                async move {
                    let index = *payload
                        .first()
                        .ok_or_else(|| anyhow!("START event without a target byte"))?
                        as usize;
                    let target = *NodeLabel::ENDS
                        .get(index)
                        .ok_or_else(|| anyhow!("END index {index} out of range"))?;
                    listener.lock().await.on_start(target).await
                }
            }),
        );
    }
    {
        let listener = listener.clone();
        receiver.on(
            Event::Aligned,
            Handler::event_and_payload(move |_, payload| {
                let listener = listener.clone();
                async move {
                    let hold = *payload
                        .first()
                        .ok_or_else(|| anyhow!("ALIGNED event without a hold byte"))?
                        == 1;
                    listener.lock().await.on_aligned(hold).await
                }
            }),
        );
    }
    {
        let listener = listener.clone();
        receiver.on(
            Event::PointReached,
            Handler::parameterless(move || {
                let listener = listener.clone();
                async move { listener.lock().await.on_point_reached().await }
            }),
        );
    }
    {
        let listener = listener.clone();
        receiver.on(
            Event::NoLineFound,
            Handler::parameterless(move || {
                let listener = listener.clone();
                async move { listener.lock().await.on_no_line_found().await }
            }),
        );
    }
    {
        let listener = listener.clone();
        receiver.on(
            Event::NextPointBlocked,
            Handler::parameterless(move || {
                let listener = listener.clone();
                async move { listener.lock().await.on_next_point_blocked().await }
            }),
        );
    }
    {
        let listener = listener.clone();
        receiver.on(
            Event::ObstacleDetected,
            Handler::parameterless(move || {
                let listener = listener.clone();
                async move { listener.lock().await.on_obstacle_detected().await }
            }),
        );
    }
    {
        let listener = listener.clone();
        receiver.on(
            Event::Returning,
            Handler::parameterless(move || {
                let listener = listener.clone();
                async move { listener.lock().await.on_returning().await }
            }),
        );
    }
}
