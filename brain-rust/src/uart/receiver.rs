//! Event fan-out: maps each event kind to an ordered list of handlers.
//!
//! A handler that fails is logged and skipped; one faulty listener must not
//! stall the read loop or starve the handlers behind it. LOG_MESSAGE frames
//! additionally get their UTF-8 payload decoded and logged before any user
//! handlers run.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use bytes::Bytes;
use futures_util::future::BoxFuture;
use tracing::{debug, error};

use uart_proto::Event;

use super::protocol::UartLink;

/// An event handler in one of the three supported arities.
pub enum Handler {
    Parameterless(Box<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>),
    EventOnly(Box<dyn Fn(Event) -> BoxFuture<'static, Result<()>> + Send + Sync>),
    EventAndPayload(Box<dyn Fn(Event, Bytes) -> BoxFuture<'static, Result<()>> + Send + Sync>),
}

impl Handler {
    pub fn parameterless<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self::Parameterless(Box::new(move || Box::pin(f())))
    }

    pub fn event_only<F, Fut>(f: F) -> Self
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self::EventOnly(Box::new(move |event| Box::pin(f(event))))
    }

    pub fn event_and_payload<F, Fut>(f: F) -> Self
    where
        F: Fn(Event, Bytes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self::EventAndPayload(Box::new(move |event, payload| Box::pin(f(event, payload))))
    }

    async fn invoke(&self, event: Event, payload: &Bytes) -> Result<()> {
        match self {
            Self::Parameterless(f) => f().await,
            Self::EventOnly(f) => f(event).await,
            Self::EventAndPayload(f) => f(event, payload.clone()).await,
        }
    }
}

type HandlerMap = Arc<Mutex<HashMap<Event, Vec<Arc<Handler>>>>>;

/// Receive events from the vehicle and dispatch them to typed handlers.
pub struct Receiver {
    handlers: HandlerMap,
}

impl Receiver {
    pub fn new(link: &Arc<UartLink>) -> Self {
        let handlers: HandlerMap = Arc::new(Mutex::new(HashMap::new()));
        let registered = handlers.clone();
        link.subscribe(Arc::new(move |event, payload| {
            let handlers = registered.clone();
            Box::pin(async move { dispatch(&handlers, event, payload).await })
        }));
        Self { handlers }
    }

    /// Register a handler. Handlers run in registration order.
    pub fn on(&self, event: Event, handler: Handler) {
        self.handlers
            .lock()
            .unwrap()
            .entry(event)
            .or_default()
            .push(Arc::new(handler));
    }
}

async fn dispatch(handlers: &HandlerMap, event: Event, payload: Bytes) {
    if event == Event::LogMessage {
        log_message(&payload);
    }
    let snapshot: Vec<Arc<Handler>> = handlers
        .lock()
        .unwrap()
        .get(&event)
        .cloned()
        .unwrap_or_default();
    for handler in snapshot {
        if let Err(e) = handler.invoke(event, &payload).await {
            error!("handler for {event:?} failed: {e:#}");
        }
    }
}

fn log_message(payload: &Bytes) {
    let text = String::from_utf8_lossy(payload);
    debug!("vehicle: {}", text.trim_end_matches('\0'));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{duplex, AsyncWriteExt};
    use uart_proto::encode_event;

    fn wired_receiver() -> (Receiver, tokio::io::WriteHalf<tokio::io::DuplexStream>) {
        let (brain_side, vehicle_side) = duplex(256);
        let (r, w) = tokio::io::split(brain_side);
        let link = UartLink::new(r, w);
        let receiver = Receiver::new(&link);
        let _ = link.start();
        let (_vr, vw) = tokio::io::split(vehicle_side);
        (receiver, vw)
    }

    #[tokio::test]
    async fn all_three_arities_fire_for_one_event() {
        let (receiver, mut vw) = wired_receiver();
        let calls = Arc::new(AtomicUsize::new(0));

        let c = calls.clone();
        receiver.on(
            Event::Aligned,
            Handler::parameterless(move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        );
        let c = calls.clone();
        receiver.on(
            Event::Aligned,
            Handler::event_only(move |event| {
                let c = c.clone();
                async move {
                    assert_eq!(event, Event::Aligned);
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        );
        let c = calls.clone();
        receiver.on(
            Event::Aligned,
            Handler::event_and_payload(move |_, payload| {
                let c = c.clone();
                async move {
                    assert_eq!(&payload[..], &[0x01]);
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        );

        vw.write_all(&encode_event(Event::Aligned, &[0x01]))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn a_failing_handler_does_not_starve_the_next_one() {
        let (receiver, mut vw) = wired_receiver();
        let reached = Arc::new(AtomicUsize::new(0));

        receiver.on(
            Event::PointReached,
            Handler::parameterless(|| async { anyhow::bail!("listener exploded") }),
        );
        let r = reached.clone();
        receiver.on(
            Event::PointReached,
            Handler::parameterless(move || {
                let r = r.clone();
                async move {
                    r.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        );

        vw.write_all(&encode_event(Event::PointReached, &[]))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(reached.load(Ordering::SeqCst), 1);
    }
}
