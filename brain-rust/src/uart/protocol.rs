//! # uart::protocol
//!
//! The one component that touches raw bytes. Owns both halves of the serial
//! transport (or any other byte stream: TCP to the simulator, an in-memory
//! duplex in demo mode and tests) and converts between frames and typed
//! `(Event, payload)` pairs.
//!
//! ## Error policy
//! - Checksum mismatch or unknown event id: warn, drop the frame, resume at
//!   the next byte. Nothing is raised to subscribers.
//! - Transport EOF or I/O error: fatal to the read loop; logged, loop exits.
//!
//! ## Ordering
//! Subscribers are invoked sequentially, in subscription order, and each
//! handler completes before the next frame is read. Commands a handler sends
//! are flushed before it returns, so responses hit the wire in event order.

use std::io;
use std::sync::{Arc, Mutex, RwLock};

use anyhow::Result;
use bytes::Bytes;
use futures_util::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use uart_proto::{encode_command, verify_frame, Command, Event, FrameError, PayloadLen};

/// Bus-level subscriber receiving every accepted frame.
pub type RawEventHandler = Arc<dyn Fn(Event, Bytes) -> BoxFuture<'static, ()> + Send + Sync>;

type Reader = Box<dyn AsyncRead + Send + Unpin>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

pub struct UartLink {
    writer: tokio::sync::Mutex<Writer>,
    reader: Mutex<Option<Reader>>,
    handlers: RwLock<Vec<RawEventHandler>>,
}

impl UartLink {
    pub fn new<R, W>(reader: R, writer: W) -> Arc<Self>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Arc::new(Self {
            writer: tokio::sync::Mutex::new(Box::new(writer)),
            reader: Mutex::new(Some(Box::new(reader))),
            handlers: RwLock::new(Vec::new()),
        })
    }

    /// Register a bus-level subscriber. Call before `start`.
    pub fn subscribe(&self, handler: RawEventHandler) {
        self.handlers.write().unwrap().push(handler);
    }

    /// Frame and flush a command.
    pub async fn send_command(&self, command: Command, payload: &[u8]) -> Result<()> {
        let frame = encode_command(command, payload);
        let mut writer = self.writer.lock().await;
        writer.write_all(&frame).await?;
        writer.flush().await?;
        debug!("sent {command:?}, payload {payload:02x?}");
        Ok(())
    }

    /// Spawn the read loop. The returned handle is the shutdown lever: abort
    /// it to stop reading the transport.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let taken = self.reader.lock().unwrap().take();
        let Some(mut reader) = taken else {
            warn!("uart read loop already started");
            return tokio::spawn(async {});
        };
        let link = self.clone();
        tokio::spawn(async move {
            loop {
                match read_event(&mut reader).await {
                    Ok(Some((event, payload))) => link.dispatch(event, payload).await,
                    Ok(None) => {} // frame dropped, resync at the next byte
                    Err(e) => {
                        error!("uart transport closed: {e}");
                        break;
                    }
                }
            }
        })
    }

    async fn dispatch(&self, event: Event, payload: Bytes) {
        let handlers: Vec<RawEventHandler> = self.handlers.read().unwrap().clone();
        for handler in handlers {
            handler(event, payload.clone()).await;
        }
    }
}

/// Read one event frame. `Ok(None)` means the frame was dropped.
async fn read_event(reader: &mut Reader) -> io::Result<Option<(Event, Bytes)>> {
    let id = reader.read_u8().await?;
    let Some(event) = Event::from_u8(id) else {
        warn!("{}, skipping", FrameError::UnknownEvent(id));
        return Ok(None);
    };

    let payload = match event.payload_len() {
        PayloadLen::Fixed(0) => Vec::new(),
        PayloadLen::Fixed(len) => {
            let mut buf = vec![0u8; len];
            reader.read_exact(&mut buf).await?;
            buf
        }
        PayloadLen::LengthPrefixed => {
            let len = reader.read_u8().await? as usize;
            let mut buf = vec![0u8; len];
            reader.read_exact(&mut buf).await?;
            buf
        }
    };

    let checksum = reader.read_u8().await?;
    if let Err(e) = verify_frame(id, &payload, checksum) {
        warn!("{e} for {event:?}, ignoring message");
        return Ok(None);
    }

    debug!("received {event:?}, payload {payload:02x?}");
    Ok(Some((event, Bytes::from(payload))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::duplex;
    use uart_proto::encode_event;

    #[tokio::test]
    async fn frames_reach_subscribers_in_wire_order() {
        let (brain_side, vehicle_side) = duplex(256);
        let (r, w) = tokio::io::split(brain_side);
        let link = UartLink::new(r, w);

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        link.subscribe(Arc::new(move |event, payload| {
            let tx = tx.clone();
            Box::pin(async move {
                let _ = tx.send((event, payload));
            })
        }));
        let _ = link.start();

        let (_vr, mut vw) = tokio::io::split(vehicle_side);
        vw.write_all(&encode_event(Event::Start, &[0x02])).await.unwrap();
        vw.write_all(&encode_event(Event::PointReached, &[])).await.unwrap();

        let (event, payload) = rx.recv().await.unwrap();
        assert_eq!(event, Event::Start);
        assert_eq!(&payload[..], &[0x02]);
        let (event, _) = rx.recv().await.unwrap();
        assert_eq!(event, Event::PointReached);
    }

    #[tokio::test]
    async fn corrupt_and_unknown_frames_are_dropped() {
        let (brain_side, vehicle_side) = duplex(256);
        let (r, w) = tokio::io::split(brain_side);
        let link = UartLink::new(r, w);

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        link.subscribe(Arc::new(move |_, _| {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        }));
        let _ = link.start();

        let (_vr, mut vw) = tokio::io::split(vehicle_side);
        // bad checksum, then an id outside the event table, then a good frame
        vw.write_all(&[0x11, 0xff]).await.unwrap();
        vw.write_all(&[0x42]).await.unwrap();
        vw.write_all(&encode_event(Event::Returning, &[])).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn send_command_writes_a_checksummed_frame() {
        let (brain_side, vehicle_side) = duplex(256);
        let (r, w) = tokio::io::split(brain_side);
        let link = UartLink::new(r, w);

        link.send_command(Command::SetSpeed, &[50]).await.unwrap();

        let (mut vr, _vw) = tokio::io::split(vehicle_side);
        let mut frame = [0u8; 3];
        vr.read_exact(&mut frame).await.unwrap();
        assert_eq!(frame, [0x05, 50, 0x05 ^ 50]);
    }
}
