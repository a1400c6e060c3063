//! Scripted in-process vehicle for `--demo` runs.
//!
//! Stands in for the firmware on an in-memory pipe: logs every command the
//! brain sends and replays a fixed event script, starting with a mission to
//! end node A. Useful for exercising the whole navigation loop on a desk.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
use tokio::time::sleep;
use tracing::{info, warn};

use uart_proto::{encode_event, verify_frame, Command, Event, FrameError};

use crate::uart::UartLink;

const SCRIPT_START_DELAY: Duration = Duration::from_secs(1);
const SCRIPT_STEP_DELAY: Duration = Duration::from_secs(10);

/// Wire up a [`UartLink`] whose far end is the scripted vehicle.
pub fn start_demo_vehicle() -> Arc<UartLink> {
    let (brain_side, vehicle_side) = duplex(256);
    let (reader, writer) = tokio::io::split(brain_side);
    let link = UartLink::new(reader, writer);

    let (vehicle_reader, vehicle_writer) = tokio::io::split(vehicle_side);
    tokio::spawn(run_command_sink(vehicle_reader));
    tokio::spawn(run_event_script(vehicle_writer));
    link
}

/// Decode and log every command frame the brain sends.
async fn run_command_sink(mut reader: ReadHalf<DuplexStream>) {
    loop {
        let id = match reader.read_u8().await {
            Ok(id) => id,
            Err(_) => return,
        };
        let Some(command) = Command::from_u8(id) else {
            warn!("demo vehicle: {}", FrameError::UnknownCommand(id));
            continue;
        };
        let mut payload = vec![0u8; command.payload_len()];
        if reader.read_exact(&mut payload).await.is_err() {
            return;
        }
        let mut checksum = [0u8; 1];
        if reader.read_exact(&mut checksum).await.is_err() {
            return;
        }
        if let Err(e) = verify_frame(id, &payload, checksum[0]) {
            warn!("demo vehicle: {e} on {command:?}");
            continue;
        }
        info!("demo vehicle received {command:?}, payload {payload:02x?}");
    }
}

/// The fixed event script: kick off a mission to A, then keep the loop busy.
async fn run_event_script(mut writer: WriteHalf<DuplexStream>) {
    let script: &[(Event, &[u8])] = &[
        (Event::Start, &[0x00]),
        (Event::PointReached, &[]),
        (Event::Aligned, &[0x00]),
        (Event::ObstacleDetected, &[]),
    ];

    sleep(SCRIPT_START_DELAY).await;
    for (event, payload) in script.iter().cycle() {
        let frame = encode_event(*event, payload);
        if writer.write_all(&frame).await.is_err() {
            return;
        }
        let _ = writer.flush().await;
        sleep(SCRIPT_STEP_DELAY).await;
    }
}
