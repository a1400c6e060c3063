//! main.rs — LineScout vehicle simulator entry point
//!
//! Plays the firmware side of the framed UART protocol over TCP so the
//! brain can be developed without hardware (`--bus tcp://127.0.0.1:7070`).
//!
//! Behaviour per connection:
//!   1. After `--start-delay`, press the virtual start button (START event
//!      with the chosen end-node index)
//!   2. Answer FOLLOW_LINE with POINT_REACHED after a jittered segment time
//!   3. Answer TURN with ALIGNED after a jittered turn time
//!   4. Log SET_SPEED / SET_DEBUG_LOGGING / DESTINATION_REACHED
//!
//! The simulated vehicle does not know the track map; it trusts the brain
//! to count waypoints, exactly like the real firmware does.

use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Parser;
use rand::Rng;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{info, warn};

use uart_proto::{encode_event, verify_frame, Command, Event, FrameError};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug, Clone)]
#[command(name = "vehicle-sim", about = "LineScout vehicle simulator")]
struct Args {
    /// Listen address for the brain connection
    #[arg(long, default_value = "127.0.0.1:7070")]
    listen: String,
    /// Mission target end node (A, B or C)
    #[arg(long, default_value = "B")]
    target: String,
    /// Seconds before the virtual start button fires
    #[arg(long, default_value = "2.0")]
    start_delay: f64,
    /// Mean travel time per segment, seconds
    #[arg(long, default_value = "1.5")]
    segment_secs: f64,
    /// Mean turn time, seconds
    #[arg(long, default_value = "0.5")]
    turn_secs: f64,
}

fn target_index(target: &str) -> Result<u8> {
    match target.to_ascii_uppercase().as_str() {
        "A" => Ok(0),
        "B" => Ok(1),
        "C" => Ok(2),
        other => Err(anyhow!("unknown end node {other}, expected A, B or C")),
    }
}

fn jittered(mean_secs: f64) -> Duration {
    let factor = rand::thread_rng().gen_range(0.8..1.2);
    Duration::from_secs_f64(mean_secs * factor)
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vehicle_sim=info".into()),
        )
        .init();

    let args = Args::parse();
    let target = target_index(&args.target)?;

    let listener = TcpListener::bind(&args.listen).await?;
    info!(
        "📡 vehicle simulator listening on {} — target {}",
        args.listen, args.target
    );

    loop {
        let (stream, peer) = listener.accept().await?;
        info!("brain connected from {peer}");
        let args = args.clone();
        tokio::spawn(async move {
            if let Err(e) = drive(stream, target, args).await {
                warn!("connection closed: {e}");
            }
        });
    }
}

// ── Per-connection firmware loop ──────────────────────────────────────────────

async fn drive(stream: TcpStream, target: u8, args: Args) -> Result<()> {
    let (reader, writer) = stream.into_split();

    // all event frames funnel through one writer task so responses never
    // interleave mid-frame
    let (events_tx, events_rx) = mpsc::channel::<(Event, Vec<u8>)>(16);
    tokio::spawn(write_events(writer, events_rx));

    // the operator presses start once the vehicle sits in the start zone
    let start_tx = events_tx.clone();
    let start_delay = Duration::from_secs_f64(args.start_delay);
    tokio::spawn(async move {
        sleep(start_delay).await;
        info!("🟢 start button pressed");
        let _ = start_tx.send((Event::Start, vec![target])).await;
    });

    read_commands(reader, events_tx, args).await
}

async fn write_events(mut writer: OwnedWriteHalf, mut rx: mpsc::Receiver<(Event, Vec<u8>)>) {
    while let Some((event, payload)) = rx.recv().await {
        let frame = encode_event(event, &payload);
        if writer.write_all(&frame).await.is_err() {
            return;
        }
        let _ = writer.flush().await;
    }
}

async fn read_commands(
    mut reader: OwnedReadHalf,
    events: mpsc::Sender<(Event, Vec<u8>)>,
    args: Args,
) -> Result<()> {
    loop {
        let id = reader.read_u8().await?;
        let Some(command) = Command::from_u8(id) else {
            warn!("{}, skipping", FrameError::UnknownCommand(id));
            continue;
        };
        let mut payload = vec![0u8; command.payload_len()];
        reader.read_exact(&mut payload).await?;
        let checksum = reader.read_u8().await?;

        if let Err(e) = verify_frame(id, &payload, checksum) {
            warn!("{e} on {command:?}, ignoring message");
            continue;
        }

        match command {
            Command::FollowLine => {
                let events = events.clone();
                let travel = jittered(args.segment_secs);
                info!("following line ({travel:.1?} to the next waypoint)");
                tokio::spawn(async move {
                    sleep(travel).await;
                    let _ = events.send((Event::PointReached, vec![])).await;
                });
            }
            Command::Turn => {
                let angle = i16::from_le_bytes([payload[0], payload[1]]);
                let snap = payload[2] == 1;
                let events = events.clone();
                let turning = jittered(args.turn_secs);
                info!("turning {angle}° (snap: {snap}, {turning:.1?})");
                tokio::spawn(async move {
                    sleep(turning).await;
                    let _ = events.send((Event::Aligned, vec![0])).await;
                });
            }
            Command::SetSpeed => {
                info!("speed set to {}", payload[0] as i8);
            }
            Command::SetDebugLogging => {
                let enabled = payload[0] == 1;
                info!("debug logging {}", if enabled { "enabled" } else { "disabled" });
                let _ = events
                    .send((Event::LogMessage, b"debug logging toggled".to_vec()))
                    .await;
            }
            Command::DestinationReached => {
                info!("🏁 destination reached — mission complete");
            }
        }
    }
}
