use std::sync::Arc;

use clap::Parser;
use tokio_serial::SerialPortBuilderExt;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use linescout_brain::competition;
use linescout_brain::constants::VERSION;
use linescout_brain::demo;
use linescout_brain::engine::Engine;
use linescout_brain::mission_log::MissionLog;
use linescout_brain::network::NetworkProvider;
use linescout_brain::uart::UartLink;
use linescout_brain::web::{self, AppState};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "linescout-brain", about = "LineScout navigation brain")]
struct Args {
    /// UART bus device, or tcp://host:port for the vehicle simulator
    #[arg(long, default_value = "/dev/serial0")]
    bus: String,
    /// UART bus baudrate
    #[arg(long, default_value = "115200")]
    baudrate: u32,
    /// Control-plane HTTP port
    #[arg(long, default_value = "8080")]
    port: u16,
    /// Enable vehicle debug logging
    #[arg(long)]
    debug: bool,
    /// Run against the built-in scripted vehicle
    #[arg(long)]
    demo: bool,
    /// Manual mode: disable autonomy, drive the vehicle via the control plane
    #[arg(short, long)]
    manual: bool,
}

// ── Transport ─────────────────────────────────────────────────────────────────

async fn open_link(args: &Args) -> anyhow::Result<Arc<UartLink>> {
    if args.demo {
        info!("demo mode");
        return Ok(demo::start_demo_vehicle());
    }
    if let Some(addr) = args.bus.strip_prefix("tcp://") {
        let stream = tokio::net::TcpStream::connect(addr).await?;
        info!("connected to vehicle simulator at {addr}");
        let (reader, writer) = stream.into_split();
        return Ok(UartLink::new(reader, writer));
    }
    let serial = tokio_serial::new(&args.bus, args.baudrate).open_native_async()?;
    info!("connected to {} with baudrate {}", args.bus, args.baudrate);
    let (reader, writer) = tokio::io::split(serial);
    Ok(UartLink::new(reader, writer))
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "linescout_brain=debug".into()),
        )
        .init();

    let args = Args::parse();
    info!("🤖 {VERSION} starting");

    let link = open_link(&args).await?;
    let read_loop = link.start();

    let provider: NetworkProvider = Arc::new(competition::create_dynamic_network);
    let log = MissionLog::new();
    let engine = Arc::new(Engine::new(provider, link, log.clone()));
    engine.init(args.manual).await?;
    engine.sender().set_debug_logging(args.debug).await?;

    let state = Arc::new(AppState { engine, log });
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = web::router(state).layer(cors);

    let addr = format!("0.0.0.0:{}", args.port);
    info!("🚀 control plane listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    // engine shutdown cancels the codec read loop
    read_loop.abort();
    Ok(())
}
