mod channels;
mod coordinator;
mod field_encoder;
mod handlers;
mod pipeline;
mod probe;
mod report;
mod server;
mod snapshot_store;
mod telemetry;
mod types;

use channels::ChannelMap;
use clap::Parser;
use field_encoder::EncoderConfig;
use handlers::handle_connection;
use pipeline::AppContext;
use probe::TcpProber;
use snapshot_store::SnapshotStore;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use telemetry::TelemetrySink;
use tokio::net::{TcpListener, TcpStream};
use tokio::{signal, task};
use tracing::{error, info};
use types::GenericBoxedStream;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
struct Args {
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    #[arg(long, default_value = "3000")]
    port: u16,

    /// Update endpoint of the telemetry sink
    #[arg(long, default_value = "http://api.thingspeak.com/update")]
    sink_url: String,

    /// Routing credential for the network-wide topology channel
    #[arg(long)]
    network_api_key: String,

    /// JSON file mapping sensor node ids to per-channel api keys
    #[arg(long)]
    channels_file: Option<PathBuf>,

    /// Nodes per encoded field slot
    #[arg(long, default_value = "6", value_parser = clap::value_parser!(u16).range(1..))]
    chunk_size: u16,

    /// Field slots per upload, the master slot included
    #[arg(long, default_value = "7", value_parser = clap::value_parser!(u16).range(1..))]
    max_slots: u16,

    /// TCP port probed on each node for reachability
    #[arg(long, default_value = "80")]
    probe_port: u16,

    /// Per-probe timeout, in seconds
    #[arg(long, default_value = "2")]
    probe_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let channels = match &args.channels_file {
        Some(path) => ChannelMap::load(path)?,
        None => ChannelMap::default(),
    };

    let ctx = AppContext {
        store: SnapshotStore::new(),
        sink: TelemetrySink::new(args.sink_url.clone()),
        channels,
        network_api_key: args.network_api_key.clone(),
        encoder: EncoderConfig {
            chunk_size: usize::from(args.chunk_size),
            max_slots: usize::from(args.max_slots),
        },
        probe_timeout: Duration::from_secs(args.probe_timeout),
        prober: Arc::new(TcpProber {
            port: args.probe_port,
        }),
    };

    let shutdown_notify = Arc::new(tokio::sync::Notify::new());

    tokio::spawn({
        let interrupt_handle = shutdown_notify.clone();
        async move {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            interrupt_handle.notify_waiters();
        }
    });

    let server_handle = tokio::spawn({
        let args = args.clone();
        let server_shutdown = shutdown_notify.clone();
        async move {
            if let Err(e) = run_web_server(args, ctx, server_shutdown).await {
                error!("Server error: {}", e);
            }
        }
    });

    server_handle.await?;

    Ok(())
}


async fn run_web_server(
    args: Args,
    ctx: AppContext,
    shutdown_notify: Arc<tokio::sync::Notify>,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", args.host, args.port);
    let tcp = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    let stream: GenericBoxedStream<(TcpStream, SocketAddr)> =
        Box::pin(server::tcp_accept_stream(tcp));

    server::serve_stream(stream, shutdown_notify, move |(stream, peer)| {
        let ctx = ctx.clone();
        task::spawn(async move {
            handle_connection(stream, ctx, peer).await;
        })
    })
    .await;

    Ok(())
}
