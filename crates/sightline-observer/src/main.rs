//! Sightline observer binary.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default port
//! sightline
//!
//! # Listen elsewhere, with a longer liveness window
//! sightline --bind 127.0.0.1:9000 --liveness-timeout-ms 2000
//!
//! # Forward an edit to a connected producer
//! echo '{"sessionId":"127.0.0.1:5000","id":3,"data":{"x":1},"type":"ResourceUpdate"}' | sightline
//! ```

use std::time::Duration;

use clap::Parser;
use sightline_observer::{
    CommandHandle, CommandRequest, DisplaySink, DriverConfig, Observer, ObserverConfig, SinkEvent,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Events buffered between the observer loop and the display sink
const SINK_CAPACITY: usize = 1024;

/// Command lines buffered between stdin and the display sink
const REQUEST_CAPACITY: usize = 64;

/// Sightline observer
#[derive(Parser, Debug)]
#[command(name = "sightline")]
#[command(about = "Observe and edit the state of instrumented producers over UDP")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:8000")]
    bind: String,

    /// Silence after which a producer is considered gone, in milliseconds
    #[arg(long, default_value = "500")]
    liveness_timeout_ms: u64,

    /// Datagram receive buffer size in bytes
    #[arg(long, default_value = "65536")]
    recv_buffer_size: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

    tracing::info!("Sightline observer starting");
    tracing::info!("Binding to {}", args.bind);

    let config = ObserverConfig {
        bind_address: args.bind,
        recv_buffer_size: args.recv_buffer_size,
        driver: DriverConfig { liveness_timeout: Duration::from_millis(args.liveness_timeout_ms) },
    };

    let observer = Observer::bind(config).await?;

    tracing::info!("Listening for producers on {}", observer.local_addr()?);

    let (sink, events) = mpsc::channel(SINK_CAPACITY);
    let (requests_tx, requests) = mpsc::channel(REQUEST_CAPACITY);
    let display = tokio::spawn(run_display(events, requests, observer.command_handle()));
    tokio::spawn(read_commands(requests_tx));

    tokio::select! {
        result = observer.run(sink) => result?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("Shutting down");
        },
    }

    display.await?;

    Ok(())
}

/// Apply sink events to per-producer views until the observer stops, and
/// forward command requests as edits of those views.
async fn run_display(
    mut events: mpsc::Receiver<SinkEvent>,
    mut requests: mpsc::Receiver<CommandRequest>,
    commands: CommandHandle,
) {
    let mut display = DisplaySink::new();
    let mut requests_open = true;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => display.handle(event),
                None => break,
            },

            request = requests.recv(), if requests_open => match request {
                Some(request) => {
                    if let Some((session_id, command)) = display.edit(request) {
                        commands.submit(session_id, command);
                    }
                },
                None => requests_open = false,
            },
        }
    }
}

/// Parse one command request per stdin line until EOF.
async fn read_commands(requests: mpsc::Sender<CommandRequest>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match CommandRequest::parse(line) {
                    Ok(request) => {
                        if requests.send(request).await.is_err() {
                            break;
                        }
                    },
                    Err(e) => tracing::warn!("ignoring command line: {}", e),
                }
            },
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("stdin read failed: {}", e);
                break;
            },
        }
    }
}
