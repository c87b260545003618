//! Penstock echo server
//!
//! A demonstration host for the pipeline framework:
//! - Accepts TCP connections
//! - Builds a two-level stack per connection (echo stage over an I/O pump)
//! - Echoes every received byte back to the peer
//! - Shuts each stack gracefully when the peer disconnects

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use clap::Parser;
use penstock::config::{generate_example_config, Config};
use penstock::{Basin, Drain, IoPump, Sink, Sunken, Valve, Valved};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Notify, Semaphore};
use tracing::{debug, error, info};

/// Penstock echo server - demo host for the pipeline framework
#[derive(Parser, Debug)]
#[command(name = "penstock-echo")]
#[command(about = "Penstock echo server - layered byte-stream stack demo")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Write an example configuration file and exit
    #[arg(long)]
    generate_config: bool,

    /// Listen address (overrides config)
    #[arg(short, long)]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'v', long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.generate_config {
        generate_example_config()
            .save(&args.config)
            .context("Failed to write example configuration")?;
        println!("Wrote example configuration to {}", args.config);
        return Ok(());
    }

    let config = if std::path::Path::new(&args.config).exists() {
        Config::load(&args.config).context("Failed to load configuration")?
    } else {
        Config::default()
    };

    let log_level = args.log_level.unwrap_or_else(|| config.logging.level.clone());
    tracing_subscriber::fmt().with_env_filter(&log_level).init();

    let listen = args.listen.unwrap_or_else(|| config.echo.listen.clone());
    let listener = TcpListener::bind(&listen)
        .await
        .context(format!("Failed to bind {}", listen))?;
    info!("Listening on {}", listen);

    let conn_limit = Arc::new(Semaphore::new(config.echo.max_connections));

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer)) => {
                        let permit = match conn_limit.clone().try_acquire_owned() {
                            Ok(permit) => permit,
                            Err(_) => {
                                debug!("Connection limit reached, refusing {}", peer);
                                continue;
                            }
                        };
                        tokio::spawn(async move {
                            let _permit = permit;
                            if let Err(e) = handle_connection(stream).await {
                                error!("Connection from {} failed: {}", peer, e);
                            } else {
                                debug!("Connection from {} closed", peer);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                // Remaining stacks are torn down by ownership when their
                // connection tasks are dropped with the runtime.
                info!("Shutting down...");
                break;
            }
        }
    }

    Ok(())
}

/// Serve one connection: build the stack, pump until the peer hangs up,
/// drain the stack leaf-to-root.
async fn handle_connection(stream: TcpStream) -> Result<()> {
    let closed = Arc::new(Notify::new());

    let sink = {
        let closed = closed.clone();
        Sink::new(|sunken| Echo::new(sunken, closed))
    };
    let pump = sink.wire(|outer| IoPump::new(outer, stream));
    pump.start();

    // The echo stage fires this when the leaf stops the stack (EOF or error)
    closed.notified().await;

    sink.shut().await;
    Ok(())
}

/// Root stage of the demo stack: lands inbound bytes and sends them straight
/// back down through the stage below.
struct Echo {
    valve: Valve,
    reflect: mpsc::UnboundedSender<Bytes>,
    closed: Arc<Notify>,
}

impl Echo {
    fn new(sunken: Sunken<Bytes>, closed: Arc<Notify>) -> Self {
        let (reflect, mut queued) = mpsc::unbounded_channel::<Bytes>();

        // land is synchronous; the write back down is not. Reflected buffers
        // queue here and drain in order on the runtime.
        tokio::spawn(async move {
            while let Some(data) = queued.recv().await {
                if !sunken.wired() {
                    break;
                }
                if let Err(e) = sunken.send(&data).await {
                    debug!("Echo write failed: {}", e);
                    break;
                }
            }
        });

        Self {
            valve: Valve::new(),
            reflect,
            closed,
        }
    }
}

impl Basin for Echo {
    fn stop(&self, error: Option<&str>) {
        if self.valve.stop() {
            if let Some(error) = error {
                debug!("Echo stack stopped: {}", error);
            }
            self.closed.notify_one();
        }
    }
}

impl Drain<Bytes> for Echo {
    fn land(&self, data: Bytes) {
        let _ = self.reflect.send(data);
    }
}

#[async_trait]
impl Valved for Echo {
    fn valve(&self) -> &Valve {
        &self.valve
    }
}
