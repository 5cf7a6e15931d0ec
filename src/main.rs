//! Veil relay server
//!
//! Accepts client connections, runs the admission handshake against
//! the session manager, and hands established streams to their
//! sessions.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use veil_access::{Access, MemoryAccessBackend};
use veil_proto::ControlMessage;
use veil_session::{SessionConfig, SessionManager};
use veil_stream::{ClientStream, HttpFraming, ReuseSink};

/// Veil - VPN relay session server
#[derive(Parser, Debug)]
#[command(name = "veild")]
#[command(about = "Veil VPN relay server")]
#[command(version)]
struct Cli {
    /// Address to listen on for client connections
    #[arg(long, default_value = "0.0.0.0:8443", env = "VEILD_LISTEN")]
    listen: SocketAddr,

    /// Idle timeout in seconds before disposed sessions are reaped
    #[arg(long, default_value = "300", env = "VEILD_SESSION_TIMEOUT_SECS")]
    session_timeout_secs: u64,

    /// Reaper pass spacing in seconds (defaults to the session timeout)
    #[arg(long, env = "VEILD_REAP_INTERVAL_SECS")]
    reap_interval_secs: Option<u64>,

    /// Hard cap on concurrent live sessions
    #[arg(long, env = "VEILD_MAX_SESSIONS")]
    max_sessions: Option<usize>,

    /// Keepalive interval advertised to clients, in seconds
    #[arg(long, default_value = "30")]
    keepalive_interval_secs: u32,

    /// JSON file with provisioned access records
    #[arg(long, env = "VEILD_ACCESS_FILE")]
    access_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// One provisioned access entry in the access file
#[derive(Debug, serde::Deserialize)]
struct AccessSeed {
    token_id: Uuid,
    access: Access,
}

/// Setup logging with the specified log level
fn setup_logging(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}

/// Load provisioned accesses into the in-memory backend
fn load_backend(access_file: Option<&PathBuf>) -> Result<Arc<MemoryAccessBackend>> {
    let backend = Arc::new(MemoryAccessBackend::new());

    match access_file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read access file {}", path.display()))?;
            let seeds: Vec<AccessSeed> = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse access file {}", path.display()))?;

            info!(count = seeds.len(), "Provisioned access records");
            for seed in seeds {
                backend.insert(seed.token_id, seed.access);
            }
        }
        None => {
            warn!("No access file given; every admission will fail with TokenNotFound");
        }
    }

    Ok(backend)
}

/// Reuse sink returning kept-alive sockets to the control loop
///
/// When a session finishes with a stream and disposes it with reuse,
/// the successor stream lands here and serves the client's next
/// request without a fresh TCP handshake. Successors inherit the sink,
/// so one socket can carry any number of logical exchanges.
fn control_reuse_sink(manager: Arc<SessionManager>, keepalive_interval_secs: u32) -> ReuseSink {
    Arc::new(move |stream| {
        let manager = manager.clone();
        Box::pin(async move {
            serve_stream(stream, manager, keepalive_interval_secs).await;
        })
    })
}

/// Drive one accepted connection through the control handshake
async fn handle_connection(
    socket: TcpStream,
    manager: Arc<SessionManager>,
    keepalive_interval_secs: u32,
) -> Result<()> {
    let framing = HttpFraming::server(socket).context("Failed to frame accepted socket")?;
    let sink = control_reuse_sink(manager.clone(), keepalive_interval_secs);
    let stream = ClientStream::new(Box::new(framing)).with_reuse_sink(sink);

    serve_stream(stream, manager, keepalive_interval_secs).await;
    Ok(())
}

/// Serve control messages on one client stream until it is handed to
/// a session or closed
async fn serve_stream(
    mut stream: ClientStream,
    manager: Arc<SessionManager>,
    keepalive_interval_secs: u32,
) {
    let peer_addr = stream.peer_addr();
    let client_ip = peer_addr.ip().to_string();

    loop {
        let message = match stream.recv_message().await {
            Ok(Some(message)) => message,
            Ok(None) => {
                stream.dispose(false).await;
                return;
            }
            Err(e) => {
                debug!(peer_addr = %peer_addr, error = %e, "Control stream failed");
                stream.dispose(false).await;
                return;
            }
        };

        match message {
            ControlMessage::Hello(hello) => {
                match manager.create_session(&hello, &client_ip).await {
                    Ok(session) => {
                        let accepted = ControlMessage::SessionAccepted {
                            session_id: session.session_id(),
                            keepalive_interval_secs,
                        };
                        if let Err(e) = stream.send_message(&accepted).await {
                            debug!(peer_addr = %peer_addr, error = %e, "Failed to send accept");
                            stream.dispose(false).await;
                            return;
                        }
                        // The session owns the stream from here on.
                        if let Err(e) = session.attach_stream(stream).await {
                            debug!(
                                session_id = session.session_id(),
                                error = %e,
                                "Session closed before stream attach"
                            );
                        }
                        return;
                    }
                    Err(e) => {
                        info!(peer_addr = %peer_addr, error = %e, "Admission rejected");
                        let _ = stream.send_message(&e.to_rejection()).await;
                        stream.dispose(false).await;
                        return;
                    }
                }
            }
            ControlMessage::Attach { session_id } => match manager.get_by_id(session_id) {
                Ok(session) => {
                    if let Err(e) = stream
                        .send_message(&ControlMessage::Attached { session_id })
                        .await
                    {
                        debug!(peer_addr = %peer_addr, error = %e, "Failed to send attach ack");
                        stream.dispose(false).await;
                        return;
                    }
                    if let Err(e) = session.attach_stream(stream).await {
                        debug!(session_id, error = %e, "Session closed before stream attach");
                    }
                    return;
                }
                Err(e) => {
                    info!(peer_addr = %peer_addr, session_id, error = %e, "Attach rejected");
                    let _ = stream.send_message(&e.to_rejection()).await;
                    stream.dispose(false).await;
                    return;
                }
            },
            ControlMessage::Keepalive { timestamp } => {
                if let Err(e) = stream
                    .send_message(&ControlMessage::KeepaliveAck { timestamp })
                    .await
                {
                    debug!(peer_addr = %peer_addr, error = %e, "Failed to answer keepalive");
                    stream.dispose(false).await;
                    return;
                }
            }
            ControlMessage::Bye { session_id, reason } => {
                debug!(session_id, reason = %reason, "Client closed session");
                if let Err(e) = manager.close_by_client(session_id) {
                    debug!(session_id, error = %e, "Bye for unknown session");
                }
                stream.dispose(true).await;
                return;
            }
            other => {
                warn!(peer_addr = %peer_addr, "Unexpected control message: {:?}", other);
                stream.dispose(false).await;
                return;
            }
        }
    }
}

/// Accept loop for the control listener
async fn run_server(
    listener: TcpListener,
    manager: Arc<SessionManager>,
    keepalive_interval_secs: u32,
) {
    loop {
        match listener.accept().await {
            Ok((socket, peer_addr)) => {
                debug!("Accepted connection from {}", peer_addr);
                let manager = manager.clone();
                tokio::spawn(async move {
                    if let Err(e) =
                        handle_connection(socket, manager, keepalive_interval_secs).await
                    {
                        error!("Failed to handle connection from {}: {}", peer_addr, e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli.log_level);

    let config = SessionConfig {
        session_timeout: Duration::from_secs(cli.session_timeout_secs),
        reap_interval: cli.reap_interval_secs.map(Duration::from_secs),
        max_concurrent_sessions: cli.max_sessions,
    };
    config.validate().context("Invalid session configuration")?;

    let backend = load_backend(cli.access_file.as_ref())?;
    let manager = Arc::new(SessionManager::new(config, backend));

    // Background reap cadence alongside the admission-path reaper.
    tokio::spawn(manager.clone().run_reaper());

    let listener = TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("Failed to bind to {}", cli.listen))?;
    info!("Veil relay listening on {}", cli.listen);

    let server = tokio::spawn(run_server(
        listener,
        manager.clone(),
        cli.keepalive_interval_secs,
    ));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        result = server => {
            if let Err(e) = result {
                error!("Server task panicked: {}", e);
            }
        }
    }

    manager.dispose();
    info!("Veil relay stopped");
    Ok(())
}
