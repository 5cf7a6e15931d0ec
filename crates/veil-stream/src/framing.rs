//! Stream framing trait
//!
//! A framing layer owns the TCP socket and carries control messages
//! over it. Implementations differ in their envelope: raw framing
//! writes codec frames directly, HTTP framing wraps them in a
//! keep-alive HTTP exchange that can yield a fresh inner stream for
//! socket reuse.

use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use veil_proto::{CodecError, ControlMessage};

/// Stream errors
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Stream closed")]
    StreamClosed,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Codec error: {0}")]
    CodecError(#[from] CodecError),

    #[error("Framing does not support reuse")]
    ReuseUnsupported,
}

/// Result of asking a framing layer to produce its reuse successor
pub enum ReuseOutcome {
    /// A fresh framing over the same socket; the old one is consumed
    Reused(Box<dyn StreamFraming>),
    /// Reuse failed; the original framing is handed back so the caller
    /// can fall through to a terminal close
    Failed(Box<dyn StreamFraming>, StreamError),
}

/// Framed control-message transport over an owned TCP socket
#[async_trait]
pub trait StreamFraming: Send + Sync + std::fmt::Debug {
    /// Send a control message
    async fn send_message(&mut self, message: &ControlMessage) -> Result<(), StreamError>;

    /// Receive the next control message
    ///
    /// Returns Ok(None) once the peer has closed the stream cleanly.
    async fn recv_message(&mut self) -> Result<Option<ControlMessage>, StreamError>;

    /// Whether this framing can produce a fresh inner stream over the
    /// same socket
    fn supports_reuse(&self) -> bool;

    /// Liveness check on the underlying socket
    async fn is_alive(&self) -> bool;

    /// Consume this framing and produce its reuse successor
    async fn into_reuse(self: Box<Self>) -> ReuseOutcome;

    /// Consume this framing and close the socket
    async fn shutdown(self: Box<Self>) -> Result<(), StreamError>;

    fn local_addr(&self) -> SocketAddr;

    fn peer_addr(&self) -> SocketAddr;
}

/// Check whether a TCP socket is still usable
///
/// Alive means the endpoint still reports a peer and a zero-timeout
/// poll shows neither an orderly close nor an error state. Any failure
/// during the check reports not-alive.
pub(crate) async fn socket_is_alive(socket: &TcpStream) -> bool {
    if socket.peer_addr().is_err() {
        return false;
    }

    let mut probe = [0u8; 1];
    match tokio::time::timeout(Duration::ZERO, socket.peek(&mut probe)).await {
        // Nothing pending within the zero timeout: connection presumed live
        Err(_) => true,
        // Orderly remote close
        Ok(Ok(0)) => false,
        // Buffered data waiting; the connection is live
        Ok(Ok(_)) => true,
        // Error state on the socket
        Ok(Err(_)) => false,
    }
}
