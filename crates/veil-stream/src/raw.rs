//! Raw framing: codec frames directly over the socket
//!
//! Used for plain control connections. Raw framing cannot produce a
//! fresh inner stream, so streams carried by it are never pooled.

use async_trait::async_trait;
use bytes::BytesMut;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::trace;
use veil_proto::{ControlCodec, ControlMessage};

use crate::framing::{socket_is_alive, ReuseOutcome, StreamError, StreamFraming};

/// Length-prefixed codec frames straight on the TCP socket
pub struct RawFraming {
    socket: TcpStream,
    recv_buffer: BytesMut,
    closed: bool,
    local_addr: SocketAddr,
    peer_addr: SocketAddr,
}

impl std::fmt::Debug for RawFraming {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawFraming")
            .field("peer_addr", &self.peer_addr)
            .field("closed", &self.closed)
            .finish()
    }
}

impl RawFraming {
    pub fn new(socket: TcpStream) -> Result<Self, StreamError> {
        let local_addr = socket.local_addr()?;
        let peer_addr = socket.peer_addr()?;
        Ok(Self {
            socket,
            recv_buffer: BytesMut::with_capacity(8192),
            closed: false,
            local_addr,
            peer_addr,
        })
    }
}

#[async_trait]
impl StreamFraming for RawFraming {
    async fn send_message(&mut self, message: &ControlMessage) -> Result<(), StreamError> {
        if self.closed {
            return Err(StreamError::StreamClosed);
        }

        let encoded = ControlCodec::encode(message)?;
        self.socket.write_all(&encoded).await?;

        trace!("Sent message to {}: {:?}", self.peer_addr, message);
        Ok(())
    }

    async fn recv_message(&mut self) -> Result<Option<ControlMessage>, StreamError> {
        if self.closed && self.recv_buffer.is_empty() {
            return Ok(None);
        }

        loop {
            // Try to decode a message from the buffer
            match ControlCodec::decode(&mut self.recv_buffer)? {
                Some(msg) => {
                    trace!("Received message from {}: {:?}", self.peer_addr, msg);
                    return Ok(Some(msg));
                }
                None => {
                    let n = self.socket.read_buf(&mut self.recv_buffer).await?;
                    if n == 0 {
                        self.closed = true;
                        if self.recv_buffer.is_empty() {
                            return Ok(None);
                        }
                        return Err(StreamError::ProtocolError(
                            "Incomplete message in buffer".to_string(),
                        ));
                    }
                }
            }
        }
    }

    fn supports_reuse(&self) -> bool {
        false
    }

    async fn is_alive(&self) -> bool {
        !self.closed && socket_is_alive(&self.socket).await
    }

    async fn into_reuse(self: Box<Self>) -> ReuseOutcome {
        ReuseOutcome::Failed(self, StreamError::ReuseUnsupported)
    }

    async fn shutdown(mut self: Box<Self>) -> Result<(), StreamError> {
        self.closed = true;
        self.socket.shutdown().await?;
        Ok(())
    }

    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}
