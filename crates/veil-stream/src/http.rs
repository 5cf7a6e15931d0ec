//! HTTP-framed streams with keep-alive reuse
//!
//! Control frames travel inside a single HTTP exchange: the client
//! opens with a POST request head, the relay answers with a response
//! head, and both sides then stream codec frames as the body. The
//! envelope lets the relay share ports with HTTP infrastructure and,
//! because the connection stays open between exchanges, a finished
//! stream can yield a fresh one over the same socket.

use async_trait::async_trait;
use bytes::BytesMut;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::trace;
use veil_proto::{ControlCodec, ControlMessage};

use crate::framing::{socket_is_alive, ReuseOutcome, StreamError, StreamFraming};

/// Which side of the HTTP exchange this framing speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HttpRole {
    Client,
    Server,
}

const REQUEST_HEAD: &[u8] =
    b"POST /veil/control HTTP/1.1\r\nHost: veil\r\nContent-Type: application/octet-stream\r\nConnection: keep-alive\r\n\r\n";
const RESPONSE_HEAD: &[u8] =
    b"HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nConnection: keep-alive\r\n\r\n";

/// Largest header block accepted before the exchange is rejected
const MAX_HEAD_SIZE: usize = 8 * 1024;

/// HTTP-framed control stream supporting keep-alive reuse
pub struct HttpFraming {
    socket: TcpStream,
    role: HttpRole,
    recv_buffer: BytesMut,
    head_sent: bool,
    head_received: bool,
    closed: bool,
    local_addr: SocketAddr,
    peer_addr: SocketAddr,
}

impl std::fmt::Debug for HttpFraming {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFraming")
            .field("role", &self.role)
            .field("peer_addr", &self.peer_addr)
            .field("closed", &self.closed)
            .finish()
    }
}

impl HttpFraming {
    /// Framing for the accepting (relay) side of a connection
    pub fn server(socket: TcpStream) -> Result<Self, StreamError> {
        Self::new(socket, HttpRole::Server)
    }

    /// Framing for the connecting (client) side of a connection
    pub fn client(socket: TcpStream) -> Result<Self, StreamError> {
        Self::new(socket, HttpRole::Client)
    }

    fn new(socket: TcpStream, role: HttpRole) -> Result<Self, StreamError> {
        let local_addr = socket.local_addr()?;
        let peer_addr = socket.peer_addr()?;
        Ok(Self {
            socket,
            role,
            recv_buffer: BytesMut::with_capacity(8192),
            head_sent: false,
            head_received: false,
            closed: false,
            local_addr,
            peer_addr,
        })
    }

    fn outgoing_head(&self) -> &'static [u8] {
        match self.role {
            HttpRole::Client => REQUEST_HEAD,
            HttpRole::Server => RESPONSE_HEAD,
        }
    }

    fn expected_head_prefix(&self) -> &'static [u8] {
        match self.role {
            // The server reads the client's request, and vice versa.
            HttpRole::Server => b"POST ",
            HttpRole::Client => b"HTTP/1.1 200",
        }
    }

    async fn ensure_head_sent(&mut self) -> Result<(), StreamError> {
        if self.head_sent {
            return Ok(());
        }
        self.socket.write_all(self.outgoing_head()).await?;
        self.head_sent = true;
        Ok(())
    }

    /// Read and strip the peer's header block from the buffer
    async fn ensure_head_received(&mut self) -> Result<(), StreamError> {
        if self.head_received {
            return Ok(());
        }

        loop {
            if let Some(end) = find_head_end(&self.recv_buffer) {
                let head = self.recv_buffer.split_to(end);
                if !head.starts_with(self.expected_head_prefix()) {
                    return Err(StreamError::ProtocolError(format!(
                        "Unexpected HTTP head from {}",
                        self.peer_addr
                    )));
                }
                self.head_received = true;
                trace!("Completed HTTP head exchange with {}", self.peer_addr);
                return Ok(());
            }

            if self.recv_buffer.len() > MAX_HEAD_SIZE {
                return Err(StreamError::ProtocolError(
                    "HTTP head too large".to_string(),
                ));
            }

            let n = self.socket.read_buf(&mut self.recv_buffer).await?;
            if n == 0 {
                self.closed = true;
                return Err(StreamError::StreamClosed);
            }
        }
    }
}

/// Offset just past the terminating CRLFCRLF, if present
fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

#[async_trait]
impl StreamFraming for HttpFraming {
    async fn send_message(&mut self, message: &ControlMessage) -> Result<(), StreamError> {
        if self.closed {
            return Err(StreamError::StreamClosed);
        }

        self.ensure_head_sent().await?;

        let encoded = ControlCodec::encode(message)?;
        self.socket.write_all(&encoded).await?;

        trace!("Sent message to {}: {:?}", self.peer_addr, message);
        Ok(())
    }

    async fn recv_message(&mut self) -> Result<Option<ControlMessage>, StreamError> {
        if self.closed && self.recv_buffer.is_empty() {
            return Ok(None);
        }

        self.ensure_head_received().await?;

        loop {
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
        true
    }

    async fn is_alive(&self) -> bool {
        !self.closed && socket_is_alive(&self.socket).await
    }

    async fn into_reuse(self: Box<Self>) -> ReuseOutcome {
        if self.closed {
            return ReuseOutcome::Failed(self, StreamError::StreamClosed);
        }

        // Fresh exchange over the kept-alive socket. Bytes already
        // buffered belong to the next exchange and are carried over.
        let fresh = HttpFraming {
            socket: self.socket,
            role: self.role,
            recv_buffer: self.recv_buffer,
            head_sent: false,
            head_received: false,
            closed: false,
            local_addr: self.local_addr,
            peer_addr: self.peer_addr,
        };
        ReuseOutcome::Reused(Box::new(fresh))
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
