//! Client stream
//!
//! Wraps a framing layer (and through it, one TCP socket) into the
//! logical byte channel the session core hands around. Disposal either
//! closes the socket or, when reuse is possible, transfers the socket
//! to a fresh stream offered to the reuse sink.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, warn};
use veil_proto::ControlMessage;

use crate::framing::{ReuseOutcome, StreamError, StreamFraming};

/// Callback receiving the successor stream produced by a reuse disposal
pub type ReuseSink =
    Arc<dyn Fn(ClientStream) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// A logical bidirectional control channel bound to one TCP socket
///
/// Exactly one live `ClientStream` owns a given socket at any time;
/// reuse transfers ownership to the successor stream during disposal.
pub struct ClientStream {
    stream_id: String,
    framing: Option<Box<dyn StreamFraming>>,
    local_addr: SocketAddr,
    peer_addr: SocketAddr,
    reuse_sink: Option<ReuseSink>,
    disposed: bool,
}

impl std::fmt::Debug for ClientStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientStream")
            .field("stream_id", &self.stream_id)
            .field("peer_addr", &self.peer_addr)
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl ClientStream {
    pub fn new(framing: Box<dyn StreamFraming>) -> Self {
        let stream_id = format!("stream-{:08x}", rand::random::<u32>());
        let local_addr = framing.local_addr();
        let peer_addr = framing.peer_addr();
        Self {
            stream_id,
            framing: Some(framing),
            local_addr,
            peer_addr,
            reuse_sink: None,
            disposed: false,
        }
    }

    /// Attach the sink that receives the successor stream on reuse
    pub fn with_reuse_sink(mut self, sink: ReuseSink) -> Self {
        self.reuse_sink = Some(sink);
        self
    }

    pub fn set_reuse_sink(&mut self, sink: ReuseSink) {
        self.reuse_sink = Some(sink);
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub async fn send_message(&mut self, message: &ControlMessage) -> Result<(), StreamError> {
        match self.framing.as_mut() {
            Some(framing) => framing.send_message(message).await,
            None => Err(StreamError::StreamClosed),
        }
    }

    pub async fn recv_message(&mut self) -> Result<Option<ControlMessage>, StreamError> {
        match self.framing.as_mut() {
            Some(framing) => framing.recv_message().await,
            None => Err(StreamError::StreamClosed),
        }
    }

    /// Liveness of the underlying socket
    pub async fn is_alive(&self) -> bool {
        match &self.framing {
            Some(framing) => framing.is_alive().await,
            None => false,
        }
    }

    /// Dispose the stream
    ///
    /// With `allow_reuse` the socket is offered back through the reuse
    /// sink when the framing supports it and the peer is still alive;
    /// any failure on that path degrades to a terminal close. A second
    /// call is a no-op.
    pub async fn dispose(&mut self, allow_reuse: bool) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        let Some(framing) = self.framing.take() else {
            return;
        };

        let framing = if allow_reuse {
            match self.try_reuse(framing).await {
                // Socket handed off to the successor stream.
                None => return,
                Some(framing) => framing,
            }
        } else {
            framing
        };

        if let Err(e) = framing.shutdown().await {
            debug!(
                stream_id = %self.stream_id,
                error = %e,
                "Error closing stream socket"
            );
        }
    }

    /// Attempt the reuse hand-off; returns the framing back when the
    /// caller should fall through to a terminal close
    async fn try_reuse(
        &self,
        framing: Box<dyn StreamFraming>,
    ) -> Option<Box<dyn StreamFraming>> {
        let Some(sink) = self.reuse_sink.clone() else {
            return Some(framing);
        };

        if !framing.supports_reuse() || !framing.is_alive().await {
            return Some(framing);
        }

        match framing.into_reuse().await {
            ReuseOutcome::Reused(fresh) => {
                let successor = ClientStream::new(fresh).with_reuse_sink(sink.clone());
                debug!(
                    outgoing = %self.stream_id,
                    successor = %successor.stream_id,
                    peer_addr = %self.peer_addr,
                    "Reusing stream socket"
                );
                // Fire-and-forget: cancellation of the disposer must
                // not lose the socket mid-hand-off.
                tokio::spawn((sink)(successor));
                None
            }
            ReuseOutcome::Failed(framing, e) => {
                warn!(
                    stream_id = %self.stream_id,
                    error = %e,
                    "Stream reuse failed, closing socket"
                );
                Some(framing)
            }
        }
    }
}
