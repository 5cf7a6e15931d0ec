//! Data-plane seam
//!
//! Packet-level forwarding inside an established session lives in an
//! external module reached through this trait. The session core only
//! needs to hand streams over and observe teardown.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use veil_stream::ClientStream;

/// Per-session packet path
#[async_trait]
pub trait DataPlane: Send + Sync {
    /// Hand a fresh client stream to the packet path
    ///
    /// The data plane takes ownership of the stream and is responsible
    /// for disposing it.
    async fn attach(&self, stream: ClientStream);

    /// Whether the packet path has torn down
    fn is_closed(&self) -> bool;

    async fn shutdown(&self);
}

/// Data plane that carries no packets
///
/// Streams handed to it are disposed immediately, with reuse allowed:
/// a stream carrying a reuse sink flows back to that sink (the relay's
/// control loop, or a keep-alive pool) instead of closing its socket.
/// Used until a real forwarder is attached and as the test substitute.
pub struct NullDataPlane {
    closed: AtomicBool,
}

impl NullDataPlane {
    pub fn new() -> Self {
        Self {
            closed: AtomicBool::new(false),
        }
    }
}

impl Default for NullDataPlane {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataPlane for NullDataPlane {
    async fn attach(&self, mut stream: ClientStream) {
        stream.dispose(true).await;
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
