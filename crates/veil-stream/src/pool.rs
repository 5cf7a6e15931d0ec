//! Keep-alive stream pool
//!
//! Holds idle reusable client streams keyed by peer address so the
//! next logical request to the same peer skips connection setup. The
//! pool's sink closure is the usual `reuse_sink` wired into streams.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::stream::{ClientStream, ReuseSink};

/// Pool of idle reusable client streams, keyed by peer address
pub struct StreamPool {
    idle: Mutex<HashMap<SocketAddr, VecDeque<ClientStream>>>,
    max_idle_per_peer: usize,
}

impl StreamPool {
    pub fn new(max_idle_per_peer: usize) -> Self {
        Self {
            idle: Mutex::new(HashMap::new()),
            max_idle_per_peer,
        }
    }

    /// Park an idle stream for its peer, evicting the oldest entry
    /// when the per-peer cap is reached
    pub async fn offer(&self, stream: ClientStream) {
        if stream.is_disposed() {
            return;
        }

        let peer = stream.peer_addr();
        let evicted = {
            let mut idle = self.idle.lock().unwrap();
            let queue = idle.entry(peer).or_default();
            let evicted = if queue.len() >= self.max_idle_per_peer {
                queue.pop_front()
            } else {
                None
            };
            queue.push_back(stream);
            evicted
        };

        if let Some(mut old) = evicted {
            debug!(peer_addr = %peer, "Evicting oldest idle stream");
            old.dispose(false).await;
        }
    }

    /// Take an idle stream for a peer, discarding dead entries
    pub async fn take(&self, peer: SocketAddr) -> Option<ClientStream> {
        loop {
            let candidate = {
                let mut idle = self.idle.lock().unwrap();
                idle.get_mut(&peer).and_then(|q| q.pop_front())
            };

            let mut stream = candidate?;
            if stream.is_alive().await {
                debug!(
                    peer_addr = %peer,
                    stream_id = %stream.stream_id(),
                    "Reusing pooled stream"
                );
                return Some(stream);
            }
            stream.dispose(false).await;
        }
    }

    /// Total number of idle streams currently parked
    pub fn idle_count(&self) -> usize {
        self.idle.lock().unwrap().values().map(VecDeque::len).sum()
    }

    /// A reuse sink that parks successor streams in this pool
    pub fn sink(self: &Arc<Self>) -> ReuseSink {
        let pool = Arc::clone(self);
        Arc::new(move |stream| {
            let pool = Arc::clone(&pool);
            Box::pin(async move {
                pool.offer(stream).await;
            })
        })
    }

    /// Close every idle stream
    pub async fn clear(&self) {
        let drained: Vec<ClientStream> = {
            let mut idle = self.idle.lock().unwrap();
            idle.drain().flat_map(|(_, q)| q).collect()
        };
        for mut stream in drained {
            stream.dispose(false).await;
        }
    }
}
