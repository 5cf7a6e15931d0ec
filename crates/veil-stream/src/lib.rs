//! Client stream layer for the Veil relay
//!
//! A [`ClientStream`] is a bidirectional control-message channel bound
//! to one TCP socket. The socket is owned by exactly one live stream at
//! a time; disposing a stream either closes the socket or, when the
//! framing supports it and the peer is still alive, hands the socket to
//! a fresh stream offered to a reuse sink. Reuse amortises the
//! handshake cost of connection setup across logical requests.

pub mod framing;
pub mod http;
pub mod pool;
pub mod raw;
pub mod stream;

pub use framing::{ReuseOutcome, StreamError, StreamFraming};
pub use http::HttpFraming;
pub use pool::StreamPool;
pub use raw::RawFraming;
pub use stream::{ClientStream, ReuseSink};
