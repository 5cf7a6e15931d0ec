//! Control-plane protocol for the Veil VPN relay
//!
//! Defines the wire messages exchanged between a client and the relay's
//! session core, plus the framed codec used to carry them over a byte
//! stream.

pub mod codec;
pub mod messages;

pub use codec::{CodecError, ControlCodec};
pub use messages::{
    AccessUsage, ControlMessage, HelloRequest, ResponseCode, SuppressedBy,
};
