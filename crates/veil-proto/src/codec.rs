//! Wire framing for control messages
//!
//! A frame is a 4-byte big-endian payload length followed by the
//! bincode payload. Decoding is incremental: the caller feeds a
//! growing buffer and gets a message back once a whole frame has
//! arrived, so partial reads never have to be special-cased at the
//! transport layer.

use crate::messages::ControlMessage;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Size of the length prefix
const LEN_PREFIX: usize = 4;

/// Largest payload a single frame may carry (16 MiB)
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Codec errors
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("Frame of {len} bytes exceeds the {max} byte cap")]
    FrameTooLarge { len: usize, max: usize },
}

/// Length-prefixed bincode codec for [`ControlMessage`]
pub struct ControlCodec;

impl ControlCodec {
    /// Encode one message as a complete frame
    pub fn encode(message: &ControlMessage) -> Result<Bytes, CodecError> {
        let payload = bincode::serialize(message)?;
        if payload.len() > MAX_FRAME_LEN {
            return Err(CodecError::FrameTooLarge {
                len: payload.len(),
                max: MAX_FRAME_LEN,
            });
        }

        let mut frame = BytesMut::with_capacity(LEN_PREFIX + payload.len());
        frame.put_u32(payload.len() as u32);
        frame.put_slice(&payload);
        Ok(frame.freeze())
    }

    /// Decode the next message out of `buf`, consuming its frame
    ///
    /// `Ok(None)` means no complete frame is buffered yet; read more
    /// bytes and call again. The length prefix is validated before the
    /// payload is awaited, so an oversized announcement fails fast.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<ControlMessage>, CodecError> {
        let payload_len = match Self::pending_frame_len(buf)? {
            Some(len) => len,
            None => return Ok(None),
        };
        if buf.len() - LEN_PREFIX < payload_len {
            return Ok(None);
        }

        buf.advance(LEN_PREFIX);
        let payload = buf.split_to(payload_len);
        Ok(Some(bincode::deserialize(&payload)?))
    }

    /// Payload length announced by the buffered prefix, if one is
    /// fully buffered
    fn pending_frame_len(buf: &BytesMut) -> Result<Option<usize>, CodecError> {
        if buf.len() < LEN_PREFIX {
            return Ok(None);
        }

        let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        if len > MAX_FRAME_LEN {
            return Err(CodecError::FrameTooLarge {
                len,
                max: MAX_FRAME_LEN,
            });
        }
        Ok(Some(len))
    }
}
