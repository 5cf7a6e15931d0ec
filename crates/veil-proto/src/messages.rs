//! Protocol message types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome code carried by session responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseCode {
    /// Request succeeded
    Ok,
    /// No access record exists for the presented token
    TokenNotFound,
    /// The admission proof did not match
    InvalidSignature,
    /// An access record exists but its status forbids new sessions
    AccessError,
    /// The addressed session has been disposed
    SessionClosed,
    /// No session with the given id or client id
    SessionNotFound,
    /// The relay's global session cap is reached
    ServerFull,
}

/// Who displaced a session, if anyone
///
/// `YourSelf` covers both a clean client close and displacement by a
/// newer session of the same client; `Other` means another client on
/// the same access took the slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuppressedBy {
    #[default]
    None,
    YourSelf,
    Other,
}

/// Usage snapshot attached to admission failures so clients can show
/// quota information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessUsage {
    pub access_id: Uuid,
    pub max_client_count: u32,
    pub bytes_used: u64,
    pub bytes_limit: u64,
}

/// Client hello: the admission request opening a new session
///
/// `encrypted_client_id` is the admission proof: the 16 raw bytes of
/// `client_id` encrypted with AES-CBC under the access secret, zero IV,
/// no padding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelloRequest {
    pub client_id: Uuid,
    pub token_id: Uuid,
    #[serde(with = "serde_bytes")]
    pub user_token: Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub encrypted_client_id: Vec<u8>,
}

/// Main control protocol message enum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControlMessage {
    /// Open a new session
    Hello(HelloRequest),
    /// Admission succeeded; carries the server-selected parameters
    SessionAccepted {
        session_id: u64,
        keepalive_interval_secs: u32,
    },
    /// Admission or lookup failed
    SessionRejected {
        response_code: ResponseCode,
        message: String,
        usage: Option<AccessUsage>,
        suppressed_by: SuppressedBy,
        suppressed_by_client_id: Option<Uuid>,
    },
    /// Address an existing session from a fresh client stream
    Attach {
        session_id: u64,
    },
    /// The relay accepted the attach
    Attached {
        session_id: u64,
    },
    Keepalive {
        timestamp: u64,
    },
    KeepaliveAck {
        timestamp: u64,
    },
    /// Clean client close of a session
    Bye {
        session_id: u64,
        reason: String,
    },
}
