//! Access records

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use veil_proto::{AccessUsage, ResponseCode};

/// Status of an access record as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessStatus {
    Ok,
    Expired,
    TrafficOverUsage,
    RevokedByAdmin,
    Suspended,
}

/// Per-token record governing a client's permission to establish
/// sessions and its usage envelope
///
/// Owned by the `AccessController` that created it and refreshed in
/// place from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Access {
    pub access_id: Uuid,
    /// Key for the admission proof; 16, 24 or 32 bytes
    #[serde(with = "serde_bytes")]
    pub secret: Vec<u8>,
    /// Maximum concurrent clients on this access; 0 = unlimited
    pub max_client_count: u32,
    pub status: AccessStatus,
    pub message: String,
    pub bytes_used: u64,
    pub bytes_limit: u64,
}

impl Access {
    /// Map the status to the wire-visible response code
    pub fn response_code(&self) -> ResponseCode {
        match self.status {
            AccessStatus::Ok => ResponseCode::Ok,
            _ => ResponseCode::AccessError,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == AccessStatus::Ok
    }

    /// Snapshot the usage counters for error reporting
    pub fn usage(&self) -> AccessUsage {
        AccessUsage {
            access_id: self.access_id,
            max_client_count: self.max_client_count,
            bytes_used: self.bytes_used,
            bytes_limit: self.bytes_limit,
        }
    }
}
