//! Session errors

use thiserror::Error;
use uuid::Uuid;
use veil_access::{AccessError, AccessStatus};
use veil_proto::{AccessUsage, ControlMessage, ResponseCode, SuppressedBy};

/// Errors surfaced by the session core
///
/// Admission failures carry the access usage snapshot where one is
/// available so clients can display quota information. A disposed
/// session reports its original disposal cause, never a generic
/// not-found.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No access record for token {token_id}")]
    TokenNotFound { token_id: Uuid },

    #[error("Admission proof mismatch for client {client_id}")]
    InvalidSignature { client_id: Uuid, usage: AccessUsage },

    #[error("Access rejected: {message}")]
    AccessDenied {
        status: AccessStatus,
        usage: AccessUsage,
        message: String,
    },

    #[error("Session {session_id} is closed: {message}")]
    SessionClosed {
        session_id: u64,
        usage: Option<AccessUsage>,
        suppressed_by: SuppressedBy,
        suppressed_by_client_id: Option<Uuid>,
        message: String,
    },

    #[error("Session not found")]
    SessionNotFound,

    #[error("Server session limit reached")]
    ServerFull,

    #[error(transparent)]
    Access(#[from] AccessError),
}

impl SessionError {
    /// Wire-visible response code for this error
    pub fn response_code(&self) -> ResponseCode {
        match self {
            SessionError::TokenNotFound { .. } => ResponseCode::TokenNotFound,
            SessionError::InvalidSignature { .. } => ResponseCode::InvalidSignature,
            SessionError::AccessDenied { .. } => ResponseCode::AccessError,
            SessionError::SessionClosed { .. } => ResponseCode::SessionClosed,
            SessionError::SessionNotFound => ResponseCode::SessionNotFound,
            SessionError::ServerFull => ResponseCode::ServerFull,
            SessionError::Access(_) => ResponseCode::AccessError,
        }
    }

    /// Usage snapshot attached to the error, if any
    pub fn usage(&self) -> Option<AccessUsage> {
        match self {
            SessionError::InvalidSignature { usage, .. } => Some(usage.clone()),
            SessionError::AccessDenied { usage, .. } => Some(usage.clone()),
            SessionError::SessionClosed { usage, .. } => usage.clone(),
            _ => None,
        }
    }

    pub fn suppressed_by(&self) -> SuppressedBy {
        match self {
            SessionError::SessionClosed { suppressed_by, .. } => *suppressed_by,
            _ => SuppressedBy::None,
        }
    }

    pub fn suppressed_by_client_id(&self) -> Option<Uuid> {
        match self {
            SessionError::SessionClosed {
                suppressed_by_client_id,
                ..
            } => *suppressed_by_client_id,
            _ => None,
        }
    }

    /// Build the wire rejection for this error
    pub fn to_rejection(&self) -> ControlMessage {
        ControlMessage::SessionRejected {
            response_code: self.response_code(),
            message: self.to_string(),
            usage: self.usage(),
            suppressed_by: self.suppressed_by(),
            suppressed_by_client_id: self.suppressed_by_client_id(),
        }
    }
}
