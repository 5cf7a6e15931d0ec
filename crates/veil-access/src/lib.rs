//! Access control for the Veil relay session core
//!
//! Binds a connecting client to an access record, verifies the AES-CBC
//! admission proof, and derives session-facing status through a shared
//! `AccessController`. The backend that issues access records is
//! reached only through the [`AccessBackend`] trait.

pub mod access;
pub mod backend;
pub mod controller;
pub mod identity;
pub mod proof;

pub use access::{Access, AccessStatus};
pub use backend::{AccessBackend, MemoryAccessBackend};
pub use controller::AccessController;
pub use identity::ClientIdentity;
pub use proof::{compute_admission_proof, verify_admission_proof, ProofError};

use thiserror::Error;

/// Access-layer errors
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Admission proof error: {0}")]
    Proof(#[from] ProofError),

    #[error("Backend error: {0}")]
    Backend(String),
}
