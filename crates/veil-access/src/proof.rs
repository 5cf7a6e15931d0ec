//! Admission proof
//!
//! The client proves knowledge of the access secret by sending its
//! 16-byte client id encrypted with AES in CBC mode: key = the access
//! secret, IV = zero bytes, no padding, one block. The 16-byte uuid
//! matches the AES block size, so the single-block encryption is
//! well-defined.
//!
//! This is a one-block MAC-like construct kept for wire compatibility.
//! It is not a general-purpose MAC; secrets must not be shared across
//! clients.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncryptMut, KeyIvInit};
use thiserror::Error;
use uuid::Uuid;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes192CbcEnc = cbc::Encryptor<aes::Aes192>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;

/// AES block size; also the size of a raw uuid
pub const PROOF_LEN: usize = 16;

/// Admission proof errors
#[derive(Debug, Error)]
pub enum ProofError {
    #[error("Unsupported secret length: {0} bytes (expected 16, 24 or 32)")]
    UnsupportedKeyLength(usize),

    #[error("Cipher error")]
    Cipher,
}

/// Compute the admission proof for a client id under an access secret
///
/// The secret length selects AES-128/192/256.
pub fn compute_admission_proof(
    secret: &[u8],
    client_id: &Uuid,
) -> Result<[u8; PROOF_LEN], ProofError> {
    let iv = [0u8; PROOF_LEN];
    let mut block = *client_id.as_bytes();

    {
        let block = GenericArray::from_mut_slice(&mut block);
        match secret.len() {
            16 => Aes128CbcEnc::new_from_slices(secret, &iv)
                .map_err(|_| ProofError::Cipher)?
                .encrypt_block_mut(block),
            24 => Aes192CbcEnc::new_from_slices(secret, &iv)
                .map_err(|_| ProofError::Cipher)?
                .encrypt_block_mut(block),
            32 => Aes256CbcEnc::new_from_slices(secret, &iv)
                .map_err(|_| ProofError::Cipher)?
                .encrypt_block_mut(block),
            other => return Err(ProofError::UnsupportedKeyLength(other)),
        }
    }

    Ok(block)
}

/// Check a presented proof against the expected value
///
/// Returns false on any length mismatch; byte-wise comparison
/// otherwise.
pub fn verify_admission_proof(
    secret: &[u8],
    client_id: &Uuid,
    presented: &[u8],
) -> Result<bool, ProofError> {
    if presented.len() != PROOF_LEN {
        return Ok(false);
    }
    let expected = compute_admission_proof(secret, client_id)?;
    Ok(expected[..] == *presented)
}
