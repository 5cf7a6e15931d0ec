//! Access backend trait
//!
//! The backend that issues tokens and accounts usage is an external
//! collaborator; the session core reaches it only through this trait.
//! The in-memory implementation backs tests and single-node
//! deployments.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::access::Access;
use crate::identity::ClientIdentity;
use crate::AccessError;

/// Resolves client identities to access records and accounts usage
#[async_trait]
pub trait AccessBackend: Send + Sync {
    /// Resolve the access record for an identity, keyed by its token
    ///
    /// Returns Ok(None) when no record exists for the token.
    async fn get_access(&self, identity: &ClientIdentity) -> Result<Option<Access>, AccessError>;

    /// Record `delta` bytes of traffic against an access
    ///
    /// The counter is monotone; returns the updated record.
    async fn add_usage(&self, access_id: Uuid, delta: u64) -> Result<Access, AccessError>;
}

/// In-memory access backend
///
/// All records are lost when the process exits.
pub struct MemoryAccessBackend {
    records: Mutex<HashMap<Uuid, Access>>,
}

impl MemoryAccessBackend {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Register an access record under a token id
    pub fn insert(&self, token_id: Uuid, access: Access) {
        self.records.lock().unwrap().insert(token_id, access);
    }

    /// Overwrite the record holding the given access id, if any
    pub fn update(&self, access: Access) {
        let mut records = self.records.lock().unwrap();
        if let Some(existing) = records
            .values_mut()
            .find(|a| a.access_id == access.access_id)
        {
            *existing = access;
        }
    }
}

impl Default for MemoryAccessBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccessBackend for MemoryAccessBackend {
    async fn get_access(&self, identity: &ClientIdentity) -> Result<Option<Access>, AccessError> {
        Ok(self.records.lock().unwrap().get(&identity.token_id).cloned())
    }

    async fn add_usage(&self, access_id: Uuid, delta: u64) -> Result<Access, AccessError> {
        let mut records = self.records.lock().unwrap();
        let access = records
            .values_mut()
            .find(|a| a.access_id == access_id)
            .ok_or_else(|| AccessError::Backend(format!("unknown access {}", access_id)))?;

        access.bytes_used = access.bytes_used.saturating_add(delta);
        Ok(access.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessStatus;

    fn test_access() -> Access {
        Access {
            access_id: Uuid::new_v4(),
            secret: vec![0u8; 16],
            max_client_count: 0,
            status: AccessStatus::Ok,
            message: String::new(),
            bytes_used: 0,
            bytes_limit: 0,
        }
    }

    fn identity_for_token(token_id: Uuid) -> ClientIdentity {
        ClientIdentity::new(Uuid::new_v4(), "192.0.2.1", token_id, Vec::new())
    }

    #[tokio::test]
    async fn test_get_access_by_token() {
        let backend = MemoryAccessBackend::new();
        let token_id = Uuid::new_v4();
        let access = test_access();
        backend.insert(token_id, access.clone());

        let resolved = backend
            .get_access(&identity_for_token(token_id))
            .await
            .unwrap();
        assert_eq!(resolved, Some(access));
    }

    #[tokio::test]
    async fn test_get_access_unknown_token() {
        let backend = MemoryAccessBackend::new();
        let resolved = backend
            .get_access(&identity_for_token(Uuid::new_v4()))
            .await
            .unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn test_add_usage_accumulates() {
        let backend = MemoryAccessBackend::new();
        let token_id = Uuid::new_v4();
        let access = test_access();
        let access_id = access.access_id;
        backend.insert(token_id, access);

        let updated = backend.add_usage(access_id, 10).await.unwrap();
        assert_eq!(updated.bytes_used, 10);
        let updated = backend.add_usage(access_id, 5).await.unwrap();
        assert_eq!(updated.bytes_used, 15);
    }

    #[tokio::test]
    async fn test_add_usage_unknown_access() {
        let backend = MemoryAccessBackend::new();
        let result = backend.add_usage(Uuid::new_v4(), 1).await;
        assert!(matches!(result, Err(AccessError::Backend(_))));
    }
}
