//! Shared access controller
//!
//! One controller exists per `access_id` among the live sessions of a
//! relay; every session carrying that access holds the same `Arc`. The
//! controller's lifetime is therefore the longest-living holder.

use std::sync::RwLock;
use uuid::Uuid;
use veil_proto::{AccessUsage, ResponseCode};

use crate::access::{Access, AccessStatus};
use crate::backend::AccessBackend;
use crate::AccessError;

/// Owns one access record and derives session-facing status from it
#[derive(Debug)]
pub struct AccessController {
    access_id: Uuid,
    access: RwLock<Access>,
}

impl AccessController {
    pub fn new(access: Access) -> Self {
        Self {
            access_id: access.access_id,
            access: RwLock::new(access),
        }
    }

    pub fn access_id(&self) -> Uuid {
        self.access_id
    }

    /// Replace the owned record with a freshly resolved one
    ///
    /// Records for a different access id are ignored; the controller is
    /// keyed by its access id for its whole lifetime.
    pub fn refresh(&self, access: Access) {
        if access.access_id != self.access_id {
            tracing::warn!(
                controller_access_id = %self.access_id,
                refreshed_access_id = %access.access_id,
                "Ignoring refresh with mismatched access id"
            );
            return;
        }
        *self.access.write().unwrap() = access;
    }

    pub fn status(&self) -> AccessStatus {
        self.access.read().unwrap().status
    }

    /// Current wire-visible response code derived from the record
    pub fn response_code(&self) -> ResponseCode {
        self.access.read().unwrap().response_code()
    }

    pub fn message(&self) -> String {
        self.access.read().unwrap().message.clone()
    }

    pub fn max_client_count(&self) -> u32 {
        self.access.read().unwrap().max_client_count
    }

    pub fn secret(&self) -> Vec<u8> {
        self.access.read().unwrap().secret.clone()
    }

    /// Snapshot the usage counters
    pub fn usage(&self) -> AccessUsage {
        self.access.read().unwrap().usage()
    }

    /// Record traffic against the access through the backend, then
    /// refresh the owned record with the returned state
    ///
    /// The backend's counter is monotone; the refreshed record is the
    /// authoritative view.
    pub async fn add_usage(
        &self,
        backend: &dyn AccessBackend,
        delta: u64,
    ) -> Result<AccessUsage, AccessError> {
        let updated = backend.add_usage(self.access_id, delta).await?;
        let usage = updated.usage();
        self.refresh(updated);
        Ok(usage)
    }
}
