//! Per-client session state

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use uuid::Uuid;
use veil_access::AccessController;
use veil_proto::{ResponseCode, SuppressedBy};
use veil_stream::ClientStream;

use crate::data_plane::DataPlane;
use crate::error::SessionError;

/// Allocator for process-unique session ids; ids are never zero.
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> u64 {
    NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)
}

/// Mutable disposal state, written once when the session dies
#[derive(Debug, Default)]
struct SessionState {
    dispose_time: Option<DateTime<Utc>>,
    suppressed_by: SuppressedBy,
    suppressed_by_client_id: Option<Uuid>,
    suppressed_to_client_id: Option<Uuid>,
    close_reason: String,
}

/// One client's live tunnel state
///
/// Owned by the session manager. Disposal is one-way: once
/// `is_disposed` is set it never clears, and `dispose_time` is
/// recorded alongside it.
pub struct Session {
    session_id: u64,
    client_id: Uuid,
    client_ip: String,
    access_controller: Arc<AccessController>,
    data_plane: Arc<dyn DataPlane>,
    created_time: DateTime<Utc>,
    is_disposed: AtomicBool,
    state: RwLock<SessionState>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("client_id", &self.client_id)
            .field("is_disposed", &self.is_disposed())
            .finish()
    }
}

impl Session {
    pub fn new(
        client_id: Uuid,
        client_ip: String,
        access_controller: Arc<AccessController>,
        data_plane: Arc<dyn DataPlane>,
    ) -> Self {
        Self {
            session_id: next_session_id(),
            client_id,
            client_ip,
            access_controller,
            data_plane,
            created_time: Utc::now(),
            is_disposed: AtomicBool::new(false),
            state: RwLock::new(SessionState::default()),
        }
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn client_id(&self) -> Uuid {
        self.client_id
    }

    pub fn client_ip(&self) -> &str {
        &self.client_ip
    }

    pub fn access_controller(&self) -> &Arc<AccessController> {
        &self.access_controller
    }

    pub fn created_time(&self) -> DateTime<Utc> {
        self.created_time
    }

    pub fn is_disposed(&self) -> bool {
        self.is_disposed.load(Ordering::SeqCst)
    }

    pub fn dispose_time(&self) -> Option<DateTime<Utc>> {
        self.state.read().unwrap().dispose_time
    }

    pub fn suppressed_by(&self) -> SuppressedBy {
        self.state.read().unwrap().suppressed_by
    }

    pub fn suppressed_by_client_id(&self) -> Option<Uuid> {
        self.state.read().unwrap().suppressed_by_client_id
    }

    /// Client displaced when this session was admitted, if any
    pub fn suppressed_to_client_id(&self) -> Option<Uuid> {
        self.state.read().unwrap().suppressed_to_client_id
    }

    pub(crate) fn set_suppressed_to(&self, client_id: Uuid) {
        self.state.write().unwrap().suppressed_to_client_id = Some(client_id);
    }

    /// Poll the access controller and the data plane, self-disposing
    /// when either says the session can no longer run
    pub fn update_status(&self) {
        if self.is_disposed() {
            return;
        }

        if self.data_plane.is_closed() {
            self.dispose_with(SuppressedBy::None, None, "data plane torn down");
            return;
        }

        let code = self.access_controller.response_code();
        if code != ResponseCode::Ok {
            let message = self.access_controller.message();
            let reason = if message.is_empty() {
                "access no longer valid".to_string()
            } else {
                message
            };
            self.dispose_with(SuppressedBy::None, None, &reason);
        }
    }

    /// Dispose the session; idempotent, records the dispose time once
    pub fn dispose(&self) {
        self.dispose_with(SuppressedBy::None, None, "session disposed");
    }

    /// Dispose because a newer session took this one's slot
    pub(crate) fn dispose_suppressed(&self, by: SuppressedBy, suppressor: Uuid) {
        self.dispose_with(by, Some(suppressor), "session displaced by a newer connection");
    }

    /// Dispose on a clean close from the client itself
    pub fn close_by_client(&self) {
        self.dispose_with(SuppressedBy::YourSelf, None, "closed by client");
    }

    fn dispose_with(&self, by: SuppressedBy, suppressor: Option<Uuid>, reason: &str) {
        let mut state = self.state.write().unwrap();
        if self.is_disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        state.dispose_time = Some(Utc::now());
        state.suppressed_by = by;
        state.suppressed_by_client_id = suppressor;
        state.close_reason = reason.to_string();

        tracing::info!(
            session_id = self.session_id,
            client_id = %self.client_id,
            client_ip = %self.client_ip,
            reason = %reason,
            "Session disposed"
        );
    }

    /// Hand a fresh client stream to the packet path
    ///
    /// The stream is closed (reuse permitted) instead of attached when
    /// the session is already disposed.
    pub async fn attach_stream(&self, stream: ClientStream) -> Result<(), SessionError> {
        if self.is_disposed() {
            let mut stream = stream;
            stream.dispose(true).await;
            return Err(self.closed_error());
        }
        self.data_plane.attach(stream).await;
        Ok(())
    }

    /// The error a lookup of this (disposed) session must surface
    pub(crate) fn closed_error(&self) -> SessionError {
        let state = self.state.read().unwrap();
        SessionError::SessionClosed {
            session_id: self.session_id,
            usage: Some(self.access_controller.usage()),
            suppressed_by: state.suppressed_by,
            suppressed_by_client_id: state.suppressed_by_client_id,
            message: state.close_reason.clone(),
        }
    }

    #[cfg(test)]
    pub(crate) fn set_dispose_time_for_test(&self, time: DateTime<Utc>) {
        self.state.write().unwrap().dispose_time = Some(time);
    }
}
