//! Session manager
//!
//! Admission control, suppression policy, reaping and lookup for all
//! live sessions of one relay instance. The session map is a
//! concurrent structure; point operations need no external locking.

use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;
use veil_access::{
    verify_admission_proof, AccessBackend, AccessController, ClientIdentity,
};
use veil_proto::{HelloRequest, ResponseCode, SuppressedBy};

use crate::config::SessionConfig;
use crate::data_plane::{DataPlane, NullDataPlane};
use crate::error::SessionError;
use crate::session::Session;
use crate::tracker::{EventTracker, NoopTracker};

/// Produces the packet path for each newly admitted session
pub type DataPlaneFactory = Box<dyn Fn() -> Arc<dyn DataPlane> + Send + Sync>;

/// Admission control and lifecycle for all sessions of one relay
pub struct SessionManager {
    sessions: DashMap<u64, Arc<Session>>,
    last_cleanup: Mutex<Option<Instant>>,
    config: SessionConfig,
    backend: Arc<dyn AccessBackend>,
    tracker: Arc<dyn EventTracker>,
    data_planes: DataPlaneFactory,
}

impl SessionManager {
    pub fn new(config: SessionConfig, backend: Arc<dyn AccessBackend>) -> Self {
        Self {
            sessions: DashMap::new(),
            last_cleanup: Mutex::new(None),
            config,
            backend,
            tracker: Arc::new(NoopTracker),
            data_planes: Box::new(|| Arc::new(NullDataPlane::new()) as Arc<dyn DataPlane>),
        }
    }

    pub fn with_tracker(mut self, tracker: Arc<dyn EventTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn with_data_plane_factory(mut self, factory: DataPlaneFactory) -> Self {
        self.data_planes = factory;
        self
    }

    /// Admit a new client
    ///
    /// Validates the admission proof against the access backend, reaps
    /// stale entries, displaces a prior session when the client or its
    /// access quota demands it, and registers the new session under a
    /// fresh id.
    pub async fn create_session(
        &self,
        hello: &HelloRequest,
        client_ip: &str,
    ) -> Result<Arc<Session>, SessionError> {
        let identity = ClientIdentity::from_hello(hello, client_ip);

        let controller = self
            .validate_access(&identity, &hello.encrypted_client_id)
            .await?;

        self.maybe_reap();

        if let Some(cap) = self.config.max_concurrent_sessions {
            if self.live_session_count() >= cap {
                warn!(
                    client_id = %identity.client_id,
                    cap,
                    "Rejecting admission: server session cap reached"
                );
                return Err(SessionError::ServerFull);
            }
        }

        let displaced = self.pick_suppression_target(
            identity.client_id,
            controller.access_id(),
            controller.max_client_count(),
        );

        if let Some(victim) = &displaced {
            let kind = if victim.client_id() == identity.client_id {
                SuppressedBy::YourSelf
            } else {
                SuppressedBy::Other
            };
            info!(
                displaced_session_id = victim.session_id(),
                displaced_client_id = %victim.client_id(),
                new_client_id = %identity.client_id,
                "Suppressing prior session"
            );
            victim.dispose_suppressed(kind, identity.client_id);
        }

        let session = Arc::new(Session::new(
            identity.client_id,
            identity.client_ip.clone(),
            controller,
            (self.data_planes)(),
        ));
        if let Some(victim) = displaced {
            session.set_suppressed_to(victim.client_id());
        }

        info!(
            session_id = session.session_id(),
            client_id = %session.client_id(),
            client_ip = %client_ip,
            "Session created"
        );
        self.sessions.insert(session.session_id(), session.clone());

        // Fire-and-forget; admission never waits on analytics.
        let tracker = self.tracker.clone();
        tokio::spawn(async move {
            if let Err(e) = tracker.track_event("session", "SessionCreated").await {
                debug!(error = %e, "Tracking event dropped");
            }
        });

        Ok(session)
    }

    /// Fetch a session, refreshing its status first
    ///
    /// A session disposed now or earlier surfaces its disposal cause.
    pub fn get_by_id(&self, session_id: u64) -> Result<Arc<Session>, SessionError> {
        let session = self
            .sessions
            .get(&session_id)
            .map(|entry| entry.value().clone())
            .ok_or(SessionError::SessionNotFound)?;

        if !session.is_disposed() {
            session.update_status();
        }
        if session.is_disposed() {
            return Err(session.closed_error());
        }
        Ok(session)
    }

    /// Locate the live session of a client, then fetch it through
    /// `get_by_id` so status refresh and error surfacing are identical
    /// across entry points
    pub fn find_by_client_id(&self, client_id: Uuid) -> Result<Arc<Session>, SessionError> {
        let session_id = self
            .sessions
            .iter()
            .find(|entry| {
                let session = entry.value();
                !session.is_disposed() && session.client_id() == client_id
            })
            .map(|entry| *entry.key());

        match session_id {
            Some(id) => self.get_by_id(id),
            None => Err(SessionError::SessionNotFound),
        }
    }

    /// Dispose a session on the client's own clean close
    pub fn close_by_client(&self, session_id: u64) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get(&session_id)
            .map(|entry| entry.value().clone())
            .ok_or(SessionError::SessionNotFound)?;
        session.close_by_client();
        Ok(())
    }

    /// Terminate all sessions
    pub fn dispose(&self) {
        info!(count = self.sessions.len(), "Disposing all sessions");
        for entry in self.sessions.iter() {
            entry.value().dispose();
        }
        self.sessions.clear();
    }

    /// Number of sessions currently in the map, disposed or not
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of live (non-disposed) sessions
    pub fn live_session_count(&self) -> usize {
        self.sessions
            .iter()
            .filter(|entry| !entry.value().is_disposed())
            .count()
    }

    /// Background reaper cadence; spawn from the server task set
    pub async fn run_reaper(self: Arc<Self>) {
        let period = self.config.reap_interval().max(std::time::Duration::from_secs(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.reap_now();
        }
    }

    async fn validate_access(
        &self,
        identity: &ClientIdentity,
        encrypted_client_id: &[u8],
    ) -> Result<Arc<AccessController>, SessionError> {
        let access = self
            .backend
            .get_access(identity)
            .await?
            .ok_or(SessionError::TokenNotFound {
                token_id: identity.token_id,
            })?;

        let proof_ok =
            verify_admission_proof(&access.secret, &identity.client_id, encrypted_client_id)
                .map_err(veil_access::AccessError::from)?;
        if !proof_ok {
            warn!(
                client_id = %identity.client_id,
                token_id = %identity.token_id,
                "Rejecting admission: invalid proof"
            );
            return Err(SessionError::InvalidSignature {
                client_id: identity.client_id,
                usage: access.usage(),
            });
        }

        // One controller per access id among live sessions; a new
        // session joins the existing controller rather than creating a
        // second one.
        let controller = match self.find_controller(access.access_id) {
            Some(existing) => {
                existing.refresh(access);
                existing
            }
            None => Arc::new(AccessController::new(access)),
        };

        if controller.response_code() != ResponseCode::Ok {
            return Err(SessionError::AccessDenied {
                status: controller.status(),
                usage: controller.usage(),
                message: controller.message(),
            });
        }

        Ok(controller)
    }

    fn find_controller(&self, access_id: Uuid) -> Option<Arc<AccessController>> {
        self.sessions.iter().find_map(|entry| {
            let session = entry.value();
            if !session.is_disposed() && session.access_controller().access_id() == access_id {
                Some(session.access_controller().clone())
            } else {
                None
            }
        })
    }

    /// Choose the prior session the new admission displaces, if any
    ///
    /// Self-suppression wins over quota suppression; the quota victim
    /// is the oldest live session on the access, ties broken by lower
    /// session id.
    fn pick_suppression_target(
        &self,
        client_id: Uuid,
        access_id: Uuid,
        max_client_count: u32,
    ) -> Option<Arc<Session>> {
        let prior = self.sessions.iter().find_map(|entry| {
            let session = entry.value();
            if !session.is_disposed() && session.client_id() == client_id {
                Some(session.clone())
            } else {
                None
            }
        });
        if prior.is_some() {
            return prior;
        }

        if max_client_count == 0 {
            return None;
        }

        let live_on_access: Vec<Arc<Session>> = self
            .sessions
            .iter()
            .filter_map(|entry| {
                let session = entry.value();
                if !session.is_disposed()
                    && session.access_controller().access_id() == access_id
                {
                    Some(session.clone())
                } else {
                    None
                }
            })
            .collect();

        if (live_on_access.len() as u32) < max_client_count {
            return None;
        }

        live_on_access
            .into_iter()
            .min_by_key(|session| (session.created_time(), session.session_id()))
    }

    /// Reap at most once per interval
    fn maybe_reap(&self) {
        {
            let mut last = self.last_cleanup.lock().unwrap();
            if let Some(at) = *last {
                if at.elapsed() < self.config.reap_interval() {
                    return;
                }
            }
            *last = Some(Instant::now());
        }
        self.reap_now();
    }

    /// Remove entries disposed longer ago than the session timeout
    ///
    /// Live sessions are never removed here; their own status updates
    /// dispose them first.
    fn reap_now(&self) {
        let now = chrono::Utc::now();
        let timeout =
            chrono::Duration::from_std(self.config.session_timeout).unwrap_or(chrono::Duration::MAX);

        self.sessions.retain(|_, session| {
            match (session.is_disposed(), session.dispose_time()) {
                (true, Some(disposed_at)) if now - disposed_at >= timeout => {
                    debug!(
                        session_id = session.session_id(),
                        client_id = %session.client_id(),
                        "Reaped expired session"
                    );
                    false
                }
                _ => true,
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::MemoryTracker;
    use std::time::Duration;
    use veil_access::{compute_admission_proof, Access, AccessStatus, MemoryAccessBackend};

    const CLIENT_IP: &str = "203.0.113.20";

    fn make_access(secret: &[u8], max_client_count: u32, status: AccessStatus) -> Access {
        Access {
            access_id: Uuid::new_v4(),
            secret: secret.to_vec(),
            max_client_count,
            status,
            message: String::new(),
            bytes_used: 0,
            bytes_limit: 0,
        }
    }

    fn hello_for(client_id: Uuid, token_id: Uuid, secret: &[u8]) -> HelloRequest {
        let proof = compute_admission_proof(secret, &client_id).unwrap();
        HelloRequest {
            client_id,
            token_id,
            user_token: b"user-token".to_vec(),
            encrypted_client_id: proof.to_vec(),
        }
    }

    /// Manager over one registered access; returns its token id.
    fn manager_with_access(config: SessionConfig, access: Access) -> (SessionManager, Uuid) {
        let backend = Arc::new(MemoryAccessBackend::new());
        let token_id = Uuid::new_v4();
        backend.insert(token_id, access);
        (SessionManager::new(config, backend), token_id)
    }

    #[tokio::test]
    async fn test_happy_admission() {
        let secret = [0u8; 16];
        let access = make_access(&secret, 0, AccessStatus::Ok);
        let (manager, token_id) = manager_with_access(SessionConfig::default(), access);

        let client_id: Uuid = "00112233-4455-6677-8899-aabbccddeeff".parse().unwrap();
        let hello = hello_for(client_id, token_id, &secret);

        assert_eq!(manager.session_count(), 0);
        let session = manager.create_session(&hello, CLIENT_IP).await.unwrap();
        assert_eq!(manager.session_count(), 1);

        assert_ne!(session.session_id(), 0);
        assert_eq!(session.client_id(), client_id);
        assert_eq!(session.client_ip(), CLIENT_IP);
        assert!(!session.is_disposed());
    }

    #[tokio::test]
    async fn test_bad_signature_rejected() {
        let secret = [0u8; 16];
        let access = make_access(&secret, 0, AccessStatus::Ok);
        let (manager, token_id) = manager_with_access(SessionConfig::default(), access);

        let client_id: Uuid = "00112233-4455-6677-8899-aabbccddeeff".parse().unwrap();
        let mut hello = hello_for(client_id, token_id, &secret);
        let last = hello.encrypted_client_id.len() - 1;
        hello.encrypted_client_id[last] ^= 0x01;

        let result = manager.create_session(&hello, CLIENT_IP).await;
        assert!(matches!(
            result,
            Err(SessionError::InvalidSignature { .. })
        ));
        assert_eq!(manager.session_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_token_rejected() {
        let secret = [0u8; 16];
        let access = make_access(&secret, 0, AccessStatus::Ok);
        let (manager, _token_id) = manager_with_access(SessionConfig::default(), access);

        let hello = hello_for(Uuid::new_v4(), Uuid::new_v4(), &secret);
        let result = manager.create_session(&hello, CLIENT_IP).await;
        assert!(matches!(result, Err(SessionError::TokenNotFound { .. })));
    }

    #[tokio::test]
    async fn test_non_ok_access_rejected_with_usage() {
        let secret = [3u8; 16];
        let mut access = make_access(&secret, 2, AccessStatus::Expired);
        access.message = "subscription lapsed".to_string();
        access.bytes_used = 77;
        let (manager, token_id) = manager_with_access(SessionConfig::default(), access);

        let hello = hello_for(Uuid::new_v4(), token_id, &secret);
        match manager.create_session(&hello, CLIENT_IP).await {
            Err(SessionError::AccessDenied {
                status,
                usage,
                message,
            }) => {
                assert_eq!(status, AccessStatus::Expired);
                assert_eq!(usage.bytes_used, 77);
                assert_eq!(message, "subscription lapsed");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(manager.session_count(), 0);
    }

    #[tokio::test]
    async fn test_self_suppression() {
        let secret = [0u8; 16];
        let access = make_access(&secret, 0, AccessStatus::Ok);
        let (manager, token_id) = manager_with_access(SessionConfig::default(), access);

        let client_id = Uuid::new_v4();
        let hello = hello_for(client_id, token_id, &secret);

        let first = manager.create_session(&hello, CLIENT_IP).await.unwrap();
        let second = manager.create_session(&hello, CLIENT_IP).await.unwrap();

        assert!(first.is_disposed());
        assert!(!second.is_disposed());
        assert_eq!(first.suppressed_by(), SuppressedBy::YourSelf);
        // The suppressor id is recorded even though it equals the
        // session's own client id.
        assert_eq!(first.suppressed_by_client_id(), Some(client_id));
        assert_eq!(second.suppressed_to_client_id(), Some(client_id));

        match manager.get_by_id(first.session_id()) {
            Err(SessionError::SessionClosed {
                suppressed_by,
                suppressed_by_client_id,
                ..
            }) => {
                assert_eq!(suppressed_by, SuppressedBy::YourSelf);
                assert_eq!(suppressed_by_client_id, Some(client_id));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_at_most_one_live_session_per_client() {
        let secret = [0u8; 16];
        let access = make_access(&secret, 0, AccessStatus::Ok);
        let (manager, token_id) = manager_with_access(SessionConfig::default(), access);

        let client_id = Uuid::new_v4();
        let hello = hello_for(client_id, token_id, &secret);
        for _ in 0..4 {
            manager.create_session(&hello, CLIENT_IP).await.unwrap();
        }

        let live = manager.live_session_count();
        assert_eq!(live, 1);
    }

    #[tokio::test]
    async fn test_quota_suppression_displaces_oldest() {
        let secret = [0u8; 16];
        let access = make_access(&secret, 2, AccessStatus::Ok);
        let (manager, token_id) = manager_with_access(SessionConfig::default(), access);

        let first = manager
            .create_session(&hello_for(Uuid::new_v4(), token_id, &secret), CLIENT_IP)
            .await
            .unwrap();
        let second = manager
            .create_session(&hello_for(Uuid::new_v4(), token_id, &secret), CLIENT_IP)
            .await
            .unwrap();
        let third_client = Uuid::new_v4();
        let third = manager
            .create_session(&hello_for(third_client, token_id, &secret), CLIENT_IP)
            .await
            .unwrap();

        assert_eq!(manager.live_session_count(), 2);
        assert!(first.is_disposed());
        assert!(!second.is_disposed());
        assert!(!third.is_disposed());
        assert_eq!(first.suppressed_by(), SuppressedBy::Other);
        assert_eq!(first.suppressed_by_client_id(), Some(third_client));
        assert_eq!(third.suppressed_to_client_id(), Some(first.client_id()));
    }

    #[tokio::test]
    async fn test_quota_not_enforced_when_unlimited() {
        let secret = [0u8; 16];
        let access = make_access(&secret, 0, AccessStatus::Ok);
        let (manager, token_id) = manager_with_access(SessionConfig::default(), access);

        for _ in 0..5 {
            manager
                .create_session(&hello_for(Uuid::new_v4(), token_id, &secret), CLIENT_IP)
                .await
                .unwrap();
        }
        assert_eq!(manager.live_session_count(), 5);
    }

    #[tokio::test]
    async fn test_controller_shared_across_sessions_of_one_access() {
        let secret = [0u8; 16];
        let access = make_access(&secret, 0, AccessStatus::Ok);
        let (manager, token_id) = manager_with_access(SessionConfig::default(), access);

        let a = manager
            .create_session(&hello_for(Uuid::new_v4(), token_id, &secret), CLIENT_IP)
            .await
            .unwrap();
        let b = manager
            .create_session(&hello_for(Uuid::new_v4(), token_id, &secret), CLIENT_IP)
            .await
            .unwrap();

        assert!(Arc::ptr_eq(a.access_controller(), b.access_controller()));
    }

    #[tokio::test]
    async fn test_server_cap_rejects_admission() {
        let secret = [0u8; 16];
        let access = make_access(&secret, 0, AccessStatus::Ok);
        let config = SessionConfig {
            max_concurrent_sessions: Some(1),
            ..SessionConfig::default()
        };
        let (manager, token_id) = manager_with_access(config, access);

        manager
            .create_session(&hello_for(Uuid::new_v4(), token_id, &secret), CLIENT_IP)
            .await
            .unwrap();
        let result = manager
            .create_session(&hello_for(Uuid::new_v4(), token_id, &secret), CLIENT_IP)
            .await;
        assert!(matches!(result, Err(SessionError::ServerFull)));
    }

    #[tokio::test]
    async fn test_reap_cycle() {
        let secret = [0u8; 16];
        let access = make_access(&secret, 0, AccessStatus::Ok);
        let config = SessionConfig {
            session_timeout: Duration::from_secs(300),
            reap_interval: Some(Duration::ZERO),
            max_concurrent_sessions: None,
        };
        let (manager, token_id) = manager_with_access(config, access);

        let stale = manager
            .create_session(&hello_for(Uuid::new_v4(), token_id, &secret), CLIENT_IP)
            .await
            .unwrap();
        stale.dispose();
        stale.set_dispose_time_for_test(chrono::Utc::now() - chrono::Duration::seconds(301));

        let fresh = manager
            .create_session(&hello_for(Uuid::new_v4(), token_id, &secret), CLIENT_IP)
            .await
            .unwrap();
        fresh.dispose();
        fresh.set_dispose_time_for_test(chrono::Utc::now() - chrono::Duration::seconds(10));

        // The next admission reaps the 301s-old entry but keeps the
        // 10s-old one.
        manager
            .create_session(&hello_for(Uuid::new_v4(), token_id, &secret), CLIENT_IP)
            .await
            .unwrap();

        assert!(matches!(
            manager.get_by_id(stale.session_id()),
            Err(SessionError::SessionNotFound)
        ));
        assert!(matches!(
            manager.get_by_id(fresh.session_id()),
            Err(SessionError::SessionClosed { .. })
        ));
        assert_eq!(manager.session_count(), 2);
    }

    #[tokio::test]
    async fn test_reaper_never_removes_live_sessions() {
        let secret = [0u8; 16];
        let access = make_access(&secret, 0, AccessStatus::Ok);
        let config = SessionConfig {
            reap_interval: Some(Duration::ZERO),
            ..SessionConfig::default()
        };
        let (manager, token_id) = manager_with_access(config, access);

        let session = manager
            .create_session(&hello_for(Uuid::new_v4(), token_id, &secret), CLIENT_IP)
            .await
            .unwrap();

        manager
            .create_session(&hello_for(Uuid::new_v4(), token_id, &secret), CLIENT_IP)
            .await
            .unwrap();
        assert!(manager.get_by_id(session.session_id()).is_ok());
    }

    #[tokio::test]
    async fn test_get_by_id_refreshes_status() {
        let secret = [0u8; 16];
        let access = make_access(&secret, 0, AccessStatus::Ok);
        let (manager, token_id) = manager_with_access(SessionConfig::default(), access.clone());

        let session = manager
            .create_session(&hello_for(Uuid::new_v4(), token_id, &secret), CLIENT_IP)
            .await
            .unwrap();
        assert!(manager.get_by_id(session.session_id()).is_ok());

        // The access expires behind the session's back; the next
        // lookup observes it and surfaces the closure.
        let mut expired = access;
        expired.status = AccessStatus::Expired;
        expired.message = "expired".to_string();
        session.access_controller().refresh(expired);

        match manager.get_by_id(session.session_id()) {
            Err(SessionError::SessionClosed { message, .. }) => {
                assert_eq!(message, "expired");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(session.is_disposed());
    }

    #[tokio::test]
    async fn test_find_by_client_id() {
        let secret = [0u8; 16];
        let access = make_access(&secret, 0, AccessStatus::Ok);
        let (manager, token_id) = manager_with_access(SessionConfig::default(), access);

        let client_id = Uuid::new_v4();
        let session = manager
            .create_session(&hello_for(client_id, token_id, &secret), CLIENT_IP)
            .await
            .unwrap();

        let found = manager.find_by_client_id(client_id).unwrap();
        assert_eq!(found.session_id(), session.session_id());

        assert!(matches!(
            manager.find_by_client_id(Uuid::new_v4()),
            Err(SessionError::SessionNotFound)
        ));
    }

    #[tokio::test]
    async fn test_close_by_client() {
        let secret = [0u8; 16];
        let access = make_access(&secret, 0, AccessStatus::Ok);
        let (manager, token_id) = manager_with_access(SessionConfig::default(), access);

        let session = manager
            .create_session(&hello_for(Uuid::new_v4(), token_id, &secret), CLIENT_IP)
            .await
            .unwrap();

        manager.close_by_client(session.session_id()).unwrap();
        assert!(session.is_disposed());
        assert_eq!(session.suppressed_by(), SuppressedBy::YourSelf);
        assert!(session.suppressed_by_client_id().is_none());

        assert!(matches!(
            manager.get_by_id(session.session_id()),
            Err(SessionError::SessionClosed { .. })
        ));
    }

    #[tokio::test]
    async fn test_dispose_terminates_all() {
        let secret = [0u8; 16];
        let access = make_access(&secret, 0, AccessStatus::Ok);
        let (manager, token_id) = manager_with_access(SessionConfig::default(), access);

        let a = manager
            .create_session(&hello_for(Uuid::new_v4(), token_id, &secret), CLIENT_IP)
            .await
            .unwrap();
        let b = manager
            .create_session(&hello_for(Uuid::new_v4(), token_id, &secret), CLIENT_IP)
            .await
            .unwrap();

        manager.dispose();
        assert!(a.is_disposed());
        assert!(b.is_disposed());
        assert_eq!(manager.session_count(), 0);
    }

    #[tokio::test]
    async fn test_tracking_event_fired_on_admission() {
        let secret = [0u8; 16];
        let access = make_access(&secret, 0, AccessStatus::Ok);
        let backend = Arc::new(MemoryAccessBackend::new());
        let token_id = Uuid::new_v4();
        backend.insert(token_id, access);

        let tracker = Arc::new(MemoryTracker::new());
        let manager = SessionManager::new(SessionConfig::default(), backend)
            .with_tracker(tracker.clone());

        manager
            .create_session(&hello_for(Uuid::new_v4(), token_id, &secret), CLIENT_IP)
            .await
            .unwrap();

        // The event is spawned; give the task a moment to land.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let events = tracker.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0], ("session".to_string(), "SessionCreated".to_string()));
    }

    #[tokio::test]
    async fn test_session_ids_stay_unique() {
        let secret = [0u8; 16];
        let access = make_access(&secret, 0, AccessStatus::Ok);
        let (manager, token_id) = manager_with_access(SessionConfig::default(), access);

        let mut seen = std::collections::HashSet::new();
        for _ in 0..16 {
            let session = manager
                .create_session(&hello_for(Uuid::new_v4(), token_id, &secret), CLIENT_IP)
                .await
                .unwrap();
            assert!(seen.insert(session.session_id()));
        }
    }
}
