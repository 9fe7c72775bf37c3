use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, info};

use crate::config::SESSION_IDLE_TTL;
use crate::types::ResultSet;

/// Key/value slots that survive across renders of one interactive session.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Arc<ResultSet>>;
    fn set(&self, key: &str, value: ResultSet);
    fn remove(&self, key: &str) -> Option<Arc<ResultSet>>;
    fn clear(&self);
}

// ---------------------------------------------------------------------------
// MemorySession
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemorySession {
    slots: DashMap<String, Arc<ResultSet>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl SessionStore for MemorySession {
    fn get(&self, key: &str) -> Option<Arc<ResultSet>> {
        self.slots.get(key).map(|v| Arc::clone(v.value()))
    }

    /// Replaces the slot wholesale.
    fn set(&self, key: &str, value: ResultSet) {
        self.slots.insert(key.to_string(), Arc::new(value));
    }

    fn remove(&self, key: &str) -> Option<Arc<ResultSet>> {
        self.slots.remove(key).map(|(_, v)| v)
    }

    fn clear(&self) {
        self.slots.clear();
    }
}

// ---------------------------------------------------------------------------
// SessionRegistry
// ---------------------------------------------------------------------------

pub type SessionId = u64;

#[derive(Debug)]
struct LiveSession {
    session: Arc<MemorySession>,
    last_seen: Mutex<Instant>,
}

impl LiveSession {
    fn idle_for(&self, now: Instant) -> Duration {
        let last_seen = *self.last_seen.lock().unwrap_or_else(|e| e.into_inner());
        now.saturating_duration_since(last_seen)
    }

    fn touch(&self) {
        *self.last_seen.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }
}

/// Owns every live session. A session exists from `start` until `end`, or
/// until it sits idle longer than the registry's TTL.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, LiveSession>,
    next_id: AtomicU64,
    idle_ttl: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self {
            sessions: DashMap::new(),
            next_id: AtomicU64::new(0),
            idle_ttl: SESSION_IDLE_TTL,
        }
    }
}

impl SessionRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_idle_ttl(idle_ttl: Duration) -> Arc<Self> {
        Arc::new(Self { idle_ttl, ..Self::default() })
    }

    /// Expired sessions are swept before the new one is registered.
    pub fn start(&self) -> (SessionId, Arc<MemorySession>) {
        self.sweep_idle(Instant::now());
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let session = Arc::new(MemorySession::new());
        self.sessions.insert(
            id,
            LiveSession { session: Arc::clone(&session), last_seen: Mutex::new(Instant::now()) },
        );
        info!(session_id = id, live = self.sessions.len(), "session started");
        (id, session)
    }

    /// Looking a session up counts as activity.
    pub fn get(&self, id: SessionId) -> Option<Arc<MemorySession>> {
        self.sessions.get(&id).map(|live| {
            live.touch();
            Arc::clone(&live.session)
        })
    }

    /// Clear and drop a session. Returns false if it was already gone.
    pub fn end(&self, id: SessionId) -> bool {
        match self.sessions.remove(&id) {
            Some((_, live)) => {
                live.session.clear();
                info!(session_id = id, live = self.sessions.len(), "session ended");
                true
            }
            None => false,
        }
    }

    /// Clear and drop every session idle for longer than the TTL as of `now`.
    /// Returns how many were dropped.
    pub fn sweep_idle(&self, now: Instant) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|id, live| {
            if live.idle_for(now) <= self.idle_ttl {
                return true;
            }
            live.session.clear();
            debug!(session_id = *id, "idle session expired");
            false
        });
        let expired = before.saturating_sub(self.sessions.len());
        if expired > 0 {
            info!(expired, live = self.sessions.len(), "swept idle sessions");
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RouteRow;

    fn rows(n: usize) -> ResultSet {
        (0..n).map(|_| RouteRow::default()).collect()
    }

    #[test]
    fn set_replaces_wholesale() {
        let session = MemorySession::new();
        session.set("results_df", rows(3));
        session.set("results_df", rows(1));
        assert_eq!(session.get("results_df").unwrap().len(), 1);
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn remove_and_clear() {
        let session = MemorySession::new();
        session.set("a", rows(1));
        session.set("b", rows(2));
        assert_eq!(session.remove("a").unwrap().len(), 1);
        assert!(session.get("a").is_none());
        session.clear();
        assert!(session.is_empty());
    }

    #[test]
    fn registry_lifecycle() {
        let registry = SessionRegistry::new();
        let (first, session) = registry.start();
        let (second, _) = registry.start();
        assert_ne!(first, second);
        assert_eq!(registry.len(), 2);

        session.set("results_df", rows(2));
        assert!(registry.end(first));
        assert!(session.get("results_df").is_none(), "ending a session clears its slots");
        assert!(registry.get(first).is_none());
        assert!(!registry.end(first));
        assert!(registry.get(second).is_some());
    }

    #[test]
    fn idle_sessions_expire_when_the_next_one_starts() {
        let registry = SessionRegistry::with_idle_ttl(Duration::from_millis(20));
        let (stale, stale_session) = registry.start();
        stale_session.set("results_df", rows(1));
        std::thread::sleep(Duration::from_millis(40));

        let (fresh, _) = registry.start();
        assert_eq!(registry.len(), 1);
        assert!(registry.get(stale).is_none());
        assert!(stale_session.is_empty(), "expired sessions are cleared");
        assert!(registry.get(fresh).is_some());
    }

    #[test]
    fn sweep_keeps_sessions_inside_the_ttl() {
        let registry = SessionRegistry::with_idle_ttl(Duration::from_secs(60));
        let (id, _) = registry.start();
        assert_eq!(registry.sweep_idle(Instant::now() + Duration::from_secs(30)), 0);
        assert!(registry.get(id).is_some());
        assert_eq!(registry.sweep_idle(Instant::now() + Duration::from_secs(61)), 1);
        assert!(registry.is_empty());
    }
}
