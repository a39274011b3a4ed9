//! Session store implementation
//!
//! Sessions live behind a per-session async mutex so that page production for
//! one session is serialised while different sessions proceed in parallel.
//! Expiry is a sliding window: every successful lookup or update pushes it out
//! by the store's TTL.

use super::types::{SearchQuery, Session, SessionId};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{MutexGuard, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

/// Keyed, TTL-bound storage for sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Allocate a fresh session for a query
    async fn create(&self, query: SearchQuery) -> Result<SessionHandle>;

    /// Look up a live session and refresh its TTL
    async fn get(&self, id: &str) -> Result<SessionHandle>;

    /// Destroy a session. Returns whether it existed.
    async fn invalidate(&self, id: &str) -> bool;

    /// Drop every expired session. Returns how many were removed.
    async fn sweep(&self) -> usize;

    /// Number of stored sessions (expired ones not yet swept included)
    async fn len(&self) -> usize;

    /// Idle time after which a session expires
    fn ttl(&self) -> Duration;
}

// ============================================================================
// Session Handle
// ============================================================================

#[derive(Debug)]
struct Lease {
    last_access: Instant,
    last_accessed_at: DateTime<Utc>,
}

#[derive(Debug)]
struct SessionSlot {
    session: tokio::sync::Mutex<Session>,
    lease: Mutex<Lease>,
    ttl: Duration,
}

impl SessionSlot {
    fn lease(&self) -> std::sync::MutexGuard<'_, Lease> {
        self.lease.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.lease().last_access) >= self.ttl
    }

    fn touch(&self) {
        let mut lease = self.lease();
        lease.last_access = Instant::now();
        lease.last_accessed_at = Utc::now();
    }
}

/// Shared access to one stored session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    slot: Arc<SessionSlot>,
}

impl SessionHandle {
    /// Session id
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Acquire exclusive access to the session state.
    ///
    /// This is the update path: mutate through the guard, drop it, then call
    /// [`touch`](Self::touch). The guard may be held across directory calls,
    /// which serialises page production for the session.
    pub async fn lock(&self) -> MutexGuard<'_, Session> {
        self.slot.session.lock().await
    }

    /// Push expiry out by one TTL from now
    pub fn touch(&self) {
        self.slot.touch();
    }

    /// Last time the session was accessed
    pub fn last_accessed_at(&self) -> DateTime<Utc> {
        self.slot.lease().last_accessed_at
    }

    /// Time left before the session expires
    pub fn expires_in(&self) -> Duration {
        let idle = Instant::now().duration_since(self.slot.lease().last_access);
        self.slot.ttl.saturating_sub(idle)
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Session store backed by an in-process map
#[derive(Debug)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Arc<SessionSlot>>>,
    ttl: Duration,
}

impl MemorySessionStore {
    /// Create a store with the given idle TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, query: SearchQuery) -> Result<SessionHandle> {
        let mut sessions = self.sessions.write().await;

        let mut id = SessionId::generate();
        while sessions.contains_key(&id) {
            id = SessionId::generate();
        }

        let slot = Arc::new(SessionSlot {
            session: tokio::sync::Mutex::new(Session::new(id.clone(), query)),
            lease: Mutex::new(Lease {
                last_access: Instant::now(),
                last_accessed_at: Utc::now(),
            }),
            ttl: self.ttl,
        });
        sessions.insert(id.clone(), Arc::clone(&slot));

        info!(session_id = %id, "Created search session");
        Ok(SessionHandle { id, slot })
    }

    async fn get(&self, id: &str) -> Result<SessionHandle> {
        let key = SessionId::from(id);
        let slot = {
            let sessions = self.sessions.read().await;
            sessions.get(&key).cloned()
        }
        .ok_or_else(|| Error::session_not_found(id))?;

        if slot.is_expired(Instant::now()) {
            let mut sessions = self.sessions.write().await;
            if sessions
                .get(&key)
                .is_some_and(|current| Arc::ptr_eq(current, &slot))
            {
                sessions.remove(&key);
            }
            debug!(session_id = %id, "Session expired on access");
            return Err(Error::session_not_found(id));
        }

        slot.touch();
        Ok(SessionHandle { id: key, slot })
    }

    async fn invalidate(&self, id: &str) -> bool {
        let removed = self
            .sessions
            .write()
            .await
            .remove(&SessionId::from(id))
            .is_some();
        if removed {
            info!(session_id = %id, "Invalidated search session");
        }
        removed
    }

    async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, slot| !slot.is_expired(now));
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, remaining = sessions.len(), "Swept expired sessions");
        }
        removed
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// Periodically sweep expired sessions until the task is aborted
pub fn spawn_sweeper(store: Arc<dyn SessionStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            store.sweep().await;
        }
    })
}
