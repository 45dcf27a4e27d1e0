//! In-memory session store.
//!
//! Each session sits behind its own async mutex. A run holds that lock for
//! its whole duration, so two runs never interleave writes to one history.
//! Sessions leave the store by explicit delete, by idling past the TTL, or by
//! being the least recently used entry when the store is full. Expiry is
//! swept lazily whenever the store is touched.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use supperclub_config::SessionConfig;
use supperclub_core::message::Message;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::{debug, warn};

/// One conversation's state.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            id: id.into(),
            messages,
            created_at: Utc::now(),
        }
    }
}

pub type SessionHandle = Arc<Mutex<Session>>;
pub type SessionGuard = OwnedMutexGuard<Session>;

struct Entry {
    session: SessionHandle,
    last_access: Instant,
}

impl Entry {
    fn is_busy(&self) -> bool {
        self.session.try_lock().is_err()
    }
}

pub struct SessionStore {
    entries: Mutex<HashMap<String, Entry>>,
    idle_ttl: Option<Duration>,
    max_sessions: usize,
}

impl SessionStore {
    /// `idle_ttl` of `None` keeps idle sessions until they are evicted by capacity.
    pub fn new(idle_ttl: Option<Duration>, max_sessions: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            idle_ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        let ttl = (config.idle_ttl_secs > 0).then(|| Duration::from_secs(config.idle_ttl_secs));
        Self::new(ttl, config.max_sessions)
    }

    /// Store a new session and return its id with a handle to it.
    pub async fn create(&self, initial_messages: Vec<Message>) -> (String, SessionHandle) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        self.sweep(&mut entries, now);

        let mut id = new_session_id();
        while entries.contains_key(&id) {
            id = new_session_id();
        }

        while entries.len() >= self.max_sessions {
            // Sessions with a run in flight are never victims.
            let oldest = entries
                .iter()
                .filter(|(_, e)| !e.is_busy())
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| k.clone());
            let Some(oldest) = oldest else {
                warn!(
                    sessions = entries.len(),
                    "Every session is busy; exceeding capacity"
                );
                break;
            };
            debug!(session_id = %oldest, "Evicting least recently used session");
            entries.remove(&oldest);
        }

        let session = Arc::new(Mutex::new(Session::new(id.clone(), initial_messages)));
        entries.insert(
            id.clone(),
            Entry {
                session: session.clone(),
                last_access: now,
            },
        );
        (id, session)
    }

    /// Fetch a live session and mark it as recently used.
    pub async fn get(&self, id: &str) -> Option<SessionHandle> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        self.sweep(&mut entries, now);
        let entry = entries.get_mut(id)?;
        entry.last_access = now;
        Some(entry.session.clone())
    }

    /// Refresh a session's idle clock without fetching it.
    pub async fn touch(&self, id: &str) {
        if let Some(entry) = self.entries.lock().await.get_mut(id) {
            entry.last_access = Instant::now();
        }
    }

    /// Remove a session. Returns whether it existed; absent ids are not an error.
    pub async fn delete(&self, id: &str) -> bool {
        self.entries.lock().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    fn sweep(&self, entries: &mut HashMap<String, Entry>, now: Instant) {
        let Some(ttl) = self.idle_ttl else { return };
        let before = entries.len();
        entries.retain(|_, e| e.is_busy() || now.duration_since(e.last_access) <= ttl);
        let expired = before - entries.len();
        if expired > 0 {
            debug!(expired, "Swept idle sessions");
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

/// Eight lowercase hex characters.
pub fn new_session_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}
