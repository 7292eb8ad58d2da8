use crate::{
    chat::Turn,
    error::{ChatError, Result},
    provider::Conversation,
};
use chrono::{DateTime, Utc};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use uuid::Uuid;

/// Server-side record of one conversation.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub turns: Vec<Turn>,
    pub conversation: Conversation,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

/// Which timestamp the reaper measures a session's age from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpiryPolicy {
    Created,
    #[default]
    LastActivity,
}

impl Session {
    fn reference_time(&self, policy: ExpiryPolicy) -> DateTime<Utc> {
        match policy {
            ExpiryPolicy::Created => self.created_at,
            ExpiryPolicy::LastActivity => self.last_active_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration, policy: ExpiryPolicy) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now.signed_duration_since(self.reference_time(policy)) > ttl,
            Err(_) => false,
        }
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += chrono::Duration::from_std(by).unwrap_or(chrono::Duration::zero());
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Process-lifetime session storage.
///
/// Every method returns quickly; implementations must not hold locks across
/// calls so the relay can talk to the provider without blocking other sessions.
pub trait SessionStore: Send + Sync {
    fn create(&self, conversation: Conversation) -> Session;

    /// Snapshot of the session, if it is live.
    fn get(&self, id: &str) -> Option<Session>;

    /// Appends turns and marks the session active. NotFound if it is gone.
    fn record_exchange(&self, id: &str, turns: Vec<Turn>) -> Result<()>;

    /// Marks the session active without changing its history.
    fn touch(&self, id: &str) -> bool;

    fn delete(&self, id: &str) -> bool;

    /// Removes every session older than `ttl` and returns their ids.
    fn sweep(&self, ttl: Duration, policy: ExpiryPolicy) -> Vec<String>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SessionStore for MemorySessionStore {
    fn create(&self, conversation: Conversation) -> Session {
        let now = self.clock.now();
        let session = Session {
            id: format!("ses_{}", Uuid::new_v4().simple()),
            turns: Vec::new(),
            conversation,
            created_at: now,
            last_active_at: now,
        };

        self.sessions()
            .insert(session.id.clone(), session.clone());
        session
    }

    fn get(&self, id: &str) -> Option<Session> {
        self.sessions().get(id).cloned()
    }

    fn record_exchange(&self, id: &str, turns: Vec<Turn>) -> Result<()> {
        let now = self.clock.now();
        let mut sessions = self.sessions();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| ChatError::NotFound(id.to_string()))?;
        session.turns.extend(turns);
        session.last_active_at = now;
        Ok(())
    }

    fn touch(&self, id: &str) -> bool {
        let now = self.clock.now();
        match self.sessions().get_mut(id) {
            Some(session) => {
                session.last_active_at = now;
                true
            }
            None => false,
        }
    }

    fn delete(&self, id: &str) -> bool {
        self.sessions().remove(id).is_some()
    }

    fn sweep(&self, ttl: Duration, policy: ExpiryPolicy) -> Vec<String> {
        let now = self.clock.now();
        let expired: Vec<String> = self
            .sessions()
            .values()
            .filter(|s| s.is_expired(now, ttl, policy))
            .map(|s| s.id.clone())
            .collect();

        // Re-check under the lock: a request may have touched the session since
        // the snapshot.
        expired
            .into_iter()
            .filter(|id| {
                let mut sessions = self.sessions();
                match sessions.get(id) {
                    Some(s) if s.is_expired(now, ttl, policy) => sessions.remove(id).is_some(),
                    _ => false,
                }
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.sessions().len()
    }
}
