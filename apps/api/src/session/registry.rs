//! Per-visit session storage for the HTTP layer.
//!
//! Each session sits behind its own mutex, so one interaction runs to completion before
//! the next one on the same session starts. Different sessions never contend.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::session::{ProfileSession, SessionSettings};

pub struct TrackedSession {
    pub session: ProfileSession,
    pub touched_at: DateTime<Utc>,
}

impl TrackedSession {
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.touched_at = now;
    }
}

pub type SessionHandle = Arc<Mutex<TrackedSession>>;

pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
    settings: SessionSettings,
    idle_ttl: Duration,
}

impl SessionRegistry {
    pub fn new(settings: SessionSettings, idle_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            settings,
            idle_ttl,
        }
    }

    /// Opens a fresh `Unidentified` session, pruning idle ones first.
    pub async fn open(&self, now: DateTime<Utc>) -> Uuid {
        self.prune_idle(now).await;

        let id = Uuid::new_v4();
        let tracked = TrackedSession {
            session: ProfileSession::new(self.settings),
            touched_at: now,
        };
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(tracked)));
        debug!("Opened session {id}");
        id
    }

    pub async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops sessions untouched for longer than the idle window.
    /// Sessions busy with an interaction are left alone.
    pub async fn prune_idle(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, handle| match handle.try_lock() {
            Ok(tracked) => now.signed_duration_since(tracked.touched_at) <= self.idle_ttl,
            Err(_) => true,
        });
        let pruned = before - sessions.len();
        if pruned > 0 {
            debug!("Pruned {pruned} idle sessions");
        }
        pruned
    }
}
