use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::create_timestamp;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Queueing,
    Running,
}

/// Snapshot of an in-flight session, as reported to clients
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SessionInfo {
    pub id: u64,
    pub exercise_id: u32,
    pub created_time: String,
    pub state: SessionState,
}

struct TrackedSession {
    info: SessionInfo,
    token: CancellationToken,
}

/// Registry of grading sessions that have been submitted but not finished.
///
/// Kept apart from the grading engine: the engine never sees it. The lock is
/// only taken for short map operations and never held across an await.
pub struct SessionTracker {
    next_id: AtomicU64,
    sessions: RwLock<HashMap<u64, TrackedSession>>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a queued session and returns its id
    pub fn register(&self, exercise_id: u32, token: CancellationToken) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let info = SessionInfo {
            id,
            exercise_id,
            created_time: create_timestamp(),
            state: SessionState::Queueing,
        };
        self.sessions
            .write()
            .insert(id, TrackedSession { info, token });
        id
    }

    pub fn mark_running(&self, id: u64) {
        if let Some(session) = self.sessions.write().get_mut(&id) {
            session.info.state = SessionState::Running;
        }
    }

    pub fn finish(&self, id: u64) {
        self.sessions.write().remove(&id);
    }

    /// Cancels a session's scope. Returns false if the id is unknown.
    pub fn cancel(&self, id: u64) -> bool {
        match self.sessions.read().get(&id) {
            Some(session) => {
                session.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn list(&self) -> Vec<SessionInfo> {
        let mut sessions: Vec<_> = self
            .sessions
            .read()
            .values()
            .map(|s| s.info.clone())
            .collect();
        sessions.sort_by_key(|s| s.id);
        sessions
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}
