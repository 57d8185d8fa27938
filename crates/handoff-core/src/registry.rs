//! Session registry
//!
//! Process-wide table from user identity to at most one live session.
//! This is the exclusivity invariant: a new instruction for a user who
//! already has an entry is rejected as busy, never queued or merged.
//!
//! The table is an explicit injectable object (never a hidden global)
//! behind a read/write lock; lookups on the callback path take the read
//! side only, so one user's long-running task never blocks another
//! user's callbacks.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::notify::Notifier;
use crate::session::Session;

/// Process-wide user -> session table enforcing exclusivity.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically create and register a session for `user_id`.
    ///
    /// Exactly one of any number of concurrent acquisition attempts for
    /// the same user can succeed; the rest get `Error::Busy` and the
    /// table is left untouched.
    pub fn try_acquire(
        &self,
        user_id: &str,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Arc<Session>> {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(user_id) {
            return Err(Error::Busy(user_id.to_string()));
        }
        let session = Session::new(user_id, notifier);
        sessions.insert(user_id.to_string(), session.clone());
        info!(user_id, "session acquired");
        Ok(session)
    }

    /// Remove the entry for `user_id` if present. Idempotent: releasing
    /// an absent entry is a no-op, so cleanup paths may double-fire.
    pub fn release(&self, user_id: &str) {
        let removed = self.sessions.write().remove(user_id);
        if removed.is_some() {
            info!(user_id, "session released");
        } else {
            debug!(user_id, "release on absent session (no-op)");
        }
    }

    /// Read-only lookup used by the callback router.
    pub fn lookup(&self, user_id: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(user_id).cloned()
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// User ids with a live session.
    pub fn active_users(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }
}
