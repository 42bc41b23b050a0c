//! In-memory session store.
//!
//! The map lock is only held to look up, insert or remove an entry. Each
//! entry carries its own lock, so pollers of one session never contend with
//! the writer of another.

use crate::session::state::SessionState;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct SessionEntry {
    state: RwLock<SessionState>,
    cancel: CancellationToken,
}

/// Process-wide mapping from session id to session state.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<SessionEntry>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `state` under its session id.
    ///
    /// Returns the token the running pipeline watches for cancellation.
    /// Replacing an existing id cancels the previous entry.
    pub fn create(&self, state: SessionState) -> CancellationToken {
        let cancel = CancellationToken::new();
        let entry = Arc::new(SessionEntry {
            state: RwLock::new(state),
            cancel: cancel.clone(),
        });
        let id = entry
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .session_id
            .clone();

        let previous = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, entry);
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }
        cancel
    }

    fn entry(&self, id: &str) -> Option<Arc<SessionEntry>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Snapshot of the session, or `None` if unknown or cancelled.
    pub fn get(&self, id: &str) -> Option<SessionState> {
        let entry = self.entry(id)?;
        let state = entry
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Some(state)
    }

    /// Applies `mutation` under the entry's write lock.
    ///
    /// Returns `None` (without calling `mutation`) if the session is gone.
    pub fn update<R>(&self, id: &str, mutation: impl FnOnce(&mut SessionState) -> R) -> Option<R> {
        let entry = self.entry(id)?;
        let mut state = entry.state.write().unwrap_or_else(PoisonError::into_inner);
        Some(mutation(&mut state))
    }

    /// Removes the session and signals its pipeline.
    ///
    /// Returns true if a session was removed.
    pub fn cancel(&self, id: &str) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        match removed {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
