//! Session collaborator used by the client and the sign-in flow.
//!
//! The client only ever calls [`SessionStore::clear_session`], on a 401.
//! Where sessions live (browser storage, keychain, memory) and whether teardown
//! also redirects to a login screen is up to the implementation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

/// Signed-in user context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Shared session store handle.
pub type SharedSessionStore = Arc<dyn SessionStore>;

pub trait SessionStore: Send + Sync {
    fn current_session(&self) -> Option<Session>;

    fn save_session(&self, session: Session);

    /// Drop any stored session. Must be safe to call repeatedly and from
    /// several failed requests at once.
    fn clear_session(&self);
}

/// Store that keeps nothing and tears down nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSessionStore;

impl SessionStore for NoopSessionStore {
    fn current_session(&self) -> Option<Session> {
        None
    }

    fn save_session(&self, _session: Session) {}

    fn clear_session(&self) {}
}

/// In-process store. Counts teardowns so callers can tell whether a 401 was
/// observed.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    current: RwLock<Option<Session>>,
    teardowns: AtomicUsize,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            current: RwLock::new(Some(session)),
            teardowns: AtomicUsize::new(0),
        }
    }

    pub fn teardowns(&self) -> usize {
        self.teardowns.load(Ordering::SeqCst)
    }
}

impl SessionStore for MemorySessionStore {
    fn current_session(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn save_session(&self, session: Session) {
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(session);
    }

    fn clear_session(&self) {
        self.current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        self.teardowns.fetch_add(1, Ordering::SeqCst);
        tracing::info!("session cleared");
    }
}
