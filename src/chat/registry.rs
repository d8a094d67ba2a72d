//! Session to provider thread resolution

use crate::storage::ChatLogStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of resolving a session to its provider thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadLookup {
    /// The session's most recent thread
    Found(String),
    /// The session has no thread yet
    Missing,
    /// The lookup failed and the error was swallowed
    Suppressed(String),
}

impl ThreadLookup {
    /// Thread id to continue, if any
    pub fn thread_id(&self) -> Option<&str> {
        match self {
            ThreadLookup::Found(id) => Some(id),
            ThreadLookup::Missing | ThreadLookup::Suppressed(_) => None,
        }
    }
}

/// Maps session ids to provider thread ids using the chat log
///
/// The most recently created log row for a session that carries a thread id
/// wins. Lookups never fail; storage errors come back as
/// [`ThreadLookup::Suppressed`].
pub struct ThreadRegistry {
    store: Arc<dyn ChatLogStore>,
}

impl ThreadRegistry {
    pub fn new(store: Arc<dyn ChatLogStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, session_id: &str) -> ThreadLookup {
        if session_id.is_empty() {
            return ThreadLookup::Missing;
        }

        match self.store.latest_thread_for_session(session_id).await {
            Ok(Some(thread_id)) => {
                debug!(session_id = %session_id, thread_id = %thread_id, "Resolved thread");
                ThreadLookup::Found(thread_id)
            }
            Ok(None) => ThreadLookup::Missing,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Thread lookup failed; starting a new thread");
                ThreadLookup::Suppressed(e.to_string())
            }
        }
    }
}
