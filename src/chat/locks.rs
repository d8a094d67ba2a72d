//! Per-session turn serialization

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockTable = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;

/// Table of async locks keyed by session id
///
/// Turns within one session run one at a time so a second turn sees the
/// thread recorded by the first. Entries are removed once no turn holds or
/// waits on them. Only serializes within this process.
#[derive(Default, Clone)]
pub struct SessionLocks {
    table: Arc<LockTable>,
}

/// Held for the duration of a turn
pub struct SessionGuard {
    guard: Option<OwnedMutexGuard<()>>,
    session_id: String,
    table: Arc<LockTable>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a session
    pub async fn acquire(&self, session_id: &str) -> SessionGuard {
        let lock = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            // A waiter cancelled after the holder released leaves an idle entry.
            table.retain(|_, lock| Arc::strong_count(lock) > 1);
            table
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        SessionGuard {
            guard: Some(lock.lock_owned().await),
            session_id: session_id.to_string(),
            table: Arc::clone(&self.table),
        }
    }

    /// Number of sessions currently tracked
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        if table
            .get(&self.session_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            table.remove(&self.session_id);
        }
    }
}
