//! Handle-keyed callback registry.
//!
//! Shared by the auth service (session listeners) and the change feed
//! (channels). Callers take a snapshot of the registered entries and invoke
//! callbacks after the lock is released, so a callback may register or
//! remove listeners without deadlocking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Identifies one registration. Handles are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerHandle(u64);

impl ListenerHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Registry of entries keyed by [`ListenerHandle`].
pub(crate) struct ListenerRegistry<T> {
    next_id: AtomicU64,
    entries: Mutex<Vec<(ListenerHandle, T)>>,
}

impl<T: Clone> ListenerRegistry<T> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(ListenerHandle, T)>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds an entry and returns its handle.
    pub fn register(&self, entry: T) -> ListenerHandle {
        let handle = ListenerHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((handle, entry));
        handle
    }

    /// Removes the entry for `handle`. Returns false if it was already gone.
    pub fn remove(&self, handle: ListenerHandle) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|(h, _)| *h != handle);
        entries.len() != before
    }

    /// Clones out every registered entry.
    pub fn snapshot(&self) -> Vec<T> {
        self.lock().iter().map(|(_, entry)| entry.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }
}

impl<T: Clone> Default for ListenerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
