//! Poison-tolerant locking for the response store.
//!
//! A panic while a handler holds the store lock must not take the index
//! page down with it; the LRU is still structurally valid, so the guard is
//! recovered and the event is logged.

use std::sync::{Mutex, MutexGuard};

use tracing::warn;

pub(crate) fn lock_store<'a, T>(
    lock: &'a Mutex<T>,
    source: &'static str,
    op: &'static str,
) -> MutexGuard<'a, T> {
    lock.lock().unwrap_or_else(|poisoned| {
        warn!(
            target = "yatube::cache",
            source,
            op,
            "response store lock was poisoned; continuing with recovered entries"
        );
        lock.clear_poison();
        poisoned.into_inner()
    })
}
