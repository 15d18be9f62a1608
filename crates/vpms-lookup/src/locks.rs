//! In-process advisory locks keyed by lookup id

use parking_lot::{Condvar, Mutex};
use std::collections::BTreeSet;

/// Lock table serializing mutations of the same lookups
///
/// A caller acquires its whole id set at once, so two callers locking
/// overlapping sets cannot deadlock.
#[derive(Debug, Default)]
pub struct LookupLocks {
    held: Mutex<BTreeSet<u64>>,
    released: Condvar,
}

/// Held locks, released on drop
#[derive(Debug)]
#[must_use = "locks are released when the guard is dropped"]
pub struct LookupGuard<'a> {
    locks: &'a LookupLocks,
    ids: Vec<u64>,
}

impl LookupGuard<'_> {
    /// Locked ids, ascending
    #[inline]
    #[must_use]
    pub fn ids(&self) -> &[u64] {
        &self.ids
    }
}

impl Drop for LookupGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.locks.held.lock();
        for id in &self.ids {
            held.remove(id);
        }
        drop(held);
        self.locks.released.notify_all();
        tracing::debug!(ids = ?self.ids, "lookup locks released");
    }
}

impl LookupLocks {
    /// Create an empty lock table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until every id in `ids` is locked
    pub fn lock(&self, ids: &[u64]) -> LookupGuard<'_> {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut held = self.held.lock();
        while ids.iter().any(|id| held.contains(id)) {
            self.released.wait(&mut held);
        }
        held.extend(ids.iter().copied());
        drop(held);

        tracing::debug!(ids = ?ids, "lookup locks acquired");
        LookupGuard { locks: self, ids }
    }

    /// True if `id` is currently locked
    #[must_use]
    pub fn is_locked(&self, id: u64) -> bool {
        self.held.lock().contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn ids_are_sorted_and_deduplicated() {
        let locks = LookupLocks::new();
        let guard = locks.lock(&[9, 2, 9, 5]);
        assert_eq!(guard.ids(), &[2, 5, 9]);
        assert!(locks.is_locked(5));
        drop(guard);
        assert!(!locks.is_locked(5));
    }

    #[test]
    fn disjoint_sets_do_not_block() {
        let locks = LookupLocks::new();
        let first = locks.lock(&[1, 2]);
        let second = locks.lock(&[3]);
        assert_eq!(first.ids(), &[1, 2]);
        assert_eq!(second.ids(), &[3]);
    }

    #[test]
    fn overlapping_sets_are_serialized() {
        let locks = Arc::new(LookupLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                thread::spawn(move || {
                    for _ in 0..50 {
                        let ids = if i % 2 == 0 { [1, 2] } else { [2, 3] };
                        let _guard = locks.lock(&ids);
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
