//! # Shared Entity Table
//!
//! The entity table does no locking of its own. When more than one thread
//! needs it, every access goes through one lock:
//!
//! ```text
//! Thread 1 (simulation):  lock -> mutate -> unlock
//! Thread 2 (render):      lock -> query  -> unlock
//! ```
//!
//! One lock per table keeps the table's invariants (mask and slot table in
//! lock-step, pool occupancy) under a single critical section.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::ecs::{ComponentStore, EntityTable, GenerationalIds, IdAllocator, PoolStore};

/// Cloneable handle to an entity table behind a single mutex.
///
/// # Example
///
/// ```rust
/// use keel_core::{EntityTable, RegistryBuilder, SharedTable};
///
/// #[derive(Clone, Default)]
/// struct Score(u32);
///
/// let mut builder = RegistryBuilder::new();
/// builder.register::<Score>();
/// let shared = SharedTable::new(EntityTable::new(builder.build().unwrap()));
///
/// let worker = shared.clone();
/// std::thread::spawn(move || {
///     worker.with(|table| {
///         let e = table.create_entity().unwrap();
///         table.insert(e, Score(10)).unwrap();
///     });
/// })
/// .join()
/// .unwrap();
///
/// assert_eq!(shared.lock().len(), 1);
/// ```
pub struct SharedTable<I: IdAllocator = GenerationalIds, S: ComponentStore = PoolStore> {
    inner: Arc<Mutex<EntityTable<I, S>>>,
}

impl<I: IdAllocator, S: ComponentStore> SharedTable<I, S> {
    /// Wraps a table.
    #[must_use]
    pub fn new(table: EntityTable<I, S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(table)),
        }
    }

    /// Locks the table for the lifetime of the guard.
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, EntityTable<I, S>> {
        self.inner.lock()
    }

    /// Runs `f` with the table locked.
    pub fn with<R>(&self, f: impl FnOnce(&mut EntityTable<I, S>) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Attempts to lock without blocking.
    #[inline]
    pub fn try_lock(&self) -> Option<MutexGuard<'_, EntityTable<I, S>>> {
        self.inner.try_lock()
    }
}

impl<I: IdAllocator, S: ComponentStore> Clone for SharedTable<I, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::RegistryBuilder;

    #[derive(Clone, Default)]
    struct Counter(u64);

    #[test]
    fn test_shared_mutation_across_threads() {
        let mut builder = RegistryBuilder::new();
        builder.register::<Counter>();
        let shared = SharedTable::new(EntityTable::new(builder.build().unwrap()));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let table = shared.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        table.with(|t| {
                            let e = t.create_entity().unwrap();
                            t.insert(e, Counter(1)).unwrap();
                        });
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let table = shared.lock();
        assert_eq!(table.len(), 100);
        let total: u64 = table
            .entities()
            .filter_map(|e| table.get::<Counter>(e).ok())
            .map(|c| c.0)
            .sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn test_try_lock_contended() {
        let shared = SharedTable::new(EntityTable::new(RegistryBuilder::new().build().unwrap()));
        let guard = shared.lock();
        assert!(shared.try_lock().is_none());
        drop(guard);
        assert!(shared.try_lock().is_some());
    }
}
