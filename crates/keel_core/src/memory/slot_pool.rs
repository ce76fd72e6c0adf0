//! # Slot Pool
//!
//! Fixed-size block of pre-initialized slots with a free bitmap.

use super::bitmap::FreeBitmap;
use crate::error::{PoolError, PoolResult};

/// Handle to an acquired slot.
///
/// The handle carries the slot's global index. Pools never renumber or move
/// slots, so a handle stays valid until it is released. After release the
/// slot may be handed out again; holding on to the old handle is a logic
/// error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotRef {
    /// Global slot index.
    index: usize,
}

impl SlotRef {
    /// Creates a handle from a raw global index.
    #[inline]
    #[must_use]
    pub const fn from_raw(index: usize) -> Self {
        Self { index }
    }

    /// Returns the global slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.index
    }
}

/// A pool of `N` slots, `N` fixed at construction.
///
/// Every slot holds a live value at all times (a clone of the template or
/// `T::default()`), so acquiring never allocates and releasing never drops.
/// A released slot keeps its stale contents until it is acquired again.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. Use one pool per thread or wrap in a mutex.
///
/// # Example
///
/// ```rust
/// use keel_core::SlotPool;
///
/// let mut pool: SlotPool<u32> = SlotPool::new(4);
///
/// let slot = pool.acquire().unwrap();
/// *pool.get_mut(slot).unwrap() = 7;
/// assert_eq!(pool.get(slot), Some(&7));
///
/// pool.release(slot).unwrap();
/// assert_eq!(pool.free_position(), Some(0));
/// ```
#[derive(Debug)]
pub struct SlotPool<T> {
    /// Slot values.
    storage: Box<[T]>,
    /// 1 = free, 0 = occupied.
    free: FreeBitmap,
    /// Global index of local slot 0.
    base: usize,
}

impl<T: Clone + Default> SlotPool<T> {
    /// Creates a pool of `capacity` default-initialized slots.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_base(capacity, 0, None)
    }

    /// Creates a pool whose slots are all clones of `template`.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn with_template(capacity: usize, template: &T) -> Self {
        Self::with_base(capacity, 0, Some(template))
    }

    /// Creates a pool whose local slot 0 has global index `base`.
    pub(crate) fn with_base(capacity: usize, base: usize, template: Option<&T>) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");

        let storage: Vec<T> = match template {
            Some(value) => vec![value.clone(); capacity],
            None => (0..capacity).map(|_| T::default()).collect(),
        };

        Self {
            storage: storage.into_boxed_slice(),
            free: FreeBitmap::new(capacity, true),
            base,
        }
    }
}

impl<T> SlotPool<T> {
    /// Returns the total number of slots.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.storage.len()
    }

    /// Returns the global index of the first slot.
    #[inline]
    #[must_use]
    pub const fn base(&self) -> usize {
        self.base
    }

    /// Returns the number of free slots.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.count_set()
    }

    /// Returns the number of acquired slots.
    #[inline]
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.size() - self.free_count()
    }

    /// Returns the lowest free local index, or `None` if the pool is full.
    #[inline]
    #[must_use]
    pub fn free_position(&self) -> Option<usize> {
        self.free.first_set()
    }

    /// Returns true if no slot is free.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.free_position().is_none()
    }

    /// Acquires the lowest free slot.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::PoolExhausted`] if every slot is occupied.
    pub fn acquire(&mut self) -> PoolResult<SlotRef> {
        let position = self.free_position().ok_or(PoolError::PoolExhausted {
            capacity: self.size(),
        })?;
        Ok(self.acquire_at(position))
    }

    /// Acquires a slot the caller already knows is free.
    ///
    /// # Panics
    ///
    /// Panics if `position` is out of range or already occupied.
    pub fn acquire_at(&mut self, position: usize) -> SlotRef {
        assert!(
            self.free.test(position),
            "slot {position} is not available"
        );
        self.free.clear(position);
        SlotRef::from_raw(self.base + position)
    }

    /// Returns true if `slot` falls inside this pool's index range.
    #[inline]
    #[must_use]
    pub fn has(&self, slot: SlotRef) -> bool {
        self.local(slot).is_some()
    }

    /// Returns true if `slot` belongs to this pool and is acquired.
    #[inline]
    #[must_use]
    pub fn is_occupied(&self, slot: SlotRef) -> bool {
        self.local(slot).is_some_and(|i| !self.free.test(i))
    }

    /// Releases an acquired slot.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ReferenceNotOwned`] if `slot` belongs to another pool.
    ///
    /// # Panics
    ///
    /// Panics if the slot is already free.
    pub fn release(&mut self, slot: SlotRef) -> PoolResult<()> {
        let position = self
            .local(slot)
            .ok_or(PoolError::ReferenceNotOwned { slot: slot.index() })?;
        assert!(
            !self.free.test(position),
            "slot {} is already released",
            slot.index()
        );
        self.free.set(position);
        Ok(())
    }

    /// Gets a reference to an acquired slot.
    #[inline]
    #[must_use]
    pub fn get(&self, slot: SlotRef) -> Option<&T> {
        let position = self.local(slot)?;
        if self.free.test(position) {
            return None;
        }
        self.storage.get(position)
    }

    /// Gets a mutable reference to an acquired slot.
    #[inline]
    pub fn get_mut(&mut self, slot: SlotRef) -> Option<&mut T> {
        let position = self.local(slot)?;
        if self.free.test(position) {
            return None;
        }
        self.storage.get_mut(position)
    }

    /// Maps a global handle to a local index.
    #[inline]
    fn local(&self, slot: SlotRef) -> Option<usize> {
        slot.index
            .checked_sub(self.base)
            .filter(|&i| i < self.storage.len())
    }
}
