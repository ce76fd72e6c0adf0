//! # Growable Pool
//!
//! A chain of slot pools presented as one unbounded pool.
//!
//! ```text
//! pools:    [ SlotPool base=0 len=1 ][ SlotPool base=1 len=1 ][ SlotPool base=2 len=2 ] ...
//! summary:  [          0           ][          1           ][          1           ]
//!                                     ^ lowest pool with a free slot
//! ```
//!
//! Growth only appends, so a slot's global index never changes and
//! handles stay valid for the pool's whole lifetime.

use tracing::{debug, error};

use super::bitmap::FreeBitmap;
use super::slot_pool::{SlotPool, SlotRef};
use crate::config::{GrowthPolicy, PoolPolicy};
use crate::error::{PoolError, PoolResult};

/// Unbounded pool built from fixed-size [`SlotPool`]s.
///
/// Acquisition always picks the lowest-index pool with a free slot, then the
/// lowest free slot in it, so a given call sequence always yields the same
/// handles.
///
/// # Example
///
/// ```rust
/// use keel_core::{GrowablePool, PoolPolicy};
///
/// let mut pool: GrowablePool<f32> = GrowablePool::new(PoolPolicy::default());
/// assert_eq!(pool.size(), 0);
///
/// let a = pool.acquire_with(1.5).unwrap();
/// let b = pool.acquire_with(2.5).unwrap();
/// assert_eq!(pool.size(), 2);
/// assert_eq!(pool.get(a), Some(&1.5));
/// assert_eq!(pool.get(b), Some(&2.5));
/// ```
#[derive(Debug)]
pub struct GrowablePool<T> {
    /// Pools in growth order; bases are strictly increasing.
    pools: Vec<SlotPool<T>>,
    /// One bit per pool: 1 = has a free slot.
    summary: FreeBitmap,
    /// Sum of all pool sizes.
    size: usize,
    /// Value cloned into every new slot.
    template: Option<T>,
    /// Growth applied when every pool is full.
    growth: GrowthPolicy,
}

impl<T: Clone + Default> GrowablePool<T> {
    /// Creates a pool pre-sized and grown according to `policy`.
    #[must_use]
    pub fn new(policy: PoolPolicy) -> Self {
        let mut pool = Self {
            pools: Vec::new(),
            summary: FreeBitmap::default(),
            size: 0,
            template: None,
            growth: policy.growth,
        };
        pool.grow_extra(policy.initial_size);
        pool
    }

    /// Creates a pool whose slots are seeded with clones of `template`.
    #[must_use]
    pub fn with_template(policy: PoolPolicy, template: T) -> Self {
        let mut pool = Self {
            pools: Vec::new(),
            summary: FreeBitmap::default(),
            size: 0,
            template: Some(template),
            growth: policy.growth,
        };
        pool.grow_extra(policy.initial_size);
        pool
    }

    /// Appends a slot pool of `delta` slots. No-op for zero.
    pub fn grow_extra(&mut self, delta: usize) {
        if delta == 0 {
            return;
        }
        let pool = SlotPool::with_base(delta, self.size, self.template.as_ref());
        self.pools.push(pool);
        self.summary.push(true);
        self.size += delta;
        debug!(
            added = delta,
            total = self.size,
            pools = self.pools.len(),
            "growable pool grew"
        );
    }

    /// Acquires a slot, growing first if every pool is full.
    ///
    /// The slot holds whatever it held before: a template clone, a default,
    /// or a previous occupant's stale value.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::PoolMisconfigured`] if the pool is full and the
    /// growth policy yields zero.
    pub fn acquire(&mut self) -> PoolResult<SlotRef> {
        if self.summary.first_set().is_none() {
            let extra = self.growth.extra_slots(self.size);
            if extra == 0 {
                error!(size = self.size, "growth policy returned 0 for a full pool");
                return Err(PoolError::PoolMisconfigured { size: self.size });
            }
            self.grow_extra(extra);
        }

        let pool_idx = self
            .summary
            .first_set()
            .ok_or(PoolError::PoolExhausted {
                capacity: self.size,
            })?;
        let pool = &mut self.pools[pool_idx];
        let slot = pool.acquire()?;
        if pool.is_full() {
            self.summary.clear(pool_idx);
        }
        Ok(slot)
    }

    /// Acquires a slot and overwrites it with `value`.
    ///
    /// # Errors
    ///
    /// See [`GrowablePool::acquire`].
    pub fn acquire_with(&mut self, value: T) -> PoolResult<SlotRef> {
        let slot = self.acquire()?;
        if let Some(target) = self.get_mut(slot) {
            *target = value;
        }
        Ok(slot)
    }

    /// Acquires a slot and resets it to the template, or `T::default()`.
    ///
    /// # Errors
    ///
    /// See [`GrowablePool::acquire`].
    pub fn acquire_fresh(&mut self) -> PoolResult<SlotRef> {
        let value = self.template.clone().unwrap_or_default();
        self.acquire_with(value)
    }

    /// Replaces the template used for slots created by future growth.
    pub fn set_template(&mut self, template: T) {
        self.template = Some(template);
    }
}

impl<T> GrowablePool<T> {
    /// Releases a slot back to its owning pool.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ReferenceNotOwned`] if no pool owns the slot.
    ///
    /// # Panics
    ///
    /// Panics if the slot is already free.
    pub fn release(&mut self, slot: SlotRef) -> PoolResult<()> {
        let pool_idx = self
            .owner(slot)
            .ok_or(PoolError::ReferenceNotOwned { slot: slot.index() })?;
        self.pools[pool_idx].release(slot)?;
        self.summary.set(pool_idx);
        Ok(())
    }

    /// Returns true if some pool owns `slot`.
    #[inline]
    #[must_use]
    pub fn has(&self, slot: SlotRef) -> bool {
        self.owner(slot).is_some()
    }

    /// Gets a reference to an acquired slot.
    #[inline]
    #[must_use]
    pub fn get(&self, slot: SlotRef) -> Option<&T> {
        self.pools.get(self.owner(slot)?)?.get(slot)
    }

    /// Gets a mutable reference to an acquired slot.
    #[inline]
    pub fn get_mut(&mut self, slot: SlotRef) -> Option<&mut T> {
        let pool_idx = self.owner(slot)?;
        self.pools.get_mut(pool_idx)?.get_mut(slot)
    }

    /// Returns the total number of slots across all pools.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Returns the number of acquired slots.
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.pools.iter().map(SlotPool::occupied_count).sum()
    }

    /// Returns the number of slot pools in the chain.
    #[inline]
    #[must_use]
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Replaces the growth policy.
    pub fn set_growth(&mut self, growth: GrowthPolicy) {
        self.growth = growth;
    }

    /// Drops every pool and resets growth and template.
    ///
    /// All outstanding handles become invalid.
    pub fn clear(&mut self) {
        self.pools.clear();
        self.summary.truncate_all();
        self.size = 0;
        self.template = None;
        self.growth = GrowthPolicy::default();
    }

    /// Finds the pool whose index range contains `slot`.
    fn owner(&self, slot: SlotRef) -> Option<usize> {
        // Bases are sorted, so the owner is the last pool starting at or
        // before the slot.
        let idx = self
            .pools
            .partition_point(|pool| pool.base() <= slot.index())
            .checked_sub(1)?;
        self.pools[idx].has(slot).then_some(idx)
    }
}

impl<T: Clone + Default> Default for GrowablePool<T> {
    fn default() -> Self {
        Self::new(PoolPolicy::default())
    }
}
