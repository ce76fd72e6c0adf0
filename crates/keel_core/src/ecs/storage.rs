//! # Component Storage
//!
//! Per-type component pools behind a type-erased interface.
//!
//! The table only ever talks to a [`ComponentStore`]: acquire a slot for
//! type `i`, release a slot of type `i`. [`PoolStore`] is the default, one
//! [`GrowablePool`] per registered type. Any replacement must keep the same
//! guarantee: a slot handle stays valid until it is released.

use std::any::Any;

use super::component::{Component, Registry, TypeIndex};
use crate::config::PoolPolicy;
use crate::error::{EcsError, EcsResult, PoolResult};
use crate::memory::{GrowablePool, SlotRef};

/// Type-erased view of one component pool.
pub trait ErasedPool: Any + Send + Sync {
    /// Acquires a slot reset to the pool's template or default value.
    ///
    /// # Errors
    ///
    /// Propagates pool growth failures.
    fn acquire_fresh(&mut self) -> PoolResult<SlotRef>;

    /// Releases a slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot does not belong to this pool.
    fn release(&mut self, slot: SlotRef) -> PoolResult<()>;

    /// Total slots.
    fn size(&self) -> usize;

    /// Acquired slots.
    fn occupied_count(&self) -> usize;

    /// Drops all slots, then re-applies `policy`.
    fn reseed(&mut self, policy: &PoolPolicy);

    /// Upcast for downcasting to the concrete pool.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete pool.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedPool for GrowablePool<T> {
    fn acquire_fresh(&mut self) -> PoolResult<SlotRef> {
        GrowablePool::acquire_fresh(self)
    }

    fn release(&mut self, slot: SlotRef) -> PoolResult<()> {
        GrowablePool::release(self, slot)
    }

    fn size(&self) -> usize {
        GrowablePool::size(self)
    }

    fn occupied_count(&self) -> usize {
        GrowablePool::occupied_count(self)
    }

    fn reseed(&mut self, policy: &PoolPolicy) {
        self.clear();
        self.set_growth(policy.growth.clone());
        self.grow_extra(policy.initial_size);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Downcasts an erased pool to its concrete type.
#[inline]
#[must_use]
pub fn typed_pool<T: Component>(pool: &dyn ErasedPool) -> Option<&GrowablePool<T>> {
    pool.as_any().downcast_ref()
}

/// Mutably downcasts an erased pool to its concrete type.
#[inline]
pub fn typed_pool_mut<T: Component>(pool: &mut dyn ErasedPool) -> Option<&mut GrowablePool<T>> {
    pool.as_any_mut().downcast_mut()
}

/// Provider of component storage, indexed by [`TypeIndex`].
pub trait ComponentStore {
    /// Acquires a fresh slot for type `ty`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::TypeIndexOutOfRange`] for unknown types and
    /// propagates pool failures.
    fn acquire(&mut self, ty: TypeIndex) -> EcsResult<SlotRef>;

    /// Releases a slot of type `ty`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::TypeIndexOutOfRange`] for unknown types and
    /// propagates pool failures.
    fn release(&mut self, ty: TypeIndex, slot: SlotRef) -> EcsResult<()>;

    /// Returns the pool of type `ty`.
    fn pool(&self, ty: TypeIndex) -> Option<&dyn ErasedPool>;

    /// Returns the pool of type `ty` mutably.
    fn pool_mut(&mut self, ty: TypeIndex) -> Option<&mut dyn ErasedPool>;

    /// Number of component types served.
    fn type_count(&self) -> usize;

    /// Returns every pool to its just-constructed state.
    fn clear(&mut self);
}

/// Default store: one growable pool per registered component type.
pub struct PoolStore {
    pools: Vec<Box<dyn ErasedPool>>,
    policies: Vec<PoolPolicy>,
}

impl PoolStore {
    /// Builds one pool per type in `registry`.
    ///
    /// Types registered with their own policy use it; the rest use
    /// `default_policy`.
    #[must_use]
    pub fn from_registry(registry: &Registry, default_policy: &PoolPolicy) -> Self {
        let policies: Vec<PoolPolicy> = registry
            .components()
            .iter()
            .map(|info| info.policy.clone().unwrap_or_else(|| default_policy.clone()))
            .collect();
        let pools = registry
            .components()
            .iter()
            .zip(&policies)
            .map(|(info, policy)| (info.make_pool)(policy.clone()))
            .collect();

        Self { pools, policies }
    }
}

impl ComponentStore for PoolStore {
    fn acquire(&mut self, ty: TypeIndex) -> EcsResult<SlotRef> {
        let pool = self
            .pools
            .get_mut(ty.get())
            .ok_or(EcsError::TypeIndexOutOfRange(ty))?;
        Ok(pool.acquire_fresh()?)
    }

    fn release(&mut self, ty: TypeIndex, slot: SlotRef) -> EcsResult<()> {
        let pool = self
            .pools
            .get_mut(ty.get())
            .ok_or(EcsError::TypeIndexOutOfRange(ty))?;
        Ok(pool.release(slot)?)
    }

    fn pool(&self, ty: TypeIndex) -> Option<&dyn ErasedPool> {
        let pool: &dyn ErasedPool = self.pools.get(ty.get())?.as_ref();
        Some(pool)
    }

    fn pool_mut(&mut self, ty: TypeIndex) -> Option<&mut dyn ErasedPool> {
        let pool: &mut dyn ErasedPool = self.pools.get_mut(ty.get())?.as_mut();
        Some(pool)
    }

    fn type_count(&self) -> usize {
        self.pools.len()
    }

    fn clear(&mut self) {
        for (pool, policy) in self.pools.iter_mut().zip(&self.policies) {
            pool.reseed(policy);
        }
    }
}
