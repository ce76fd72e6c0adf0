//! # Singletons
//!
//! World-wide components with at most one instance per type.
//!
//! Singletons are owned by the table and handed to systems explicitly
//! through [`EntityTable::singletons`](super::EntityTable::singletons).
//!
//! Every registered singleton type gets its storage (an `Option<T>`) when
//! the table is built. Adding and removing only fill and empty that slot.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;

use super::component::{Component, Registry, TypeIndex};
use crate::error::{EcsError, EcsResult};

/// Type-erased storage for one singleton type.
pub(crate) trait SingletonSlot: Any + Send + Sync {
    /// Returns true if the slot holds a value.
    fn is_present(&self) -> bool;

    /// Drops the held value, if any.
    fn clear(&mut self);

    /// Upcast for downcasting to `Option<T>`.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to `Option<T>`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> SingletonSlot for Option<T> {
    fn is_present(&self) -> bool {
        self.is_some()
    }

    fn clear(&mut self) {
        *self = None;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Allocates the empty slot for singleton type `T`.
pub(crate) fn make_slot<T: Component>() -> Box<dyn SingletonSlot> {
    Box::new(None::<T>)
}

/// Flat table of singleton instances, indexed by singleton [`TypeIndex`].
pub struct Singletons {
    /// One pre-allocated slot per registered singleton type.
    slots: Vec<Box<dyn SingletonSlot>>,
    /// Type lookup, frozen from the registry.
    indices: HashMap<TypeId, TypeIndex>,
}

impl Singletons {
    /// Creates an empty table for the singleton types in `registry`.
    #[must_use]
    pub fn from_registry(registry: &Registry) -> Self {
        let infos = registry.singletons();
        let indices = infos
            .iter()
            .enumerate()
            .map(|(i, info)| (info.type_id, TypeIndex::new(i)))
            .collect();

        Self {
            slots: infos.iter().map(|info| (info.make_slot)()).collect(),
            indices,
        }
    }

    /// Returns the number of live singletons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_present()).count()
    }

    /// Returns true if no singleton is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.slots.iter().any(|s| s.is_present())
    }

    /// Returns true if singleton `ty` is live.
    #[inline]
    #[must_use]
    pub fn contains_index(&self, ty: TypeIndex) -> bool {
        self.slots.get(ty.get()).is_some_and(|s| s.is_present())
    }

    /// Returns true if a singleton of type `T` is live.
    #[inline]
    #[must_use]
    pub fn contains<T: Component>(&self) -> bool {
        self.index::<T>().is_ok_and(|ty| self.contains_index(ty))
    }

    /// Adds the singleton of type `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnregisteredComponent`] if `T` was not registered
    /// as a singleton and [`EcsError::SingletonAlreadyPresent`] if one exists.
    pub fn add<T: Component>(&mut self, value: T) -> EcsResult<&mut T> {
        let slot = self.slot_mut::<T>()?;
        if slot.is_some() {
            return Err(EcsError::SingletonAlreadyPresent(type_name::<T>()));
        }
        Ok(slot.insert(value))
    }

    /// Gets the singleton of type `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SingletonMissing`] if it is not live.
    pub fn get<T: Component>(&self) -> EcsResult<&T> {
        self.slot::<T>()?
            .as_ref()
            .ok_or(EcsError::SingletonMissing(type_name::<T>()))
    }

    /// Gets the singleton of type `T` mutably.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SingletonMissing`] if it is not live.
    pub fn get_mut<T: Component>(&mut self) -> EcsResult<&mut T> {
        self.slot_mut::<T>()?
            .as_mut()
            .ok_or(EcsError::SingletonMissing(type_name::<T>()))
    }

    /// Removes the singleton of type `T`, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SingletonMissing`] if it is not live.
    pub fn remove<T: Component>(&mut self) -> EcsResult<T> {
        self.slot_mut::<T>()?
            .take()
            .ok_or(EcsError::SingletonMissing(type_name::<T>()))
    }

    /// Removes every live singleton.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.clear();
        }
    }

    fn index<T: Component>(&self) -> EcsResult<TypeIndex> {
        self.indices
            .get(&TypeId::of::<T>())
            .copied()
            .ok_or(EcsError::UnregisteredComponent(type_name::<T>()))
    }

    fn slot<T: Component>(&self) -> EcsResult<&Option<T>> {
        let ty = self.index::<T>()?;
        self.slots[ty.get()]
            .as_any()
            .downcast_ref()
            .ok_or(EcsError::UnregisteredComponent(type_name::<T>()))
    }

    fn slot_mut<T: Component>(&mut self) -> EcsResult<&mut Option<T>> {
        let ty = self.index::<T>()?;
        self.slots[ty.get()]
            .as_any_mut()
            .downcast_mut()
            .ok_or(EcsError::UnregisteredComponent(type_name::<T>()))
    }
}
