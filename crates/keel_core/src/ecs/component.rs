//! # Component System
//!
//! Components are pure data containers with no behavior.
//!
//! Types get their dense [`TypeIndex`] from an explicit registration step:
//! a [`RegistryBuilder`] assigns indices in registration order and freezes
//! them into a [`Registry`] before any table is built. There is no global
//! type table.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;

use super::mask::MAX_COMPONENT_TYPES;
use super::singleton::{make_slot, SingletonSlot};
use super::storage::ErasedPool;
use crate::config::PoolPolicy;
use crate::error::{EcsError, EcsResult};
use crate::memory::GrowablePool;

/// Marker trait for ECS components and singletons.
///
/// Components must be:
/// - `Clone` + `Default`: pool slots are pre-initialized and reused in place
/// - `Send` + `Sync` + `'static`: tables may be moved to another thread
///
/// Implemented for every type that satisfies the bounds.
///
/// # Example
///
/// ```rust
/// #[derive(Clone, Default)]
/// struct Health {
///     current: u32,
///     max: u32,
/// }
///
/// fn assert_component<T: keel_core::Component>() {}
/// assert_component::<Health>();
/// ```
pub trait Component: Clone + Default + Send + Sync + 'static {}

impl<T: Clone + Default + Send + Sync + 'static> Component for T {}

/// Dense index of a registered type, assigned from zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeIndex(u16);

impl TypeIndex {
    /// Creates a type index.
    ///
    /// # Panics
    ///
    /// Panics if `index` does not fit in 16 bits.
    #[inline]
    #[must_use]
    pub fn new(index: usize) -> Self {
        assert!(index <= u16::MAX as usize, "type index {index} exceeds u16::MAX");
        Self(index as u16)
    }

    /// Returns the index as `usize`.
    #[inline]
    #[must_use]
    pub const fn get(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything the table needs to know about one component type.
pub(crate) struct ComponentInfo {
    pub(crate) name: &'static str,
    pub(crate) type_id: TypeId,
    pub(crate) policy: Option<PoolPolicy>,
    pub(crate) make_pool: fn(PoolPolicy) -> Box<dyn ErasedPool>,
}

fn make_pool<T: Component>(policy: PoolPolicy) -> Box<dyn ErasedPool> {
    Box::new(GrowablePool::<T>::new(policy))
}

/// Registered singleton type.
pub(crate) struct SingletonInfo {
    pub(crate) name: &'static str,
    pub(crate) type_id: TypeId,
    pub(crate) make_slot: fn() -> Box<dyn SingletonSlot>,
}

/// Index handed out for a registration past `MAX_COMPONENT_TYPES`.
///
/// It is out of range for every registry; `build` reports the overflow.
fn capped_index(position: usize) -> TypeIndex {
    TypeIndex::new(position.min(MAX_COMPONENT_TYPES))
}

/// Assigns type indices in registration order.
///
/// At most [`MAX_COMPONENT_TYPES`] component types and as many singleton
/// types fit in one registry. Registrations past that limit get an index
/// that no table accepts, and [`RegistryBuilder::build`] fails.
///
/// # Example
///
/// ```rust
/// use keel_core::RegistryBuilder;
///
/// #[derive(Clone, Default)]
/// struct Position(f32, f32);
/// #[derive(Clone, Default)]
/// struct Velocity(f32, f32);
///
/// let mut builder = RegistryBuilder::new();
/// let pos = builder.register::<Position>();
/// let vel = builder.register::<Velocity>();
/// let registry = builder.build().unwrap();
///
/// assert_eq!(pos.get(), 0);
/// assert_eq!(vel.get(), 1);
/// assert_eq!(registry.index_of::<Velocity>(), Some(vel));
/// ```
#[derive(Default)]
pub struct RegistryBuilder {
    components: Vec<ComponentInfo>,
    singletons: Vec<SingletonInfo>,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a component type using the table's default pool policy.
    ///
    /// Registering the same type twice returns the existing index.
    pub fn register<T: Component>(&mut self) -> TypeIndex {
        self.register_inner::<T>(None)
    }

    /// Registers a component type with its own pool policy.
    ///
    /// If the type is already registered its policy is replaced.
    pub fn register_with_policy<T: Component>(&mut self, policy: PoolPolicy) -> TypeIndex {
        self.register_inner::<T>(Some(policy))
    }

    /// Registers a singleton type. Singletons have their own index space.
    pub fn register_singleton<T: Component>(&mut self) -> TypeIndex {
        let type_id = TypeId::of::<T>();
        if let Some(pos) = self.singletons.iter().position(|s| s.type_id == type_id) {
            return capped_index(pos);
        }
        self.singletons.push(SingletonInfo {
            name: type_name::<T>(),
            type_id,
            make_slot: make_slot::<T>,
        });
        capped_index(self.singletons.len() - 1)
    }

    fn register_inner<T: Component>(&mut self, policy: Option<PoolPolicy>) -> TypeIndex {
        let type_id = TypeId::of::<T>();
        if let Some(pos) = self.components.iter().position(|c| c.type_id == type_id) {
            if policy.is_some() {
                self.components[pos].policy = policy;
            }
            return capped_index(pos);
        }
        self.components.push(ComponentInfo {
            name: type_name::<T>(),
            type_id,
            policy,
            make_pool: make_pool::<T>,
        });
        capped_index(self.components.len() - 1)
    }

    /// Freezes the registrations.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::TooManyComponentTypes`] if more component types
    /// were registered than a [`ComponentMask`](super::ComponentMask) holds,
    /// and [`EcsError::TooManySingletonTypes`] for the same limit on
    /// singletons.
    pub fn build(self) -> EcsResult<Registry> {
        if self.components.len() > MAX_COMPONENT_TYPES {
            return Err(EcsError::TooManyComponentTypes {
                count: self.components.len(),
                max: MAX_COMPONENT_TYPES,
            });
        }
        if self.singletons.len() > MAX_COMPONENT_TYPES {
            return Err(EcsError::TooManySingletonTypes {
                count: self.singletons.len(),
                max: MAX_COMPONENT_TYPES,
            });
        }

        let component_ids = self
            .components
            .iter()
            .enumerate()
            .map(|(i, c)| (c.type_id, TypeIndex::new(i)))
            .collect();
        let singleton_ids = self
            .singletons
            .iter()
            .enumerate()
            .map(|(i, s)| (s.type_id, TypeIndex::new(i)))
            .collect();

        Ok(Registry {
            components: self.components,
            singletons: self.singletons,
            component_ids,
            singleton_ids,
        })
    }
}

/// Frozen type → index mapping.
pub struct Registry {
    components: Vec<ComponentInfo>,
    singletons: Vec<SingletonInfo>,
    component_ids: HashMap<TypeId, TypeIndex>,
    singleton_ids: HashMap<TypeId, TypeIndex>,
}

impl Registry {
    /// Returns the index of component type `T`.
    #[inline]
    #[must_use]
    pub fn index_of<T: 'static>(&self) -> Option<TypeIndex> {
        self.component_ids.get(&TypeId::of::<T>()).copied()
    }

    /// Returns the index of singleton type `T`.
    #[inline]
    #[must_use]
    pub fn singleton_index_of<T: 'static>(&self) -> Option<TypeIndex> {
        self.singleton_ids.get(&TypeId::of::<T>()).copied()
    }

    /// Returns the number of component types.
    #[inline]
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Returns the number of singleton types.
    #[inline]
    #[must_use]
    pub fn singleton_count(&self) -> usize {
        self.singletons.len()
    }

    /// Returns the type name of component `index`.
    #[must_use]
    pub fn name(&self, index: TypeIndex) -> Option<&'static str> {
        self.components.get(index.get()).map(|c| c.name)
    }

    /// Returns the type name of singleton `index`.
    #[must_use]
    pub fn singleton_name(&self, index: TypeIndex) -> Option<&'static str> {
        self.singletons.get(index.get()).map(|s| s.name)
    }

    pub(crate) fn components(&self) -> &[ComponentInfo] {
        &self.components
    }

    pub(crate) fn singletons(&self) -> &[SingletonInfo] {
        &self.singletons
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field(
                "components",
                &self.components.iter().map(|c| c.name).collect::<Vec<_>>(),
            )
            .field(
                "singletons",
                &self.singletons.iter().map(|s| s.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct A;
    #[derive(Clone, Default)]
    struct B;
    #[derive(Clone, Default)]
    struct Clock(u64);

    #[test]
    fn test_indices_dense_in_registration_order() {
        let mut builder = RegistryBuilder::new();
        assert_eq!(builder.register::<A>().get(), 0);
        assert_eq!(builder.register::<B>().get(), 1);
        assert_eq!(builder.register::<A>().get(), 0);

        let registry = builder.build().unwrap();
        assert_eq!(registry.component_count(), 2);
        assert_eq!(registry.index_of::<B>(), Some(TypeIndex::new(1)));
        assert!(registry.name(TypeIndex::new(1)).unwrap().ends_with("B"));
        assert_eq!(registry.index_of::<Clock>(), None);
    }

    #[test]
    fn test_singletons_separate_space() {
        let mut builder = RegistryBuilder::new();
        builder.register::<A>();
        let clock = builder.register_singleton::<Clock>();
        assert_eq!(clock.get(), 0);

        let registry = builder.build().unwrap();
        assert_eq!(registry.singleton_index_of::<Clock>(), Some(clock));
        assert_eq!(registry.singleton_index_of::<A>(), None);
        assert_eq!(registry.singleton_count(), 1);
    }

    #[test]
    fn test_policy_override_kept() {
        let mut builder = RegistryBuilder::new();
        builder.register::<A>();
        builder.register_with_policy::<A>(PoolPolicy::preallocated(16));

        let registry = builder.build().unwrap();
        let info = &registry.components()[0];
        assert_eq!(info.policy.as_ref().map(|p| p.initial_size), Some(16));
    }

    // 11 rows of 12 distinct types: 132 registrations.
    #[derive(Clone, Default)]
    struct Cell<const ROW: usize, const COL: usize>;

    fn register_row<const ROW: usize>(builder: &mut RegistryBuilder, singleton: bool) {
        fn one<T: Component>(builder: &mut RegistryBuilder, singleton: bool) -> TypeIndex {
            if singleton {
                builder.register_singleton::<T>()
            } else {
                builder.register::<T>()
            }
        }
        one::<Cell<ROW, 0>>(builder, singleton);
        one::<Cell<ROW, 1>>(builder, singleton);
        one::<Cell<ROW, 2>>(builder, singleton);
        one::<Cell<ROW, 3>>(builder, singleton);
        one::<Cell<ROW, 4>>(builder, singleton);
        one::<Cell<ROW, 5>>(builder, singleton);
        one::<Cell<ROW, 6>>(builder, singleton);
        one::<Cell<ROW, 7>>(builder, singleton);
        one::<Cell<ROW, 8>>(builder, singleton);
        one::<Cell<ROW, 9>>(builder, singleton);
        one::<Cell<ROW, 10>>(builder, singleton);
        one::<Cell<ROW, 11>>(builder, singleton);
    }

    fn register_grid(builder: &mut RegistryBuilder, singleton: bool) {
        register_row::<0>(builder, singleton);
        register_row::<1>(builder, singleton);
        register_row::<2>(builder, singleton);
        register_row::<3>(builder, singleton);
        register_row::<4>(builder, singleton);
        register_row::<5>(builder, singleton);
        register_row::<6>(builder, singleton);
        register_row::<7>(builder, singleton);
        register_row::<8>(builder, singleton);
        register_row::<9>(builder, singleton);
        register_row::<10>(builder, singleton);
    }

    #[test]
    fn test_too_many_components_reported_by_build() {
        let mut builder = RegistryBuilder::new();
        register_grid(&mut builder, false);

        // Past the limit, indices are capped instead of panicking
        assert_eq!(builder.register::<Cell<10, 11>>().get(), MAX_COMPONENT_TYPES);
        assert_eq!(builder.register::<Cell<0, 0>>().get(), 0);

        assert_eq!(
            builder.build().unwrap_err(),
            EcsError::TooManyComponentTypes {
                count: 132,
                max: MAX_COMPONENT_TYPES
            }
        );
    }

    #[test]
    fn test_too_many_singletons_reported_by_build() {
        let mut builder = RegistryBuilder::new();
        register_grid(&mut builder, true);
        assert_eq!(
            builder.register_singleton::<Cell<10, 0>>().get(),
            MAX_COMPONENT_TYPES
        );

        assert_eq!(
            builder.build().unwrap_err(),
            EcsError::TooManySingletonTypes {
                count: 132,
                max: MAX_COMPONENT_TYPES
            }
        );
    }
}
