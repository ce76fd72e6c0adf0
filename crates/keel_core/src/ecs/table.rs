//! # Entity Table
//!
//! The central container for all entities, components and singletons.
//!
//! ```text
//! dense:   [(E0, r0), (E1, r1), (E2, r2)]        <- scan order for queries
//! lookup:  { E0 -> 0, E1 -> 1, E2 -> 2 }
//! records: GrowablePool<EntityRecord>            <- mask + slot table per entity
//! store:   [GrowablePool<A>, GrowablePool<B>, ..] <- one pool per component type
//! ```
//!
//! After the pools have grown to the working set, creating and destroying
//! entities or attaching and detaching components performs no heap
//! allocation.

use std::collections::HashMap;

use tracing::{debug, trace};

use super::component::{Component, Registry, TypeIndex};
use super::entity::{EntityId, EntityRecord, GenerationalIds, IdAllocator};
use super::mask::ComponentMask;
use super::query::QueryBuffer;
use super::singleton::Singletons;
use super::storage::{typed_pool, typed_pool_mut, ComponentStore, PoolStore};
use crate::config::TableConfig;
use crate::error::{EcsError, EcsResult};
use crate::memory::{GrowablePool, SlotRef};

/// Occupancy of one component pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolStats {
    /// Component type name.
    pub name: &'static str,
    /// Total slots.
    pub size: usize,
    /// Acquired slots.
    pub occupied: usize,
}

/// Snapshot of table occupancy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableStats {
    /// Live entities.
    pub entities: usize,
    /// Entity record slots, live or free.
    pub record_slots: usize,
    /// Live singletons.
    pub singletons: usize,
    /// One entry per component type, in index order.
    pub components: Vec<PoolStats>,
}

/// Entity table: entity lifetimes, component attachment, singletons, queries.
///
/// The table performs no locking. Confine it to one thread or wrap it in a
/// [`SharedTable`](crate::SharedTable).
///
/// # Example
///
/// ```rust
/// use keel_core::{EntityTable, RegistryBuilder};
///
/// #[derive(Clone, Default, Debug, PartialEq)]
/// struct Position(f32, f32);
/// #[derive(Clone, Default)]
/// struct Frozen;
///
/// let mut builder = RegistryBuilder::new();
/// let pos = builder.register::<Position>();
/// let frozen = builder.register::<Frozen>();
/// let mut table = EntityTable::new(builder.build().unwrap());
///
/// let e = table.create_entity().unwrap();
/// table.insert(e, Position(1.0, 2.0)).unwrap();
/// assert_eq!(table.get::<Position>(e).unwrap(), &Position(1.0, 2.0));
///
/// let moving = table.query(&[pos]).unwrap();
/// assert_eq!(moving.entities(), &[e]);
/// assert!(table.query(&[pos, frozen]).unwrap().is_empty());
/// ```
pub struct EntityTable<I: IdAllocator = GenerationalIds, S: ComponentStore = PoolStore> {
    /// Frozen type indices.
    registry: Registry,
    /// Policies, re-applied on reset.
    config: TableConfig,
    /// Identifier source.
    ids: I,
    /// Per-type component pools.
    store: S,
    /// Entity records, one per live entity.
    records: GrowablePool<EntityRecord>,
    /// Live entities and their record slots, in scan order.
    dense: Vec<(EntityId, SlotRef)>,
    /// Entity → position in `dense`.
    lookup: HashMap<EntityId, usize>,
    /// World-wide single instances.
    singletons: Singletons,
}

impl EntityTable {
    /// Creates a table with default pool policies.
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self::with_config(registry, TableConfig::default())
    }

    /// Creates a table with the given pool policies.
    #[must_use]
    pub fn with_config(registry: Registry, config: TableConfig) -> Self {
        let store = PoolStore::from_registry(&registry, &config.components);
        Self::with_parts(registry, config, GenerationalIds::new(), store)
    }
}

impl<I: IdAllocator, S: ComponentStore> EntityTable<I, S> {
    /// Creates a table from an injected identifier allocator and store.
    ///
    /// # Panics
    ///
    /// Panics if `store` serves a different number of types than `registry`
    /// registers.
    #[must_use]
    pub fn with_parts(registry: Registry, config: TableConfig, ids: I, store: S) -> Self {
        assert_eq!(
            store.type_count(),
            registry.component_count(),
            "component store does not match the registry"
        );

        let records = record_pool(&config, registry.component_count());
        let singletons = Singletons::from_registry(&registry);

        Self {
            registry,
            config,
            ids,
            store,
            records,
            dense: Vec::new(),
            lookup: HashMap::new(),
            singletons,
        }
    }

    /// Returns the frozen registry.
    #[inline]
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the index of component type `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnregisteredComponent`] if `T` was not registered.
    #[inline]
    pub fn type_index<T: Component>(&self) -> EcsResult<TypeIndex> {
        self.registry
            .index_of::<T>()
            .ok_or(EcsError::UnregisteredComponent(std::any::type_name::<T>()))
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Creates an entity with no components.
    ///
    /// # Errors
    ///
    /// Propagates a failure of the record pool to grow.
    pub fn create_entity(&mut self) -> EcsResult<EntityId> {
        let record = self.records.acquire()?;
        debug_assert!(
            self.records.get(record).is_some_and(EntityRecord::is_clear),
            "recycled entity record still has components"
        );

        let id = self.ids.acquire();
        self.lookup.insert(id, self.dense.len());
        self.dense.push((id, record));

        trace!(entity = ?id, "entity created");
        Ok(id)
    }

    /// Destroys an entity and releases all of its components.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownEntity`] if `id` is not live.
    pub fn destroy_entity(&mut self, id: EntityId) -> EcsResult<()> {
        let position = self.lookup.remove(&id).ok_or(EcsError::UnknownEntity(id))?;
        let (_, record) = self.dense.swap_remove(position);
        if let Some(&(moved, _)) = self.dense.get(position) {
            self.lookup.insert(moved, position);
        }

        self.release_entity(id, record);
        trace!(entity = ?id, "entity destroyed");
        Ok(())
    }

    /// Returns true if `id` is live.
    #[inline]
    #[must_use]
    pub fn exists(&self, id: EntityId) -> bool {
        self.lookup.contains_key(&id)
    }

    /// Returns the number of live entities.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Returns true if no entity is live.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Iterates over live entities in scan order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.dense.iter().map(|&(id, _)| id)
    }

    /// Returns the component mask of an entity.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownEntity`] if `id` is not live.
    pub fn mask(&self, id: EntityId) -> EcsResult<ComponentMask> {
        Ok(*self.record(id)?.mask())
    }

    // =========================================================================
    // Components by index
    // =========================================================================

    /// Attaches a component of type `ty`, reset to its pool's default value.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownEntity`], [`EcsError::TypeIndexOutOfRange`]
    /// or [`EcsError::ComponentAlreadyPresent`]; propagates pool failures.
    pub fn add_component(&mut self, id: EntityId, ty: TypeIndex) -> EcsResult<SlotRef> {
        self.check_type(ty)?;
        let record_slot = self.record_slot(id)?;
        if self.record_at(id, record_slot)?.has(ty) {
            return Err(EcsError::ComponentAlreadyPresent {
                entity: id,
                type_index: ty,
            });
        }

        let slot = self.store.acquire(ty)?;
        self.record_at_mut(id, record_slot)?.set_component(ty, slot);
        Ok(slot)
    }

    /// Detaches component `ty` and returns its slot to the pool.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownEntity`] or [`EcsError::ComponentMissing`].
    pub fn remove_component(&mut self, id: EntityId, ty: TypeIndex) -> EcsResult<()> {
        let record_slot = self.record_slot(id)?;
        let slot = self
            .record_at(id, record_slot)?
            .slot(ty)
            .ok_or(EcsError::ComponentMissing {
                entity: id,
                type_index: ty,
            })?;

        // The record only changes once the pool took the slot back
        self.store.release(ty, slot)?;
        let cleared = self.record_at_mut(id, record_slot)?.clear_component(ty);
        debug_assert_eq!(cleared, Some(slot));
        Ok(())
    }

    /// Returns the slot of component `ty`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownEntity`] or [`EcsError::ComponentMissing`].
    pub fn get_component(&self, id: EntityId, ty: TypeIndex) -> EcsResult<SlotRef> {
        self.record(id)?
            .slot(ty)
            .ok_or(EcsError::ComponentMissing {
                entity: id,
                type_index: ty,
            })
    }

    /// Returns true if `id` is live and has component `ty`.
    #[inline]
    #[must_use]
    pub fn has_component(&self, id: EntityId, ty: TypeIndex) -> bool {
        self.record(id).is_ok_and(|record| record.has(ty))
    }

    // =========================================================================
    // Components by type
    // =========================================================================

    /// Attaches `value` as the entity's component of type `T`.
    ///
    /// # Errors
    ///
    /// See [`EntityTable::add_component`]; also
    /// [`EcsError::UnregisteredComponent`].
    pub fn insert<T: Component>(&mut self, id: EntityId, value: T) -> EcsResult<&mut T> {
        let ty = self.type_index::<T>()?;
        let slot = self.add_component(id, ty)?;
        let Some(target) = self.resolve_mut::<T>(slot) else {
            panic!(
                "component store handed out {slot:?} that does not resolve to {}",
                std::any::type_name::<T>()
            );
        };
        *target = value;
        Ok(target)
    }

    /// Detaches the entity's component of type `T`, returning its value.
    ///
    /// # Errors
    ///
    /// See [`EntityTable::remove_component`].
    pub fn remove<T: Component>(&mut self, id: EntityId) -> EcsResult<T> {
        let ty = self.type_index::<T>()?;
        let value = std::mem::take(self.get_mut::<T>(id)?);
        self.remove_component(id, ty)?;
        Ok(value)
    }

    /// Gets the entity's component of type `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownEntity`] or [`EcsError::ComponentMissing`].
    pub fn get<T: Component>(&self, id: EntityId) -> EcsResult<&T> {
        let ty = self.type_index::<T>()?;
        let slot = self.get_component(id, ty)?;
        self.resolve::<T>(slot).ok_or(EcsError::ComponentMissing {
            entity: id,
            type_index: ty,
        })
    }

    /// Gets the entity's component of type `T` mutably.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownEntity`] or [`EcsError::ComponentMissing`].
    pub fn get_mut<T: Component>(&mut self, id: EntityId) -> EcsResult<&mut T> {
        let ty = self.type_index::<T>()?;
        let slot = self.get_component(id, ty)?;
        self.resolve_mut::<T>(slot).ok_or(EcsError::ComponentMissing {
            entity: id,
            type_index: ty,
        })
    }

    /// Returns true if `id` is live and has a component of type `T`.
    #[inline]
    #[must_use]
    pub fn has<T: Component>(&self, id: EntityId) -> bool {
        self.type_index::<T>()
            .is_ok_and(|ty| self.has_component(id, ty))
    }

    /// Resolves a slot handle of type `T`, e.g. one returned by a query.
    #[must_use]
    pub fn resolve<T: Component>(&self, slot: SlotRef) -> Option<&T> {
        let ty = self.registry.index_of::<T>()?;
        typed_pool::<T>(self.store.pool(ty)?)?.get(slot)
    }

    /// Resolves a slot handle of type `T` mutably.
    pub fn resolve_mut<T: Component>(&mut self, slot: SlotRef) -> Option<&mut T> {
        let ty = self.registry.index_of::<T>()?;
        typed_pool_mut::<T>(self.store.pool_mut(ty)?)?.get_mut(slot)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Collects every entity that has all of `types`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::TypeIndexOutOfRange`] for unregistered indices.
    pub fn query(&self, types: &[TypeIndex]) -> EcsResult<QueryBuffer> {
        let mut buffer = QueryBuffer::new();
        self.query_into(types, &mut buffer)?;
        Ok(buffer)
    }

    /// Collects matches into a caller-owned buffer, replacing its contents.
    ///
    /// Each match carries one slot handle per requested type, in the
    /// requested order. Scan order is the table's dense order: creation
    /// order until an entity is destroyed, after which the last entity takes
    /// the destroyed one's place.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::TypeIndexOutOfRange`] for unregistered indices.
    pub fn query_into(&self, types: &[TypeIndex], buffer: &mut QueryBuffer) -> EcsResult<()> {
        for &ty in types {
            self.check_type(ty)?;
        }
        let required = ComponentMask::from_indices(types);

        buffer.reset(types.len());
        for &(entity, record_slot) in &self.dense {
            let Some(record) = self.records.get(record_slot) else {
                continue;
            };
            if record.mask().contains(&required) {
                buffer.push(entity, types.iter().filter_map(|&ty| record.slot(ty)));
            }
        }
        Ok(())
    }

    // =========================================================================
    // Singletons
    // =========================================================================

    /// Returns the singleton context.
    #[inline]
    #[must_use]
    pub const fn singletons(&self) -> &Singletons {
        &self.singletons
    }

    /// Returns the singleton context mutably.
    #[inline]
    pub fn singletons_mut(&mut self) -> &mut Singletons {
        &mut self.singletons
    }

    /// Adds the singleton of type `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SingletonAlreadyPresent`] if one exists.
    pub fn add_singleton<T: Component>(&mut self, value: T) -> EcsResult<&mut T> {
        self.singletons.add(value)
    }

    /// Gets the singleton of type `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SingletonMissing`] if it is not live.
    pub fn singleton<T: Component>(&self) -> EcsResult<&T> {
        self.singletons.get()
    }

    /// Gets the singleton of type `T` mutably.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SingletonMissing`] if it is not live.
    pub fn singleton_mut<T: Component>(&mut self) -> EcsResult<&mut T> {
        self.singletons.get_mut()
    }

    /// Removes the singleton of type `T`, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SingletonMissing`] if it is not live.
    pub fn remove_singleton<T: Component>(&mut self) -> EcsResult<T> {
        self.singletons.remove()
    }

    /// Returns true if the singleton of type `T` is live.
    #[inline]
    #[must_use]
    pub fn has_singleton<T: Component>(&self) -> bool {
        self.singletons.contains::<T>()
    }

    // =========================================================================
    // Whole table
    // =========================================================================

    /// Destroys every entity and singleton and returns all pools to their
    /// just-constructed state.
    ///
    /// Entity IDs are released like on [`EntityTable::destroy_entity`], so
    /// IDs from before the reset stay dead. Safe to call on an empty table.
    pub fn reset(&mut self) {
        let destroyed = self.dense.len();
        while let Some((id, record)) = self.dense.pop() {
            self.release_entity(id, record);
        }
        self.lookup.clear();
        self.singletons.clear();

        self.store.clear();
        self.records = record_pool(&self.config, self.registry.component_count());

        debug!(entities = destroyed, "entity table reset");
    }

    /// Returns a snapshot of pool occupancy.
    #[must_use]
    pub fn stats(&self) -> TableStats {
        let components = (0..self.registry.component_count())
            .map(TypeIndex::new)
            .map(|ty| {
                let (size, occupied) = self
                    .store
                    .pool(ty)
                    .map_or((0, 0), |pool| (pool.size(), pool.occupied_count()));
                PoolStats {
                    name: self.registry.name(ty).unwrap_or("<unknown>"),
                    size,
                    occupied,
                }
            })
            .collect();

        TableStats {
            entities: self.dense.len(),
            record_slots: self.records.size(),
            singletons: self.singletons.len(),
            components,
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Releases everything an entity owns. The entity must already be
    /// unlinked from `dense` and `lookup`.
    ///
    /// Panics if a pool rejects a slot the table handed out, since the
    /// table and its pools no longer agree at that point.
    fn release_entity(&mut self, id: EntityId, record_slot: SlotRef) {
        let store = &mut self.store;
        let record = self
            .records
            .get_mut(record_slot)
            .unwrap_or_else(|| panic!("entity {id:?} has no record"));
        record.clear_all(|ty, slot| {
            if let Err(err) = store.release(ty, slot) {
                panic!("component store rejected slot of {id:?}: {err}");
            }
        });
        if let Err(err) = self.records.release(record_slot) {
            panic!("record pool rejected slot of {id:?}: {err}");
        }
        self.ids.release(id);
    }

    fn check_type(&self, ty: TypeIndex) -> EcsResult<()> {
        if ty.get() < self.registry.component_count() {
            Ok(())
        } else {
            Err(EcsError::TypeIndexOutOfRange(ty))
        }
    }

    fn record_slot(&self, id: EntityId) -> EcsResult<SlotRef> {
        let position = *self.lookup.get(&id).ok_or(EcsError::UnknownEntity(id))?;
        Ok(self.dense[position].1)
    }

    fn record(&self, id: EntityId) -> EcsResult<&EntityRecord> {
        let record_slot = self.record_slot(id)?;
        self.record_at(id, record_slot)
    }

    fn record_at(&self, id: EntityId, record_slot: SlotRef) -> EcsResult<&EntityRecord> {
        self.records
            .get(record_slot)
            .ok_or(EcsError::UnknownEntity(id))
    }

    fn record_at_mut(&mut self, id: EntityId, record_slot: SlotRef) -> EcsResult<&mut EntityRecord> {
        self.records
            .get_mut(record_slot)
            .ok_or(EcsError::UnknownEntity(id))
    }
}

/// Builds the record pool, seeded with empty records sized for every type.
fn record_pool(config: &TableConfig, type_count: usize) -> GrowablePool<EntityRecord> {
    GrowablePool::with_template(config.entity_records.clone(), EntityRecord::new(type_count))
}
