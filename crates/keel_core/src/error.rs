//! # Error Types
//!
//! All errors that can occur in pools and the entity table.
//!
//! Errors here are returned before any structure is touched, so the table
//! stays consistent after a failed call. Corruption that is only detectable
//! after the fact (releasing a slot twice, acquiring an occupied hinted slot)
//! panics instead.

use thiserror::Error;

use crate::ecs::{EntityId, TypeIndex};

/// Errors raised by slot pools and growable pools.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// No free slot and no way to grow.
    #[error("pool exhausted: all {capacity} slots are occupied")]
    PoolExhausted {
        /// Total capacity of the pool.
        capacity: usize,
    },

    /// The growth policy returned zero for a full pool.
    #[error("pool misconfigured: growth policy returned 0 at size {size}")]
    PoolMisconfigured {
        /// Pool size passed to the growth policy.
        size: usize,
    },

    /// A slot handle was released to a pool that does not own it.
    #[error("slot {slot} does not belong to this pool")]
    ReferenceNotOwned {
        /// Global index of the foreign slot.
        slot: usize,
    },
}

/// Errors raised by the entity table and the component registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// Operation on an entity that is not live.
    #[error("unknown entity: {0:?}")]
    UnknownEntity(EntityId),

    /// Access or removal of a component the entity does not have.
    #[error("entity {entity:?} has no component of type {type_index}")]
    ComponentMissing {
        /// The entity.
        entity: EntityId,
        /// The missing component type.
        type_index: TypeIndex,
    },

    /// Adding a component the entity already has.
    #[error("entity {entity:?} already has a component of type {type_index}")]
    ComponentAlreadyPresent {
        /// The entity.
        entity: EntityId,
        /// The duplicate component type.
        type_index: TypeIndex,
    },

    /// A type was used without being registered.
    #[error("component type not registered: {0}")]
    UnregisteredComponent(&'static str),

    /// Type index past the registered range.
    #[error("type index {0} is out of range")]
    TypeIndexOutOfRange(TypeIndex),

    /// Access or removal of an absent singleton.
    #[error("singleton not present: {0}")]
    SingletonMissing(&'static str),

    /// Adding a singleton that already exists.
    #[error("singleton already present: {0}")]
    SingletonAlreadyPresent(&'static str),

    /// More component types registered than a mask can hold.
    #[error("too many component types: {count} registered, maximum is {max}")]
    TooManyComponentTypes {
        /// Number of registered types.
        count: usize,
        /// Mask width.
        max: usize,
    },

    /// More singleton types registered than a registry holds.
    #[error("too many singleton types: {count} registered, maximum is {max}")]
    TooManySingletonTypes {
        /// Number of registered singleton types.
        count: usize,
        /// Singleton limit.
        max: usize,
    },

    /// Underlying pool failure.
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for entity table operations.
pub type EcsResult<T> = Result<T, EcsError>;

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;
