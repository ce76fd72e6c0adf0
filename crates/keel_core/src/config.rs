//! # Configuration
//!
//! Pool sizing policies, applied once when a table is built.
//!
//! ## Example
//!
//! ```toml
//! [entity_records]
//! initial_size = 1024
//! growth = { kind = "doubling" }
//!
//! [components]
//! initial_size = 256
//! growth = { kind = "linear", step = 128 }
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Closure form of a growth policy: current total size in, extra slots out.
pub type GrowthFn = Arc<dyn Fn(usize) -> usize + Send + Sync>;

/// How many slots a full growable pool adds.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrowthPolicy {
    /// Double the pool, starting from one slot.
    #[default]
    Doubling,
    /// Add a constant number of slots.
    Linear {
        /// Slots added per growth.
        step: usize,
    },
    /// Add exactly `size` slots. Zero means the pool never grows.
    Fixed {
        /// Slots added per growth.
        size: usize,
    },
    /// Caller supplied function.
    #[serde(skip)]
    Custom(GrowthFn),
}

impl GrowthPolicy {
    /// Wraps a closure as a growth policy.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(usize) -> usize + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Returns how many slots to add to a pool of `current_size`.
    #[inline]
    #[must_use]
    pub fn extra_slots(&self, current_size: usize) -> usize {
        match self {
            Self::Doubling => current_size.max(1),
            Self::Linear { step } => *step,
            Self::Fixed { size } => *size,
            Self::Custom(f) => f(current_size),
        }
    }
}

impl fmt::Debug for GrowthPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Doubling => f.write_str("Doubling"),
            Self::Linear { step } => f.debug_struct("Linear").field("step", step).finish(),
            Self::Fixed { size } => f.debug_struct("Fixed").field("size", size).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Sizing policy for one growable pool.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolPolicy {
    /// Slots allocated up front.
    pub initial_size: usize,
    /// Growth applied when every slot is taken.
    pub growth: GrowthPolicy,
}

impl PoolPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(initial_size: usize, growth: GrowthPolicy) -> Self {
        Self {
            initial_size,
            growth,
        }
    }

    /// Creates a doubling policy with `initial_size` slots pre-allocated.
    #[must_use]
    pub const fn preallocated(initial_size: usize) -> Self {
        Self::new(initial_size, GrowthPolicy::Doubling)
    }
}

/// Policies for every pool an entity table owns.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Pool of entity records.
    pub entity_records: PoolPolicy,
    /// Default for every component type without its own policy.
    pub components: PoolPolicy,
}

impl TableConfig {
    /// Parses a configuration from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the document is malformed.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Reads and parses a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}
