//! Component storage.
//!
//! Every component type owns one [`Container`]: a dense array of rows, one per registered
//! entity, plus an entity to instance index. Rows are soft-deleted by
//! [`Container::deregister_entity`] and physically reclaimed by [`Container::optimize`], which
//! the world runs for every container at the start of each frame.
//!
//! ## Architecture
//!
//! - [`Component`]: The trait all component row types implement, usually through
//!   `#[derive(Component)]`
//! - [`Container`]: Typed per-component storage with the registration API
//! - [`Storage`]: The object-safe capability set the world drives containers through
//! - [`Registry`]: Maps Rust types to component [`Id`]s
//! - [`Config`]: Per-container tuning
//!
//! ## Usage
//!
//! ```ignore
//! use rusty_ecs::ecs::component::{Component, Container};
//!
//! #[derive(Component, Clone, Default)]
//! struct Position { x: f32, y: f32 }
//!
//! let mut positions = Container::<Position>::new(Id::new(0));
//! let instance = positions.register_entity(entity);
//! positions.get_mut(instance)?.x = 10.0;
//! ```

mod container;
mod registry;
mod snapshot;
mod storage;

pub use container::{Container, MoveHook};
pub use registry::Registry;
pub use snapshot::Snapshot;
pub use storage::Storage;

use crate::ecs::{
    attribute::{Definition, Value},
    error::{Error, Result},
    storage::IndexKind,
};

/// A component identifier, unique per component type within one world.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u32);

impl Id {
    /// Construct a new component Id from a raw u32 value.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the index of this component if it were to live in indexable storage (e.g. Vec)
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for Id {
    #[inline]
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<usize> for Id {
    #[inline]
    fn from(value: usize) -> Self {
        Self::new(value as u32)
    }
}

/// A component row type.
///
/// `Default` supplies the attribute values a freshly registered row starts with. The attribute
/// table and the by-position accessors are normally generated by `#[derive(Component)]`; a
/// hand-written component with no dynamic attributes only needs `NAME`.
pub trait Component: 'static + Sized + Send + Sync + Default + Clone {
    /// Human readable component name, used in logs and dynamic lookups.
    const NAME: &'static str;

    /// The attribute table, in field order.
    const ATTRIBUTES: &'static [Definition] = &[];

    /// Read the attribute at `index` of [`Component::ATTRIBUTES`].
    fn attribute(&self, index: usize) -> Option<Value> {
        let _ = index;
        None
    }

    /// Write the attribute at `index` of [`Component::ATTRIBUTES`].
    fn set_attribute(&mut self, index: usize, value: Value) -> Result<()> {
        let _ = value;
        Err(Error::AttributeIndex(index))
    }
}

/// Configuration for a component container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Rows to reserve up front.
    pub capacity: usize,

    /// The entity to instance index implementation.
    pub index: IndexKind,

    /// Whether registered entities subscribe this container to their destruction.
    pub notify_on_delete: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 0,
            index: IndexKind::default(),
            notify_on_delete: true,
        }
    }
}

impl Config {
    /// Set the number of rows to reserve up front.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the index implementation.
    pub fn with_index(mut self, index: IndexKind) -> Self {
        self.index = index;
        self
    }

    /// Set whether the container subscribes to entity destruction.
    pub fn with_notify_on_delete(mut self, notify: bool) -> Self {
        self.notify_on_delete = notify;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::storage::IndexKind;

    #[derive(Debug, Default, Clone)]
    struct Marker;

    impl Component for Marker {
        const NAME: &'static str = "Marker";
    }

    #[test]
    fn component_defaults_without_attributes() {
        // Given
        let mut marker = Marker;

        // Then
        assert!(Marker::ATTRIBUTES.is_empty());
        assert_eq!(marker.attribute(0), None);
        assert_eq!(
            marker.set_attribute(2, Value::Bool(true)),
            Err(Error::AttributeIndex(2))
        );
    }

    #[test]
    fn config_builder() {
        // When
        let config = Config::default()
            .with_capacity(64)
            .with_index(IndexKind::Hash)
            .with_notify_on_delete(false);

        // Then
        assert_eq!(config.capacity, 64);
        assert_eq!(config.index, IndexKind::Hash);
        assert!(!config.notify_on_delete);
        assert!(Config::default().notify_on_delete);
    }
}
