use std::{
    any::TypeId,
    sync::atomic::{AtomicU32, Ordering},
};

use dashmap::DashMap;

use crate::ecs::component::{Component, Id};

/// A thread-safe component type registry, assigning each component type a dense [`Id`].
///
/// Ids double as positions in the world's container list and as deletion callback subscriber
/// keys.
#[derive(Debug, Default)]
pub struct Registry {
    /// Map from TypeId to component Id. Lock-free reads via sharded concurrent hashmap.
    type_map: DashMap<TypeId, Id>,

    /// Component names, by id.
    names: DashMap<Id, &'static str>,

    /// Next available component identifier.
    next_id: AtomicU32,
}

impl Registry {
    /// Create a new component registry.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component type and get its unique identifier. Registering a type twice
    /// returns the existing id.
    pub fn register<C: Component>(&self) -> Id {
        let type_id = TypeId::of::<C>();

        // Fast path: check if already registered (lock-free read)
        if let Some(id) = self.type_map.get(&type_id) {
            return *id;
        }

        // Use entry API to avoid race condition where two threads both miss the cache
        *self
            .type_map
            .entry(type_id)
            .or_insert_with(|| {
                let id = Id(self.next_id.fetch_add(1, Ordering::Relaxed));
                self.names.insert(id, C::NAME);
                id
            })
            .value()
    }

    /// Get the component id for a type `C`, if registered.
    #[inline]
    pub fn get<C: Component>(&self) -> Option<Id> {
        self.type_map
            .get(&TypeId::of::<C>())
            .map(|entry| *entry.value())
    }

    /// Get the component id for a component name, if registered.
    pub fn get_by_name(&self, name: &str) -> Option<Id> {
        self.names
            .iter()
            .find(|entry| *entry.value() == name)
            .map(|entry| *entry.key())
    }

    /// Get the name of a registered component.
    #[inline]
    pub fn name(&self, id: Id) -> Option<&'static str> {
        self.names.get(&id).map(|entry| *entry.value())
    }

    /// Number of registered component types.
    #[inline]
    pub fn len(&self) -> usize {
        self.type_map.len()
    }

    /// Check if no component types are registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.type_map.is_empty()
    }
}
