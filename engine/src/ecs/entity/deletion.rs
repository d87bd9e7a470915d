use log::{trace, warn};

use crate::ecs::entity::{Entity, Generation};

/// The subscriptions held for one entity slot. Only meaningful while `generation` matches the
/// generation of the entity the subscriptions were made for.
#[derive(Debug, Clone)]
struct Entry<S> {
    generation: Generation,
    subscribers: Vec<S>,
}

impl<S> Default for Entry<S> {
    fn default() -> Self {
        Self {
            generation: Generation::FIRST,
            subscribers: Vec::new(),
        }
    }
}

/// Per-entity deletion callback subscriptions.
///
/// A subscriber (typically a component container id) registers interest in an entity and is
/// handed back, in registration order, when that entity is destroyed. Registration has set
/// semantics: a subscriber is held at most once per entity, so it can never be notified twice
/// for the same destruction.
///
/// Entries are indexed by entity slot. Subscriptions made for an older generation of a slot are
/// discarded the next time the slot is touched with a newer entity.
#[derive(Debug, Clone)]
pub struct Registry<S> {
    entries: Vec<Entry<S>>,
}

impl<S: Copy + Eq + std::fmt::Debug> Default for Registry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Copy + Eq + std::fmt::Debug> Registry<S> {
    /// Construct a new empty callback registry.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Subscribe `subscriber` to the destruction of `entity`.
    ///
    /// Returns `false` if the subscriber was already registered for this entity, in which case
    /// nothing changes.
    pub fn register(&mut self, entity: Entity, subscriber: S) -> bool {
        let index = entity.index();
        self.ensure_capacity(index);
        let entry = &mut self.entries[index];
        if entry.generation != entity.generation() {
            entry.generation = entity.generation();
            entry.subscribers.clear();
        }

        if entry.subscribers.contains(&subscriber) {
            warn!("Deletion callback {subscriber:?} already registered for {entity}");
            return false;
        }
        entry.subscribers.push(subscriber);
        true
    }

    /// Remove one subscription. Returns `false` if it was not registered.
    pub fn deregister(&mut self, entity: Entity, subscriber: S) -> bool {
        let Some(entry) = self.entry_mut(entity) else {
            return false;
        };
        match entry.subscribers.iter().position(|s| *s == subscriber) {
            Some(position) => {
                // Keep the remaining subscribers in registration order.
                entry.subscribers.remove(position);
                true
            }
            None => false,
        }
    }

    /// Check whether `subscriber` is registered for `entity`.
    pub fn contains(&self, entity: Entity, subscriber: S) -> bool {
        self.subscribers(entity).contains(&subscriber)
    }

    /// Get the subscribers for `entity` in registration order.
    pub fn subscribers(&self, entity: Entity) -> &[S] {
        self.entry(entity)
            .map(|entry| entry.subscribers.as_slice())
            .unwrap_or(&[])
    }

    /// Remove and return every subscriber for `entity`, in registration order. After this the
    /// entity's callback set is empty.
    pub fn take(&mut self, entity: Entity) -> Vec<S> {
        let taken = self
            .entry_mut(entity)
            .map(|entry| std::mem::take(&mut entry.subscribers))
            .unwrap_or_default();
        if !taken.is_empty() {
            trace!("Firing {} deletion callbacks for {entity}", taken.len());
        }
        taken
    }

    /// Drop every subscription for every entity.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Total number of subscriptions held across all entities.
    pub fn len(&self) -> usize {
        self.entries.iter().map(|e| e.subscribers.len()).sum()
    }

    /// Check if no subscriptions are held.
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|e| e.subscribers.is_empty())
    }

    /// Get the entry for the given entity if it exists and the generation matches.
    fn entry(&self, entity: Entity) -> Option<&Entry<S>> {
        self.entries
            .get(entity.index())
            .filter(|entry| entry.generation == entity.generation())
    }

    /// Get the mutable entry for the given entity if it exists and the generation matches.
    fn entry_mut(&mut self, entity: Entity) -> Option<&mut Entry<S>> {
        self.entries
            .get_mut(entity.index())
            .filter(|entry| entry.generation == entity.generation())
    }

    /// Ensure the entries have capacity for the given index.
    #[inline]
    fn ensure_capacity(&mut self, index: usize) {
        if index >= self.entries.len() {
            self.entries.resize_with(index + 1, Entry::default);
        }
    }
}
