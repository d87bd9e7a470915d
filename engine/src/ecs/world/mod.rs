//! The World owns every entity and component container of one simulation.
//!
//! It replaces process-wide registries with a single explicitly constructed context: create it,
//! register component types, drive it from the simulation thread, and drop it (or call
//! [`World::destroy_all`]) at teardown.
//!
//! # Architecture
//!
//! The World coordinates several subsystems:
//! - **Entity Allocator**: Issues generational entity handles and recycles slots
//! - **Deletion Callbacks**: Which containers to notify when an entity is destroyed
//! - **Component Registry**: Maps component types to ids
//! - **Attribute Registry**: Every attribute code claimed by a registered component
//! - **Containers**: One [`Container`] per component type, held as `Box<dyn Storage>`
//!
//! # Frame Flow
//!
//! ```ignore
//! use rusty_ecs::ecs::world::{Id, World};
//!
//! let mut world = World::new(Id::new(0));
//! world.register_component::<Position>()?;
//!
//! let entity = world.alloc();
//! world.register_entity::<Position>(entity)?;
//!
//! // Soft delete, the row stays in place for the rest of the frame
//! world.deregister_entity::<Position>(entity);
//!
//! // Next frame: compact every container
//! world.on_begin_frame();
//! ```
//!
//! Destroying an entity fires the deletion callbacks of every container it is registered in,
//! in registration order, before the entity's slot is recycled. Each container drops the row
//! immediately.

use std::marker::PhantomData;

use log::{debug, warn};

use crate::ecs::{
    attribute::{self, FourCC, Value},
    component::{self, Component, Config, Container, Snapshot, Storage},
    entity::{self, Entity, deletion},
    error::{Error, Result},
    storage::Instance,
};

/// A world identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u32);

impl Id {
    /// Create a new world identifier.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Id(id)
    }

    /// Get the raw identifier value.
    #[inline]
    pub const fn id(&self) -> u32 {
        self.0
    }
}

/// A registered component container and how it takes part in entity destruction.
struct Entry {
    storage: Box<dyn Storage>,
    notify_on_delete: bool,
}

/// The World is the owner of all entities and component containers.
pub struct World {
    /// The world's unique identifier.
    id: Id,

    /// The world's entity allocator.
    entities: entity::Allocator,

    /// Deletion callback subscriptions, keyed by component id.
    callbacks: deletion::Registry<component::Id>,

    /// Component type to id mapping.
    components: component::Registry,

    /// Attribute definitions of every registered component.
    attributes: attribute::Registry,

    /// Containers, indexed by component id.
    storages: Vec<Entry>,

    /// Marker to make World !Send. World must stay on the simulation thread.
    _not_send: PhantomData<*mut ()>,
}

impl Default for World {
    fn default() -> Self {
        Self::new(Id::new(0))
    }
}

impl World {
    pub fn new(id: Id) -> Self {
        Self {
            id,
            entities: entity::Allocator::new(),
            callbacks: deletion::Registry::new(),
            components: component::Registry::new(),
            attributes: attribute::Registry::new(),
            storages: Vec::new(),
            _not_send: PhantomData,
        }
    }

    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    #[inline]
    pub fn entities(&self) -> &entity::Allocator {
        &self.entities
    }

    #[inline]
    pub fn attributes(&self) -> &attribute::Registry {
        &self.attributes
    }

    #[inline]
    pub fn deletion_callbacks(&self) -> &deletion::Registry<component::Id> {
        &self.callbacks
    }

    /// Allocate a new entity.
    #[inline]
    pub fn alloc(&mut self) -> Entity {
        self.entities.alloc()
    }

    /// Allocate `count` new entities.
    #[inline]
    pub fn alloc_many(&mut self, count: usize) -> Vec<Entity> {
        self.entities.alloc_many(count)
    }

    /// Check whether `entity` is alive in this world.
    #[inline]
    pub fn is_valid(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Destroy an entity.
    ///
    /// Every container subscribed to `entity` is notified in registration order and drops the
    /// entity's row immediately. Only then is the slot recycled. Returns `false` if `entity` was
    /// not alive.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.entities.is_alive(entity) {
            warn!("Attempted to destroy an entity that is not alive: {entity}");
            return false;
        }

        for subscriber in self.callbacks.take(entity) {
            if let Some(entry) = self.storages.get_mut(subscriber.index()) {
                entry.storage.on_entity_deleted(entity);
            }
        }
        self.entities.free(entity)
    }

    /// Register a component type with the default configuration. See
    /// [`World::register_component_with`].
    pub fn register_component<C: Component>(&mut self) -> Result<component::Id> {
        self.register_component_with::<C>(Config::default())
    }

    /// Register a component type, creating its container.
    ///
    /// Registering a type again returns the existing id and ignores `config`. Fails with
    /// [`Error::AttributeConflict`] if one of the component's attribute codes is already claimed
    /// by a different attribute.
    pub fn register_component_with<C: Component>(
        &mut self,
        config: Config,
    ) -> Result<component::Id> {
        self.register_storage::<C, _>(config.notify_on_delete, |id| {
            Container::<C>::with_config(id, config)
        })
    }

    /// Register a component type backed by the storage `make` builds for its id.
    ///
    /// Use this to install a storage that wraps a [`Container`], for instance one that reacts to
    /// [`Storage::on_entity_deleted`] itself. Typed access through [`World::component`] only
    /// works if the storage's [`Storage::as_any`] exposes a `Container<C>`. Registering a type
    /// again returns the existing id without calling `make`.
    pub fn register_storage<C: Component, S: Storage>(
        &mut self,
        notify_on_delete: bool,
        make: impl FnOnce(component::Id) -> S,
    ) -> Result<component::Id> {
        if let Some(id) = self.components.get::<C>() {
            return Ok(id);
        }

        self.attributes.register_all(C::ATTRIBUTES)?;
        let id = self.components.register::<C>();
        debug_assert_eq!(id.index(), self.storages.len(), "component ids must be dense");
        self.storages.push(Entry {
            storage: Box::new(make(id)),
            notify_on_delete,
        });
        debug!("Registered component {} as {:?}", C::NAME, id);
        Ok(id)
    }

    /// Get the id of a registered component type.
    #[inline]
    pub fn component_id<C: Component>(&self) -> Option<component::Id> {
        self.components.get::<C>()
    }

    /// Get the container of a registered component type.
    pub fn component<C: Component>(&self) -> Option<&Container<C>> {
        let id = self.components.get::<C>()?;
        self.storages[id.index()]
            .storage
            .as_any()
            .downcast_ref::<Container<C>>()
    }

    /// Get the mutable container of a registered component type.
    pub fn component_mut<C: Component>(&mut self) -> Option<&mut Container<C>> {
        let id = self.components.get::<C>()?;
        self.storages[id.index()]
            .storage
            .as_any_mut()
            .downcast_mut::<Container<C>>()
    }

    /// Get the type-erased container for a component name.
    pub fn storage(&self, name: &str) -> Option<&dyn Storage> {
        let id = self.components.get_by_name(name)?;
        self.storages.get(id.index()).map(|entry| entry.storage.as_ref())
    }

    /// Register `entity` in the container of `C`, registering the component type with the
    /// default configuration on first use.
    ///
    /// If the component takes part in deletion notification, the container subscribes to the
    /// destruction of `entity`.
    ///
    /// # Panics
    ///
    /// - If `entity` is already registered in the container.
    /// - In debug builds, if `entity` is not alive. Release builds return
    ///   [`Error::InvalidEntity`] instead.
    pub fn register_entity<C: Component>(&mut self, entity: Entity) -> Result<Instance> {
        self.check_entity(entity)?;
        let id = self.register_component::<C>()?;
        let entry = &mut self.storages[id.index()];
        let instance = entry.storage.register_entity(entity);
        if entry.notify_on_delete {
            self.callbacks.register(entity, id);
        }
        Ok(instance)
    }

    /// Soft-delete the row of `entity` in the container of `C` and drop its deletion callback.
    ///
    /// Returns `false` if `entity` had no active row.
    ///
    /// # Panics
    ///
    /// In debug builds, if `entity` is not alive. Release builds return `false`.
    pub fn deregister_entity<C: Component>(&mut self, entity: Entity) -> bool {
        if self.check_entity(entity).is_err() {
            return false;
        }
        let Some(id) = self.components.get::<C>() else {
            warn!("Attempted to deregister {entity} from unregistered component {}", C::NAME);
            return false;
        };
        self.callbacks.deregister(entity, id);
        self.storages[id.index()].storage.deregister_entity(entity)
    }

    /// Remove the row of `entity` from the container of `C` right away and drop its deletion
    /// callback.
    ///
    /// `entity` does not have to be alive, this is the path for rows whose owner is already gone.
    /// Returns `false` if `entity` had no row.
    pub fn deregister_entity_immediate<C: Component>(&mut self, entity: Entity) -> bool {
        let Some(id) = self.components.get::<C>() else {
            warn!("Attempted to remove {entity} from unregistered component {}", C::NAME);
            return false;
        };
        self.callbacks.deregister(entity, id);
        self.storages[id.index()]
            .storage
            .deregister_entity_immediate(entity)
    }

    /// Get the instance of `entity` in the container of `C`.
    ///
    /// Stale and unregistered entities resolve to `None`.
    pub fn instance<C: Component>(&self, entity: Entity) -> Option<Instance> {
        self.component::<C>()?.instance(entity)
    }

    /// Get the component value owned by `entity`.
    pub fn get<C: Component>(&self, entity: Entity) -> Option<&C> {
        self.component::<C>()?.get_by_entity(entity)
    }

    /// Get the mutable component value owned by `entity`.
    pub fn get_mut<C: Component>(&mut self, entity: Entity) -> Option<&mut C> {
        self.component_mut::<C>()?.get_by_entity_mut(entity)
    }

    /// Subscribe the container `subscriber` to the destruction of `entity`.
    ///
    /// Returns `false` if the subscription already existed or `entity` is not alive.
    pub fn register_deletion_callback(
        &mut self,
        entity: Entity,
        subscriber: component::Id,
    ) -> bool {
        if self.check_entity(entity).is_err() {
            return false;
        }
        self.callbacks.register(entity, subscriber)
    }

    /// Remove a deletion callback subscription. Returns `false` if it did not exist.
    pub fn deregister_deletion_callback(
        &mut self,
        entity: Entity,
        subscriber: component::Id,
    ) -> bool {
        self.callbacks.deregister(entity, subscriber)
    }

    /// Frame boundary hook: optimize every container once. Returns the total number of rows
    /// removed.
    pub fn on_begin_frame(&mut self) -> usize {
        let removed: usize = self
            .storages
            .iter_mut()
            .map(|entry| entry.storage.optimize())
            .sum();
        if removed > 0 {
            debug!(
                "Begin frame: removed {} rows across {} components",
                removed,
                self.storages.len()
            );
        }
        removed
    }

    /// Soft-delete every row whose owner is no longer alive, in every container. The rows are
    /// reclaimed by the next [`World::on_begin_frame`].
    pub fn collect_garbage(&mut self) -> usize {
        let entities = &self.entities;
        let is_alive = |entity: Entity| entities.is_alive(entity);
        self.storages
            .iter_mut()
            .map(|entry| entry.storage.deregister_dead(&is_alive))
            .sum()
    }

    /// Clear the container of `C`, dropping the deletion callbacks of its rows. Returns the
    /// number of rows removed.
    pub fn destroy_all_of<C: Component>(&mut self) -> usize {
        match self.components.get::<C>() {
            Some(id) => self.destroy_storage(id),
            None => 0,
        }
    }

    /// Clear every container and drop every deletion callback. Entities stay alive.
    pub fn destroy_all(&mut self) {
        let removed: usize = self
            .storages
            .iter_mut()
            .map(|entry| entry.storage.destroy_all().len())
            .sum();
        self.callbacks.clear();
        debug!("Destroyed {removed} rows across {} components", self.storages.len());
    }

    /// Copy the active rows of `C`, or `None` if the component is not registered.
    pub fn save_component<C: Component>(&self) -> Option<Snapshot<C>> {
        Some(self.component::<C>()?.save())
    }

    /// Load `snapshot` into the container of `C` at row `offset`, registering the component on
    /// first use. See [`Container::load`].
    ///
    /// Live owners of loaded rows subscribe to deletion notification when the component takes
    /// part in it. Owners whose rows were overwritten lose their subscription. Returns the number
    /// of rows loaded.
    pub fn load_component<C: Component>(
        &mut self,
        offset: usize,
        snapshot: Snapshot<C>,
    ) -> Result<usize> {
        let id = self.register_component::<C>()?;
        let count = snapshot.len();
        let owners = snapshot.owners().to_vec();
        let container = self
            .component_mut::<C>()
            .ok_or_else(|| Error::UnknownComponent(C::NAME.to_string()))?;
        let displaced = container.load(offset, snapshot)?;

        for owner in displaced {
            self.callbacks.deregister(owner, id);
        }
        if self.storages[id.index()].notify_on_delete {
            for owner in &owners {
                if self.entities.is_alive(*owner) && !self.callbacks.contains(*owner, id) {
                    self.callbacks.register(*owner, id);
                }
            }
        }
        Ok(count)
    }

    /// Read an attribute of `entity` through the container named `component`.
    pub fn attribute_value(&self, component: &str, entity: Entity, fourcc: FourCC) -> Result<Value> {
        let storage = self.named_storage(component)?;
        let instance = storage
            .instance(entity)
            .ok_or(Error::NotRegistered(entity))?;
        storage.attribute(instance, fourcc)
    }

    /// Write an attribute of `entity` through the container named `component`.
    pub fn set_attribute_value(
        &mut self,
        component: &str,
        entity: Entity,
        fourcc: FourCC,
        value: Value,
    ) -> Result<()> {
        let id = self
            .components
            .get_by_name(component)
            .ok_or_else(|| Error::UnknownComponent(component.to_string()))?;
        let storage = &mut self.storages[id.index()].storage;
        let instance = storage
            .instance(entity)
            .ok_or(Error::NotRegistered(entity))?;
        storage.set_attribute(instance, fourcc, value)
    }

    /// Clear one container and drop the deletion callbacks of its owners.
    fn destroy_storage(&mut self, id: component::Id) -> usize {
        let owners = self.storages[id.index()].storage.destroy_all();
        for owner in &owners {
            self.callbacks.deregister(*owner, id);
        }
        owners.len()
    }

    fn named_storage(&self, component: &str) -> Result<&dyn Storage> {
        self.storage(component)
            .ok_or_else(|| Error::UnknownComponent(component.to_string()))
    }

    /// Assert `entity` is alive in debug builds; log and reject it in release builds.
    fn check_entity(&self, entity: Entity) -> Result<()> {
        let alive = self.entities.is_alive(entity);
        debug_assert!(alive, "attempted to use an invalid entity: {entity}");
        if alive {
            Ok(())
        } else {
            warn!("Attempted to use an invalid entity: {entity}");
            Err(Error::InvalidEntity(entity))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use rusty_ecs_macros::Component;
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::ecs::storage::IndexKind;

    #[derive(Component, Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Component, Debug, Default, Clone, PartialEq)]
    struct Velocity {
        #[attribute(fourcc = "VELX")]
        dx: f32,
        #[attribute(fourcc = "VELY")]
        dy: f32,
    }

    #[derive(Component, Debug, Default, Clone)]
    struct Tag {
        #[attribute(skip)]
        label: String,
    }

    #[derive(Component, Debug, Default, Clone)]
    struct Clash {
        #[attribute(fourcc = "VELX")]
        speed: f32,
    }

    #[derive(Component, Debug, Default, Clone)]
    struct Thruster {
        #[attribute(fourcc = "THRU")]
        thrust: f32,
        #[attribute(fourcc = "VELX")]
        speed: i32,
    }

    #[derive(Component, Debug, Default, Clone)]
    struct Engine {
        #[attribute(fourcc = "THRU")]
        on: bool,
    }

    /// Wraps a container and counts deletion notifications.
    struct CountingStorage {
        inner: Container<Position>,
        deleted: Rc<RefCell<Vec<Entity>>>,
    }

    impl Storage for CountingStorage {
        fn id(&self) -> component::Id {
            Storage::id(&self.inner)
        }

        fn name(&self) -> &'static str {
            Storage::name(&self.inner)
        }

        fn len(&self) -> usize {
            Storage::len(&self.inner)
        }

        fn register_entity(&mut self, entity: Entity) -> Instance {
            Storage::register_entity(&mut self.inner, entity)
        }

        fn deregister_entity(&mut self, entity: Entity) -> bool {
            Storage::deregister_entity(&mut self.inner, entity)
        }

        fn deregister_entity_immediate(&mut self, entity: Entity) -> bool {
            Storage::deregister_entity_immediate(&mut self.inner, entity)
        }

        fn instance(&self, entity: Entity) -> Option<Instance> {
            Storage::instance(&self.inner, entity)
        }

        fn optimize(&mut self) -> usize {
            Storage::optimize(&mut self.inner)
        }

        fn deregister_dead(&mut self, is_alive: &dyn Fn(Entity) -> bool) -> usize {
            Storage::deregister_dead(&mut self.inner, is_alive)
        }

        fn destroy_all(&mut self) -> Vec<Entity> {
            Storage::destroy_all(&mut self.inner)
        }

        fn on_entity_deleted(&mut self, entity: Entity) {
            self.deleted.borrow_mut().push(entity);
            Storage::on_entity_deleted(&mut self.inner, entity);
        }

        fn attribute(&self, instance: Instance, fourcc: FourCC) -> Result<Value> {
            Storage::attribute(&self.inner, instance, fourcc)
        }

        fn set_attribute(
            &mut self,
            instance: Instance,
            fourcc: FourCC,
            value: Value,
        ) -> Result<()> {
            Storage::set_attribute(&mut self.inner, instance, fourcc, value)
        }

        fn as_any(&self) -> &dyn std::any::Any {
            &self.inner
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            &mut self.inner
        }
    }

    #[test]
    fn generational_safety() {
        // Given
        let mut world = World::default();
        let e = world.alloc();

        // When
        assert!(world.destroy(e));
        let reused = world.alloc();

        // Then
        assert!(!world.is_valid(e));
        assert_eq!(reused.id(), e.id());
        assert_ne!(reused.generation(), e.generation());
        assert!(world.is_valid(reused));
        assert!(!world.destroy(e));
    }

    #[test]
    fn registration_round_trip() {
        // Given
        let mut world = World::default();
        let e = world.alloc();

        // When
        let instance = world.register_entity::<Velocity>(e).unwrap();

        // Then
        assert_eq!(world.instance::<Velocity>(e), Some(instance));
        assert_eq!(world.get::<Velocity>(e), Some(&Velocity::default()));
        assert_eq!(
            world.attribute_value("Velocity", e, FourCC::new(*b"VELX")),
            Ok(Value::Float(0.0))
        );
    }

    #[test]
    fn concrete_optimize_scenario() {
        // Given - E1..E5 registered at instances 0..4
        let mut world = World::default();
        let e = world.alloc_many(5);
        for (i, entity) in e.iter().enumerate() {
            assert_eq!(
                world.register_entity::<Position>(*entity),
                Ok(Instance::new(i))
            );
        }

        // When
        assert!(world.deregister_entity::<Position>(e[1]));
        assert!(world.deregister_entity::<Position>(e[3]));
        let removed = world.on_begin_frame();

        // Then
        assert_eq!(removed, 2);
        assert_eq!(world.component::<Position>().unwrap().len(), 3);
        assert_eq!(world.instance::<Position>(e[0]), Some(Instance::new(0)));
        for survivor in [e[2], e[4]] {
            let instance = world.instance::<Position>(survivor).unwrap();
            assert!([1, 2].contains(&instance.index()));
        }
        assert_eq!(world.instance::<Position>(e[1]), None);
        assert_eq!(world.instance::<Position>(e[3]), None);
        assert_eq!(world.on_begin_frame(), 0);
    }

    #[test]
    fn optimize_preserves_live_data() {
        // Given
        let mut world = World::default();
        let e = world.alloc_many(10);
        for (i, entity) in e.iter().enumerate() {
            world.register_entity::<Position>(*entity).unwrap();
            world.get_mut::<Position>(*entity).unwrap().x = i as f32;
        }

        // When
        for i in [0, 3, 4, 9] {
            world.deregister_entity::<Position>(e[i]);
        }
        world.on_begin_frame();

        // Then
        for (i, entity) in e.iter().enumerate() {
            match world.get::<Position>(*entity) {
                Some(position) => assert_eq!(position.x, i as f32),
                None => assert!([0, 3, 4, 9].contains(&i)),
            }
        }
        assert_eq!(world.component::<Position>().unwrap().len(), 6);
    }

    #[test]
    fn destroy_fires_callbacks_once_and_removes_rows() {
        // Given
        let mut world = World::default();
        let e = world.alloc_many(3);
        for entity in &e {
            world.register_entity::<Position>(*entity).unwrap();
            world.register_entity::<Velocity>(*entity).unwrap();
        }
        let position_id = world.component_id::<Position>().unwrap();
        let velocity_id = world.component_id::<Velocity>().unwrap();
        assert_eq!(
            world.deletion_callbacks().subscribers(e[0]),
            &[position_id, velocity_id]
        );

        // When - A duplicate subscription is rejected
        assert!(!world.register_deletion_callback(e[0], position_id));
        assert!(world.destroy(e[0]));

        // Then
        assert_eq!(world.instance::<Position>(e[0]), None);
        assert_eq!(world.instance::<Velocity>(e[0]), None);
        assert_eq!(world.component::<Position>().unwrap().len(), 2);
        assert_eq!(world.component::<Velocity>().unwrap().len(), 2);
        assert!(world.deletion_callbacks().subscribers(e[0]).is_empty());
        assert_eq!(world.instance::<Position>(e[2]), Some(Instance::new(0)));
    }

    #[test]
    fn destroy_notifies_each_subscriber_exactly_once() {
        // Given
        let deleted = Rc::new(RefCell::new(Vec::new()));
        let mut world = World::default();
        let log = Rc::clone(&deleted);
        world
            .register_storage::<Position, _>(true, move |id| CountingStorage {
                inner: Container::new(id),
                deleted: log,
            })
            .unwrap();
        let e = world.alloc_many(2);
        world.register_entity::<Position>(e[0]).unwrap();
        world.register_entity::<Position>(e[1]).unwrap();

        // When - A duplicate subscription is attempted before destruction
        let position_id = world.component_id::<Position>().unwrap();
        assert!(!world.register_deletion_callback(e[0], position_id));
        assert!(world.destroy(e[0]));
        assert!(!world.destroy(e[0]));

        // Then
        assert_eq!(*deleted.borrow(), vec![e[0]]);
        assert_eq!(world.component::<Position>().unwrap().len(), 1);
        assert_eq!(world.instance::<Position>(e[1]), Some(Instance::new(0)));
    }

    #[test]
    fn recycled_slot_row_is_reclaimed_for_every_index_kind() {
        for kind in [IndexKind::default(), IndexKind::Hash] {
            // Given - A component that does not listen for deletion
            let mut world = World::default();
            world
                .register_component_with::<Position>(
                    Config::default().with_notify_on_delete(false).with_index(kind),
                )
                .unwrap();
            let old = world.alloc();
            world.register_entity::<Position>(old).unwrap();
            world.destroy(old);
            let new = world.alloc();
            assert_eq!(new.id(), old.id());

            // When
            world.register_entity::<Position>(new).unwrap();

            // Then - Both index kinds retire the leftover row
            let positions = world.component::<Position>().unwrap();
            assert_eq!(positions.active_len(), 1, "{kind:?}");
            assert_eq!(world.instance::<Position>(old), None, "{kind:?}");
            assert!(!world.deregister_entity_immediate::<Position>(old), "{kind:?}");
            assert_eq!(world.on_begin_frame(), 1, "{kind:?}");
            assert_eq!(world.instance::<Position>(new), Some(Instance::new(0)), "{kind:?}");
        }
    }

    #[test]
    fn deregister_drops_callback() {
        // Given
        let mut world = World::default();
        let e = world.alloc();
        world.register_entity::<Position>(e).unwrap();

        // When
        world.deregister_entity::<Position>(e);

        // Then - Destroy leaves the soft-deleted row to the next optimize
        assert!(world.deletion_callbacks().is_empty());
        world.destroy(e);
        assert_eq!(world.component::<Position>().unwrap().len(), 1);
        assert_eq!(world.on_begin_frame(), 1);
    }

    #[test]
    fn deregister_immediate_accepts_destroyed_entity() {
        // Given - A component that does not listen for deletion
        let mut world = World::default();
        world
            .register_component_with::<Position>(Config::default().with_notify_on_delete(false))
            .unwrap();
        let e = world.alloc_many(2);
        world.register_entity::<Position>(e[0]).unwrap();
        world.register_entity::<Position>(e[1]).unwrap();
        world.destroy(e[0]);
        assert_eq!(world.component::<Position>().unwrap().len(), 2);

        // When
        let removed = world.deregister_entity_immediate::<Position>(e[0]);

        // Then
        assert!(removed);
        assert_eq!(world.instance::<Position>(e[1]), Some(Instance::new(0)));
    }

    #[test]
    fn collect_garbage_reclaims_dead_owners() {
        // Given
        let mut world = World::default();
        world
            .register_component_with::<Position>(
                Config::default()
                    .with_notify_on_delete(false)
                    .with_index(IndexKind::Hash),
            )
            .unwrap();
        let e = world.alloc_many(3);
        for entity in &e {
            world.register_entity::<Position>(*entity).unwrap();
        }
        world.destroy(e[1]);

        // When
        let collected = world.collect_garbage();

        // Then
        assert_eq!(collected, 1);
        assert_eq!(world.on_begin_frame(), 1);
        assert_eq!(world.component::<Position>().unwrap().len(), 2);
    }

    #[test]
    fn destroy_all_clears_containers_and_callbacks() {
        // Given
        let mut world = World::default();
        let e = world.alloc_many(4);
        for entity in &e {
            world.register_entity::<Position>(*entity).unwrap();
            world.register_entity::<Tag>(*entity).unwrap();
        }

        // When
        assert_eq!(world.destroy_all_of::<Tag>(), 4);
        world.destroy_all();

        // Then
        assert!(world.component::<Position>().unwrap().is_empty());
        assert!(world.component::<Tag>().unwrap().is_empty());
        assert!(world.deletion_callbacks().is_empty());
        assert!(e.iter().all(|entity| world.is_valid(*entity)));
    }

    #[test]
    fn register_component_conflicting_attribute() {
        // Given
        let mut world = World::default();
        world.register_component::<Velocity>().unwrap();

        // When
        let result = world.register_component::<Clash>();

        // Then
        assert!(matches!(result, Err(Error::AttributeConflict { .. })));
        assert!(world.component::<Clash>().is_none());
        assert_eq!(
            world.register_component::<Velocity>(),
            Ok(world.component_id::<Velocity>().unwrap())
        );
    }

    #[test]
    fn rejected_component_leaves_no_attributes_behind() {
        // Given
        let mut world = World::default();
        world.register_component::<Velocity>().unwrap();

        // When - THRU is new but VELX clashes with Velocity
        let result = world.register_component::<Thruster>();

        // Then
        assert!(matches!(result, Err(Error::AttributeConflict { .. })));
        assert!(world.attributes().get(FourCC::new(*b"THRU")).is_none());
        assert!(world.register_component::<Engine>().is_ok());
        assert_eq!(
            world.attributes().get(FourCC::new(*b"THRU")).map(|d| d.name()),
            Some("On")
        );
    }

    #[test]
    fn saved_component_reloads_with_callbacks() {
        // Given
        let mut source = World::default();
        let e = source.alloc_many(3);
        for (i, entity) in e.iter().enumerate() {
            source.register_entity::<Position>(*entity).unwrap();
            source.get_mut::<Position>(*entity).unwrap().x = i as f32;
        }
        source.deregister_entity::<Position>(e[1]);
        let json = serde_json::to_string(&source.save_component::<Position>().unwrap()).unwrap();

        // When - Loaded into a world where the same entities are alive
        let mut target = World::default();
        let alive = target.alloc_many(3);
        assert_eq!(alive, e);
        let snapshot = serde_json::from_str(&json).unwrap();
        let loaded = target.load_component::<Position>(0, snapshot).unwrap();

        // Then
        assert_eq!(loaded, 2);
        assert_eq!(target.get::<Position>(e[2]).map(|p| p.x), Some(2.0));
        assert_eq!(target.instance::<Position>(e[1]), None);
        let id = target.component_id::<Position>().unwrap();
        assert_eq!(target.deletion_callbacks().subscribers(e[0]), &[id]);

        // When - Destroying a loaded owner removes its row
        target.destroy(e[0]);

        // Then
        assert_eq!(target.instance::<Position>(e[2]), Some(Instance::new(0)));
        assert!(target.save_component::<Velocity>().is_none());
    }

    #[test]
    fn dynamic_attribute_access() {
        // Given
        let mut world = World::default();
        let e = world.alloc();
        world.register_entity::<Velocity>(e).unwrap();

        // When
        world
            .set_attribute_value("Velocity", e, FourCC::new(*b"VELY"), Value::Float(-1.0))
            .unwrap();

        // Then
        assert_eq!(world.get::<Velocity>(e).unwrap().dy, -1.0);
        assert_eq!(
            world.attribute_value("Missing", e, FourCC::new(*b"VELY")),
            Err(Error::UnknownComponent("Missing".to_string()))
        );
        let other = world.alloc();
        assert_eq!(
            world.attribute_value("Velocity", other, FourCC::new(*b"VELY")),
            Err(Error::NotRegistered(other))
        );
        assert!(Tag::ATTRIBUTES.is_empty());
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn double_registration_panics() {
        // Given
        let mut world = World::default();
        let e = world.alloc();
        world.register_entity::<Position>(e).unwrap();

        // When
        let _ = world.register_entity::<Position>(e);
    }

    #[test]
    #[should_panic(expected = "invalid entity")]
    #[cfg(debug_assertions)]
    fn register_invalid_entity_panics_in_debug() {
        // Given
        let mut world = World::default();
        let e = world.alloc();
        world.destroy(e);

        // When
        let _ = world.register_entity::<Position>(e);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn register_invalid_entity_is_rejected_in_release() {
        // Given
        let mut world = World::default();
        let e = world.alloc();
        world.destroy(e);

        // When
        let result = world.register_entity::<Position>(e);

        // Then
        assert_eq!(result, Err(Error::InvalidEntity(e)));
        assert!(!world.deregister_entity::<Position>(e));
    }
}
