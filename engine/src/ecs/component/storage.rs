use std::any::Any;

use crate::ecs::{
    attribute::{FourCC, Value},
    component::{Component, Container, Id},
    entity::Entity,
    error::Result,
    storage::Instance,
};

/// The type-erased capability set of a component container.
///
/// The world holds every container as a `Box<dyn Storage>` and drives frame-level work
/// (optimize, teardown, deletion notification, dynamic attribute access) through this trait.
/// Per-row typed access goes through the concrete [`Container`] instead, reached with
/// [`Storage::as_any`].
pub trait Storage: Any {
    /// The component id this storage holds.
    fn id(&self) -> Id;

    /// The component name.
    fn name(&self) -> &'static str;

    /// Number of rows, soft-deleted rows included.
    fn len(&self) -> usize;

    /// Check if the storage holds no rows.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// See [`Container::register_entity`].
    fn register_entity(&mut self, entity: Entity) -> Instance;

    /// See [`Container::deregister_entity`].
    fn deregister_entity(&mut self, entity: Entity) -> bool;

    /// See [`Container::deregister_entity_immediate`].
    fn deregister_entity_immediate(&mut self, entity: Entity) -> bool;

    /// See [`Container::instance`].
    fn instance(&self, entity: Entity) -> Option<Instance>;

    /// See [`Container::optimize`].
    fn optimize(&mut self) -> usize;

    /// See [`Container::deregister_dead`].
    fn deregister_dead(&mut self, is_alive: &dyn Fn(Entity) -> bool) -> usize;

    /// See [`Container::destroy_all`].
    fn destroy_all(&mut self) -> Vec<Entity>;

    /// Deletion callback: `entity` is being destroyed, drop its row right away.
    fn on_entity_deleted(&mut self, entity: Entity) {
        if self.instance(entity).is_some() {
            self.deregister_entity_immediate(entity);
        }
    }

    /// See [`Container::attribute_by_fourcc`].
    fn attribute(&self, instance: Instance, fourcc: FourCC) -> Result<Value>;

    /// See [`Container::set_attribute_by_fourcc`].
    fn set_attribute(&mut self, instance: Instance, fourcc: FourCC, value: Value) -> Result<()>;

    /// Upcast for downcasting to the concrete container.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete container.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<C: Component> Storage for Container<C> {
    #[inline]
    fn id(&self) -> Id {
        Container::id(self)
    }

    #[inline]
    fn name(&self) -> &'static str {
        C::NAME
    }

    #[inline]
    fn len(&self) -> usize {
        Container::len(self)
    }

    fn register_entity(&mut self, entity: Entity) -> Instance {
        Container::register_entity(self, entity)
    }

    fn deregister_entity(&mut self, entity: Entity) -> bool {
        Container::deregister_entity(self, entity)
    }

    fn deregister_entity_immediate(&mut self, entity: Entity) -> bool {
        Container::deregister_entity_immediate(self, entity)
    }

    #[inline]
    fn instance(&self, entity: Entity) -> Option<Instance> {
        Container::instance(self, entity)
    }

    fn optimize(&mut self) -> usize {
        Container::optimize(self)
    }

    fn deregister_dead(&mut self, is_alive: &dyn Fn(Entity) -> bool) -> usize {
        Container::deregister_dead(self, is_alive)
    }

    fn destroy_all(&mut self) -> Vec<Entity> {
        Container::destroy_all(self)
    }

    fn attribute(&self, instance: Instance, fourcc: FourCC) -> Result<Value> {
        self.attribute_by_fourcc(instance, fourcc)
    }

    fn set_attribute(&mut self, instance: Instance, fourcc: FourCC, value: Value) -> Result<()> {
        self.set_attribute_by_fourcc(instance, fourcc, value)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use rusty_ecs_macros::Component;

    use super::*;

    #[derive(Component, Debug, Default, Clone)]
    struct Mass {
        mass: f32,
    }

    #[test]
    fn storage_trait_object() {
        // Given
        let mut storage: Box<dyn Storage> = Box::new(Container::<Mass>::new(Id::new(3)));
        let a = Entity::new(0);
        let b = Entity::new(1);

        // When
        storage.register_entity(a);
        let instance = storage.register_entity(b);
        storage
            .set_attribute(instance, FourCC::from_name("mass"), Value::Float(2.5))
            .unwrap();
        storage.deregister_entity(a);

        // Then
        assert_eq!(storage.id(), Id::new(3));
        assert_eq!(storage.name(), "Mass");
        assert_eq!(storage.optimize(), 1);
        let instance = storage.instance(b).unwrap();
        assert_eq!(
            storage.attribute(instance, FourCC::new(*b"MASS")),
            Ok(Value::Float(2.5))
        );
        let container = storage.as_any().downcast_ref::<Container<Mass>>().unwrap();
        assert_eq!(container.get(instance).unwrap().mass, 2.5);
    }

    #[test]
    fn on_entity_deleted_removes_immediately() {
        // Given
        let mut storage: Box<dyn Storage> = Box::new(Container::<Mass>::new(Id::new(0)));
        let a = Entity::new(0);
        let b = Entity::new(1);
        storage.register_entity(a);
        storage.register_entity(b);

        // When
        storage.on_entity_deleted(a);
        storage.on_entity_deleted(Entity::new(9));

        // Then
        assert_eq!(storage.len(), 1);
        assert_eq!(storage.instance(b), Some(Instance::new(0)));
        assert_eq!(storage.instance(a), None);
    }
}
