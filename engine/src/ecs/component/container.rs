use std::collections::HashSet;

use fixedbitset::FixedBitSet;
use log::{debug, trace, warn};

use crate::ecs::{
    attribute::{FourCC, Value},
    component::{Component, Config, Id, Snapshot},
    entity::Entity,
    error::{Error, Result},
    storage::{Index, Indexer, Instance},
};

/// Hook invoked with `(owner, from, to)` whenever compaction relocates a row.
pub type MoveHook = Box<dyn FnMut(Entity, Instance, Instance)>;

/// Dense storage for one component type.
///
/// Rows live in parallel vectors: the owning entity, the component value and an active bit. Each
/// registered entity owns exactly one row, found through the entity to instance index.
///
/// # Row lifecycle
///
/// - [`register_entity`](Self::register_entity) appends an active row holding `C::default()`.
/// - [`deregister_entity`](Self::deregister_entity) soft-deletes: the row stays where it is, so
///   instances handed out this frame keep pointing at the same rows.
/// - [`optimize`](Self::optimize) removes every soft-deleted row with swap-remove, pulling the
///   last row into the hole and rekeying its owner.
/// - [`deregister_entity_immediate`](Self::deregister_entity_immediate) performs the same
///   swap-remove right away for a single entity.
///
/// Instances are only valid until the next registration, immediate removal or optimize pass.
pub struct Container<C: Component> {
    /// The component id this container stores.
    id: Id,

    /// Owning entity per row.
    owners: Vec<Entity>,

    /// Component value per row.
    rows: Vec<C>,

    /// Rows that have not been soft-deleted.
    active: FixedBitSet,

    /// Entity to instance index. Soft-deleted rows keep their mapping until they are removed.
    index: Indexer,

    /// Number of soft-deleted rows awaiting removal.
    pending: usize,

    /// Optional hook notified of row moves.
    on_moved: Option<MoveHook>,
}

impl<C: Component> Container<C> {
    /// Construct an empty container with the default configuration.
    pub fn new(id: Id) -> Self {
        Self::with_config(id, Config::default())
    }

    /// Construct an empty container with the given configuration.
    pub fn with_config(id: Id, config: Config) -> Self {
        Self {
            id,
            owners: Vec::with_capacity(config.capacity),
            rows: Vec::with_capacity(config.capacity),
            active: FixedBitSet::with_capacity(config.capacity),
            index: Indexer::new(config.index, config.capacity),
            pending: 0,
            on_moved: None,
        }
    }

    /// The component id of this container.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Number of rows, including soft-deleted rows not yet removed by an optimize pass.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the container holds no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of active rows.
    #[inline]
    pub fn active_len(&self) -> usize {
        self.rows.len() - self.pending
    }

    /// Number of soft-deleted rows awaiting an optimize pass.
    #[inline]
    pub fn pending_len(&self) -> usize {
        self.pending
    }

    /// Estimated bytes held by the entity to instance index.
    #[inline]
    pub fn index_memory_usage(&self) -> usize {
        self.index.memory_usage()
    }

    /// Reserve room for `additional` more rows.
    pub fn reserve(&mut self, additional: usize) {
        self.owners.reserve(additional);
        self.rows.reserve(additional);
        self.active.grow(self.rows.len() + additional);
    }

    /// Install a hook notified with `(owner, from, to)` every time a row is relocated.
    pub fn on_instance_moved(&mut self, hook: impl FnMut(Entity, Instance, Instance) + 'static) {
        self.on_moved = Some(Box::new(hook));
    }

    /// Register `entity`, giving it a row holding `C::default()`, and return its instance.
    ///
    /// An entity that was soft-deleted but not yet removed by an optimize pass gets its old row
    /// back, reset to the default value. An active row still owned by an older generation of the
    /// same entity slot is soft-deleted.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is already registered in this container.
    pub fn register_entity(&mut self, entity: Entity) -> Instance {
        if let Some(instance) = self.index.get(entity) {
            let index = instance.index();
            assert!(
                !self.active.contains(index),
                "attempted to register an entity that is already registered in {}: {}",
                C::NAME,
                entity
            );
            self.rows[index] = C::default();
            self.active.insert(index);
            self.pending -= 1;
            return instance;
        }

        self.retire_stale_occupant(entity);

        let instance = Instance::new(self.rows.len());
        self.owners.push(entity);
        self.rows.push(C::default());
        self.active.grow(self.rows.len());
        self.active.insert(instance.index());
        self.index.insert(entity, instance);
        instance
    }

    /// Soft-delete the row of `entity`. The row stays in place until the next optimize pass.
    ///
    /// Returns `false` if `entity` has no active row in this container.
    pub fn deregister_entity(&mut self, entity: Entity) -> bool {
        let Some(instance) = self.instance(entity) else {
            warn!(
                "Attempted to deregister an entity that is not registered in {}: {}",
                C::NAME,
                entity
            );
            return false;
        };
        self.active.set(instance.index(), false);
        self.pending += 1;
        true
    }

    /// Remove the row of `entity` right away, moving the last row into its slot.
    ///
    /// A soft-deleted row is removed too. Returns `false` if `entity` has no row.
    pub fn deregister_entity_immediate(&mut self, entity: Entity) -> bool {
        let Some(instance) = self.index.get(entity) else {
            warn!(
                "Attempted to remove an entity that is not registered in {}: {}",
                C::NAME,
                entity
            );
            return false;
        };
        self.swap_remove(instance);

        #[cfg(debug_assertions)]
        self.verify_invariants();

        true
    }

    /// Get the instance of `entity`, or `None` if it has no active row.
    #[inline]
    pub fn instance(&self, entity: Entity) -> Option<Instance> {
        self.index
            .get(entity)
            .filter(|instance| self.active.contains(instance.index()))
    }

    /// Check if `entity` has an active row.
    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        self.instance(entity).is_some()
    }

    /// Remove every soft-deleted row and return how many were removed.
    ///
    /// A single index-based pass: each soft-deleted slot is filled with the last live row, then
    /// the pass moves on. A live row is moved at most once and never after the pass has walked
    /// past it. Calling this with nothing soft-deleted does nothing and returns 0.
    pub fn optimize(&mut self) -> usize {
        if self.pending == 0 {
            return 0;
        }

        let mut removed = 0;
        let mut index = 0;
        while index < self.rows.len() {
            if self.active.contains(index) {
                index += 1;
                continue;
            }
            let last = self.rows.len() - 1;
            if self.active.contains(last) {
                // The last row lands here, do not advance so it is examined next.
                self.swap_remove(Instance::new(index));
            } else {
                // Drop soft-deleted tail rows first so only live rows are moved.
                self.swap_remove(Instance::new(last));
            }
            removed += 1;
        }

        debug!(
            "Optimized {}: removed {} rows, {} remain",
            C::NAME,
            removed,
            self.rows.len()
        );

        #[cfg(debug_assertions)]
        self.verify_invariants();

        removed
    }

    /// Soft-delete every active row. Returns the number of rows deregistered.
    pub fn deregister_all(&mut self) -> usize {
        let count = self.active_len();
        self.active.clear();
        self.pending = self.rows.len();
        count
    }

    /// Soft-delete every active row whose owner is no longer alive. Returns the number of rows
    /// deregistered.
    pub fn deregister_dead(&mut self, is_alive: impl Fn(Entity) -> bool) -> usize {
        let mut count = 0;
        for (index, owner) in self.owners.iter().enumerate() {
            if self.active.contains(index) && !is_alive(*owner) {
                self.active.set(index, false);
                count += 1;
            }
        }
        self.pending += count;
        count
    }

    /// Clear the container to zero rows, returning the owners of every row that was present.
    pub fn destroy_all(&mut self) -> Vec<Entity> {
        let owners = std::mem::take(&mut self.owners);
        self.rows.clear();
        self.active.clear();
        self.index.clear();
        self.pending = 0;
        debug!("Destroyed all {} rows of {}", owners.len(), C::NAME);
        owners
    }

    /// Copy every active row and its owner, in instance order.
    pub fn save(&self) -> Snapshot<C> {
        let (owners, rows): (Vec<Entity>, Vec<C>) = self
            .iter()
            .map(|(_, owner, row)| (owner, row.clone()))
            .unzip();
        Snapshot::from_parts(owners, rows)
    }

    /// Write the rows of `snapshot` starting at row `offset`, overwriting rows already there and
    /// appending the rest. Every written row is active and mapped to its owner.
    ///
    /// Returns the owners of overwritten rows that the snapshot did not bring back. Fails without
    /// changing anything if `offset` is past the last row, if the snapshot is malformed, or if an
    /// owner would end up with two rows.
    pub fn load(&mut self, offset: usize, snapshot: Snapshot<C>) -> Result<Vec<Entity>> {
        snapshot.validate()?;
        if offset > self.rows.len() {
            return Err(Error::IndexOutOfRange {
                instance: Instance::new(offset),
                len: self.rows.len(),
            });
        }

        let (owners, rows) = snapshot.into_parts();
        let overwritten = offset..(offset + owners.len()).min(self.rows.len());
        let mut incoming = HashSet::with_capacity(owners.len());
        for owner in &owners {
            let elsewhere = self
                .index
                .get(*owner)
                .is_some_and(|instance| !overwritten.contains(&instance.index()));
            if !incoming.insert(*owner) || elsewhere {
                return Err(Error::DuplicateOwner(*owner));
            }
        }

        let mut displaced = Vec::new();
        for index in overwritten {
            let previous = self.owners[index];
            if self.index.get(previous) == Some(Instance::new(index)) {
                self.index.remove(previous);
            }
            if !self.active.contains(index) {
                self.pending -= 1;
            }
            if !incoming.contains(&previous) {
                displaced.push(previous);
            }
        }

        let count = owners.len();
        for (position, (owner, row)) in owners.into_iter().zip(rows).enumerate() {
            let index = offset + position;
            self.retire_stale_occupant(owner);
            if index < self.rows.len() {
                self.owners[index] = owner;
                self.rows[index] = row;
            } else {
                self.owners.push(owner);
                self.rows.push(row);
                self.active.grow(self.rows.len());
            }
            self.active.insert(index);
            self.index.insert(owner, Instance::new(index));
        }
        debug!(
            "Loaded {} rows into {} at {}, {} owners displaced",
            count,
            C::NAME,
            offset,
            displaced.len()
        );

        #[cfg(debug_assertions)]
        self.verify_invariants();

        Ok(displaced)
    }

    /// Get the owner of the row at `instance`.
    pub fn owner(&self, instance: Instance) -> Result<Entity> {
        let index = self.check(instance)?;
        Ok(self.owners[index])
    }

    /// Get the component value at `instance`.
    pub fn get(&self, instance: Instance) -> Result<&C> {
        let index = self.check(instance)?;
        Ok(&self.rows[index])
    }

    /// Get the mutable component value at `instance`.
    pub fn get_mut(&mut self, instance: Instance) -> Result<&mut C> {
        let index = self.check(instance)?;
        Ok(&mut self.rows[index])
    }

    /// Replace the component value at `instance`.
    pub fn set(&mut self, instance: Instance, value: C) -> Result<()> {
        *self.get_mut(instance)? = value;
        Ok(())
    }

    /// Reset the component value at `instance` to `C::default()`.
    pub fn set_to_default(&mut self, instance: Instance) -> Result<()> {
        self.set(instance, C::default())
    }

    /// Get the component value owned by `entity`.
    #[inline]
    pub fn get_by_entity(&self, entity: Entity) -> Option<&C> {
        self.instance(entity).map(|i| &self.rows[i.index()])
    }

    /// Get the mutable component value owned by `entity`.
    #[inline]
    pub fn get_by_entity_mut(&mut self, entity: Entity) -> Option<&mut C> {
        self.instance(entity).map(|i| &mut self.rows[i.index()])
    }

    /// Read an attribute by its position in [`Component::ATTRIBUTES`].
    pub fn attribute(&self, instance: Instance, attribute: usize) -> Result<Value> {
        self.get(instance)?
            .attribute(attribute)
            .ok_or(Error::AttributeIndex(attribute))
    }

    /// Write an attribute by its position in [`Component::ATTRIBUTES`].
    pub fn set_attribute(&mut self, instance: Instance, attribute: usize, value: Value) -> Result<()> {
        self.get_mut(instance)?.set_attribute(attribute, value)
    }

    /// Read an attribute by its code.
    pub fn attribute_by_fourcc(&self, instance: Instance, fourcc: FourCC) -> Result<Value> {
        self.attribute(instance, Self::attribute_position(fourcc)?)
    }

    /// Write an attribute by its code.
    pub fn set_attribute_by_fourcc(
        &mut self,
        instance: Instance,
        fourcc: FourCC,
        value: Value,
    ) -> Result<()> {
        self.set_attribute(instance, Self::attribute_position(fourcc)?, value)
    }

    /// Iterate over active rows.
    pub fn iter(&self) -> impl Iterator<Item = (Instance, Entity, &C)> {
        self.owners
            .iter()
            .zip(self.rows.iter())
            .enumerate()
            .filter(|(index, _)| self.active.contains(*index))
            .map(|(index, (owner, row))| (Instance::new(index), *owner, row))
    }

    /// Iterate mutably over active rows.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Instance, Entity, &mut C)> {
        let active = &self.active;
        self.owners
            .iter()
            .zip(self.rows.iter_mut())
            .enumerate()
            .filter(|(index, _)| active.contains(*index))
            .map(|(index, (owner, row))| (Instance::new(index), *owner, row))
    }

    /// Owners of every row, soft-deleted rows included, in instance order.
    #[inline]
    pub fn owners(&self) -> &[Entity] {
        &self.owners
    }

    /// Every row, soft-deleted rows included, in instance order.
    ///
    /// Meant for read-only bulk access to already optimized data.
    #[inline]
    pub fn rows(&self) -> &[C] {
        &self.rows
    }

    /// Validate an instance and return its row index.
    ///
    /// Returns [`Error::IndexOutOfRange`] past the last row and [`Error::StaleInstance`] for a
    /// soft-deleted row.
    #[inline]
    fn check(&self, instance: Instance) -> Result<usize> {
        let index = instance.index();
        if index >= self.rows.len() {
            return Err(Error::IndexOutOfRange {
                instance,
                len: self.rows.len(),
            });
        }
        if !self.active.contains(index) {
            return Err(Error::StaleInstance(instance));
        }
        Ok(index)
    }

    /// Find the position of an attribute code in the attribute table.
    fn attribute_position(fourcc: FourCC) -> Result<usize> {
        C::ATTRIBUTES
            .iter()
            .position(|definition| definition.fourcc() == fourcc)
            .ok_or(Error::UnknownAttribute(fourcc))
    }

    /// Remove the row at `instance` by moving the last row into it, rekeying the moved owner and
    /// dropping the removed owner's mapping.
    fn swap_remove(&mut self, instance: Instance) {
        let index = instance.index();
        debug_assert!(index < self.rows.len(), "instance out of bounds");

        let last = self.rows.len() - 1;
        let removed = self.owners[index];
        if !self.active.contains(index) {
            self.pending -= 1;
        }

        self.owners.swap_remove(index);
        self.rows.swap_remove(index);
        self.index.remove(removed);

        if index != last {
            let moved = self.owners[index];
            let moved_active = self.active.contains(last);
            self.active.set(index, moved_active);
            let from = Instance::new(last);
            self.index.rekey(moved, from, instance);
            trace!("{}: moved {} from {} to {}", C::NAME, moved, from, instance);
            if moved_active && let Some(hook) = self.on_moved.as_mut() {
                hook(moved, from, instance);
            }
        }
        self.active.set(last, false);
    }

    /// Soft-delete an active row still mapped for an older generation of `entity`'s slot. Its
    /// mapping is about to be overwritten by `entity`.
    fn retire_stale_occupant(&mut self, entity: Entity) {
        if let Some((stale, instance)) = self.index.occupant(entity)
            && stale != entity
            && self.active.contains(instance.index())
        {
            debug!(
                "{}: deregistering {} left behind by recycled slot, now {}",
                C::NAME,
                stale,
                entity
            );
            self.active.set(instance.index(), false);
            self.pending += 1;
        }
    }

    /// Verify parallel vectors and the index agree.
    #[cfg(debug_assertions)]
    pub fn verify_invariants(&self) {
        assert_eq!(
            self.owners.len(),
            self.rows.len(),
            "owner count {} doesn't match row count {}",
            self.owners.len(),
            self.rows.len()
        );
        let inactive = (0..self.rows.len())
            .filter(|i| !self.active.contains(*i))
            .count();
        assert_eq!(
            inactive, self.pending,
            "inactive rows {} don't match pending count {}",
            inactive, self.pending
        );
        for (index, owner) in self.owners.iter().enumerate() {
            if let Some(instance) = self.index.get(*owner) {
                assert_eq!(
                    instance.index(),
                    index,
                    "{} maps to {} but owns row {}",
                    owner,
                    instance,
                    index
                );
            }
        }
    }
}

impl<C: Component> std::fmt::Debug for Container<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("name", &C::NAME)
            .field("id", &self.id)
            .field("len", &self.rows.len())
            .field("pending", &self.pending)
            .finish()
    }
}
