use std::collections::HashMap;

use log::warn;

use crate::ecs::{
    entity::{Entity, Id},
    storage::Instance,
};

/// Trait for a sparse index mapping entities to dense container instances.
///
/// Entity ids may have large gaps while container rows are contiguous. An index answers "which
/// row belongs to this entity" in O(1) and is retargeted whenever compaction moves a row.
///
/// Lookups match the full entity, generation included. A stale handle for a recycled slot never
/// resolves to the row of the slot's new occupant.
///
/// # Example
///
/// ```ignore
/// let mut index = DynamicIndex::new();
///
/// index.insert(entity1, Instance::new(0));
/// index.insert(entity105, Instance::new(1));
/// index.rekey(entity105, Instance::new(1), Instance::new(0));
///
/// assert_eq!(index.get(entity105), Some(Instance::new(0)));
/// assert_eq!(index.get(entity999), None);
/// ```
pub trait Index {
    /// Map `entity` to `instance`.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is already mapped. A slot held by another generation of the same id is
    /// overwritten, see [`Index::occupant`].
    fn insert(&mut self, entity: Entity, instance: Instance);

    /// Get the instance for the given entity if it is mapped.
    fn get(&self, entity: Entity) -> Option<Instance>;

    /// Get the mapping held for the slot of `entity`, whatever generation it was made for.
    fn occupant(&self, entity: Entity) -> Option<(Entity, Instance)>;

    /// Remove the mapping for the given entity.
    ///
    /// Returns the old instance if it existed, or `None` if not present.
    fn remove(&mut self, entity: Entity) -> Option<Instance>;

    /// Retarget `owner` from `from` to `to` after its row moved.
    ///
    /// Returns `false` and changes nothing if `owner` is not currently mapped to `from`.
    fn rekey(&mut self, owner: Entity, from: Instance, to: Instance) -> bool;

    /// Number of mapped entities.
    fn len(&self) -> usize;

    /// Remove every mapping.
    fn clear(&mut self);

    /// Check if the index contains a mapping for the given entity.
    #[inline]
    fn contains(&self, entity: Entity) -> bool {
        self.get(entity).is_some()
    }

    /// Check if no entities are mapped.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The index implementation a container should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Block-sparse array keyed by entity slot. See [`DynamicIndex`].
    Dynamic { block_size: usize },
    /// Hash map keyed by entity. See [`HashIndex`].
    Hash,
}

impl Default for Kind {
    fn default() -> Self {
        Self::Dynamic {
            block_size: DynamicIndex::DEFAULT_BLOCK_SIZE,
        }
    }
}

/// A block-based sparse index optimized for entity id to instance lookups.
///
/// This index divides the sparse id space into fixed-size blocks, allocating memory only for
/// blocks that contain at least one entry. Within each block a dense vector stores the owning
/// entity alongside its instance, so lookups can reject stale generations.
///
/// # Performance Characteristics
///
/// | Operation | Time | Memory |
/// |-----------|------|--------|
/// | `insert()` | O(1) amortized | Allocates block on first use |
/// | `get()` | O(1) | No allocation |
/// | `remove()` | O(1) | No deallocation (leaves `None`) |
/// | `rekey()` | O(1) | No allocation |
///
/// # Block Size Tuning
///
/// - **Small blocks (64-128)**: Lower memory overhead for very sparse ids, more indirection
/// - **Default (256)**: Balanced for typical entity allocation patterns
/// - **Large blocks (512-1024)**: Better cache locality for dense ids, higher memory overhead
///
/// Entity ids are recycled by the allocator before the slot table grows, so they stay locally
/// dense and this is the default index for every container. Use [`HashIndex`] when a component
/// is attached to a small, scattered subset of a large entity population.
#[derive(Debug)]
pub struct DynamicIndex {
    /// The size of blocks to allocate when growing the index.
    block_size: usize,

    /// Outer Vec is indexed by `entity index / block_size`.
    /// Inner Vec is indexed by `entity index % block_size`.
    maps: Vec<Option<Vec<Option<(Entity, Instance)>>>>,

    /// Number of occupied slots.
    len: usize,
}

impl DynamicIndex {
    /// Default block size balances memory usage and access speed for typical entity patterns.
    pub const DEFAULT_BLOCK_SIZE: usize = 256;

    /// Create a new DynamicIndex with the default block size.
    #[inline]
    pub const fn new() -> Self {
        Self::new_with_block_size(Self::DEFAULT_BLOCK_SIZE)
    }

    /// Create a new DynamicIndex with a custom block size.
    ///
    /// # Panics
    ///
    /// Debug builds panic if block_size is 0. Release builds use blocks of one entry.
    #[inline]
    pub const fn new_with_block_size(block_size: usize) -> Self {
        debug_assert!(block_size > 0, "block_size must be greater than 0");
        Self {
            block_size: if block_size == 0 { 1 } else { block_size },
            maps: Vec::new(),
            len: 0,
        }
    }

    /// Calculate block and within-block indices for an entity.
    #[inline]
    fn indices(&self, entity: Entity) -> (usize, usize) {
        let entity_index = entity.index();
        (entity_index / self.block_size, entity_index % self.block_size)
    }

    /// Get the slot for an entity if its block is allocated.
    #[inline]
    fn slot(&self, entity: Entity) -> Option<&Option<(Entity, Instance)>> {
        let (block_index, within_block_index) = self.indices(entity);
        self.maps
            .get(block_index)?
            .as_ref()
            .map(|block| &block[within_block_index])
    }

    /// Get the mutable slot for an entity if its block is allocated.
    #[inline]
    fn slot_mut(&mut self, entity: Entity) -> Option<&mut Option<(Entity, Instance)>> {
        let (block_index, within_block_index) = self.indices(entity);
        self.maps
            .get_mut(block_index)?
            .as_mut()
            .map(|block| &mut block[within_block_index])
    }

    /// Get the number of block slots (including unallocated ones).
    #[inline]
    pub fn block_count(&self) -> usize {
        self.maps.len()
    }

    /// Get the number of blocks that have been allocated.
    pub fn allocated_block_count(&self) -> usize {
        self.maps.iter().filter(|b| b.is_some()).count()
    }

    /// Estimate memory usage in bytes.
    ///
    /// This is approximate and doesn't include heap allocator metadata.
    pub fn memory_usage(&self) -> usize {
        let outer_vec_size =
            self.maps.capacity() * std::mem::size_of::<Option<Vec<Option<(Entity, Instance)>>>>();
        let inner_vecs_size: usize = self
            .maps
            .iter()
            .filter_map(|block| block.as_ref())
            .map(|vec| vec.capacity() * std::mem::size_of::<Option<(Entity, Instance)>>())
            .sum();
        outer_vec_size + inner_vecs_size
    }
}

impl Default for DynamicIndex {
    /// Custom default to ensure we get the default block size.
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Index for DynamicIndex {
    fn insert(&mut self, entity: Entity, instance: Instance) {
        let (block_index, within_block_index) = self.indices(entity);

        // Ensure the maps vector has enough blocks
        if block_index >= self.maps.len() {
            self.maps.resize_with(block_index + 1, || None);
        }

        let block_size = self.block_size;
        let block = self.maps[block_index].get_or_insert_with(|| vec![None; block_size]);
        let slot = &mut block[within_block_index];
        match slot {
            Some((existing, _)) if *existing == entity => {
                panic!("entity {entity} is already mapped in this index")
            }
            // An older generation of this slot left its mapping behind.
            Some(_) => {}
            None => self.len += 1,
        }
        *slot = Some((entity, instance));
    }

    fn get(&self, entity: Entity) -> Option<Instance> {
        match self.slot(entity)? {
            Some((owner, instance)) if *owner == entity => Some(*instance),
            _ => None,
        }
    }

    fn occupant(&self, entity: Entity) -> Option<(Entity, Instance)> {
        *self.slot(entity)?
    }

    fn remove(&mut self, entity: Entity) -> Option<Instance> {
        let slot = self.slot_mut(entity)?;
        let instance = match *slot {
            Some((owner, instance)) if owner == entity => instance,
            _ => return None,
        };
        *slot = None;
        self.len -= 1;
        Some(instance)
    }

    fn rekey(&mut self, owner: Entity, from: Instance, to: Instance) -> bool {
        match self.slot_mut(owner) {
            Some(Some((mapped, instance))) if *mapped == owner && *instance == from => {
                *instance = to;
                true
            }
            _ => false,
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    fn clear(&mut self) {
        self.maps.clear();
        self.len = 0;
    }
}

/// A HashMap-based sparse index.
///
/// Simpler than [`DynamicIndex`] and typically slower due to hashing overhead, but memory use
/// tracks the number of mapped entities rather than the spread of their ids.
#[derive(Debug, Default)]
pub struct HashIndex {
    /// Keyed by entity slot, holding the owning entity alongside its instance.
    map: HashMap<Id, (Entity, Instance)>,
}

impl HashIndex {
    /// Create a new empty HashIndex.
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Create a new HashIndex with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity),
        }
    }

    /// Estimate memory usage in bytes.
    #[inline]
    pub fn memory_usage(&self) -> usize {
        // Rough estimate, actual overhead varies
        self.map.capacity()
            * (std::mem::size_of::<Id>() + std::mem::size_of::<(Entity, Instance)>() + 8)
    }
}

impl Index for HashIndex {
    fn insert(&mut self, entity: Entity, instance: Instance) {
        let previous = self.map.insert(entity.id(), (entity, instance));
        assert!(
            !matches!(previous, Some((existing, _)) if existing == entity),
            "entity {entity} is already mapped in this index"
        );
    }

    fn get(&self, entity: Entity) -> Option<Instance> {
        match self.map.get(&entity.id())? {
            (owner, instance) if *owner == entity => Some(*instance),
            _ => None,
        }
    }

    fn occupant(&self, entity: Entity) -> Option<(Entity, Instance)> {
        self.map.get(&entity.id()).copied()
    }

    fn remove(&mut self, entity: Entity) -> Option<Instance> {
        self.get(entity)?;
        self.map.remove(&entity.id()).map(|(_, instance)| instance)
    }

    fn rekey(&mut self, owner: Entity, from: Instance, to: Instance) -> bool {
        match self.map.get_mut(&owner.id()) {
            Some((mapped, instance)) if *mapped == owner && *instance == from => {
                *instance = to;
                true
            }
            _ => false,
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.map.len()
    }

    fn clear(&mut self) {
        self.map.clear();
    }
}

/// Static dispatch over the index implementations a container can be configured with.
#[derive(Debug)]
pub enum Indexer {
    Dynamic(DynamicIndex),
    Hash(HashIndex),
}

impl Indexer {
    /// Build the index described by `kind`, pre-sized for `capacity` entities where the
    /// implementation supports it.
    pub fn new(kind: Kind, capacity: usize) -> Self {
        match kind {
            Kind::Dynamic { block_size } => {
                if block_size == 0 {
                    warn!("Dynamic index block size of 0 requested, using 1");
                }
                Self::Dynamic(DynamicIndex::new_with_block_size(block_size.max(1)))
            }
            Kind::Hash => Self::Hash(HashIndex::with_capacity(capacity)),
        }
    }

    /// Estimate memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        match self {
            Self::Dynamic(index) => index.memory_usage(),
            Self::Hash(index) => index.memory_usage(),
        }
    }
}

impl Default for Indexer {
    fn default() -> Self {
        Self::new(Kind::default(), 0)
    }
}

impl Index for Indexer {
    #[inline]
    fn insert(&mut self, entity: Entity, instance: Instance) {
        match self {
            Self::Dynamic(index) => index.insert(entity, instance),
            Self::Hash(index) => index.insert(entity, instance),
        }
    }

    #[inline]
    fn get(&self, entity: Entity) -> Option<Instance> {
        match self {
            Self::Dynamic(index) => index.get(entity),
            Self::Hash(index) => index.get(entity),
        }
    }

    #[inline]
    fn occupant(&self, entity: Entity) -> Option<(Entity, Instance)> {
        match self {
            Self::Dynamic(index) => index.occupant(entity),
            Self::Hash(index) => index.occupant(entity),
        }
    }

    #[inline]
    fn remove(&mut self, entity: Entity) -> Option<Instance> {
        match self {
            Self::Dynamic(index) => index.remove(entity),
            Self::Hash(index) => index.remove(entity),
        }
    }

    #[inline]
    fn rekey(&mut self, owner: Entity, from: Instance, to: Instance) -> bool {
        match self {
            Self::Dynamic(index) => index.rekey(owner, from, to),
            Self::Hash(index) => index.rekey(owner, from, to),
        }
    }

    #[inline]
    fn len(&self) -> usize {
        match self {
            Self::Dynamic(index) => index.len(),
            Self::Hash(index) => index.len(),
        }
    }

    fn clear(&mut self) {
        match self {
            Self::Dynamic(index) => index.clear(),
            Self::Hash(index) => index.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ecs::entity::Entity;

    use super::*;

    fn entity(id: u32) -> Entity {
        Entity::new(id)
    }

    fn instance(index: usize) -> Option<Instance> {
        Some(Instance::new(index))
    }

    #[test]
    fn dynamic_index_single_block() {
        // Given
        let mut index = DynamicIndex::new_with_block_size(10);

        // When
        index.insert(entity(0), Instance::new(0));
        index.insert(entity(5), Instance::new(1));
        index.insert(entity(9), Instance::new(2));

        // Then
        assert_eq!(index.get(entity(0)), instance(0));
        assert_eq!(index.get(entity(5)), instance(1));
        assert_eq!(index.get(entity(9)), instance(2));
        assert_eq!(index.get(entity(1)), None);
        assert_eq!(index.len(), 3);
        assert_eq!(index.allocated_block_count(), 1);
    }

    #[test]
    fn dynamic_index_block_skipping() {
        // Given
        let mut index = DynamicIndex::new_with_block_size(10);

        // When
        index.insert(entity(5), Instance::new(0));
        index.insert(entity(55), Instance::new(1));

        // Then - Blocks between are never allocated
        assert_eq!(index.block_count(), 6);
        assert_eq!(index.allocated_block_count(), 2);
        assert_eq!(index.get(entity(25)), None);
        assert_eq!(index.get(entity(55)), instance(1));
    }

    #[test]
    fn dynamic_index_remove() {
        // Given
        let mut index = DynamicIndex::new_with_block_size(10);
        index.insert(entity(3), Instance::new(7));

        // When
        let removed = index.remove(entity(3));
        let again = index.remove(entity(3));
        let unallocated = index.remove(entity(300));

        // Then
        assert_eq!(removed, instance(7));
        assert_eq!(again, None);
        assert_eq!(unallocated, None);
        assert!(index.is_empty());
    }

    #[test]
    #[should_panic(expected = "already mapped")]
    fn dynamic_index_double_insert_panics() {
        // Given
        let mut index = DynamicIndex::new();
        index.insert(entity(1), Instance::new(0));

        // When
        index.insert(entity(1), Instance::new(1));
    }

    #[test]
    fn dynamic_index_rejects_stale_generation() {
        // Given
        let mut index = DynamicIndex::new();
        let old = entity(4);
        let new = old.genned();
        index.insert(old, Instance::new(0));

        // Then - The stale handle never resolves to another generation
        assert_eq!(index.get(new), None);
        assert_eq!(index.remove(new), None);
        assert!(!index.rekey(new, Instance::new(0), Instance::new(1)));
        assert_eq!(index.get(old), instance(0));
    }

    #[test]
    fn dynamic_index_overwrites_leftover_generation() {
        // Given
        let mut index = DynamicIndex::new();
        let old = entity(4);
        let new = old.genned();
        index.insert(old, Instance::new(0));

        // When
        index.insert(new, Instance::new(3));

        // Then
        assert_eq!(index.get(new), instance(3));
        assert_eq!(index.get(old), None);
        assert_eq!(index.remove(old), None);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn dynamic_index_rekey() {
        // Given
        let mut index = DynamicIndex::new();
        index.insert(entity(8), Instance::new(4));

        // When
        let wrong_from = index.rekey(entity(8), Instance::new(2), Instance::new(0));
        let moved = index.rekey(entity(8), Instance::new(4), Instance::new(1));

        // Then
        assert!(!wrong_from);
        assert!(moved);
        assert_eq!(index.get(entity(8)), instance(1));
    }

    #[test]
    fn dynamic_index_sequential_entity_pattern() {
        // Given
        let mut index = DynamicIndex::new();

        // When - Simulate sequential entity allocation
        for i in 0..1000 {
            index.insert(entity(i), Instance::new(i as usize));
        }

        // Then
        for i in 0..1000 {
            assert_eq!(index.get(entity(i)), instance(i as usize));
        }
        assert_eq!(index.allocated_block_count(), 4);
        assert_eq!(index.len(), 1000);
    }

    #[test]
    fn dynamic_index_memory_usage() {
        // Given
        let mut index = DynamicIndex::new_with_block_size(100);
        let empty = index.memory_usage();

        // When
        index.insert(entity(0), Instance::new(0));

        // Then
        assert!(index.memory_usage() > empty);
        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.get(entity(0)), None);
    }

    #[test]
    fn hash_index_basic_operations() {
        // Given
        let mut index = HashIndex::new();

        // When
        index.insert(entity(0), Instance::new(0));
        index.insert(entity(1_000_000), Instance::new(1));

        // Then
        assert_eq!(index.get(entity(0)), instance(0));
        assert_eq!(index.get(entity(1_000_000)), instance(1));
        assert_eq!(index.get(entity(1_000_000).genned()), None);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn hash_index_remove_and_rekey() {
        // Given
        let mut index = HashIndex::with_capacity(4);
        index.insert(entity(1), Instance::new(0));
        index.insert(entity(2), Instance::new(1));

        // When
        index.remove(entity(1));
        let moved = index.rekey(entity(2), Instance::new(1), Instance::new(0));

        // Then
        assert!(moved);
        assert_eq!(index.get(entity(1)), None);
        assert_eq!(index.get(entity(2)), instance(0));
    }

    #[test]
    #[should_panic(expected = "already mapped")]
    fn hash_index_double_insert_panics() {
        // Given
        let mut index = HashIndex::new();
        index.insert(entity(1), Instance::new(0));

        // When
        index.insert(entity(1), Instance::new(0));
    }

    #[test]
    fn indexer_dispatch() {
        // Given
        let mut dynamic = Indexer::new(Kind::default(), 0);
        let mut hash = Indexer::new(Kind::Hash, 16);

        // When
        dynamic.insert(entity(10), Instance::new(100));
        hash.insert(entity(10), Instance::new(100));

        // Then - both work through the enum
        assert_eq!(dynamic.get(entity(10)), instance(100));
        assert_eq!(hash.get(entity(10)), instance(100));
        assert!(dynamic.contains(entity(10)));
        assert!(hash.contains(entity(10)));
        assert!(matches!(dynamic, Indexer::Dynamic(_)));
        assert!(matches!(hash, Indexer::Hash(_)));
    }

    #[test]
    fn index_trait_dynamic_dispatch() {
        // Given - use trait objects
        let mut indices: Vec<Box<dyn Index>> =
            vec![Box::new(DynamicIndex::new()), Box::new(HashIndex::new())];

        for index in indices.iter_mut() {
            // When
            index.insert(entity(3), Instance::new(1));
            index.rekey(entity(3), Instance::new(1), Instance::new(0));

            // Then
            assert_eq!(index.get(entity(3)), instance(0));
        }
    }

    #[test]
    #[should_panic(expected = "block_size must be greater than 0")]
    #[cfg(debug_assertions)]
    fn dynamic_index_zero_block_size_panics() {
        let _ = DynamicIndex::new_with_block_size(0);
    }

    #[test]
    fn index_kinds_agree_on_recycled_slots() {
        let mut indices: Vec<Box<dyn Index>> =
            vec![Box::new(DynamicIndex::new()), Box::new(HashIndex::new())];

        for index in indices.iter_mut() {
            // Given
            let old = entity(4);
            let new = old.genned();
            index.insert(old, Instance::new(0));

            // When
            let before = index.occupant(new);
            index.insert(new, Instance::new(3));

            // Then - The slot now belongs to the new generation only
            assert_eq!(before, Some((old, Instance::new(0))));
            assert_eq!(index.occupant(old), Some((new, Instance::new(3))));
            assert_eq!(index.get(old), None);
            assert_eq!(index.remove(old), None);
            assert!(!index.rekey(old, Instance::new(0), Instance::new(1)));
            assert_eq!(index.get(new), instance(3));
            assert_eq!(index.len(), 1);
        }
    }

    #[test]
    fn indexer_zero_block_size_falls_back_to_one() {
        // Given
        let mut index = Indexer::new(Kind::Dynamic { block_size: 0 }, 0);

        // When
        index.insert(entity(0), Instance::new(0));
        index.insert(entity(7), Instance::new(1));

        // Then
        assert_eq!(index.get(entity(7)), instance(1));
        assert!(matches!(&index, Indexer::Dynamic(dynamic) if dynamic.block_count() == 8));
    }
}
