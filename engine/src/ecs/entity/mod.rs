//! Entity identity for the component storage core.
//!
//! Entities are lightweight generational handles. They own no data; every component container
//! keys its rows by entity, and the [`Allocator`] is the single authority on which handles are
//! currently alive.
//!
//! # Generation Tracking
//!
//! An [`Entity`] is an ([`Id`], [`Generation`]) pair. The id names a slot in the allocator's slot
//! table and the generation counts how many times that slot has been handed out. Freeing an
//! entity bumps its slot generation, so any handle captured before the free no longer compares
//! equal to the live occupant of the slot:
//!
//! ```rust,ignore
//! let entity = allocator.alloc(); // Entity(0v0)
//! allocator.free(entity);
//! let reused = allocator.alloc();  // Entity(0v1)
//! assert!(!allocator.is_alive(entity));
//! ```
//!
//! Generations wrap on overflow. A handle that survives 2^32 reuses of its slot will alias the
//! new occupant; this is an accepted limitation.
//!
//! # Slot Recycling
//!
//! Freed ids go to a FIFO dead pool and are handed out again before the slot table grows, which
//! keeps the id space compact for the block-sparse indices that key off [`Entity::index`].

pub mod deletion;

use std::fmt;

use crossbeam::queue::SegQueue;
use fixedbitset::FixedBitSet;
use log::warn;
use serde::{Deserialize, Serialize};

/// The generation of an entity, used to track whether a handle still names the live occupant of
/// its slot. Starts at `FIRST` and wraps when incremented past `u32::MAX`.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Generation(u32);

impl Generation {
    /// The first generation of an entity.
    pub const FIRST: Self = Self(0);

    /// Get the next generation from the current.
    #[inline]
    pub const fn next(&self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// Get the raw generation counter.
    #[inline]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

/// An entity slot identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(u32);

impl From<u32> for Id {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl Id {
    /// Get the raw slot number.
    #[inline]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

/// An entity handle. Two entities are equal iff both their `id` and `generation` match.
///
/// The allocator holds at most one live entity per `id`; the `generation` tells whether this
/// handle is that live entity or a stale copy of an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    id: Id,
    generation: Generation,
}

impl Entity {
    /// Construct a new entity with just an id. This will default to the first generation.
    ///
    /// This is primarily used for testing.
    #[inline]
    pub fn new(id: impl Into<Id>) -> Self {
        Self::new_with_generation(id.into(), Generation::FIRST)
    }

    /// Construct a new entity with an id and known generation.
    #[inline]
    pub const fn new_with_generation(id: Id, generation: Generation) -> Self {
        Self { id, generation }
    }

    /// Get the id of this entity.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Get the generation of this entity.
    #[inline]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Get the index of this entity if it were to live in indexable storage (e.g. Vec)
    #[inline]
    pub fn index(&self) -> usize {
        self.id.0 as usize
    }

    /// Get a new entity with the same id but the next generation.
    #[inline]
    pub fn genned(&self) -> Self {
        Self::new_with_generation(self.id, self.generation.next())
    }

    /// Pack this entity into a single `u64`, generation in the upper half.
    #[inline]
    pub const fn to_bits(&self) -> u64 {
        ((self.generation.0 as u64) << 32) | self.id.0 as u64
    }

    /// Unpack an entity previously packed with [`Entity::to_bits`].
    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self::new_with_generation(Id(bits as u32), Generation((bits >> 32) as u32))
    }
}

impl PartialOrd for Entity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Entities order by id, then generation.
impl Ord for Entity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self.id.cmp(&other.id) {
            std::cmp::Ordering::Equal => self.generation.cmp(&other.generation),
            ord => ord,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.id.0, self.generation.0)
    }
}

/// An allocator for entities.
///
/// Allocates unique entity ids and recycles freed slots. When an entity is freed its slot
/// generation is incremented before the id goes back to the dead pool, invalidating every
/// outstanding copy of the old handle.
///
/// All mutation goes through `&mut self`; the allocator is owned by the world and driven from
/// the single simulation thread.
#[derive(Default, Debug)]
pub struct Allocator {
    /// Current generation for each slot, indexed by entity id.
    generations: Vec<Generation>,

    /// Slots currently holding a live entity.
    alive: FixedBitSet,

    /// Ids available for reuse, oldest first.
    dead_pool: SegQueue<Id>,
}

impl Allocator {
    /// Construct a new entity allocator starting from id 0.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new entity, either by reusing a freed slot from the dead pool (with its
    /// already bumped generation) or by growing the slot table with a fresh id at generation 0.
    pub fn alloc(&mut self) -> Entity {
        if let Some(id) = self.dead_pool.pop() {
            self.alive.insert(id.0 as usize);
            return Entity::new_with_generation(id, self.generations[id.0 as usize]);
        }

        let id = Id(self.generations.len() as u32);
        self.generations.push(Generation::FIRST);
        self.alive.grow(self.generations.len());
        self.alive.insert(id.0 as usize);
        Entity::new(id)
    }

    /// Allocate many new entities at once.
    ///
    /// Reuses entities from the dead pool first, then allocates new ids as needed.
    pub fn alloc_many(&mut self, count: usize) -> Vec<Entity> {
        let mut alloced = Vec::with_capacity(count);
        // Allocate as many as we can from the dead pool.
        while alloced.len() < count
            && let Some(id) = self.dead_pool.pop()
        {
            self.alive.insert(id.0 as usize);
            alloced.push(Entity::new_with_generation(
                id,
                self.generations[id.0 as usize],
            ));
        }

        // Allocate remaining as new sequential ids
        let remaining = count - alloced.len();
        if remaining > 0 {
            let start = self.generations.len();
            let end = start + remaining;
            self.generations.resize(end, Generation::FIRST);
            self.alive.grow(end);
            self.alive.insert_range(start..end);
            alloced.extend((start..end).map(|id| Entity::new(Id(id as u32))));
        }

        alloced
    }

    /// Free an entity for reuse.
    ///
    /// Returns `false` and leaves the allocator untouched if `entity` is stale (already freed,
    /// or never allocated by this allocator).
    pub fn free(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            warn!("Attempted to free an entity that is not alive: {entity}");
            return false;
        }

        let index = entity.index();
        self.generations[index] = self.generations[index].next();
        self.alive.set(index, false);
        self.dead_pool.push(entity.id);
        true
    }

    /// Check whether `entity` is the live occupant of its slot.
    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool {
        let index = entity.index();
        self.alive.contains(index) && self.generations[index] == entity.generation
    }

    /// Get the current generation stored for a slot, if the slot exists.
    #[inline]
    pub fn generation(&self, id: Id) -> Option<Generation> {
        self.generations.get(id.0 as usize).copied()
    }

    /// Number of live entities.
    #[inline]
    pub fn len(&self) -> usize {
        self.alive.count_ones(..)
    }

    /// Check if no entities are alive.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots ever created, live or dead.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.generations.len()
    }
}

#[test]
fn allocator_uniqueness() {
    // Given
    let mut allocator = Allocator::default();

    // When
    let mut entities = Vec::new();
    for _ in 0..200 {
        entities.push(allocator.alloc());
    }

    // Then - No dupes generated
    let pre_len = entities.len();
    entities.sort();
    entities.dedup();
    assert_eq!(pre_len, entities.len());
}

#[test]
fn allocator_reuse_bumps_generation() {
    // Given
    let mut allocator = Allocator::default();
    let entities = allocator.alloc_many(10);

    // When
    for e in &entities {
        assert!(allocator.free(*e));
    }
    let mut reused: Vec<_> = (0..10).map(|_| allocator.alloc()).collect();

    // Then - Same slots, next generation
    reused.sort();
    for (i, e) in reused.iter().enumerate() {
        assert_eq!(e.id.0, i as u32);
        assert_eq!(e.generation.0, 1);
    }
}

#[test]
fn generational_safety() {
    // Given
    let mut allocator = Allocator::default();
    let e = allocator.alloc();
    assert!(allocator.is_alive(e));

    // When
    allocator.free(e);
    let reused = allocator.alloc();

    // Then
    assert!(!allocator.is_alive(e));
    assert_eq!(reused.id(), e.id());
    assert_ne!(reused.generation(), e.generation());
    assert!(allocator.is_alive(reused));
    assert!(!allocator.is_alive(e));
}

#[test]
fn free_stale_handle_is_rejected() {
    // Given
    let mut allocator = Allocator::default();
    let e = allocator.alloc();
    assert!(allocator.free(e));

    // When
    let second = allocator.free(e);

    // Then - No double free, slot only pooled once
    assert!(!second);
    assert_eq!(allocator.dead_pool.len(), 1);
    assert_eq!(allocator.generation(e.id()), Some(Generation(1)));
}

#[test]
fn free_stale_handle_after_reuse_does_not_kill_new_occupant() {
    // Given
    let mut allocator = Allocator::default();
    let old = allocator.alloc();
    allocator.free(old);
    let new = allocator.alloc();

    // When
    let freed = allocator.free(old);

    // Then
    assert!(!freed);
    assert!(allocator.is_alive(new));
}

#[test]
fn allocator_recycles_fifo_before_growing() {
    // Given
    let mut allocator = Allocator::default();
    let entities = allocator.alloc_many(5);

    // When
    allocator.free(entities[3]);
    allocator.free(entities[1]);
    let a = allocator.alloc();
    let b = allocator.alloc();
    let c = allocator.alloc();

    // Then
    assert_eq!(a.id(), entities[3].id());
    assert_eq!(b.id(), entities[1].id());
    assert_eq!(c.id(), Id(5));
    assert_eq!(c.generation(), Generation::FIRST);
    assert_eq!(allocator.capacity(), 6);
    assert_eq!(allocator.len(), 6);
}

#[test]
fn allocator_alloc_many_mixed() {
    // Given
    let mut allocator = Allocator::default();
    for e in allocator.alloc_many(3) {
        allocator.free(e);
    }
    assert_eq!(allocator.dead_pool.len(), 3);

    // When - Allocate 5 (more than pool size)
    let entities = allocator.alloc_many(5);

    // Then - Should get 3 reused + 2 new
    assert_eq!(entities.len(), 5);
    let reused = entities.iter().filter(|e| e.generation.0 == 1).count();
    let mut new_ids: Vec<_> = entities
        .iter()
        .filter(|e| e.generation.0 == 0)
        .map(|e| e.id.0)
        .collect();
    new_ids.sort();
    assert_eq!(reused, 3);
    assert_eq!(new_ids, vec![3, 4]);
    assert!(entities.iter().all(|e| allocator.is_alive(*e)));
    assert_eq!(allocator.dead_pool.len(), 0);
}

#[test]
fn allocator_multiple_generations() {
    // Given
    let mut allocator = Allocator::default();
    let entity = allocator.alloc();

    // When - Free and reallocate multiple times
    allocator.free(entity);
    let gen1 = allocator.alloc();
    allocator.free(gen1);
    let gen2 = allocator.alloc();

    // Then - Same id, incrementing generations
    assert_eq!(gen1.id, entity.id);
    assert_eq!(gen1.generation.0, 1);
    assert_eq!(gen2.id, entity.id);
    assert_eq!(gen2.generation.0, 2);
}

#[test]
fn is_alive_unknown_slot() {
    // Given
    let allocator = Allocator::default();

    // Then
    assert!(!allocator.is_alive(Entity::new(Id(7))));
    assert!(allocator.is_empty());
}

#[test]
fn generation_wraps() {
    // Given
    let last = Generation(u32::MAX);

    // Then
    assert_eq!(last.next(), Generation::FIRST);
}

#[test]
fn entity_ordering() {
    // Given
    let e1 = Entity::new(Id(1));
    let e2 = Entity::new(Id(2));
    let e1_gen1 = e1.genned();

    // Then - Ordered by id first, then generation
    assert!(e1 < e2);
    assert!(e1 < e1_gen1);
    assert!(e1_gen1 < e2);
}

#[test]
fn entity_equality() {
    // Given
    let e1 = Entity::new(Id(42));
    let e2 = Entity::new(Id(42));
    let e3 = Entity::new(Id(43));

    // Then
    assert_eq!(e1, e2);
    assert_ne!(e1, e3);
    assert_ne!(e1, e1.genned());
}

#[test]
fn entity_bits() {
    // Given
    let e = Entity::new_with_generation(Id(42), Generation(7));

    // When
    let bits = e.to_bits();

    // Then
    assert_eq!(bits, (7u64 << 32) | 42);
    assert_eq!(Entity::from_bits(bits), e);
    assert_eq!(e.to_string(), "Entity(42v7)");
}
