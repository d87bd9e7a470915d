//! Particle system scenario.
//!
//! Maintains a fixed population of particles with Position, Velocity, Lifetime and Color. Every
//! frame particles move and age; particles whose lifetime ran out are either destroyed (their
//! rows leave through deletion callbacks) or soft-deregistered from their components and
//! recycled, and the frame ends with an optimize pass over every container.
//!
//! This scenario tests:
//! - Per-frame optimize cost under steady churn
//! - Deletion callback fan-out across four containers
//! - Entity slot recycling

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rusty_ecs::ecs::{Entity, World, WorldId, component::Config, storage::IndexKind};

use crate::components::{Color, Lifetime, Position, Velocity};
use crate::scenarios::Scenario;

/// Configuration for the particle scenario.
#[derive(Debug, Clone, Copy)]
pub struct ParticleConfig {
    /// Total number of particles to maintain.
    pub particle_count: usize,
    /// Simulated delta time per frame.
    pub delta_time: f32,
    /// Random seed for reproducibility.
    pub seed: u64,
    /// Index implementation for every container.
    pub index: IndexKind,
    /// Destroy dead particles instead of soft-deregistering them.
    pub destroy_dead: bool,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            particle_count: 100_000,
            delta_time: 1.0 / 60.0, // 60 FPS
            seed: 12345,
            index: IndexKind::default(),
            destroy_dead: true,
        }
    }
}

/// Particle system scenario.
pub struct ParticleScenario {
    config: ParticleConfig,
    world: World,
    rng: ChaCha8Rng,
    /// Particles soft-deregistered this frame.
    retired: Vec<Entity>,
    /// Particles waiting to be re-emitted.
    respawn: Vec<Entity>,
}

impl ParticleScenario {
    /// Create a new particle scenario with default config.
    pub fn new() -> Self {
        Self::with_config(ParticleConfig::default())
    }

    /// Create a new particle scenario with custom config.
    pub fn with_config(config: ParticleConfig) -> Self {
        Self {
            world: World::new(WorldId::new(0)),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            retired: Vec::new(),
            respawn: Vec::new(),
            config,
        }
    }

    /// Number of live particles.
    pub fn current_count(&self) -> usize {
        self.world.entities().len()
    }

    /// The scenario world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Register a particle's components with randomized values.
    fn emit(&mut self, entity: Entity) {
        let rng = &mut self.rng;
        let position = Position {
            x: rng.gen_range(-100.0..100.0),
            y: rng.gen_range(-100.0..100.0),
            z: rng.gen_range(-100.0..100.0),
        };
        let velocity = Velocity {
            x: rng.gen_range(-10.0..10.0),
            y: rng.gen_range(-10.0..10.0),
            z: rng.gen_range(-10.0..10.0),
        };
        let lifetime = Lifetime {
            remaining: rng.gen_range(0.1..2.0),
            total: 2.0,
        };
        let color = Color {
            rgba: [rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0), 1.0, 1.0],
        };

        // Components are registered in setup, so registration cannot fail here.
        if self.world.register_entity::<Position>(entity).is_ok()
            && let Some(row) = self.world.get_mut::<Position>(entity)
        {
            *row = position;
        }
        if self.world.register_entity::<Velocity>(entity).is_ok()
            && let Some(row) = self.world.get_mut::<Velocity>(entity)
        {
            *row = velocity;
        }
        if self.world.register_entity::<Lifetime>(entity).is_ok()
            && let Some(row) = self.world.get_mut::<Lifetime>(entity)
        {
            *row = lifetime;
        }
        if self.world.register_entity::<Color>(entity).is_ok()
            && let Some(row) = self.world.get_mut::<Color>(entity)
        {
            *row = color;
        }
    }

    /// Drop a dead particle from every component without destroying the entity.
    fn retire(&mut self, entity: Entity) {
        self.world.deregister_entity::<Position>(entity);
        self.world.deregister_entity::<Velocity>(entity);
        self.world.deregister_entity::<Lifetime>(entity);
        self.world.deregister_entity::<Color>(entity);
    }
}

impl Default for ParticleScenario {
    fn default() -> Self {
        Self::new()
    }
}

impl Scenario for ParticleScenario {
    fn name(&self) -> &'static str {
        "particles"
    }

    fn description(&self) -> &'static str {
        "High-volume particles with movement, lifetime and per-frame churn"
    }

    fn entity_count(&self) -> usize {
        self.config.particle_count
    }

    fn setup(&mut self) {
        let config = Config::default()
            .with_capacity(self.config.particle_count)
            .with_index(self.config.index);
        for result in [
            self.world.register_component_with::<Position>(config),
            self.world.register_component_with::<Velocity>(config),
            self.world.register_component_with::<Lifetime>(config),
            self.world.register_component_with::<Color>(config),
        ] {
            if let Err(err) = result {
                panic!("particle components must register cleanly: {err}");
            }
        }

        for entity in self.world.alloc_many(self.config.particle_count) {
            self.emit(entity);
        }
    }

    fn update(&mut self) {
        // Compact last frame's deregistrations before touching any instance.
        self.world.on_begin_frame();

        let dt = self.config.delta_time;
        let mut expired = Vec::new();
        if let Some(lifetimes) = self.world.component_mut::<Lifetime>() {
            for (_, entity, lifetime) in lifetimes.iter_mut() {
                lifetime.remaining -= dt;
                if lifetime.remaining <= 0.0 {
                    expired.push(entity);
                }
            }
        }

        let velocities: Vec<(Entity, Velocity)> = self
            .world
            .component::<Velocity>()
            .map(|container| container.iter().map(|(_, e, v)| (e, *v)).collect())
            .unwrap_or_default();
        if let Some(positions) = self.world.component_mut::<Position>() {
            for (entity, velocity) in velocities {
                if let Some(position) = positions.get_by_entity_mut(entity) {
                    position.x += velocity.x * dt;
                    position.y += velocity.y * dt;
                    position.z += velocity.z * dt;
                }
            }
        }

        for entity in expired {
            if self.config.destroy_dead {
                self.world.destroy(entity);
                let replacement = self.world.alloc();
                self.emit(replacement);
            } else {
                self.retire(entity);
                self.retired.push(entity);
            }
        }

        // Particles retired on the previous frame come back with fresh rows.
        if !self.config.destroy_dead {
            for entity in std::mem::take(&mut self.respawn) {
                self.emit(entity);
            }
            std::mem::swap(&mut self.respawn, &mut self.retired);
        }
    }

    fn teardown(&mut self) {
        self.world.destroy_all();
        self.retired.clear();
        self.respawn.clear();
    }
}
