//! Common component types used across benchmarks.
//!
//! These components are representative of real game components in terms of size and access
//! patterns.

use rusty_ecs_macros::Component;

/// 3D position component (12 bytes).
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Position {
    #[attribute(fourcc = "POSX")]
    pub x: f32,
    #[attribute(fourcc = "POSY")]
    pub y: f32,
    #[attribute(fourcc = "POSZ")]
    pub z: f32,
}

/// 3D velocity component (12 bytes).
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Velocity {
    #[attribute(fourcc = "VELX")]
    pub x: f32,
    #[attribute(fourcc = "VELY")]
    pub y: f32,
    #[attribute(fourcc = "VELZ")]
    pub z: f32,
}

/// Particle lifetime in seconds.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Lifetime {
    #[attribute(fourcc = "LIFE")]
    pub remaining: f32,
    #[attribute(fourcc = "LTOT")]
    pub total: f32,
}

/// RGBA color.
#[derive(Component, Clone, Copy, Debug)]
pub struct Color {
    #[attribute(fourcc = "RGBA")]
    pub rgba: [f32; 4],
}

impl Default for Color {
    fn default() -> Self {
        Self { rgba: [1.0; 4] }
    }
}

/// 4x4 transformation matrix (64 bytes), too large for a dynamic attribute.
#[derive(Component, Clone, Copy, Debug)]
pub struct Transform {
    #[attribute(skip)]
    pub matrix: [[f32; 4]; 4],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            matrix: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }
}
