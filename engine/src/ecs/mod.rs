pub mod attribute;
pub mod component;
pub mod entity;
pub mod error;
pub mod storage;
pub mod world;

pub use attribute::{FourCC, Value};
pub use component::{Component, Container};
pub use entity::Entity;
pub use error::{Error, Result};
pub use storage::Instance;
pub use world::{Id as WorldId, World};

pub use rusty_ecs_macros::Component;
