use thiserror::Error;

use crate::ecs::{
    attribute::{FourCC, ValueKind},
    entity::Entity,
    storage::Instance,
};

/// Recoverable errors raised by the component storage core.
///
/// Contract violations (registering an entity twice in the same container) are not represented
/// here; they panic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The entity's generation does not match the live occupant of its slot.
    #[error("invalid entity {0}")]
    InvalidEntity(Entity),

    /// The entity has no row in the container.
    #[error("{0} is not registered")]
    NotRegistered(Entity),

    /// The instance points past the end of the container.
    #[error("instance {instance} out of range for container of {len} rows")]
    IndexOutOfRange { instance: Instance, len: usize },

    /// The instance points at a row that has been deregistered.
    #[error("instance {0} refers to a deregistered row")]
    StaleInstance(Instance),

    /// A snapshot's owner and row sequences differ in length.
    #[error("snapshot holds {owners} owners but {rows} rows")]
    SnapshotMismatch { owners: usize, rows: usize },

    /// Loading would give an entity a second row in the container.
    #[error("{0} would own more than one row")]
    DuplicateOwner(Entity),

    /// No container is registered for the component type.
    #[error("component {0} is not registered with this world")]
    UnknownComponent(String),

    /// The component has no attribute with this code.
    #[error("unknown attribute {0}")]
    UnknownAttribute(FourCC),

    /// The component has no attribute at this position.
    #[error("attribute index {0} out of range")]
    AttributeIndex(usize),

    /// A dynamic value of the wrong kind was supplied for an attribute.
    #[error("attribute type mismatch: expected {expected}, found {found}")]
    AttributeType { expected: ValueKind, found: ValueKind },

    /// A FourCC was registered twice with different definitions.
    #[error("attribute {fourcc} already registered as `{existing}`, cannot register `{requested}`")]
    AttributeConflict {
        fourcc: FourCC,
        existing: &'static str,
        requested: &'static str,
    },
}

/// Result alias for fallible component operations.
pub type Result<T> = std::result::Result<T, Error>;
