//! Component attributes.
//!
//! Each component type describes its fields as a table of attribute [`Definition`]s. A definition
//! names the field, gives it a four character code ([`FourCC`]) that tools and scripts use to
//! address it, and records the [`ValueKind`] of the field so it can be read and written as a
//! dynamic [`Value`].
//!
//! Definitions are collected in a [`Registry`] owned by the world, so two component types cannot
//! claim the same code for different attributes.

mod value;

use std::fmt;

use dashmap::{DashMap, mapref::entry::Entry};

pub use value::{Attribute, Value, ValueKind};

use crate::ecs::error::{Error, Result};

/// A four character attribute code, packed big-endian into a `u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FourCC(u32);

impl FourCC {
    /// Construct a code from four bytes, e.g. `FourCC::new(*b"RANG")`.
    #[inline]
    pub const fn new(code: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(code))
    }

    /// Derive a code from an attribute name: the first four ASCII characters, upper-cased and
    /// padded with spaces.
    pub const fn from_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut code = [b' '; 4];
        let mut i = 0;
        while i < 4 && i < bytes.len() {
            code[i] = bytes[i].to_ascii_uppercase();
            i += 1;
        }
        Self::new(code)
    }

    /// Get the raw packed code.
    #[inline]
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Get the four code bytes.
    #[inline]
    pub const fn bytes(&self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl From<u32> for FourCC {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.bytes() {
            write!(f, "{}", byte as char)?;
        }
        Ok(())
    }
}

/// Describes one attribute of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Definition {
    name: &'static str,
    fourcc: FourCC,
    kind: ValueKind,
}

impl Definition {
    /// Construct a new attribute definition.
    #[inline]
    pub const fn new(name: &'static str, fourcc: FourCC, kind: ValueKind) -> Self {
        Self { name, fourcc, kind }
    }

    /// The attribute name.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The attribute code.
    #[inline]
    pub const fn fourcc(&self) -> FourCC {
        self.fourcc
    }

    /// The kind of value the attribute holds.
    #[inline]
    pub const fn kind(&self) -> ValueKind {
        self.kind
    }
}

/// A thread-safe attribute registry, mapping codes and names to their definitions.
///
/// Registration is idempotent for identical definitions, so every component type can register
/// its whole attribute table without coordinating with other types that share attributes.
#[derive(Debug, Default)]
pub struct Registry {
    by_fourcc: DashMap<FourCC, Definition>,
    by_name: DashMap<&'static str, FourCC>,
}

impl Registry {
    /// Create a new empty attribute registry.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an attribute definition.
    ///
    /// Returns [`Error::AttributeConflict`] if the code is already registered with a different
    /// definition.
    pub fn register(&self, definition: Definition) -> Result<()> {
        match self.by_fourcc.entry(definition.fourcc) {
            Entry::Occupied(entry) => {
                let existing = entry.get();
                if *existing == definition {
                    Ok(())
                } else {
                    Err(Error::AttributeConflict {
                        fourcc: definition.fourcc,
                        existing: existing.name,
                        requested: definition.name,
                    })
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(definition);
                self.by_name
                    .entry(definition.name)
                    .or_insert(definition.fourcc);
                Ok(())
            }
        }
    }

    /// Register every definition in `definitions`, or none of them if any conflicts with a
    /// registered definition or with another entry of `definitions`.
    pub fn register_all(&self, definitions: &[Definition]) -> Result<()> {
        for (position, definition) in definitions.iter().enumerate() {
            let earlier = definitions[..position]
                .iter()
                .find(|d| d.fourcc == definition.fourcc)
                .copied();
            let existing = earlier.or_else(|| self.get(definition.fourcc));
            if let Some(existing) = existing
                && existing != *definition
            {
                return Err(Error::AttributeConflict {
                    fourcc: definition.fourcc,
                    existing: existing.name,
                    requested: definition.name,
                });
            }
        }
        definitions.iter().try_for_each(|d| self.register(*d))
    }

    /// Get the definition for a code.
    #[inline]
    pub fn get(&self, fourcc: FourCC) -> Option<Definition> {
        self.by_fourcc.get(&fourcc).map(|entry| *entry.value())
    }

    /// Get the definition for an attribute name.
    pub fn get_by_name(&self, name: &str) -> Option<Definition> {
        let fourcc = *self.by_name.get(name)?.value();
        self.get(fourcc)
    }

    /// Number of registered attributes.
    #[inline]
    pub fn len(&self) -> usize {
        self.by_fourcc.len()
    }

    /// Check if no attributes are registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_fourcc.is_empty()
    }
}
