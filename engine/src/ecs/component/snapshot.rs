use serde::{Deserialize, Serialize};

use crate::ecs::{
    entity::Entity,
    error::{Error, Result},
};

/// A serializable copy of a container's active rows, in instance order.
///
/// Built with [`Container::save`](super::Container::save) and written back with
/// [`Container::load`](super::Container::load). The wire format is whatever serde format the
/// caller picks; owners and rows are stored as two parallel sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<C> {
    owners: Vec<Entity>,
    rows: Vec<C>,
}

impl<C> Snapshot<C> {
    /// Build a snapshot from parallel owner and row sequences.
    ///
    /// Fails with [`Error::SnapshotMismatch`] if the lengths differ.
    pub fn new(owners: Vec<Entity>, rows: Vec<C>) -> Result<Self> {
        let snapshot = Self { owners, rows };
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the snapshot holds no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    pub fn owners(&self) -> &[Entity] {
        &self.owners
    }

    #[inline]
    pub fn rows(&self) -> &[C] {
        &self.rows
    }

    /// Deserialized snapshots skip [`Snapshot::new`], so loading checks again.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.owners.len() == self.rows.len() {
            Ok(())
        } else {
            Err(Error::SnapshotMismatch {
                owners: self.owners.len(),
                rows: self.rows.len(),
            })
        }
    }

    pub(crate) fn from_parts(owners: Vec<Entity>, rows: Vec<C>) -> Self {
        Self { owners, rows }
    }

    pub(crate) fn into_parts(self) -> (Vec<Entity>, Vec<C>) {
        (self.owners, self.rows)
    }
}
