//! Instance addressing for component containers.
//!
//! A component container stores its rows densely and finds them through a sparse index:
//!
//! ```text
//! ┌──────────────┐      ┌─────────────────┐      ┌──────────────────────┐
//! │  Entity      │ ───▶ │  Index          │ ───▶ │  Instance            │
//! │  (id, gen)   │      │  DynamicIndex / │      │  dense row position  │
//! │              │      │  HashIndex      │      │                      │
//! └──────────────┘      └─────────────────┘      └──────────────────────┘
//! ```
//!
//! The index stores the full entity next to each instance, so a stale handle for a recycled slot
//! never resolves to another entity's row. When compaction moves a row the container calls
//! [`Index::rekey`] to retarget the owner.

mod index;
mod instance;

pub use index::{DynamicIndex, HashIndex, Index, Indexer, Kind as IndexKind};
pub use instance::Instance;
