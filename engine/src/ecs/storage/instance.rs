use std::fmt;

/// A dense row position inside one component container.
///
/// Instances are only meaningful until the next structural change of the container that handed
/// them out (registration, immediate removal or an optimize pass). Callers re-resolve them from
/// the owning entity each frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instance(u32);

impl From<usize> for Instance {
    /// Get an instance from a usize row index.
    fn from(value: usize) -> Self {
        Self::new(value)
    }
}

impl Instance {
    /// Construct a new instance from a row index.
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Get the index used in the row vecs.
    #[inline]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    /// Get the raw instance value.
    #[inline]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
