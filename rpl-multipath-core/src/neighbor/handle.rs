use std::fmt;

/// Generation-checked reference to an entry of a [`NeighborTable`].
///
/// The handle is made of the slot index and the generation of the slot at
/// the time the neighbor was inserted. When the entry is evicted the slot's
/// generation moves on, so a handle kept across an eviction no longer
/// resolves, even if the slot was since given to another neighbor.
///
/// [`NeighborTable`]: crate::neighbor::NeighborTable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NeighborHandle {
    index: u32,
    generation: u32,
}

impl NeighborHandle {
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NeighborHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.index, self.generation)
    }
}
