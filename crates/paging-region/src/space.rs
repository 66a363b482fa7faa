use crate::{Position, Region, RegionError};
use core::fmt;

/// Identifies one coordinate space.
///
/// Every storage layer addresses its contents in its own space; positions
/// and regions carry the id of the space they belong to, and mixing spaces
/// in arithmetic or comparisons is rejected.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SpaceId(u32);

impl SpaceId {
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "space#{}", self.0)
    }
}

impl fmt::Debug for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Factory for positions and regions of one coordinate space.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Space {
    id: SpaceId,
}

impl Space {
    #[inline]
    #[must_use]
    pub const fn new(id: SpaceId) -> Self {
        Self { id }
    }

    #[inline]
    #[must_use]
    pub const fn id(self) -> SpaceId {
        self.id
    }

    /// The position at `offset` fields from this space's origin.
    #[inline]
    #[must_use]
    pub const fn position(self, offset: u64) -> Position {
        Position::new(self.id, offset)
    }

    /// The region covering `[start, start + len)` fields.
    ///
    /// # Errors
    /// [`RegionError::Overflow`] if `start + len` does not fit in `u64`.
    #[inline]
    pub const fn region(self, start: u64, len: u64) -> Result<Region, RegionError> {
        Region::new(self.id, start, len)
    }

    /// The region between two positions of this space, end exclusive.
    ///
    /// # Errors
    /// [`RegionError::SpaceMismatch`] if either position belongs to another
    /// space, [`RegionError::Backwards`] if `end` precedes `start`.
    pub fn region_between(self, start: Position, end: Position) -> Result<Region, RegionError> {
        if start.space() != self.id || end.space() != self.id {
            return Err(RegionError::SpaceMismatch {
                left: self.id,
                right: if start.space() == self.id {
                    end.space()
                } else {
                    start.space()
                },
            });
        }
        if end.offset() < start.offset() {
            return Err(RegionError::Backwards {
                start: start.offset(),
                end: end.offset(),
            });
        }
        Region::new(self.id, start.offset(), end.offset() - start.offset())
    }

    /// An empty region anchored at the origin.
    #[inline]
    #[must_use]
    pub const fn empty(self) -> Region {
        match Region::new(self.id, 0, 0) {
            Ok(region) => region,
            Err(_) => unreachable!(),
        }
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.id, f)
    }
}
