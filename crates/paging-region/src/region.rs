use crate::{Position, RegionError, Size, SpaceId};
use core::fmt;

/// A contiguous, half-open run of positions `[start, start + len)` inside
/// one coordinate space.
///
/// A region may be empty (`len == 0`); empty regions contain nothing and
/// overlap nothing.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Region {
    space: SpaceId,
    start: u64,
    len: u64,
}

impl Region {
    /// # Errors
    /// [`RegionError::Overflow`] if `start + len` exceeds `u64::MAX`.
    pub const fn new(space: SpaceId, start: u64, len: u64) -> Result<Self, RegionError> {
        if start.checked_add(len).is_none() {
            return Err(RegionError::Overflow { start, len });
        }
        Ok(Self { space, start, len })
    }

    #[inline]
    #[must_use]
    pub const fn space(self) -> SpaceId {
        self.space
    }

    /// First position of the region.
    #[inline]
    #[must_use]
    pub const fn start(self) -> Position {
        Position::new(self.space, self.start)
    }

    /// One past the last position (exclusive end).
    #[inline]
    #[must_use]
    pub const fn end(self) -> Position {
        Position::new(self.space, self.start + self.len)
    }

    /// The last position covered, `None` for an empty region.
    #[inline]
    #[must_use]
    pub const fn last(self) -> Option<Position> {
        if self.len == 0 {
            None
        } else {
            Some(Position::new(self.space, self.start + self.len - 1))
        }
    }

    #[inline]
    #[must_use]
    pub const fn size(self) -> Size {
        Size::new(self.len)
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub const fn contains(self, position: Position) -> bool {
        position.space().as_u32() == self.space.as_u32()
            && position.offset() >= self.start
            && position.offset() < self.start + self.len
    }

    #[must_use]
    pub const fn contains_region(self, other: Self) -> bool {
        self.space.as_u32() == other.space.as_u32()
            && other.start >= self.start
            && other.start + other.len <= self.start + self.len
            && other.len > 0
    }

    /// Whether the two regions share at least one position.
    #[must_use]
    pub const fn overlaps(self, other: Self) -> bool {
        self.space.as_u32() == other.space.as_u32()
            && self.len > 0
            && other.len > 0
            && self.start < other.start + other.len
            && other.start < self.start + self.len
    }

    /// The shared sub-run of two regions, `None` if they do not overlap.
    #[must_use]
    pub const fn intersect(self, other: Self) -> Option<Self> {
        if !self.overlaps(other) {
            return None;
        }
        let start = if self.start > other.start {
            self.start
        } else {
            other.start
        };
        let end_a = self.start + self.len;
        let end_b = other.start + other.len;
        let end = if end_a < end_b { end_a } else { end_b };
        Some(Self {
            space: self.space,
            start,
            len: end - start,
        })
    }

    /// Whether both the start and the length sit on multiples of
    /// `granularity` fields (a page boundary check).
    #[must_use]
    pub const fn is_aligned_to(self, granularity: Size) -> bool {
        let g = granularity.as_u64();
        g != 0 && self.start % g == 0 && self.len % g == 0
    }

    /// Sub-run of this region, `offset` fields in, `len` fields long.
    ///
    /// # Errors
    /// [`RegionError::OutOfBounds`] if the sub-run does not fit.
    pub const fn subregion(self, offset: u64, len: u64) -> Result<Self, RegionError> {
        let Some(end) = offset.checked_add(len) else {
            return Err(RegionError::Overflow {
                start: offset,
                len,
            });
        };
        if end > self.len {
            return Err(RegionError::OutOfBounds {
                offset,
                len,
                within: self.len,
            });
        }
        Ok(Self {
            space: self.space,
            start: self.start + offset,
            len,
        })
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}..{})@{}",
            self.start,
            self.start + self.len,
            self.space
        )
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Space;

    fn space() -> Space {
        Space::new(SpaceId::new(1))
    }

    #[test]
    fn overlap_and_intersection() {
        let s = space();
        let a = s.region(0, 8).unwrap();
        let b = s.region(4, 8).unwrap();
        let c = s.region(8, 8).unwrap();

        assert!(a.overlaps(b));
        assert_eq!(a.intersect(b), Some(s.region(4, 4).unwrap()));
        // Touching regions do not overlap.
        assert!(!a.overlaps(c));
        assert_eq!(a.intersect(c), None);
    }

    #[test]
    fn other_space_never_overlaps() {
        let a = space().region(0, 8).unwrap();
        let b = Space::new(SpaceId::new(2)).region(0, 8).unwrap();
        assert!(!a.overlaps(b));
        assert!(!a.contains(b.start()));
    }

    #[test]
    fn empty_regions_contain_nothing() {
        let s = space();
        let empty = s.region(4, 0).unwrap();
        assert!(empty.is_empty());
        assert!(!empty.contains(s.position(4)));
        assert!(!empty.overlaps(s.region(0, 8).unwrap()));
        assert_eq!(empty.last(), None);
    }

    #[test]
    fn alignment_checks_start_and_length() {
        let s = space();
        assert!(s.region(16, 8).unwrap().is_aligned_to(Size::new(8)));
        assert!(!s.region(17, 8).unwrap().is_aligned_to(Size::new(8)));
        assert!(!s.region(16, 7).unwrap().is_aligned_to(Size::new(8)));
    }

    #[test]
    fn subregion_is_bounds_checked() {
        let s = space();
        let r = s.region(100, 50).unwrap();
        assert_eq!(r.subregion(10, 20).unwrap(), s.region(110, 20).unwrap());
        assert!(matches!(
            r.subregion(40, 20),
            Err(RegionError::OutOfBounds { .. })
        ));
    }
}
