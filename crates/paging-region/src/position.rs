use crate::{Size, SpaceId};
use core::cmp::Ordering;
use core::fmt;

/// One field index inside a specific coordinate space.
///
/// Positions of different spaces are incomparable: [`PartialOrd`] yields
/// `None` for them, and equality is always `false`.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Position {
    space: SpaceId,
    offset: u64,
}

impl Position {
    #[inline]
    #[must_use]
    pub const fn new(space: SpaceId, offset: u64) -> Self {
        Self { space, offset }
    }

    #[inline]
    #[must_use]
    pub const fn space(self) -> SpaceId {
        self.space
    }

    #[inline]
    #[must_use]
    pub const fn offset(self) -> u64 {
        self.offset
    }

    /// Checked advance by `size` fields, `None` on overflow.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, size: Size) -> Option<Self> {
        match self.offset.checked_add(size.as_u64()) {
            Some(offset) => Some(Self {
                space: self.space,
                offset,
            }),
            None => None,
        }
    }

    /// Align down to the nearest multiple of `granularity` fields.
    ///
    /// `granularity` must be non-zero; a zero granularity leaves the
    /// position unchanged.
    #[inline]
    #[must_use]
    pub const fn align_down(self, granularity: Size) -> Self {
        let g = granularity.as_u64();
        if g == 0 {
            return self;
        }
        Self {
            space: self.space,
            offset: self.offset - self.offset % g,
        }
    }

    /// Whether this position sits on a multiple of `granularity` fields.
    #[inline]
    #[must_use]
    pub const fn is_aligned_to(self, granularity: Size) -> bool {
        let g = granularity.as_u64();
        g != 0 && self.offset % g == 0
    }

    /// Re-tag this position into another space, keeping the offset.
    ///
    /// Used by swappers whose adjacent layers address the same field run
    /// under different space ids.
    #[inline]
    #[must_use]
    pub const fn in_space(self, space: SpaceId) -> Self {
        Self {
            space,
            offset: self.offset,
        }
    }
}

impl PartialOrd for Position {
    /// Total order by offset within one space; `None` across spaces.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.space == other.space {
            Some(self.offset.cmp(&other.offset))
        } else {
            None
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.offset, self.space)
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
