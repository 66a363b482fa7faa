use core::fmt;
use core::ops::{Add, Mul};

/// A count of fields, independent of any coordinate space.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct Size(u64);

impl Size {
    pub const ZERO: Self = Self(0);

    #[inline]
    #[must_use]
    pub const fn new(fields: u64) -> Self {
        Self(fields)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Whether this size is an exact multiple of `other`.
    ///
    /// A zero `other` never divides anything.
    #[inline]
    #[must_use]
    pub const fn is_multiple_of(self, other: Self) -> bool {
        other.0 != 0 && self.0 % other.0 == 0
    }

    /// Exact ratio `self / other`, `None` unless it divides cleanly.
    #[inline]
    #[must_use]
    pub const fn ratio(self, other: Self) -> Option<u64> {
        if other.0 != 0 && self.0 % other.0 == 0 {
            Some(self.0 / other.0)
        } else {
            None
        }
    }
}

impl Add for Size {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Mul<u64> for Size {
    type Output = Self;

    fn mul(self, rhs: u64) -> Self {
        Self(self.0 * rhs)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} fields", self.0)
    }
}

impl fmt::Debug for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_requires_clean_division() {
        assert_eq!(Size::new(4096).ratio(Size::new(512)), Some(8));
        assert_eq!(Size::new(4096).ratio(Size::new(24)), None);
        assert_eq!(Size::new(4096).ratio(Size::ZERO), None);
    }

    #[test]
    fn multiple_of_zero_is_false() {
        assert!(!Size::new(8).is_multiple_of(Size::ZERO));
        assert!(Size::new(8).is_multiple_of(Size::new(4)));
    }
}
