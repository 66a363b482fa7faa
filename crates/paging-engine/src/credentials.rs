use core::fmt;

/// Opaque authorization token passed to every mutating operation.
///
/// The engine itself does not interpret credentials; swap states and
/// drivers decide whether a given token is permitted and fail with
/// [`SwapError::Unauthorized`](crate::SwapError::Unauthorized) otherwise.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Credentials(u64);

impl Credentials {
    #[inline]
    #[must_use]
    pub const fn new(token: u64) -> Self {
        Self(token)
    }

    #[inline]
    #[must_use]
    pub const fn token(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "credentials#{}", self.0)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
