use crate::credentials::Credentials;
use crate::error::SwapError;
use paging_buffer::Field;
use paging_region::Region;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Backing storage for a driver-backed swap state.
///
/// Addresses are field-granular: `region` spans the driver's whole
/// addressable extent in the swap state's coordinate space, and reads and
/// writes move a sub-region of fields in one call. Calls may block for the
/// duration of the underlying I/O.
///
/// Every operation is credential-checked; an implementation rejects
/// callers it does not know with [`SwapError::Unauthorized`].
pub trait BlockDriver: Send + Sync {
    fn name(&self) -> &str;

    /// The addressable extent of this driver.
    fn region(&self) -> Region;

    /// Whether `credentials` may use this driver at all.
    ///
    /// # Errors
    /// [`SwapError::Unauthorized`] if not.
    fn authorize(&self, credentials: Credentials) -> Result<(), SwapError>;

    /// Copy `region` of the driver's storage into `into`.
    ///
    /// `into.len()` must equal the region's field count.
    ///
    /// # Errors
    /// [`SwapError::Unauthorized`] or [`SwapError::Io`].
    fn read(
        &self,
        credentials: Credentials,
        region: Region,
        into: &mut [Field],
    ) -> Result<(), SwapError>;

    /// Copy `from` into `region` of the driver's storage.
    ///
    /// `from.len()` must equal the region's field count.
    ///
    /// # Errors
    /// [`SwapError::Unauthorized`] or [`SwapError::Io`].
    fn write(
        &self,
        credentials: Credentials,
        region: Region,
        from: &[Field],
    ) -> Result<(), SwapError>;
}

/// In-memory [`BlockDriver`]: a plain field array behind a lock.
///
/// The reference driver for tests and for swap chains that only need a
/// second in-process layer. Optionally restricted to a set of permitted
/// credentials, and able to simulate I/O failure.
pub struct MemDriver {
    name: String,
    region: Region,
    /// `None` permits everyone.
    allowed: Option<HashSet<Credentials>>,
    fields: Mutex<Vec<Field>>,
    failing: std::sync::atomic::AtomicBool,
}

impl MemDriver {
    /// A driver covering `region`, zero-filled, open to all callers.
    #[must_use]
    pub fn new(name: impl Into<String>, region: Region) -> Self {
        Self {
            name: name.into(),
            region,
            allowed: None,
            fields: Mutex::new(vec![Field::EMPTY; region.size().as_u64() as usize]),
            failing: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Like [`new`](Self::new) but only `allowed` callers may touch it.
    #[must_use]
    pub fn restricted(
        name: impl Into<String>,
        region: Region,
        allowed: impl IntoIterator<Item = Credentials>,
    ) -> Self {
        Self {
            allowed: Some(allowed.into_iter().collect()),
            ..Self::new(name, region)
        }
    }

    /// Make every subsequent read/write fail with an I/O error.
    pub fn set_failing(&self, failing: bool) {
        self.failing
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }

    fn locked(&self) -> MutexGuard<'_, Vec<Field>> {
        self.fields.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn io_error(&self, region: Region, reason: &str) -> SwapError {
        SwapError::Io {
            driver: self.name.clone(),
            region,
            reason: reason.to_string(),
        }
    }

    fn check(&self, credentials: Credentials, region: Region, len: usize) -> Result<usize, SwapError> {
        self.authorize(credentials)?;
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(self.io_error(region, "injected failure"));
        }
        if !self.region.contains_region(region) {
            return Err(self.io_error(region, "outside the driver extent"));
        }
        if region.size().as_u64() != len as u64 {
            return Err(self.io_error(region, "transfer length mismatch"));
        }
        Ok((region.start().offset() - self.region.start().offset()) as usize)
    }
}

impl BlockDriver for MemDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn region(&self) -> Region {
        self.region
    }

    fn authorize(&self, credentials: Credentials) -> Result<(), SwapError> {
        match &self.allowed {
            Some(allowed) if !allowed.contains(&credentials) => {
                Err(SwapError::Unauthorized { credentials })
            }
            _ => Ok(()),
        }
    }

    fn read(
        &self,
        credentials: Credentials,
        region: Region,
        into: &mut [Field],
    ) -> Result<(), SwapError> {
        let offset = self.check(credentials, region, into.len())?;
        let fields = self.locked();
        into.copy_from_slice(&fields[offset..offset + into.len()]);
        Ok(())
    }

    fn write(
        &self,
        credentials: Credentials,
        region: Region,
        from: &[Field],
    ) -> Result<(), SwapError> {
        let offset = self.check(credentials, region, from.len())?;
        let mut fields = self.locked();
        fields[offset..offset + from.len()].copy_from_slice(from);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paging_region::{Space, SpaceId};

    fn space() -> Space {
        Space::new(SpaceId::new(1))
    }

    #[test]
    fn round_trips_a_sub_region() {
        let s = space();
        let driver = MemDriver::new("mem0", s.region(0, 1024).unwrap());
        let creds = Credentials::new(1);

        let data = [Field::new(7), Field::new(8)];
        driver
            .write(creds, s.region(512, 2).unwrap(), &data)
            .unwrap();

        let mut out = [Field::EMPTY; 2];
        driver
            .read(creds, s.region(512, 2).unwrap(), &mut out)
            .unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn rejects_unknown_credentials() {
        let s = space();
        let driver = MemDriver::restricted(
            "mem0",
            s.region(0, 64).unwrap(),
            [Credentials::new(1)],
        );

        let mut out = [Field::EMPTY; 1];
        let err = driver
            .read(Credentials::new(2), s.region(0, 1).unwrap(), &mut out)
            .unwrap_err();
        assert!(matches!(err, SwapError::Unauthorized { .. }));
    }

    #[test]
    fn rejects_out_of_extent_transfers() {
        let s = space();
        let driver = MemDriver::new("mem0", s.region(0, 64).unwrap());
        let err = driver
            .write(
                Credentials::new(1),
                s.region(60, 8).unwrap(),
                &[Field::EMPTY; 8],
            )
            .unwrap_err();
        assert!(matches!(err, SwapError::Io { .. }));
    }

    #[test]
    fn injected_failure_surfaces_as_io_error() {
        let s = space();
        let driver = MemDriver::new("mem0", s.region(0, 64).unwrap());
        driver.set_failing(true);

        let mut out = [Field::EMPTY; 1];
        let err = driver
            .read(Credentials::new(1), s.region(0, 1).unwrap(), &mut out)
            .unwrap_err();
        assert!(matches!(err, SwapError::Io { .. }));
    }
}
