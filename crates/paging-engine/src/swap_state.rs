use crate::credentials::Credentials;
use crate::driver::BlockDriver;
use crate::error::SwapError;
use crate::page::{Page, PagePayload};
use core::fmt;
use paging_buffer::Buffer;
use paging_region::{Region, RegionError, Size, SpaceId};
use std::collections::HashMap;
use std::sync::Arc;

/// Identity of a swap state within a swap system.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SwapStateId(u32);

impl SwapStateId {
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

impl fmt::Display for SwapStateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "swap-state#{}", self.0)
    }
}

impl fmt::Debug for SwapStateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// How pages of a swap state store their fields.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SwapStateKind {
    /// Pages carry an in-memory field buffer.
    Buffer,
    /// Pages address into a configured [`BlockDriver`].
    Block,
}

/// One storage layer: a fixed page size, a coordinate space and a page
/// factory.
///
/// Swap states are descriptions, not containers; the pages themselves
/// live in page tables. All states chained into one
/// [`SwapSystem`](crate::SwapSystem) must share one space and have page
/// sizes that are exact integer multiples of each other.
pub struct SwapState {
    id: SwapStateId,
    name: String,
    space: SpaceId,
    page_size: Size,
    kind: SwapStateKind,
}

impl SwapState {
    /// # Errors
    /// [`SwapError::OutOfMemory`] with a zero size when `page_size` is
    /// zero; pages of no fields cannot tile anything.
    pub fn new(
        id: SwapStateId,
        name: impl Into<String>,
        space: SpaceId,
        page_size: Size,
        kind: SwapStateKind,
    ) -> Result<Arc<Self>, SwapError> {
        if page_size.is_zero() {
            return Err(SwapError::OutOfMemory { page_size });
        }
        Ok(Arc::new(Self {
            id,
            name: name.into(),
            space,
            page_size,
            kind,
        }))
    }

    #[must_use]
    pub fn id(&self) -> SwapStateId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn space(&self) -> SpaceId {
        self.space
    }

    #[must_use]
    pub fn page_size(&self) -> Size {
        self.page_size
    }

    #[must_use]
    pub fn kind(&self) -> SwapStateKind {
        self.kind
    }

    /// Create an unpopulated page starting at `start`.
    ///
    /// The page covers exactly one page size worth of fields. For a
    /// [`Block`](SwapStateKind::Block) state the configured driver is
    /// consulted: the caller must be authorized and the page must fall
    /// inside the driver's extent.
    ///
    /// # Errors
    /// [`SwapError::MisalignedPage`] when `start` is not on a page
    /// boundary, [`SwapError::Region`] when it is in the wrong space,
    /// [`SwapError::MissingDriver`], [`SwapError::Unauthorized`] or
    /// [`SwapError::Io`] for driver-backed states.
    pub fn create_page(
        self: &Arc<Self>,
        credentials: Credentials,
        start: paging_region::Position,
        configuration: &SwapConfiguration,
    ) -> Result<Arc<Page>, SwapError> {
        if start.space() != self.space {
            return Err(RegionError::SpaceMismatch {
                left: self.space,
                right: start.space(),
            }
            .into());
        }
        if !start.is_aligned_to(self.page_size) {
            return Err(SwapError::MisalignedPage {
                position: start,
                page_size: self.page_size,
            });
        }
        let region = Region::new(self.space, start.offset(), self.page_size.as_u64())?;
        let payload = match self.kind {
            SwapStateKind::Buffer => {
                PagePayload::Fields(Buffer::new(self.page_size.as_u64() as usize))
            }
            SwapStateKind::Block => {
                let driver = configuration
                    .driver(self.id)
                    .ok_or(SwapError::MissingDriver { state: self.id })?;
                driver.authorize(credentials)?;
                if !driver.region().contains_region(region) {
                    return Err(SwapError::Io {
                        driver: driver.name().to_string(),
                        region,
                        reason: "page outside the driver extent".to_string(),
                    });
                }
                PagePayload::Block {
                    driver: Arc::clone(driver),
                }
            }
        };
        Ok(Page::new(Arc::clone(self), region, payload))
    }
}

impl fmt::Debug for SwapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwapState")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("space", &self.space)
            .field("page_size", &self.page_size)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Per-area wiring of swap states to the block drivers backing them.
///
/// A buffer-backed state needs no entry; a driver-backed state without
/// one fails page creation with
/// [`SwapError::MissingDriver`](crate::SwapError::MissingDriver).
#[derive(Default, Clone)]
pub struct SwapConfiguration {
    drivers: HashMap<SwapStateId, Arc<dyn BlockDriver>>,
}

impl SwapConfiguration {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Back `state` with `driver`.
    #[must_use]
    pub fn with_driver(mut self, state: SwapStateId, driver: Arc<dyn BlockDriver>) -> Self {
        self.drivers.insert(state, driver);
        self
    }

    #[must_use]
    pub fn driver(&self, state: SwapStateId) -> Option<&Arc<dyn BlockDriver>> {
        self.drivers.get(&state)
    }
}
