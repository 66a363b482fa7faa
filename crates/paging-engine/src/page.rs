use crate::driver::BlockDriver;
use crate::error::SwapError;
use crate::swap_state::SwapState;
use core::fmt;
use paging_buffer::Buffer;
use paging_region::Region;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Process-unique page identity, assigned at creation and never reused.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PageId(u64);

impl PageId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page#{}", self.0)
    }
}

impl fmt::Debug for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// What a page's fields are stored in.
///
/// A page in an in-memory swap state carries its fields directly; a page
/// in a driver-backed state carries only a handle to the driver holding
/// them. A freed page carries nothing and every access fails.
pub enum PagePayload {
    /// Fields held in memory.
    Fields(Buffer),
    /// Fields held by a block driver; the page's region addresses into it.
    Block { driver: Arc<dyn BlockDriver> },
    /// The page has been torn down.
    Freed,
}

impl PagePayload {
    const fn kind_name(&self) -> &'static str {
        match self {
            Self::Fields(_) => "fields",
            Self::Block { .. } => "block",
            Self::Freed => "freed",
        }
    }
}

/// One fixed-size run of fields in exactly one [`SwapState`].
///
/// The region is immutable for the page's lifetime; swapping never
/// migrates a page between states, it creates a page in the other state
/// and copies. Reference counting ([`acquire`](Self::acquire) /
/// [`release`](Self::release)) tracks outside users so that
/// [`free`](Self::free) can refuse to tear down a page still in use.
pub struct Page {
    id: PageId,
    state: Arc<SwapState>,
    region: Region,
    refs: AtomicUsize,
    payload: Mutex<PagePayload>,
}

impl Page {
    pub(crate) fn new(state: Arc<SwapState>, region: Region, payload: PagePayload) -> Arc<Self> {
        Arc::new(Self {
            id: PageId::next(),
            state,
            region,
            refs: AtomicUsize::new(0),
            payload: Mutex::new(payload),
        })
    }

    #[must_use]
    pub fn id(&self) -> PageId {
        self.id
    }

    /// The swap state this page belongs to.
    #[must_use]
    pub fn swap_state(&self) -> &Arc<SwapState> {
        &self.state
    }

    /// The run of fields this page covers, in its state's space.
    #[must_use]
    pub fn region(&self) -> Region {
        self.region
    }

    /// Register one more outside user. Returns the new count.
    pub fn acquire(&self) -> usize {
        self.refs.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Drop one outside user. Returns the new count; saturates at zero.
    pub fn release(&self) -> usize {
        self.refs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |refs| {
                refs.checked_sub(1)
            })
            .map_or(0, |previous| previous - 1)
    }

    #[must_use]
    pub fn refs(&self) -> usize {
        self.refs.load(Ordering::SeqCst)
    }

    /// Tear the page down, dropping its payload.
    ///
    /// # Errors
    /// [`SwapError::StillReferenced`] while anyone still holds a
    /// reference; the payload is left intact in that case.
    pub fn free(&self) -> Result<(), SwapError> {
        let mut payload = self.locked();
        let refs = self.refs();
        if refs > 0 {
            return Err(SwapError::StillReferenced {
                page: self.id,
                refs,
            });
        }
        *payload = PagePayload::Freed;
        Ok(())
    }

    #[must_use]
    pub fn is_freed(&self) -> bool {
        matches!(&*self.locked(), PagePayload::Freed)
    }

    /// Run `f` against the page's in-memory fields.
    ///
    /// # Errors
    /// [`SwapError::WrongPayload`] for a driver-backed page,
    /// [`SwapError::PageFreed`] for a freed one.
    pub fn with_fields<R>(&self, f: impl FnOnce(&Buffer) -> R) -> Result<R, SwapError> {
        match &*self.locked() {
            PagePayload::Fields(buffer) => Ok(f(buffer)),
            PagePayload::Block { .. } => Err(self.wrong_payload("fields")),
            PagePayload::Freed => Err(SwapError::PageFreed { page: self.id }),
        }
    }

    /// Run `f` against the page's in-memory fields, mutably.
    ///
    /// # Errors
    /// Like [`with_fields`](Self::with_fields).
    pub fn with_fields_mut<R>(&self, f: impl FnOnce(&mut Buffer) -> R) -> Result<R, SwapError> {
        match &mut *self.locked() {
            PagePayload::Fields(buffer) => Ok(f(buffer)),
            PagePayload::Block { .. } => Err(self.wrong_payload("fields")),
            PagePayload::Freed => Err(SwapError::PageFreed { page: self.id }),
        }
    }

    /// The block driver holding this page's fields.
    ///
    /// # Errors
    /// [`SwapError::WrongPayload`] for an in-memory page,
    /// [`SwapError::PageFreed`] for a freed one.
    pub fn driver(&self) -> Result<Arc<dyn BlockDriver>, SwapError> {
        match &*self.locked() {
            PagePayload::Block { driver } => Ok(Arc::clone(driver)),
            PagePayload::Fields(_) => Err(self.wrong_payload("block")),
            PagePayload::Freed => Err(SwapError::PageFreed { page: self.id }),
        }
    }

    fn wrong_payload(&self, expected: &'static str) -> SwapError {
        SwapError::WrongPayload {
            page: self.id,
            expected,
        }
    }

    fn locked(&self) -> MutexGuard<'_, PagePayload> {
        self.payload.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.id)
            .field("state", &self.state.name())
            .field("region", &self.region)
            .field("refs", &self.refs())
            .field("payload", &self.locked().kind_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{buffer_state, test_space};
    use paging_buffer::Field;

    fn fields_page() -> Arc<Page> {
        let state = buffer_state("ram", 8);
        let region = test_space().region(0, 8).unwrap();
        Page::new(state, region, PagePayload::Fields(Buffer::new(8)))
    }

    #[test]
    fn ids_are_unique() {
        let a = fields_page();
        let b = fields_page();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn field_access_round_trips() {
        let page = fields_page();
        page.with_fields_mut(|buffer| buffer.set(3, Field::new(42)))
            .unwrap()
            .unwrap();
        let field = page.with_fields(|buffer| buffer.get(3)).unwrap().unwrap();
        assert_eq!(field, Field::new(42));
    }

    #[test]
    fn fields_page_has_no_driver() {
        let page = fields_page();
        assert!(matches!(
            page.driver(),
            Err(SwapError::WrongPayload { expected: "block", .. })
        ));
    }

    #[test]
    fn free_refuses_while_referenced() {
        let page = fields_page();
        assert_eq!(page.acquire(), 1);
        assert!(matches!(
            page.free(),
            Err(SwapError::StillReferenced { refs: 1, .. })
        ));
        assert_eq!(page.release(), 0);
        page.free().unwrap();
        assert!(page.is_freed());
        assert!(matches!(
            page.with_fields(|_| ()),
            Err(SwapError::PageFreed { .. })
        ));
    }

    #[test]
    fn acquire_and_release_report_the_new_count() {
        let page = fields_page();
        assert_eq!(page.acquire(), 1);
        assert_eq!(page.acquire(), 2);
        assert_eq!(page.release(), 1);
        assert_eq!(page.release(), 0);
        assert_eq!(page.refs(), 0);
    }

    #[test]
    fn release_saturates_at_zero() {
        let page = fields_page();
        assert_eq!(page.release(), 0);
        assert_eq!(page.refs(), 0);
    }
}
