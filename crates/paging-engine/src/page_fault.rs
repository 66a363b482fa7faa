use crate::error::SwapError;
use crate::page::Page;
use crate::swap_state::SwapState;
use core::fmt;
use paging_region::Position;
use std::sync::Arc;

bitflags::bitflags! {
    /// Outcome bits of a handled page fault.
    #[derive(Copy, Clone, Eq, PartialEq, Debug)]
    pub struct PageFaultFlags: u32 {
        /// Handling ran out of memory creating a page.
        const OUT_OF_MEMORY = 1 << 0;
        /// A driver failed while swapping.
        const IO_ERROR = 1 << 1;
        /// No page covered the faulting position.
        const NO_PAGE = 1 << 2;
        /// The fault was raised on behalf of a write.
        const WRITE_ACCESS = 1 << 3;
        /// Swap steps actually ran; data moved between layers.
        const MAJOR = 1 << 4;
        /// The faulting page is pinned and cannot be swapped.
        const LOCKED = 1 << 5;
    }
}

impl PageFaultFlags {
    /// The flag a swap failure maps to.
    #[must_use]
    pub fn for_error(error: &SwapError) -> Self {
        match error {
            SwapError::OutOfMemory { .. } => Self::OUT_OF_MEMORY,
            SwapError::Io { .. } => Self::IO_ERROR,
            _ => Self::empty(),
        }
    }
}

/// A request to make the fields at one position resident in a target
/// swap state.
///
/// A fault is single-use: handling consumes it and yields a
/// [`ResolvedPageFault`]. It cannot be re-raised; raise a fresh fault
/// instead.
pub struct PageFault {
    position: Position,
    target: Arc<SwapState>,
    write_access: bool,
}

impl PageFault {
    /// A fault raised on behalf of a read.
    #[must_use]
    pub fn new(position: Position, target: Arc<SwapState>) -> Self {
        Self {
            position,
            target,
            write_access: false,
        }
    }

    /// A fault raised on behalf of a write.
    #[must_use]
    pub fn write(position: Position, target: Arc<SwapState>) -> Self {
        Self {
            position,
            target,
            write_access: true,
        }
    }

    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    /// The swap state the fields must end up resident in.
    #[must_use]
    pub fn target_state(&self) -> &Arc<SwapState> {
        &self.target
    }

    #[must_use]
    pub fn is_write(&self) -> bool {
        self.write_access
    }

    /// Consume the fault, recording its outcome.
    #[must_use]
    pub fn resolve(self, page: Option<Arc<Page>>, flags: PageFaultFlags) -> ResolvedPageFault {
        let mut flags = flags;
        if self.write_access {
            flags |= PageFaultFlags::WRITE_ACCESS;
        }
        ResolvedPageFault {
            position: self.position,
            page,
            flags,
        }
    }
}

impl fmt::Debug for PageFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageFault")
            .field("position", &self.position)
            .field("target", &self.target.name())
            .field("write_access", &self.write_access)
            .finish()
    }
}

/// The outcome of a handled [`PageFault`].
#[derive(Debug)]
pub struct ResolvedPageFault {
    position: Position,
    page: Option<Arc<Page>>,
    flags: PageFaultFlags,
}

impl ResolvedPageFault {
    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    /// The page now covering the faulting position, if handling
    /// succeeded.
    #[must_use]
    pub fn page(&self) -> Option<&Arc<Page>> {
        self.page.as_ref()
    }

    #[must_use]
    pub fn flags(&self) -> PageFaultFlags {
        self.flags
    }

    /// Whether swap steps ran to handle the fault.
    #[must_use]
    pub fn is_major(&self) -> bool {
        self.flags.contains(PageFaultFlags::MAJOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{buffer_state, test_space};
    use paging_region::Region;

    #[test]
    fn write_faults_carry_the_write_flag_through_resolution() {
        let state = buffer_state("ram", 8);
        let fault = PageFault::write(test_space().position(3), Arc::clone(&state));
        assert!(fault.is_write());

        let resolved = fault.resolve(None, PageFaultFlags::MAJOR);
        assert!(resolved
            .flags()
            .contains(PageFaultFlags::WRITE_ACCESS | PageFaultFlags::MAJOR));
        assert!(resolved.is_major());
        assert!(resolved.page().is_none());
    }

    #[test]
    fn read_faults_resolve_without_extra_flags() {
        let state = buffer_state("ram", 8);
        let fault = PageFault::new(test_space().position(0), state);
        let resolved = fault.resolve(None, PageFaultFlags::empty());
        assert_eq!(resolved.flags(), PageFaultFlags::empty());
        assert!(!resolved.is_major());
    }

    #[test]
    fn swap_errors_map_to_flags() {
        let s = test_space();
        let region = Region::new(s.id(), 0, 8).unwrap();
        let io = SwapError::Io {
            driver: "mem0".to_string(),
            region,
            reason: "boom".to_string(),
        };
        assert_eq!(PageFaultFlags::for_error(&io), PageFaultFlags::IO_ERROR);

        let oom = SwapError::OutOfMemory {
            page_size: paging_region::Size::new(8),
        };
        assert_eq!(
            PageFaultFlags::for_error(&oom),
            PageFaultFlags::OUT_OF_MEMORY
        );
    }
}
