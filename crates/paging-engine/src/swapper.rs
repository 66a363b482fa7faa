use crate::credentials::Credentials;
use crate::error::SwapError;
use crate::page::Page;
use crate::swap_state::SwapState;
use paging_buffer::Field;
use paging_region::{Position, Region, RegionError};
use std::sync::Arc;

/// Moves fields between two *adjacent* swap states.
///
/// A swapper is a pure copier: it never touches page tables or recency
/// bookkeeping, it only transfers the fields of one sub-region between an
/// out-page and an in-page. The position mapping
/// ([`in_position`](Self::in_position) / [`out_position`](Self::out_position))
/// is a bijection between the two states' coordinate spaces; swapping a
/// region in and back out must land on the fields it started from.
pub trait Swapper: Send + Sync {
    /// The more-swapped-out of the two states.
    fn out_state(&self) -> &Arc<SwapState>;

    /// The more-swapped-in of the two states.
    fn in_state(&self) -> &Arc<SwapState>;

    /// Map a position in the out state to its image in the in state.
    ///
    /// # Errors
    /// [`SwapError::Region`] when `out_position` is not in the out
    /// state's space.
    fn in_position(&self, out_position: Position) -> Result<Position, SwapError>;

    /// Map a position in the in state to its image in the out state.
    ///
    /// # Errors
    /// [`SwapError::Region`] when `in_position` is not in the in
    /// state's space.
    fn out_position(&self, in_position: Position) -> Result<Position, SwapError>;

    /// Copy `out_region` of `out_page` into `in_region` of `in_page`.
    ///
    /// # Errors
    /// [`SwapError::SizeMismatch`], [`SwapError::RegionOutsidePage`],
    /// or whatever the underlying transfer fails with.
    fn read_in(
        &self,
        credentials: Credentials,
        out_page: &Arc<Page>,
        out_region: Region,
        in_page: &Arc<Page>,
        in_region: Region,
    ) -> Result<(), SwapError>;

    /// Copy `in_region` of `in_page` into `out_region` of `out_page`.
    ///
    /// # Errors
    /// Like [`read_in`](Self::read_in).
    fn write_out(
        &self,
        credentials: Credentials,
        in_page: &Arc<Page>,
        in_region: Region,
        out_page: &Arc<Page>,
        out_region: Region,
    ) -> Result<(), SwapError>;
}

/// Sanity checks shared by the swapper implementations: equal transfer
/// sizes and both sub-regions actually inside their pages.
fn check_transfer(
    out_page: &Page,
    out_region: Region,
    in_page: &Page,
    in_region: Region,
) -> Result<(), SwapError> {
    if out_region.size() != in_region.size() {
        return Err(SwapError::SizeMismatch {
            out_region,
            in_region,
        });
    }
    for (page, region) in [(out_page, out_region), (in_page, in_region)] {
        if !page.region().contains_region(region) {
            return Err(SwapError::RegionOutsidePage {
                region,
                page_region: page.region(),
            });
        }
    }
    Ok(())
}

fn map_offset(position: Position, from: &SwapState, to: &SwapState) -> Result<Position, SwapError> {
    if position.space() != from.space() {
        return Err(RegionError::SpaceMismatch {
            left: from.space(),
            right: position.space(),
        }
        .into());
    }
    Ok(position.in_space(to.space()))
}

/// Swapper between a block-driver-backed out state and an in-memory in
/// state. Reading in pulls fields from the out-page's driver into the
/// in-page's buffer; writing out pushes them back.
pub struct BufferBlockSwapper {
    out_state: Arc<SwapState>,
    in_state: Arc<SwapState>,
}

impl BufferBlockSwapper {
    pub fn new(out_state: Arc<SwapState>, in_state: Arc<SwapState>) -> Self {
        Self {
            out_state,
            in_state,
        }
    }

    fn buffer_offset(page: &Page, region: Region) -> usize {
        (region.start().offset() - page.region().start().offset()) as usize
    }
}

impl Swapper for BufferBlockSwapper {
    fn out_state(&self) -> &Arc<SwapState> {
        &self.out_state
    }

    fn in_state(&self) -> &Arc<SwapState> {
        &self.in_state
    }

    fn in_position(&self, out_position: Position) -> Result<Position, SwapError> {
        map_offset(out_position, &self.out_state, &self.in_state)
    }

    fn out_position(&self, in_position: Position) -> Result<Position, SwapError> {
        map_offset(in_position, &self.in_state, &self.out_state)
    }

    fn read_in(
        &self,
        credentials: Credentials,
        out_page: &Arc<Page>,
        out_region: Region,
        in_page: &Arc<Page>,
        in_region: Region,
    ) -> Result<(), SwapError> {
        check_transfer(out_page, out_region, in_page, in_region)?;
        let driver = out_page.driver()?;
        let offset = Self::buffer_offset(in_page, in_region);
        let len = in_region.size().as_u64() as usize;
        in_page.with_fields_mut(|buffer| {
            let slice = buffer.slice_mut(offset, len)?;
            driver.read(credentials, out_region, slice)
        })?
    }

    fn write_out(
        &self,
        credentials: Credentials,
        in_page: &Arc<Page>,
        in_region: Region,
        out_page: &Arc<Page>,
        out_region: Region,
    ) -> Result<(), SwapError> {
        check_transfer(out_page, out_region, in_page, in_region)?;
        let driver = out_page.driver()?;
        let offset = Self::buffer_offset(in_page, in_region);
        let len = in_region.size().as_u64() as usize;
        in_page.with_fields(|buffer| {
            let slice = buffer.slice(offset, len)?;
            driver.write(credentials, out_region, slice)
        })?
    }
}

/// Swapper between two in-memory states, for chains with more than one
/// buffer-backed layer.
///
/// Transfers stage through a temporary vector so that the two page locks
/// are never held at once.
pub struct BufferSwapper {
    out_state: Arc<SwapState>,
    in_state: Arc<SwapState>,
}

impl BufferSwapper {
    pub fn new(out_state: Arc<SwapState>, in_state: Arc<SwapState>) -> Self {
        Self {
            out_state,
            in_state,
        }
    }

    fn copy(
        from_page: &Page,
        from_region: Region,
        to_page: &Page,
        to_region: Region,
    ) -> Result<(), SwapError> {
        let from_offset = (from_region.start().offset() - from_page.region().start().offset()) as usize;
        let to_offset = (to_region.start().offset() - to_page.region().start().offset()) as usize;
        let len = from_region.size().as_u64() as usize;

        let staged: Vec<Field> =
            from_page.with_fields(|buffer| buffer.slice(from_offset, len).map(<[Field]>::to_vec))??;
        to_page.with_fields_mut(|buffer| {
            buffer
                .slice_mut(to_offset, len)
                .map(|slice| slice.copy_from_slice(&staged))
        })??;
        Ok(())
    }
}

impl Swapper for BufferSwapper {
    fn out_state(&self) -> &Arc<SwapState> {
        &self.out_state
    }

    fn in_state(&self) -> &Arc<SwapState> {
        &self.in_state
    }

    fn in_position(&self, out_position: Position) -> Result<Position, SwapError> {
        map_offset(out_position, &self.out_state, &self.in_state)
    }

    fn out_position(&self, in_position: Position) -> Result<Position, SwapError> {
        map_offset(in_position, &self.in_state, &self.out_state)
    }

    fn read_in(
        &self,
        _credentials: Credentials,
        out_page: &Arc<Page>,
        out_region: Region,
        in_page: &Arc<Page>,
        in_region: Region,
    ) -> Result<(), SwapError> {
        check_transfer(out_page, out_region, in_page, in_region)?;
        Self::copy(out_page, out_region, in_page, in_region)
    }

    fn write_out(
        &self,
        _credentials: Credentials,
        in_page: &Arc<Page>,
        in_region: Region,
        out_page: &Arc<Page>,
        out_region: Region,
    ) -> Result<(), SwapError> {
        check_transfer(out_page, out_region, in_page, in_region)?;
        Self::copy(in_page, in_region, out_page, out_region)
    }
}
