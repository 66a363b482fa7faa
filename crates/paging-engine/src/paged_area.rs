use crate::credentials::Credentials;
use crate::error::{MemoryError, SwapError};
use crate::kernel_paging::KernelPaging;
use crate::page::Page;
use crate::page_fault::{PageFault, PageFaultFlags, ResolvedPageFault};
use crate::page_table::PageTable;
use crate::swap_state::SwapConfiguration;
use crate::swap_system::SwapSystem;
use core::fmt;
use paging_buffer::Field;
use paging_region::{Position, Region, Size};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Identity of a paged area.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PagedAreaId(u64);

impl PagedAreaId {
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PagedAreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "paged-area#{}", self.0)
    }
}

impl fmt::Debug for PagedAreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A contiguous run of virtual fields backed by a [`SwapSystem`].
///
/// The area is the façade the rest of the system talks to: reads and
/// writes address any position inside the covered region and the area
/// faults the right pages up to the swapped-in-to-fields state on
/// demand, creating unpopulated most-swapped-out pages for gaps that
/// have never been touched.
///
/// One lock serializes every swapping operation of the area, so a read,
/// write, fault, resize or synchronize may block for the duration of
/// another caller's driver I/O. The shared [`KernelPaging`] has its own
/// lock and is safe to consult concurrently.
pub struct PagedArea {
    id: PagedAreaId,
    swap_system: Arc<SwapSystem>,
    configuration: SwapConfiguration,
    kernel_paging: Arc<KernelPaging>,
    page_table: PageTable,
    covered: Mutex<Region>,
    swap_lock: Mutex<()>,
}

impl PagedArea {
    /// An area covering `region`, initially with no resident pages.
    ///
    /// The region must sit in the swap system's space and be aligned to
    /// the system's swap span, both in start and in length, so that
    /// every span-aligned window the planner works on stays inside the
    /// area.
    ///
    /// # Errors
    /// [`SwapError::MisalignedPage`] or a space mismatch.
    pub fn new(
        id: PagedAreaId,
        swap_system: Arc<SwapSystem>,
        configuration: SwapConfiguration,
        kernel_paging: Arc<KernelPaging>,
        region: Region,
    ) -> Result<Arc<Self>, MemoryError> {
        Self::check_span_aligned(&swap_system, region)?;
        let page_table = PageTable::new(swap_system.space(), Arc::clone(&kernel_paging));
        Ok(Arc::new(Self {
            id,
            swap_system,
            configuration,
            kernel_paging,
            page_table,
            covered: Mutex::new(region),
            swap_lock: Mutex::new(()),
        }))
    }

    fn check_span_aligned(swap_system: &SwapSystem, region: Region) -> Result<(), MemoryError> {
        if region.space() != swap_system.space() {
            return Err(MemoryError::PageTable(
                crate::error::PageTableError::SpaceMismatch {
                    expected: swap_system.space(),
                    actual: region.space(),
                },
            ));
        }
        let span = swap_system.swap_span();
        if !region.is_aligned_to(span) {
            return Err(SwapError::MisalignedPage {
                position: region.start(),
                page_size: span,
            }
            .into());
        }
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> PagedAreaId {
        self.id
    }

    #[must_use]
    pub fn swap_system(&self) -> &Arc<SwapSystem> {
        &self.swap_system
    }

    #[must_use]
    pub fn swap_configuration(&self) -> &SwapConfiguration {
        &self.configuration
    }

    #[must_use]
    pub fn kernel_paging(&self) -> &Arc<KernelPaging> {
        &self.kernel_paging
    }

    #[must_use]
    pub fn page_table(&self) -> &PageTable {
        &self.page_table
    }

    /// The region this area currently covers.
    #[must_use]
    pub fn region(&self) -> Region {
        *self.covered.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read fields starting at `start` into `into`.
    ///
    /// Faults pages in as needed. Reads past the end of the area are
    /// truncated; the returned count says how many fields were read.
    /// Touched pages become most recent.
    ///
    /// # Errors
    /// [`MemoryError::OutOfArea`] when `start` is outside the area, or
    /// whatever faulting the pages in fails with.
    pub fn read(
        &self,
        credentials: Credentials,
        start: Position,
        into: &mut [Field],
    ) -> Result<usize, MemoryError> {
        let _guard = self.swap_guard();
        self.read_locked(credentials, start, into)
    }

    /// Write `from` starting at `start`.
    ///
    /// Faults pages in as needed, truncates at the end of the area and
    /// returns the count written. Touched pages become dirty and most
    /// recent.
    ///
    /// # Errors
    /// Like [`read`](Self::read).
    pub fn write(
        &self,
        credentials: Credentials,
        start: Position,
        from: &[Field],
    ) -> Result<usize, MemoryError> {
        let _guard = self.swap_guard();
        self.write_locked(credentials, start, from)
    }

    /// Read the single field at `position`.
    ///
    /// # Errors
    /// Like [`read`](Self::read).
    pub fn read_field(
        &self,
        credentials: Credentials,
        position: Position,
    ) -> Result<Field, MemoryError> {
        let mut one = [Field::EMPTY];
        self.read(credentials, position, &mut one)?;
        Ok(one[0])
    }

    /// Write the single field at `position`.
    ///
    /// # Errors
    /// Like [`read`](Self::read).
    pub fn write_field(
        &self,
        credentials: Credentials,
        position: Position,
        field: Field,
    ) -> Result<(), MemoryError> {
        self.write(credentials, position, &[field])?;
        Ok(())
    }

    /// Handle `fault`, making its position resident in its target
    /// state.
    ///
    /// Consumes the fault; the outcome carries the covering page and
    /// flags. [`MAJOR`](PageFaultFlags::MAJOR) is set when swap steps
    /// actually ran, [`NO_PAGE`](PageFaultFlags::NO_PAGE) when the
    /// position fell in a gap that had to be populated first.
    ///
    /// # Errors
    /// [`MemoryError::OutOfArea`] for positions outside the area;
    /// otherwise the planner's or the failing step's error. Steps
    /// completed before a failure stay committed.
    pub fn page_fault(
        &self,
        credentials: Credentials,
        fault: PageFault,
    ) -> Result<ResolvedPageFault, MemoryError> {
        let _guard = self.swap_guard();
        self.fault_locked(credentials, fault)
    }

    /// Re-cover the area with `region`, keeping resident pages that
    /// still fit.
    ///
    /// The start must be span-aligned; the length is rounded up to the
    /// next span multiple. Pages outside the new region are withdrawn
    /// and freed without write-back; dirty fields outside the new
    /// region are lost. Returns the previously covered region.
    ///
    /// # Errors
    /// [`SwapError::MisalignedPage`], a space mismatch, or the first
    /// failure freeing an evicted page (the resize itself still
    /// completes).
    pub fn resize(&self, _credentials: Credentials, region: Region) -> Result<Region, MemoryError> {
        let _guard = self.swap_guard();
        let span = self.swap_system.swap_span();
        let rounded = round_up(region.size(), span);
        let aligned = Region::new(region.space(), region.start().offset(), rounded.as_u64())?;
        Self::check_span_aligned(&self.swap_system, aligned)?;

        let old = {
            let mut covered = self.covered.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *covered, aligned)
        };

        let mut first_error = None;
        for page in self.resident_pages() {
            if aligned.contains_region(page.region()) {
                continue;
            }
            self.page_table.remove(&page)?;
            if let Err(error) = page.free() {
                log::warn!("{}: failed to free evicted {}: {error}", self.id, page.id());
                first_error.get_or_insert(error);
            }
        }
        match first_error {
            Some(error) => Err(error.into()),
            None => Ok(old),
        }
    }

    /// Reconcile one in-page with the out-page sharing its fields.
    ///
    /// A dirty in-page is written out through the swapper joining the
    /// two states; a clean one is re-read from the out-page. Either way
    /// the in-page ends up clean.
    ///
    /// # Errors
    /// [`SwapError::PagesDisjoint`] when the two pages share no fields,
    /// [`SwapError::NoSuchSwapper`] when their states are not adjacent,
    /// or the transfer's own error.
    pub fn synchronize(
        &self,
        credentials: Credentials,
        in_page: &Arc<Page>,
        out_page: &Arc<Page>,
    ) -> Result<(), MemoryError> {
        let _guard = self.swap_guard();
        let common = in_page
            .region()
            .intersect(out_page.region())
            .ok_or(SwapError::PagesDisjoint {
                out_region: out_page.region(),
                in_region: in_page.region(),
            })?;
        let swapper = self
            .swap_system
            .swapper(out_page.swap_state().id(), in_page.swap_state().id())?;
        if self.kernel_paging.is_dirty(in_page) {
            swapper.write_out(credentials, in_page, common, out_page, common)?;
        } else {
            swapper.read_in(credentials, out_page, common, in_page, common)?;
        }
        self.kernel_paging.clean(in_page);
        Ok(())
    }

    /// Tear the area down: withdraw and free every resident page.
    ///
    /// Best-effort; every page is attempted and the first failure is
    /// reported. Dirty fields are not written back.
    ///
    /// # Errors
    /// The first page that could not be withdrawn or freed.
    pub fn free(&self) -> Result<(), MemoryError> {
        let _guard = self.swap_guard();
        let mut first_error: Option<MemoryError> = None;
        for page in self.resident_pages() {
            if let Err(error) = self.page_table.remove(&page) {
                first_error.get_or_insert(error.into());
                continue;
            }
            if let Err(error) = page.free() {
                first_error.get_or_insert(error.into());
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn read_locked(
        &self,
        credentials: Credentials,
        start: Position,
        into: &mut [Field],
    ) -> Result<usize, MemoryError> {
        if into.is_empty() {
            return Ok(0);
        }
        let region = self.clamped(start, into.len())?;
        let pages = self.fields_resident(credentials, region, false)?;
        for page in &pages {
            let Some(overlap) = page.region().intersect(region) else {
                continue;
            };
            let page_offset = (overlap.start().offset() - page.region().start().offset()) as usize;
            let into_offset = (overlap.start().offset() - region.start().offset()) as usize;
            let len = overlap.size().as_u64() as usize;
            page.with_fields(|buffer| {
                buffer.slice(page_offset, len).map(|slice| {
                    into[into_offset..into_offset + len].copy_from_slice(slice);
                })
            })??;
            self.kernel_paging.recent(page);
        }
        Ok(region.size().as_u64() as usize)
    }

    fn write_locked(
        &self,
        credentials: Credentials,
        start: Position,
        from: &[Field],
    ) -> Result<usize, MemoryError> {
        if from.is_empty() {
            return Ok(0);
        }
        let region = self.clamped(start, from.len())?;
        let pages = self.fields_resident(credentials, region, true)?;
        for page in &pages {
            let Some(overlap) = page.region().intersect(region) else {
                continue;
            };
            let page_offset = (overlap.start().offset() - page.region().start().offset()) as usize;
            let from_offset = (overlap.start().offset() - region.start().offset()) as usize;
            let len = overlap.size().as_u64() as usize;
            page.with_fields_mut(|buffer| {
                buffer.slice_mut(page_offset, len).map(|slice| {
                    slice.copy_from_slice(&from[from_offset..from_offset + len]);
                })
            })??;
            self.kernel_paging.dirty(page);
            self.kernel_paging.recent(page);
        }
        Ok(region.size().as_u64() as usize)
    }

    /// Clamp a transfer of `len` fields at `start` to the covered
    /// region.
    fn clamped(&self, start: Position, len: usize) -> Result<Region, MemoryError> {
        let covered = self.region();
        if !covered.contains(start) {
            return Err(MemoryError::OutOfArea { position: start });
        }
        // An overflowing end clamps to the covered region like any other
        // transfer running past it.
        let end = start
            .checked_add(Size::new(len as u64))
            .map_or(covered.end().offset(), |end| {
                end.offset().min(covered.end().offset())
            });
        Ok(Region::new(
            covered.space(),
            start.offset(),
            end - start.offset(),
        )?)
    }

    /// Make every page overlapping `region` resident in the
    /// swapped-in-to-fields state, populating unpaged gaps with fresh
    /// most-swapped-out pages first.
    fn fields_resident(
        &self,
        credentials: Credentials,
        region: Region,
        write_access: bool,
    ) -> Result<Vec<Arc<Page>>, MemoryError> {
        let fields_state = Arc::clone(self.swap_system.swapped_in_to_fields());
        let span = self.swap_system.swap_span();
        let mut window_start = region.start().align_down(span);
        while window_start.offset() < region.end().offset() {
            let window = Region::new(region.space(), window_start.offset(), span.as_u64())?;
            self.populate_window(credentials, window)?;
            let swapped_out = self
                .page_table
                .pages(window)?
                .into_iter()
                .find(|page| page.swap_state().id() != fields_state.id());
            if let Some(page) = swapped_out {
                let position = page.region().start();
                let fault = if write_access {
                    PageFault::write(position, Arc::clone(&fields_state))
                } else {
                    PageFault::new(position, Arc::clone(&fields_state))
                };
                self.fault_locked(credentials, fault)?;
            }
            window_start = Position::new(
                window_start.space(),
                window_start.offset() + span.as_u64(),
            );
        }
        Ok(self.page_table.pages(region)?)
    }

    /// Create unpopulated most-swapped-out pages for every unpaged slot
    /// of `window`. Returns whether anything was created.
    fn populate_window(
        &self,
        credentials: Credentials,
        window: Region,
    ) -> Result<bool, MemoryError> {
        let out_state = self.swap_system.most_swapped_out();
        let slot = out_state.page_size();
        let mut created = Vec::new();
        let mut offset = window.start().offset();
        while offset < window.end().offset() {
            let slot_region = Region::new(window.space(), offset, slot.as_u64())?;
            if self.page_table.pages(slot_region)?.is_empty() {
                let page = out_state.create_page(
                    credentials,
                    slot_region.start(),
                    &self.configuration,
                )?;
                created.push(page);
            }
            offset += slot.as_u64();
        }
        if created.is_empty() {
            return Ok(false);
        }
        self.page_table.put(&created)?;
        Ok(true)
    }

    fn fault_locked(
        &self,
        credentials: Credentials,
        fault: PageFault,
    ) -> Result<ResolvedPageFault, MemoryError> {
        let position = fault.position();
        if !self.region().contains(position) {
            return Err(MemoryError::OutOfArea { position });
        }
        let span = self.swap_system.swap_span();
        let window = Region::new(
            position.space(),
            position.align_down(span).offset(),
            span.as_u64(),
        )?;
        let populated = self.populate_window(credentials, window)?;

        let operation = self.swap_system.create_swap_operation(
            credentials,
            &self.page_table,
            &self.configuration,
            position,
            fault.target_state(),
        )?;
        if let Err(error) = operation.swap(credentials) {
            log::warn!(
                "{}: fault at {position} failed ({:?}): {error}",
                self.id,
                PageFaultFlags::for_error(&error),
            );
            return Err(error.into());
        }
        if !operation.is_empty() {
            // The fault replaces every page of the window that is not
            // already in the target state; page sizes differ between
            // states, so the consumed pages must be withdrawn before
            // the differently-cut target pages can land.
            for page in self.page_table.pages(window)? {
                if page.swap_state().id() != fault.target_state().id() {
                    self.page_table.remove(&page)?;
                    if let Err(error) = page.free() {
                        log::debug!("{}: consumed {} not freed: {error}", self.id, page.id());
                    }
                }
            }
            self.page_table.put(&operation.target_pages())?;
        }

        let page = self.page_table.page(position)?;
        let mut flags = PageFaultFlags::empty();
        if !operation.is_empty() {
            flags |= PageFaultFlags::MAJOR;
        }
        if populated {
            flags |= PageFaultFlags::NO_PAGE;
        }
        Ok(fault.resolve(Some(page), flags))
    }

    fn resident_pages(&self) -> Vec<Arc<Page>> {
        self.page_table
            .region()
            .bounding()
            .map(|bounding| self.page_table.pages(bounding).unwrap_or_default())
            .unwrap_or_default()
    }

    fn swap_guard(&self) -> MutexGuard<'_, ()> {
        self.swap_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for PagedArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagedArea")
            .field("id", &self.id)
            .field("region", &self.region())
            .field("resident", &self.page_table.len())
            .finish()
    }
}

fn round_up(size: Size, granularity: Size) -> Size {
    let granule = granularity.as_u64();
    if granule == 0 {
        return size;
    }
    Size::new(size.as_u64().div_ceil(granule) * granule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{BlockDriver, MemDriver};
    use crate::swap_state::SwapState;
    use crate::swapper::{BufferBlockSwapper, Swapper};
    use crate::testing::{block_state, buffer_state, test_space, TEST_CREDENTIALS};

    struct Fixture {
        area: Arc<PagedArea>,
        kernel_paging: Arc<KernelPaging>,
        driver: Arc<MemDriver>,
        disk: Arc<SwapState>,
        ram: Arc<SwapState>,
    }

    /// 512-field driver-backed pages under 4096-field in-memory pages,
    /// area and driver both covering fields 0..8192.
    fn fixture() -> Fixture {
        let s = test_space();
        let disk = block_state("disk", 512);
        let ram = buffer_state("ram", 4096);
        let driver = Arc::new(MemDriver::new("mem0", s.region(0, 8192).unwrap()));
        let configuration = SwapConfiguration::new()
            .with_driver(disk.id(), Arc::clone(&driver) as Arc<dyn BlockDriver>);
        let swapper: Arc<dyn Swapper> = Arc::new(BufferBlockSwapper::new(
            Arc::clone(&disk),
            Arc::clone(&ram),
        ));
        let system = Arc::new(SwapSystem::new(vec![swapper], &ram).unwrap());
        let kernel_paging = Arc::new(KernelPaging::new());
        let area = PagedArea::new(
            PagedAreaId::new(1),
            system,
            configuration,
            Arc::clone(&kernel_paging),
            s.region(0, 8192).unwrap(),
        )
        .unwrap();
        Fixture {
            area,
            kernel_paging,
            driver,
            disk,
            ram,
        }
    }

    #[test]
    fn first_touch_faults_a_whole_window_in() {
        let fixture = fixture();
        let s = test_space();
        fixture
            .driver
            .write(
                TEST_CREDENTIALS,
                s.region(5000, 1).unwrap(),
                &[Field::new(77)],
            )
            .unwrap();

        let field = fixture
            .area
            .read_field(TEST_CREDENTIALS, s.position(5000))
            .unwrap();
        assert_eq!(field, Field::new(77));

        // The touched window is now one resident in-memory page,
        // clean and most recent.
        let page = fixture.area.page_table().page(s.position(5000)).unwrap();
        assert_eq!(page.region(), s.region(4096, 4096).unwrap());
        assert_eq!(page.swap_state().id(), fixture.ram.id());
        assert!(fixture.kernel_paging.is_clean(&page));
        assert!(fixture.kernel_paging.is_most_recent(&page));
        // The untouched window stayed out.
        assert!(fixture
            .area
            .page_table()
            .pages(s.region(0, 4096).unwrap())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn explicit_fault_reports_major_and_populated() {
        let fixture = fixture();
        let s = test_space();
        let fault = PageFault::new(s.position(5000), Arc::clone(&fixture.ram));
        let resolved = fixture.area.page_fault(TEST_CREDENTIALS, fault).unwrap();
        assert!(resolved.is_major());
        assert!(resolved.flags().contains(PageFaultFlags::NO_PAGE));
        assert_eq!(
            resolved.page().unwrap().region(),
            s.region(4096, 4096).unwrap()
        );

        // Faulting a resident position again is a no-op.
        let again = PageFault::new(s.position(5000), Arc::clone(&fixture.ram));
        let resolved = fixture.area.page_fault(TEST_CREDENTIALS, again).unwrap();
        assert!(!resolved.is_major());
    }

    #[test]
    fn faults_outside_the_area_are_rejected() {
        let fixture = fixture();
        let fault = PageFault::new(test_space().position(9000), Arc::clone(&fixture.ram));
        let err = fixture.area.page_fault(TEST_CREDENTIALS, fault).unwrap_err();
        assert!(matches!(err, MemoryError::OutOfArea { .. }));
    }

    #[test]
    fn writes_dirty_the_page_and_synchronize_cleans_it() {
        let fixture = fixture();
        let s = test_space();
        fixture
            .area
            .write_field(TEST_CREDENTIALS, s.position(100), Field::new(42))
            .unwrap();

        let in_page = fixture.area.page_table().page(s.position(100)).unwrap();
        assert!(fixture.kernel_paging.is_dirty(&in_page));

        // Write the dirty fields back through an out-page and verify
        // they reached the driver.
        let out_page = fixture
            .disk
            .create_page(
                TEST_CREDENTIALS,
                s.position(0),
                fixture.area.swap_configuration(),
            )
            .unwrap();
        fixture
            .area
            .synchronize(TEST_CREDENTIALS, &in_page, &out_page)
            .unwrap();
        assert!(fixture.kernel_paging.is_clean(&in_page));

        let mut readback = [Field::EMPTY];
        fixture
            .driver
            .read(TEST_CREDENTIALS, s.region(100, 1).unwrap(), &mut readback)
            .unwrap();
        assert_eq!(readback[0], Field::new(42));
    }

    #[test]
    fn synchronize_rejects_disjoint_pages() {
        let fixture = fixture();
        let s = test_space();
        fixture
            .area
            .write_field(TEST_CREDENTIALS, s.position(0), Field::new(1))
            .unwrap();
        let in_page = fixture.area.page_table().page(s.position(0)).unwrap();
        let out_page = fixture
            .disk
            .create_page(
                TEST_CREDENTIALS,
                s.position(4096),
                fixture.area.swap_configuration(),
            )
            .unwrap();

        let err = fixture
            .area
            .synchronize(TEST_CREDENTIALS, &in_page, &out_page)
            .unwrap_err();
        assert!(matches!(
            err,
            MemoryError::Swap(SwapError::PagesDisjoint { .. })
        ));
    }

    #[test]
    fn reads_and_writes_span_page_boundaries() {
        let fixture = fixture();
        let s = test_space();
        let outgoing: Vec<Field> = (0..16).map(Field::new).collect();
        let written = fixture
            .area
            .write(TEST_CREDENTIALS, s.position(4090), &outgoing)
            .unwrap();
        assert_eq!(written, 16);

        let mut incoming = vec![Field::EMPTY; 16];
        let read = fixture
            .area
            .read(TEST_CREDENTIALS, s.position(4090), &mut incoming)
            .unwrap();
        assert_eq!(read, 16);
        assert_eq!(incoming, outgoing);
        // Both windows were touched.
        assert_eq!(fixture.area.page_table().len(), 2);
    }

    #[test]
    fn transfers_truncate_at_the_end_of_the_area() {
        let fixture = fixture();
        let s = test_space();
        let mut incoming = vec![Field::EMPTY; 100];
        let read = fixture
            .area
            .read(TEST_CREDENTIALS, s.position(8150), &mut incoming)
            .unwrap();
        assert_eq!(read, 42);

        let err = fixture
            .area
            .read(TEST_CREDENTIALS, s.position(8192), &mut incoming)
            .unwrap_err();
        assert!(matches!(err, MemoryError::OutOfArea { .. }));
    }

    #[test]
    fn io_failure_surfaces_and_leaves_nothing_resident_in_fields() {
        let fixture = fixture();
        let s = test_space();
        fixture.driver.set_failing(true);

        let err = fixture
            .area
            .read_field(TEST_CREDENTIALS, s.position(0))
            .unwrap_err();
        assert!(matches!(err, MemoryError::Swap(SwapError::Io { .. })));
        assert_eq!(
            PageFaultFlags::for_error(&SwapError::Io {
                driver: String::new(),
                region: s.region(0, 1).unwrap(),
                reason: String::new(),
            }),
            PageFaultFlags::IO_ERROR
        );

        // The populated out-pages stay; no fields page landed.
        let resident = fixture
            .area
            .page_table()
            .pages(s.region(0, 4096).unwrap())
            .unwrap();
        assert!(resident
            .iter()
            .all(|page| page.swap_state().id() == fixture.disk.id()));
    }

    #[test]
    fn resize_frees_evicted_pages_and_returns_the_old_region() {
        let fixture = fixture();
        let s = test_space();
        fixture
            .area
            .write_field(TEST_CREDENTIALS, s.position(5000), Field::new(9))
            .unwrap();
        let page = fixture.area.page_table().page(s.position(5000)).unwrap();

        let old = fixture
            .area
            .resize(TEST_CREDENTIALS, s.region(0, 4096).unwrap())
            .unwrap();
        assert_eq!(old, s.region(0, 8192).unwrap());
        assert_eq!(fixture.area.region(), s.region(0, 4096).unwrap());
        assert!(page.is_freed());
        assert!(!fixture.kernel_paging.knows(&page));
    }

    #[test]
    fn resize_rounds_the_length_up_to_the_swap_span() {
        let fixture = fixture();
        let s = test_space();
        fixture
            .area
            .resize(TEST_CREDENTIALS, s.region(0, 5000).unwrap())
            .unwrap();
        assert_eq!(fixture.area.region(), s.region(0, 8192).unwrap());
    }

    #[test]
    fn free_tears_down_every_resident_page() {
        let fixture = fixture();
        let s = test_space();
        fixture
            .area
            .write_field(TEST_CREDENTIALS, s.position(0), Field::new(1))
            .unwrap();
        let page = fixture.area.page_table().page(s.position(0)).unwrap();

        fixture.area.free().unwrap();
        assert!(fixture.area.page_table().is_empty());
        assert!(page.is_freed());
    }

    #[test]
    fn free_reports_still_referenced_pages() {
        let fixture = fixture();
        let s = test_space();
        fixture
            .area
            .write_field(TEST_CREDENTIALS, s.position(0), Field::new(1))
            .unwrap();
        let page = fixture.area.page_table().page(s.position(0)).unwrap();
        page.acquire();

        let err = fixture.area.free().unwrap_err();
        assert!(matches!(
            err,
            MemoryError::Swap(SwapError::StillReferenced { .. })
        ));
    }
}
