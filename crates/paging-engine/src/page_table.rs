use crate::error::PageTableError;
use crate::kernel_paging::KernelPaging;
use crate::page::{Page, PageId};
use crate::swap_state::SwapStateId;
use core::fmt;
use paging_region::{Position, Region, SparseRegion, SpaceId};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Sparse, ordered mapping from positions to resident [`Page`]s.
///
/// All pages live in one space and never overlap. A batch insert either
/// lands every page or none: an incoming page whose region exactly
/// matches a resident page replaces it, while a partial overlap rejects
/// the whole batch with [`PageTableError::BoundaryViolation`]. Gaps
/// between pages are ordinary; looking one up reports
/// [`PageTableError::UnpagedGap`] so the caller can decide to populate
/// it.
///
/// Inserted pages are reported to the shared [`KernelPaging`] as clean
/// and most recent; replaced and removed ones are withdrawn from it.
pub struct PageTable {
    space: SpaceId,
    kernel_paging: Arc<KernelPaging>,
    /// Sorted by region start, pairwise disjoint.
    pages: Mutex<Vec<Arc<Page>>>,
}

impl PageTable {
    #[must_use]
    pub fn new(space: SpaceId, kernel_paging: Arc<KernelPaging>) -> Self {
        Self {
            space,
            kernel_paging,
            pages: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn space(&self) -> SpaceId {
        self.space
    }

    /// Insert `incoming`, all-or-nothing.
    ///
    /// # Errors
    /// [`PageTableError::SpaceMismatch`] for a page from another space,
    /// [`PageTableError::OverlappingBatch`] when two incoming pages
    /// overlap each other, [`PageTableError::BoundaryViolation`] when an
    /// incoming page partially overlaps a resident one. Nothing is
    /// inserted on error.
    pub fn put(&self, incoming: &[Arc<Page>]) -> Result<(), PageTableError> {
        let mut pages = self.locked();

        for (index, page) in incoming.iter().enumerate() {
            let region = page.region();
            if region.space() != self.space {
                return Err(PageTableError::SpaceMismatch {
                    expected: self.space,
                    actual: region.space(),
                });
            }
            for earlier in &incoming[..index] {
                if earlier.region().overlaps(region) {
                    return Err(PageTableError::OverlappingBatch {
                        first: earlier.region(),
                        second: region,
                    });
                }
            }
        }

        // Pair every incoming page with the resident page it exactly
        // replaces, failing on any partial overlap.
        let mut replaced: Vec<PageId> = Vec::new();
        for page in incoming {
            let region = page.region();
            for resident in pages.iter() {
                let existing = resident.region();
                if !existing.overlaps(region) {
                    continue;
                }
                if existing == region {
                    replaced.push(resident.id());
                } else {
                    return Err(PageTableError::BoundaryViolation {
                        incoming: region,
                        existing,
                    });
                }
            }
        }

        pages.retain(|resident| {
            if replaced.contains(&resident.id()) {
                self.kernel_paging.remove(resident);
                false
            } else {
                true
            }
        });
        for page in incoming {
            let at = pages.partition_point(|resident| {
                resident.region().start().offset() < page.region().start().offset()
            });
            pages.insert(at, Arc::clone(page));
            self.kernel_paging.recent(page);
            self.kernel_paging.clean(page);
        }
        Ok(())
    }

    /// Withdraw `page` from the table and the kernel paging structure.
    ///
    /// # Errors
    /// [`PageTableError::NoSuchPage`] when it is not resident.
    pub fn remove(&self, page: &Page) -> Result<(), PageTableError> {
        let mut pages = self.locked();
        let index = pages
            .iter()
            .position(|resident| resident.id() == page.id())
            .ok_or(PageTableError::NoSuchPage { page: page.id() })?;
        pages.remove(index);
        self.kernel_paging.remove(page);
        Ok(())
    }

    /// The page covering `position`.
    ///
    /// The covered range is derived from the resident pages, so a
    /// position before the first page or past the last one reports
    /// [`PageTableError::OutOfRange`] even when the surrounding area
    /// extends further; only holes between resident pages report
    /// [`PageTableError::UnpagedGap`].
    ///
    /// # Errors
    /// [`PageTableError::SpaceMismatch`] for a position from another
    /// space, [`PageTableError::OutOfRange`] beyond the outermost pages,
    /// [`PageTableError::UnpagedGap`] for a hole between pages.
    pub fn page(&self, position: Position) -> Result<Arc<Page>, PageTableError> {
        self.check_space(position.space())?;
        let pages = self.locked();
        let index = pages.partition_point(|resident| {
            resident.region().end().offset() <= position.offset()
        });
        if let Some(resident) = pages.get(index) {
            if resident.region().contains(position) {
                return Ok(Arc::clone(resident));
            }
            if index == 0 {
                return Err(PageTableError::OutOfRange { position });
            }
            return Err(PageTableError::UnpagedGap { position });
        }
        Err(PageTableError::OutOfRange { position })
    }

    /// All pages overlapping `region`, in position order.
    ///
    /// # Errors
    /// [`PageTableError::SpaceMismatch`] for a region from another
    /// space.
    pub fn pages(&self, region: Region) -> Result<Vec<Arc<Page>>, PageTableError> {
        self.check_space(region.space())?;
        Ok(self
            .locked()
            .iter()
            .filter(|resident| resident.region().overlaps(region))
            .map(Arc::clone)
            .collect())
    }

    /// Mark every resident page of the given states inside `region`
    /// clean.
    ///
    /// # Errors
    /// [`PageTableError::SpaceMismatch`] for a region from another
    /// space.
    pub fn clean_all(&self, region: Region, states: &[SwapStateId]) -> Result<(), PageTableError> {
        for page in self.pages_of_states(region, states)? {
            self.kernel_paging.clean(&page);
        }
        Ok(())
    }

    /// Mark every resident page of the given states inside `region`
    /// dirty.
    ///
    /// # Errors
    /// Like [`clean_all`](Self::clean_all).
    pub fn dirty_all(&self, region: Region, states: &[SwapStateId]) -> Result<(), PageTableError> {
        for page in self.pages_of_states(region, states)? {
            self.kernel_paging.dirty(&page);
        }
        Ok(())
    }

    /// The sub-runs of `region` covered by clean pages of the given
    /// states.
    ///
    /// # Errors
    /// Like [`clean_all`](Self::clean_all).
    pub fn clean_region(
        &self,
        region: Region,
        states: &[SwapStateId],
    ) -> Result<SparseRegion, PageTableError> {
        self.filtered_region(region, states, |page| self.kernel_paging.is_clean(page))
    }

    /// The sub-runs of `region` covered by dirty pages of the given
    /// states.
    ///
    /// # Errors
    /// Like [`clean_all`](Self::clean_all).
    pub fn dirty_region(
        &self,
        region: Region,
        states: &[SwapStateId],
    ) -> Result<SparseRegion, PageTableError> {
        self.filtered_region(region, states, |page| self.kernel_paging.is_dirty(page))
    }

    /// Every resident run, in order.
    #[must_use]
    pub fn region(&self) -> SparseRegion {
        let runs = self.locked().iter().map(|page| page.region()).collect();
        // Resident pages are sorted and disjoint by construction.
        SparseRegion::from_runs(self.space, runs).unwrap_or_else(|_| SparseRegion::empty(self.space))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.locked().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locked().is_empty()
    }

    fn pages_of_states(
        &self,
        region: Region,
        states: &[SwapStateId],
    ) -> Result<Vec<Arc<Page>>, PageTableError> {
        Ok(self
            .pages(region)?
            .into_iter()
            .filter(|page| states.contains(&page.swap_state().id()))
            .collect())
    }

    fn filtered_region(
        &self,
        region: Region,
        states: &[SwapStateId],
        keep: impl Fn(&Page) -> bool,
    ) -> Result<SparseRegion, PageTableError> {
        let runs = self
            .pages_of_states(region, states)?
            .into_iter()
            .filter(|page| keep(page))
            .filter_map(|page| page.region().intersect(region))
            .collect();
        // Resident pages are sorted and disjoint, so the runs are too.
        Ok(SparseRegion::from_runs(self.space, runs)
            .unwrap_or_else(|_| SparseRegion::empty(self.space)))
    }

    fn check_space(&self, space: SpaceId) -> Result<(), PageTableError> {
        if space == self.space {
            Ok(())
        } else {
            Err(PageTableError::SpaceMismatch {
                expected: self.space,
                actual: space,
            })
        }
    }

    fn locked(&self) -> MutexGuard<'_, Vec<Arc<Page>>> {
        self.pages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for PageTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageTable")
            .field("space", &self.space)
            .field("pages", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swap_state::SwapConfiguration;
    use crate::testing::{buffer_state, test_space, TEST_CREDENTIALS};

    fn table() -> PageTable {
        PageTable::new(test_space().id(), Arc::new(KernelPaging::new()))
    }

    fn page_at(offset: u64, fields: u64) -> Arc<Page> {
        let state = buffer_state("ram", fields);
        state
            .create_page(
                TEST_CREDENTIALS,
                test_space().position(offset),
                &SwapConfiguration::new(),
            )
            .unwrap()
    }

    #[test]
    fn looks_up_pages_and_reports_gaps() {
        let table = table();
        let s = test_space();
        table.put(&[page_at(16, 8), page_at(32, 8)]).unwrap();

        assert_eq!(
            table.page(s.position(18)).unwrap().region(),
            s.region(16, 8).unwrap()
        );
        assert!(matches!(
            table.page(s.position(26)),
            Err(PageTableError::UnpagedGap { .. })
        ));
        assert!(matches!(
            table.page(s.position(3)),
            Err(PageTableError::OutOfRange { .. })
        ));
        assert!(matches!(
            table.page(s.position(40)),
            Err(PageTableError::OutOfRange { .. })
        ));
    }

    #[test]
    fn partial_overlap_rejects_the_whole_batch() {
        let table = table();
        table.put(&[page_at(16, 8)]).unwrap();

        // A page over 17..=39 straddles the resident page's boundary.
        let state = buffer_state("odd", 23);
        let bad = Page::new(
            Arc::clone(&state),
            test_space().region(17, 23).unwrap(),
            crate::page::PagePayload::Fields(paging_buffer::Buffer::new(23)),
        );
        let good = page_at(40, 8);
        let err = table.put(&[good, bad]).unwrap_err();
        assert!(matches!(err, PageTableError::BoundaryViolation { .. }));
        // All-or-nothing: the in-bounds page must not have landed.
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn exact_overlap_replaces_and_adjacent_inserts() {
        let table = table();
        let s = test_space();
        let original = page_at(16, 8);
        table.put(&[Arc::clone(&original)]).unwrap();

        let replacement = page_at(16, 8);
        let adjacent = page_at(24, 8);
        table
            .put(&[Arc::clone(&replacement), Arc::clone(&adjacent)])
            .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.page(s.position(16)).unwrap().id(), replacement.id());
        assert_eq!(table.page(s.position(24)).unwrap().id(), adjacent.id());
    }

    #[test]
    fn batches_may_not_overlap_themselves() {
        let table = table();
        let err = table.put(&[page_at(0, 8), page_at(0, 8)]).unwrap_err();
        assert!(matches!(err, PageTableError::OverlappingBatch { .. }));
    }

    #[test]
    fn put_marks_pages_clean_and_most_recent() {
        let kernel_paging = Arc::new(KernelPaging::new());
        let table = PageTable::new(test_space().id(), Arc::clone(&kernel_paging));
        let page = page_at(0, 8);
        table.put(&[Arc::clone(&page)]).unwrap();

        assert!(kernel_paging.is_clean(&page));
        assert!(kernel_paging.is_most_recent(&page));
    }

    #[test]
    fn replacement_withdraws_the_old_page_from_kernel_paging() {
        let kernel_paging = Arc::new(KernelPaging::new());
        let table = PageTable::new(test_space().id(), Arc::clone(&kernel_paging));
        let original = page_at(0, 8);
        table.put(&[Arc::clone(&original)]).unwrap();

        let replacement = page_at(0, 8);
        table.put(&[Arc::clone(&replacement)]).unwrap();
        assert!(!kernel_paging.knows(&original));
        assert!(kernel_paging.knows(&replacement));
    }

    #[test]
    fn dirty_and_clean_runs_partition_the_residents() {
        let kernel_paging = Arc::new(KernelPaging::new());
        let table = PageTable::new(test_space().id(), Arc::clone(&kernel_paging));
        let s = test_space();
        let a = page_at(0, 8);
        let b = page_at(8, 8);
        let states = [a.swap_state().id(), b.swap_state().id()];
        table.put(&[Arc::clone(&a), Arc::clone(&b)]).unwrap();
        kernel_paging.dirty(&b);

        let whole = s.region(0, 16).unwrap();
        let clean = table.clean_region(whole, &states).unwrap();
        let dirty = table.dirty_region(whole, &states).unwrap();
        assert_eq!(clean.runs(), &[s.region(0, 8).unwrap()]);
        assert_eq!(dirty.runs(), &[s.region(8, 8).unwrap()]);
    }

    #[test]
    fn dirty_all_and_clean_all_reclassify_within_the_region() {
        let kernel_paging = Arc::new(KernelPaging::new());
        let table = PageTable::new(test_space().id(), Arc::clone(&kernel_paging));
        let s = test_space();
        let a = page_at(0, 8);
        let b = page_at(8, 8);
        let c = page_at(16, 8);
        let states = [
            a.swap_state().id(),
            b.swap_state().id(),
            c.swap_state().id(),
        ];
        table
            .put(&[Arc::clone(&a), Arc::clone(&b), Arc::clone(&c)])
            .unwrap();

        // Only the pages overlapping the region flip; `c` stays clean.
        table.dirty_all(s.region(0, 16).unwrap(), &states).unwrap();
        assert!(kernel_paging.is_dirty(&a));
        assert!(kernel_paging.is_dirty(&b));
        assert!(kernel_paging.is_clean(&c));

        table.clean_all(s.region(8, 16).unwrap(), &states).unwrap();
        assert!(kernel_paging.is_dirty(&a));
        assert!(kernel_paging.is_clean(&b));
        assert!(kernel_paging.is_clean(&c));
    }

    #[test]
    fn bulk_reclassification_skips_other_states() {
        let kernel_paging = Arc::new(KernelPaging::new());
        let table = PageTable::new(test_space().id(), Arc::clone(&kernel_paging));
        let s = test_space();
        let a = page_at(0, 8);
        let b = page_at(8, 8);
        table.put(&[Arc::clone(&a), Arc::clone(&b)]).unwrap();

        table
            .dirty_all(s.region(0, 16).unwrap(), &[a.swap_state().id()])
            .unwrap();
        assert!(kernel_paging.is_dirty(&a));
        assert!(kernel_paging.is_clean(&b));
    }

    #[test]
    fn remove_forgets_the_page_everywhere() {
        let kernel_paging = Arc::new(KernelPaging::new());
        let table = PageTable::new(test_space().id(), Arc::clone(&kernel_paging));
        let page = page_at(0, 8);
        table.put(&[Arc::clone(&page)]).unwrap();

        table.remove(&page).unwrap();
        assert!(table.is_empty());
        assert!(!kernel_paging.knows(&page));
        assert!(matches!(
            table.remove(&page),
            Err(PageTableError::NoSuchPage { .. })
        ));
    }
}
