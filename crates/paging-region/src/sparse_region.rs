use crate::{Position, Region, RegionError, SpaceId};
use alloc::vec::Vec;
use core::fmt;

/// An ordered set of disjoint regions inside one space.
///
/// The page table reports its coverage as a sparse region: one run per
/// page, sorted by start, with gaps where nothing is paged. Runs are kept
/// as given (adjacent runs are not merged) so that a run index maps back
/// to the page it came from.
#[derive(Clone, Eq, PartialEq)]
pub struct SparseRegion {
    space: SpaceId,
    runs: Vec<Region>,
}

impl SparseRegion {
    #[inline]
    #[must_use]
    pub const fn empty(space: SpaceId) -> Self {
        Self {
            space,
            runs: Vec::new(),
        }
    }

    /// Build from runs, which must all share `space`, be non-empty,
    /// sorted by start and pairwise disjoint.
    ///
    /// # Errors
    /// [`RegionError::SpaceMismatch`] for a foreign run,
    /// [`RegionError::UnorderedRuns`] if runs are unsorted or overlap.
    pub fn from_runs(space: SpaceId, runs: Vec<Region>) -> Result<Self, RegionError> {
        let mut previous_end: Option<u64> = None;
        for run in &runs {
            if run.space() != space {
                return Err(RegionError::SpaceMismatch {
                    left: space,
                    right: run.space(),
                });
            }
            if run.is_empty() {
                return Err(RegionError::UnorderedRuns);
            }
            if let Some(end) = previous_end
                && run.start().offset() < end
            {
                return Err(RegionError::UnorderedRuns);
            }
            previous_end = Some(run.end().offset());
        }
        Ok(Self { space, runs })
    }

    #[inline]
    #[must_use]
    pub const fn space(&self) -> SpaceId {
        self.space
    }

    #[inline]
    #[must_use]
    pub fn runs(&self) -> &[Region] {
        &self.runs
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Index of the run containing `position`.
    ///
    /// `Ok(index)` if some run contains it; `Err(index)` with the insertion
    /// point if it falls in a gap or outside the covered bounds.
    pub fn run_index(&self, position: Position) -> Result<usize, usize> {
        if position.space() != self.space {
            return Err(0);
        }
        let offset = position.offset();
        let insertion = self
            .runs
            .partition_point(|run| run.end().offset() <= offset);
        if self
            .runs
            .get(insertion)
            .is_some_and(|run| run.contains(position))
        {
            Ok(insertion)
        } else {
            Err(insertion)
        }
    }

    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        self.run_index(position).is_ok()
    }

    /// Smallest contiguous region spanning all runs, `None` when empty.
    #[must_use]
    pub fn bounding(&self) -> Option<Region> {
        let first = self.runs.first()?;
        let last = self.runs.last()?;
        Region::new(
            self.space,
            first.start().offset(),
            last.end().offset() - first.start().offset(),
        )
        .ok()
    }
}

impl fmt::Debug for SparseRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.runs).finish()
    }
}
