use crate::credentials::Credentials;
use crate::error::SwapError;
use crate::page::Page;
use crate::swapper::Swapper;
use core::fmt;
use paging_region::Region;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Which way a swap moves data through the layer chain.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SwapDirection {
    /// Toward the most-swapped-in state.
    In,
    /// Toward the most-swapped-out state.
    Out,
}

impl SwapDirection {
    #[must_use]
    pub const fn is_in(self) -> bool {
        matches!(self, Self::In)
    }
}

impl fmt::Display for SwapDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::In => "in",
            Self::Out => "out",
        })
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum StepState {
    Unstarted,
    Started,
    Completed,
}

/// One single-use transfer of a sub-region between an out-page and an
/// in-page.
///
/// A step moves through `unstarted -> started -> completed` exactly once.
/// [`swap`](Self::swap) on anything but an unstarted step fails with
/// [`SwapError::DoubleSwap`]; a failed step stays `started` and can never
/// be retried. Build a fresh step instead.
pub struct SwapStep {
    swapper: Arc<dyn Swapper>,
    direction: SwapDirection,
    out_page: Arc<Page>,
    out_region: Region,
    in_page: Arc<Page>,
    in_region: Region,
    state: Mutex<StepState>,
}

impl SwapStep {
    /// # Errors
    /// [`SwapError::SizeMismatch`] when the two sub-regions cover
    /// different field counts, [`SwapError::RegionOutsidePage`] when
    /// either sub-region leaves its page.
    pub fn new(
        swapper: Arc<dyn Swapper>,
        direction: SwapDirection,
        out_page: Arc<Page>,
        out_region: Region,
        in_page: Arc<Page>,
        in_region: Region,
    ) -> Result<Self, SwapError> {
        if out_region.size() != in_region.size() {
            return Err(SwapError::SizeMismatch {
                out_region,
                in_region,
            });
        }
        for (page, region) in [(&out_page, out_region), (&in_page, in_region)] {
            if !page.region().contains_region(region) {
                return Err(SwapError::RegionOutsidePage {
                    region,
                    page_region: page.region(),
                });
            }
        }
        Ok(Self {
            swapper,
            direction,
            out_page,
            out_region,
            in_page,
            in_region,
            state: Mutex::new(StepState::Unstarted),
        })
    }

    #[must_use]
    pub fn direction(&self) -> SwapDirection {
        self.direction
    }

    #[must_use]
    pub fn out_page(&self) -> &Arc<Page> {
        &self.out_page
    }

    #[must_use]
    pub fn out_region(&self) -> Region {
        self.out_region
    }

    #[must_use]
    pub fn in_page(&self) -> &Arc<Page> {
        &self.in_page
    }

    #[must_use]
    pub fn in_region(&self) -> Region {
        self.in_region
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        *self.locked() != StepState::Unstarted
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        *self.locked() == StepState::Completed
    }

    /// Perform the transfer.
    ///
    /// # Errors
    /// [`SwapError::DoubleSwap`] when the step has already run (or is
    /// running); otherwise whatever the swapper fails with, in which
    /// case the step is spent but not completed.
    pub fn swap(&self, credentials: Credentials) -> Result<(), SwapError> {
        {
            let mut state = self.locked();
            if *state != StepState::Unstarted {
                return Err(SwapError::DoubleSwap {
                    out_region: self.out_region,
                    in_region: self.in_region,
                });
            }
            *state = StepState::Started;
        }
        if self.direction.is_in() {
            self.swapper.read_in(
                credentials,
                &self.out_page,
                self.out_region,
                &self.in_page,
                self.in_region,
            )?;
        } else {
            self.swapper.write_out(
                credentials,
                &self.in_page,
                self.in_region,
                &self.out_page,
                self.out_region,
            )?;
        }
        *self.locked() = StepState::Completed;
        Ok(())
    }

    fn locked(&self) -> MutexGuard<'_, StepState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SwapStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwapStep")
            .field("direction", &self.direction)
            .field("out_region", &self.out_region)
            .field("in_region", &self.in_region)
            .field("state", &*self.locked())
            .finish()
    }
}

/// An ordered batch of [`SwapStep`]s, all moving the same direction.
///
/// Steps run in order and execution stops at the first failure. Already
/// completed steps stay committed; there is no rollback. The caller sees
/// the failing step's error and owns the reconciliation.
pub struct SwapOperation {
    direction: SwapDirection,
    steps: Vec<SwapStep>,
}

impl SwapOperation {
    /// # Errors
    /// [`SwapError::MixedDirection`] when any step disagrees with
    /// `direction`.
    pub fn new(direction: SwapDirection, steps: Vec<SwapStep>) -> Result<Self, SwapError> {
        if steps.iter().any(|step| step.direction() != direction) {
            return Err(SwapError::MixedDirection);
        }
        Ok(Self { direction, steps })
    }

    #[must_use]
    pub fn direction(&self) -> SwapDirection {
        self.direction
    }

    #[must_use]
    pub fn steps(&self) -> &[SwapStep] {
        &self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order, stopping at the first failure.
    ///
    /// # Errors
    /// The failing step's error. Steps completed before it remain
    /// committed.
    pub fn swap(&self, credentials: Credentials) -> Result<(), SwapError> {
        for (index, step) in self.steps.iter().enumerate() {
            if let Err(error) = step.swap(credentials) {
                log::warn!(
                    "swap-{} operation failed at step {index} of {}: {error}",
                    self.direction,
                    self.steps.len(),
                );
                return Err(error);
            }
        }
        Ok(())
    }

    /// The pages data finally lands in, deduplicated, in step order.
    ///
    /// For a swap-in these are the in-pages, for a swap-out the
    /// out-pages. A multi-hop operation carries steps for every
    /// intermediate hop; only the pages of the final state count.
    #[must_use]
    pub fn target_pages(&self) -> Vec<Arc<Page>> {
        let Some(last) = self.steps.last() else {
            return Vec::new();
        };
        let side = |step: &SwapStep| {
            if self.direction.is_in() {
                Arc::clone(step.in_page())
            } else {
                Arc::clone(step.out_page())
            }
        };
        let final_state = side(last).swap_state().id();
        let mut seen = std::collections::HashSet::new();
        let mut pages = Vec::new();
        for step in &self.steps {
            let page = side(step);
            if page.swap_state().id() == final_state && seen.insert(page.id()) {
                pages.push(page);
            }
        }
        pages
    }
}

impl fmt::Debug for SwapOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwapOperation")
            .field("direction", &self.direction)
            .field("steps", &self.steps.len())
            .finish()
    }
}
