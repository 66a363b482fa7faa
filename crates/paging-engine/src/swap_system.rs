use crate::credentials::Credentials;
use crate::error::{MemoryError, PageTableError, SwapError};
use crate::page::Page;
use crate::page_table::PageTable;
use crate::swap_state::{SwapConfiguration, SwapState, SwapStateId};
use crate::swap_step::{SwapDirection, SwapOperation, SwapStep};
use crate::swapper::Swapper;
use core::fmt;
use paging_region::{Position, Region, Size, SpaceId};
use std::sync::Arc;

/// An ordered chain of swap states and the swappers joining them, plus
/// the planner that turns "make this position resident in that state"
/// into a [`SwapOperation`].
///
/// States are ordered most-swapped-out first. The chain is validated on
/// construction: every swapper's in state must be the next swapper's out
/// state, no state appears twice, all states share one space, and the
/// page sizes of any two states divide evenly into one another.
///
/// The *swap span* is the largest page size in the chain. Every plan
/// covers one whole span-aligned window so that differently sized pages
/// always meet on common boundaries.
pub struct SwapSystem {
    /// Most-swapped-out first.
    states: Vec<Arc<SwapState>>,
    /// `swappers[i]` joins `states[i]` (out) and `states[i + 1]` (in).
    swappers: Vec<Arc<dyn Swapper>>,
    space: SpaceId,
    swap_span: Size,
    fields_index: usize,
}

impl SwapSystem {
    /// Build a system from a chain of swappers, most-swapped-out pair
    /// first. `swapped_in_to_fields` names the state whose pages carry
    /// directly addressable fields; reads and writes fault pages up to
    /// it.
    ///
    /// # Errors
    /// [`SwapError::BrokenChain`] when consecutive swappers do not share
    /// a state, [`SwapError::DuplicateState`] when a state appears
    /// twice, [`SwapError::Region`] when states disagree on the space,
    /// [`SwapError::PageSizeRatio`] when two page sizes do not divide
    /// evenly, [`SwapError::UnknownState`] when `swapped_in_to_fields`
    /// is not in the chain.
    pub fn new(
        swappers: Vec<Arc<dyn Swapper>>,
        swapped_in_to_fields: &Arc<SwapState>,
    ) -> Result<Self, SwapError> {
        let mut states: Vec<Arc<SwapState>> = Vec::with_capacity(swappers.len() + 1);
        match swappers.first() {
            Some(first) => states.push(Arc::clone(first.out_state())),
            None => states.push(Arc::clone(swapped_in_to_fields)),
        }
        for swapper in &swappers {
            let tail = states[states.len() - 1].id();
            if swapper.out_state().id() != tail {
                return Err(SwapError::BrokenChain {
                    out_state: tail,
                    in_state: swapper.out_state().id(),
                });
            }
            states.push(Arc::clone(swapper.in_state()));
        }
        Self::validated(states, swappers, swapped_in_to_fields)
    }

    /// A one-state system; nothing to swap, but areas still need a
    /// state to create pages in.
    ///
    /// # Errors
    /// Never fails today; kept fallible to match [`new`](Self::new).
    pub fn single(state: Arc<SwapState>) -> Result<Self, SwapError> {
        let fields = Arc::clone(&state);
        Self::validated(vec![state], Vec::new(), &fields)
    }

    fn validated(
        states: Vec<Arc<SwapState>>,
        swappers: Vec<Arc<dyn Swapper>>,
        swapped_in_to_fields: &Arc<SwapState>,
    ) -> Result<Self, SwapError> {
        let space = states[0].space();
        for (index, state) in states.iter().enumerate() {
            if states[..index].iter().any(|seen| seen.id() == state.id()) {
                return Err(SwapError::DuplicateState { state: state.id() });
            }
            if state.space() != space {
                return Err(paging_region::RegionError::SpaceMismatch {
                    left: space,
                    right: state.space(),
                }
                .into());
            }
            for other in &states[..index] {
                let a = state.page_size();
                let b = other.page_size();
                if !a.is_multiple_of(b) && !b.is_multiple_of(a) {
                    return Err(SwapError::PageSizeRatio {
                        left: other.id(),
                        right: state.id(),
                    });
                }
            }
        }
        let swap_span = states
            .iter()
            .map(|state| state.page_size())
            .max_by_key(|size| size.as_u64())
            .unwrap_or(Size::ZERO);
        let fields_index = states
            .iter()
            .position(|state| state.id() == swapped_in_to_fields.id())
            .ok_or(SwapError::UnknownState {
                state: swapped_in_to_fields.id(),
            })?;
        Ok(Self {
            states,
            swappers,
            space,
            swap_span,
            fields_index,
        })
    }

    #[must_use]
    pub fn states(&self) -> &[Arc<SwapState>] {
        &self.states
    }

    #[must_use]
    pub fn space(&self) -> SpaceId {
        self.space
    }

    /// The largest page size in the chain; plans always cover one whole
    /// span-aligned window.
    #[must_use]
    pub fn swap_span(&self) -> Size {
        self.swap_span
    }

    #[must_use]
    pub fn most_swapped_out(&self) -> &Arc<SwapState> {
        &self.states[0]
    }

    #[must_use]
    pub fn most_swapped_in(&self) -> &Arc<SwapState> {
        &self.states[self.states.len() - 1]
    }

    /// The state whose pages carry directly addressable fields.
    #[must_use]
    pub fn swapped_in_to_fields(&self) -> &Arc<SwapState> {
        &self.states[self.fields_index]
    }

    /// The next state toward swapped-in.
    ///
    /// # Errors
    /// [`SwapError::UnknownState`] or [`SwapError::EndOfChain`].
    pub fn in_from(&self, state: SwapStateId) -> Result<&Arc<SwapState>, SwapError> {
        let index = self.index_of(state)?;
        self.states
            .get(index + 1)
            .ok_or(SwapError::EndOfChain { state })
    }

    /// The next state toward swapped-out.
    ///
    /// # Errors
    /// [`SwapError::UnknownState`] or [`SwapError::EndOfChain`].
    pub fn out_from(&self, state: SwapStateId) -> Result<&Arc<SwapState>, SwapError> {
        let index = self.index_of(state)?;
        index
            .checked_sub(1)
            .map(|previous| &self.states[previous])
            .ok_or(SwapError::EndOfChain { state })
    }

    #[must_use]
    pub fn is_swap_inable(&self, state: SwapStateId) -> bool {
        self.in_from(state).is_ok()
    }

    #[must_use]
    pub fn is_swap_outable(&self, state: SwapStateId) -> bool {
        self.out_from(state).is_ok()
    }

    /// The swapper joining two *adjacent* states.
    ///
    /// # Errors
    /// [`SwapError::UnknownState`] or [`SwapError::NoSuchSwapper`].
    pub fn swapper(
        &self,
        out_state: SwapStateId,
        in_state: SwapStateId,
    ) -> Result<&Arc<dyn Swapper>, SwapError> {
        let index = self.index_of(out_state)?;
        if self.states.get(index + 1).map(|state| state.id()) == Some(in_state) {
            Ok(&self.swappers[index])
        } else {
            Err(SwapError::NoSuchSwapper {
                out_state,
                in_state,
            })
        }
    }

    /// Plan the steps that make `position` resident in `target`.
    ///
    /// The plan covers the whole span-aligned window around `position`
    /// and hops one adjacent state at a time. Every hop creates fresh
    /// pages in the next state and splits the window into
    /// `max(from pages, to pages)` steps so that each step transfers
    /// exactly one (sub-)page worth of fields. An empty operation comes
    /// back when the position is already resident in `target`.
    ///
    /// No data moves here; the caller decides when to run the returned
    /// operation.
    ///
    /// # Errors
    /// [`PageTableError`] lookups when the window is not fully paged in
    /// the starting state, [`SwapError`] for unknown states or page
    /// creation failures.
    pub fn create_swap_operation(
        &self,
        credentials: Credentials,
        page_table: &PageTable,
        configuration: &SwapConfiguration,
        position: Position,
        target: &Arc<SwapState>,
    ) -> Result<SwapOperation, MemoryError> {
        let current = page_table.page(position)?;
        let current_index = self.index_of(current.swap_state().id())?;
        let target_index = self.index_of(target.id())?;
        let direction = if target_index >= current_index {
            SwapDirection::In
        } else {
            SwapDirection::Out
        };
        if current_index == target_index {
            return Ok(SwapOperation::new(direction, Vec::new())?);
        }

        let span = self.swap_span.as_u64();
        let window_start = position.align_down(self.swap_span).offset();
        let window = Region::new(self.space, window_start, span)?;

        let mut steps = Vec::new();
        let mut hop_pages: Option<Vec<Arc<Page>>> = None;
        let mut from_index = current_index;
        while from_index != target_index {
            let to_index = if direction.is_in() {
                from_index + 1
            } else {
                from_index - 1
            };
            let from_state = &self.states[from_index];
            let to_state = &self.states[to_index];

            let from_pages = match hop_pages.take() {
                Some(pages) => pages,
                None => page_table
                    .pages(window)?
                    .into_iter()
                    .filter(|page| page.swap_state().id() == from_state.id())
                    .collect(),
            };
            let from_count = span / from_state.page_size().as_u64();
            if from_pages.len() as u64 != from_count {
                return Err(PageTableError::UnpagedGap { position }.into());
            }

            let swapper = if direction.is_in() {
                self.swapper(from_state.id(), to_state.id())?
            } else {
                self.swapper(to_state.id(), from_state.id())?
            };

            let to_fields = to_state.page_size().as_u64();
            let to_count = span / to_fields;
            let mut to_pages = Vec::with_capacity(to_count as usize);
            for index in 0..to_count {
                let start = Position::new(self.space, window_start + index * to_fields);
                to_pages.push(to_state.create_page(credentials, start, configuration)?);
            }

            let num_steps = from_count.max(to_count);
            let step_fields = span / num_steps;
            for index in 0..num_steps {
                let sub = Region::new(
                    self.space,
                    window_start + index * step_fields,
                    step_fields,
                )?;
                let from_page = &from_pages[(index * from_count / num_steps) as usize];
                let to_page = &to_pages[(index * to_count / num_steps) as usize];
                let step = if direction.is_in() {
                    SwapStep::new(
                        Arc::clone(swapper),
                        direction,
                        Arc::clone(from_page),
                        sub,
                        Arc::clone(to_page),
                        sub,
                    )?
                } else {
                    SwapStep::new(
                        Arc::clone(swapper),
                        direction,
                        Arc::clone(to_page),
                        sub,
                        Arc::clone(from_page),
                        sub,
                    )?
                };
                steps.push(step);
            }

            hop_pages = Some(to_pages);
            from_index = to_index;
        }
        Ok(SwapOperation::new(direction, steps)?)
    }

    fn index_of(&self, state: SwapStateId) -> Result<usize, SwapError> {
        self.states
            .iter()
            .position(|candidate| candidate.id() == state)
            .ok_or(SwapError::UnknownState { state })
    }
}

impl fmt::Debug for SwapSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.states.iter().map(|state| state.name()).collect();
        f.debug_struct("SwapSystem")
            .field("states", &names)
            .field("space", &self.space)
            .field("swap_span", &self.swap_span)
            .finish()
    }
}
