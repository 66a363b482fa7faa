//! # Virtual-Memory Paging Engine
//!
//! Maps a linear address space onto one or more backing representations
//! ("swap states": in-memory field buffers, block-driver-backed storage,
//! remote stores) and moves data between them transparently.
//!
//! ## What you get
//!
//! - A [`SwapState`] describing one storage layer: page size, coordinate
//!   space and a factory for unpopulated [`Page`]s.
//! - A [`Swapper`] converting page regions between two *adjacent* layers,
//!   with a [`BlockDriver`] seam for driver-backed out-states.
//! - Single-use [`SwapStep`]s batched into same-direction
//!   [`SwapOperation`]s, planned by a [`SwapSystem`] across any number of
//!   intermediate layers.
//! - A sparse, non-overlapping [`PageTable`] and a process-wide
//!   [`KernelPaging`] recency/dirty structure shared by all areas.
//! - The [`PagedArea`] façade: read/write at arbitrary positions, page
//!   faults, resize and synchronize.
//!
//! ## Layer chains
//!
//! A swap system owns an ordered chain of swap states, most-swapped-out
//! first:
//!
//! ```text
//! +-----------------------------------------------+
//! |  SwapState: swapped out to a block driver.    |   512-field pages
//! +-----------------------------------------------+
//!                       ^
//!                       | Swapper
//!                       v
//! +-----------------------------------------------+
//! |  SwapState: swapped in to fields in memory.   |   4096-field pages
//! +-----------------------------------------------+
//! ```
//!
//! Page sizes may differ between layers by any exact integer ratio; the
//! planner splits each hop into per-sub-region steps so that, e.g., one
//! 4096-field in-page is assembled from eight 512-field out-pages.
//!
//! ## Concurrency
//!
//! `read`/`write`/`resize`/`page_fault`/`synchronize` may block for the
//! duration of driver I/O. Each [`PagedArea`] serializes its swaps behind
//! one lock; [`KernelPaging`] carries its own internal lock because many
//! areas update it concurrently.
//!
//! ## No rollback
//!
//! A partially failed [`SwapOperation`] leaves completed steps committed.
//! There is deliberately no transactional rollback across steps; callers
//! must reconcile a partial failure themselves (see
//! [`SwapOperation::swap`]).

mod credentials;
mod driver;
mod error;
mod kernel_paging;
mod page;
mod page_fault;
mod page_table;
mod paged_area;
mod swap_state;
mod swap_step;
mod swap_system;
mod swapper;

#[cfg(test)]
mod testing;

pub use credentials::Credentials;
pub use driver::{BlockDriver, MemDriver};
pub use error::{MemoryError, PageTableError, SwapError};
pub use kernel_paging::KernelPaging;
pub use page::{Page, PageId, PagePayload};
pub use page_fault::{PageFault, PageFaultFlags, ResolvedPageFault};
pub use page_table::PageTable;
pub use paged_area::{PagedArea, PagedAreaId};
pub use swap_state::{SwapConfiguration, SwapState, SwapStateId, SwapStateKind};
pub use swap_step::{SwapDirection, SwapOperation, SwapStep};
pub use swap_system::SwapSystem;
pub use swapper::{BufferBlockSwapper, BufferSwapper, Swapper};
