use crate::credentials::Credentials;
use crate::page::PageId;
use crate::swap_state::SwapStateId;
use paging_buffer::BufferError;
use paging_region::{Position, Region, RegionError, Size, SpaceId};

/// Swap failures: driver I/O, allocation, authorization, and misuse of the
/// single-use swap primitives.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SwapError {
    #[error("{credentials} is not permitted to perform this swap")]
    Unauthorized { credentials: Credentials },
    #[error("driver '{driver}' failed on {region}: {reason}")]
    Io {
        driver: String,
        region: Region,
        reason: String,
    },
    #[error("out of memory creating a page of {page_size}")]
    OutOfMemory { page_size: Size },
    #[error("swap step over out {out_region} / in {in_region} has already swapped")]
    DoubleSwap {
        out_region: Region,
        in_region: Region,
    },
    #[error("page start {position} is not aligned to the {page_size} page boundary")]
    MisalignedPage { position: Position, page_size: Size },
    #[error("swap state {state} is not part of this swap system")]
    UnknownState { state: SwapStateId },
    #[error("no swapper between out state {out_state} and in state {in_state}")]
    NoSuchSwapper {
        out_state: SwapStateId,
        in_state: SwapStateId,
    },
    #[error("swap state {state} is at the end of the chain")]
    EndOfChain { state: SwapStateId },
    #[error("swap operation steps must all share one direction")]
    MixedDirection,
    #[error("out region {out_region} and in region {in_region} cover different field counts")]
    SizeMismatch {
        out_region: Region,
        in_region: Region,
    },
    #[error("swapper chain is broken: {out_state} does not feed {in_state}")]
    BrokenChain {
        out_state: SwapStateId,
        in_state: SwapStateId,
    },
    #[error("page sizes of {left} and {right} are not integer multiples of each other")]
    PageSizeRatio {
        left: SwapStateId,
        right: SwapStateId,
    },
    #[error("swap state {state} appears twice in the chain")]
    DuplicateState { state: SwapStateId },
    #[error("swap state {state} has no configured block driver")]
    MissingDriver { state: SwapStateId },
    #[error("{region} is not covered by page region {page_region}")]
    RegionOutsidePage { region: Region, page_region: Region },
    #[error("out page {out_region} and in page {in_region} share no fields")]
    PagesDisjoint {
        out_region: Region,
        in_region: Region,
    },
    #[error("page {page} does not carry a {expected} payload")]
    WrongPayload {
        page: PageId,
        expected: &'static str,
    },
    #[error("page {page} has been freed")]
    PageFreed { page: PageId },
    #[error("page {page} is still referenced ({refs} outstanding)")]
    StillReferenced { page: PageId, refs: usize },
    #[error(transparent)]
    Region(#[from] RegionError),
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// Page-table failures: lookups outside the covered region, unpaged gaps,
/// and boundary violations on insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PageTableError {
    #[error("{position} is outside the page table's region")]
    OutOfRange { position: Position },
    #[error("{position} falls in an unpaged gap")]
    UnpagedGap { position: Position },
    #[error("incoming page {incoming} partially overlaps resident page {existing}")]
    BoundaryViolation { incoming: Region, existing: Region },
    #[error("incoming pages {first} and {second} overlap each other")]
    OverlappingBatch { first: Region, second: Region },
    #[error("page {page} is not in this page table")]
    NoSuchPage { page: PageId },
    #[error("page table is in {expected}, not {actual}")]
    SpaceMismatch { expected: SpaceId, actual: SpaceId },
}

/// Umbrella error for the [`PagedArea`](crate::PagedArea) façade.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    #[error("{position} is outside the paged area's region")]
    OutOfArea { position: Position },
    #[error(transparent)]
    PageTable(#[from] PageTableError),
    #[error(transparent)]
    Swap(#[from] SwapError),
    #[error(transparent)]
    Region(#[from] RegionError),
    #[error(transparent)]
    Buffer(#[from] BufferError),
}
