use crate::SpaceId;

/// Geometry errors, detected before any state is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegionError {
    #[error("positions from {left} and {right} cannot be combined")]
    SpaceMismatch { left: SpaceId, right: SpaceId },
    #[error("region start {start} + length {len} overflows the space")]
    Overflow { start: u64, len: u64 },
    #[error("region end {end} precedes start {start}")]
    Backwards { start: u64, end: u64 },
    #[error("subregion at {offset} + {len} exceeds the parent length {within}")]
    OutOfBounds { offset: u64, len: u64, within: u64 },
    #[error("sparse region runs must be non-empty, sorted and disjoint")]
    UnorderedRuns,
}
