//! # Address-Space Algebra for Paging
//!
//! Strongly typed positions, sizes and regions used by the paging engine.
//!
//! ## Overview
//!
//! All paging geometry (page boundaries, swap spans, page-table coverage)
//! is expressed with a small set of types that prevent mixing coordinates
//! from different address spaces at runtime while remaining thin wrappers
//! around `u64` values.
//!
//! | Concept | Description |
//! |----------|-------------|
//! | [`SpaceId`] / [`Space`] | Identifies one coordinate space (one storage layer's addressing). |
//! | [`Position`] | One field index inside a specific space. |
//! | [`Size`] | A count of fields, space-free. |
//! | [`Region`] | A contiguous, half-open run of positions inside one space. |
//! | [`SparseRegion`] | An ordered set of disjoint regions (page-table coverage). |
//!
//! ## Ordering across spaces
//!
//! Positions from different spaces are deliberately *incomparable*:
//! [`Position`] implements [`PartialOrd`](core::cmp::PartialOrd) but not
//! `Ord`, and comparing positions of two different spaces yields `None`.
//! Any sorted page storage must therefore stay within a single space, which
//! the page table enforces.
//!
//! ## Typical Usage
//!
//! ```rust
//! # use paging_region::*;
//! let space = Space::new(SpaceId::new(1));
//! let page = space.region(4096, 4096).unwrap();
//!
//! assert!(page.contains(space.position(5000)));
//! assert_eq!(page.size(), Size::new(4096));
//!
//! // Align an arbitrary position down to a page boundary.
//! let pos = space.position(5000);
//! assert_eq!(pos.align_down(Size::new(4096)), space.position(4096));
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

mod error;
mod position;
mod region;
mod size;
mod space;
mod sparse_region;

pub use error::RegionError;
pub use position::Position;
pub use region::Region;
pub use size::Size;
pub use space::{Space, SpaceId};
pub use sparse_region::SparseRegion;
