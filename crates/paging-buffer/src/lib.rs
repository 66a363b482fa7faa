//! # Fields and Buffers
//!
//! The unit of paged data and its in-memory aggregate.
//!
//! A [`Field`] is the atom the paging engine moves around: page sizes,
//! positions and regions are all counted in fields. A [`Buffer`] is a
//! fixed-length run of fields backing one swapped-in page, or supplied by
//! a caller as the source/destination of a paged-area read or write.
//!
//! The engine treats field contents as opaque; a field is a thin wrapper
//! around a `u64` payload.

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

mod buffer;
mod field;

pub use buffer::{Buffer, BufferError};
pub use field::Field;
