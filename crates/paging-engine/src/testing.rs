//! Shared fixtures for the unit tests in this crate.

use crate::credentials::Credentials;
use crate::swap_state::{SwapState, SwapStateId, SwapStateKind};
use paging_region::{Size, Space, SpaceId};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

pub const TEST_CREDENTIALS: Credentials = Credentials::new(0xC0FFEE);

pub fn test_space() -> Space {
    Space::new(SpaceId::new(7))
}

fn next_state_id() -> SwapStateId {
    static NEXT: AtomicU32 = AtomicU32::new(100);
    SwapStateId::new(NEXT.fetch_add(1, Ordering::Relaxed))
}

pub fn buffer_state(name: &str, page_fields: u64) -> Arc<SwapState> {
    SwapState::new(
        next_state_id(),
        name,
        test_space().id(),
        Size::new(page_fields),
        SwapStateKind::Buffer,
    )
    .unwrap()
}

pub fn block_state(name: &str, page_fields: u64) -> Arc<SwapState> {
    SwapState::new(
        next_state_id(),
        name,
        test_space().id(),
        Size::new(page_fields),
        SwapStateKind::Block,
    )
    .unwrap()
}
