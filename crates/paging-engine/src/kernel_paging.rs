use crate::page::{Page, PageId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Process-wide page recency and dirty/clean bookkeeping.
///
/// One instance is shared by every [`PagedArea`](crate::PagedArea) in a
/// process: construct it once wherever the swap system is assembled and
/// pass it around explicitly (there is no global).
///
/// The recency list is a doubly linked list threaded through a map, so
/// `recent`, `remove` and the set operations are O(1) amortized;
/// [`least_recent`](Self::least_recent) yields the eviction candidate for
/// whatever out-swap policy sits above this structure.
///
/// A page is in at most one of the dirty and clean sets; a page this
/// structure has never seen is in neither.
///
/// All operations take the structure's own internal lock, independent of
/// any paged area's swap lock.
pub struct KernelPaging {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    nodes: HashMap<PageId, Node>,
    /// Most recently used end.
    head: Option<PageId>,
    /// Least recently used end.
    tail: Option<PageId>,
    dirty: HashSet<PageId>,
    clean: HashSet<PageId>,
}

struct Node {
    page: Weak<Page>,
    prev: Option<PageId>,
    next: Option<PageId>,
}

impl KernelPaging {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    fn locked(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark `page` most recently used, inserting it if unknown.
    pub fn recent(&self, page: &Arc<Page>) {
        let mut inner = self.locked();
        let id = page.id();
        if inner.nodes.contains_key(&id) {
            inner.unlink(id);
        } else {
            inner.nodes.insert(
                id,
                Node {
                    page: Arc::downgrade(page),
                    prev: None,
                    next: None,
                },
            );
        }
        inner.push_front(id);
    }

    /// The least recently used page, if any.
    ///
    /// Entries whose page has been dropped are discarded on the way.
    #[must_use]
    pub fn least_recent(&self) -> Option<Arc<Page>> {
        let mut inner = self.locked();
        while let Some(id) = inner.tail {
            if let Some(page) = inner.nodes.get(&id).and_then(|node| node.page.upgrade()) {
                return Some(page);
            }
            // Stale entry; the page is gone.
            inner.unlink(id);
            inner.nodes.remove(&id);
            inner.dirty.remove(&id);
            inner.clean.remove(&id);
        }
        None
    }

    /// Forget `page` entirely: recency list and both sets.
    pub fn remove(&self, page: &Page) {
        let mut inner = self.locked();
        let id = page.id();
        if inner.nodes.contains_key(&id) {
            inner.unlink(id);
            inner.nodes.remove(&id);
        }
        inner.dirty.remove(&id);
        inner.clean.remove(&id);
    }

    /// Classify `page` clean. Returns whether it was dirty before.
    pub fn clean(&self, page: &Page) -> bool {
        let mut inner = self.locked();
        let id = page.id();
        let was_dirty = inner.dirty.remove(&id);
        inner.clean.insert(id);
        was_dirty
    }

    /// Classify `page` dirty. Returns whether it was clean before.
    pub fn dirty(&self, page: &Page) -> bool {
        let mut inner = self.locked();
        let id = page.id();
        let was_clean = inner.clean.remove(&id);
        inner.dirty.insert(id);
        was_clean
    }

    #[must_use]
    pub fn is_dirty(&self, page: &Page) -> bool {
        self.locked().dirty.contains(&page.id())
    }

    #[must_use]
    pub fn is_clean(&self, page: &Page) -> bool {
        self.locked().clean.contains(&page.id())
    }

    /// Whether `page` is currently on the recency list.
    #[must_use]
    pub fn knows(&self, page: &Page) -> bool {
        self.locked().nodes.contains_key(&page.id())
    }

    /// Whether `page` sits at the most-recently-used end.
    #[must_use]
    pub fn is_most_recent(&self, page: &Page) -> bool {
        self.locked().head == Some(page.id())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.locked().nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locked().nodes.is_empty()
    }
}

impl Default for KernelPaging {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    /// Detach `id` from the list without touching the node map.
    fn unlink(&mut self, id: PageId) {
        let (prev, next) = match self.nodes.get_mut(&id) {
            Some(node) => {
                let links = (node.prev, node.next);
                node.prev = None;
                node.next = None;
                links
            }
            None => return,
        };
        self.relink_neighbors(id, prev, next);
    }

    fn relink_neighbors(&mut self, id: PageId, prev: Option<PageId>, next: Option<PageId>) {
        if let Some(prev_id) = prev
            && let Some(node) = self.nodes.get_mut(&prev_id)
        {
            node.next = next;
        }
        if let Some(next_id) = next
            && let Some(node) = self.nodes.get_mut(&next_id)
        {
            node.prev = prev;
        }
        if self.head == Some(id) {
            self.head = next;
        }
        if self.tail == Some(id) {
            self.tail = prev;
        }
    }

    fn push_front(&mut self, id: PageId) {
        let old_head = self.head;
        if let Some(node) = self.nodes.get_mut(&id) {
            node.prev = None;
            node.next = old_head;
        }
        if let Some(head_id) = old_head
            && let Some(node) = self.nodes.get_mut(&head_id)
        {
            node.prev = Some(id);
        }
        self.head = Some(id);
        if self.tail.is_none() {
            self.tail = Some(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swap_state::SwapConfiguration;
    use crate::testing::{buffer_state, test_space, TEST_CREDENTIALS};

    fn page_at(offset: u64) -> Arc<Page> {
        buffer_state("ram", 8)
            .create_page(
                TEST_CREDENTIALS,
                test_space().position(offset),
                &SwapConfiguration::new(),
            )
            .unwrap()
    }

    #[test]
    fn recency_follows_touches() {
        let paging = KernelPaging::new();
        let a = page_at(0);
        let b = page_at(8);
        paging.recent(&a);
        paging.recent(&b);
        assert!(paging.is_most_recent(&b));
        assert_eq!(paging.least_recent().unwrap().id(), a.id());

        paging.recent(&a);
        assert!(paging.is_most_recent(&a));
        assert_eq!(paging.least_recent().unwrap().id(), b.id());
    }

    #[test]
    fn dirty_and_clean_are_mutually_exclusive() {
        let paging = KernelPaging::new();
        let page = page_at(0);
        paging.recent(&page);
        // Recency alone classifies nothing.
        assert!(!paging.is_clean(&page));
        assert!(!paging.is_dirty(&page));

        paging.clean(&page);
        let was_clean = paging.dirty(&page);
        assert!(was_clean);
        assert!(paging.is_dirty(&page));
        assert!(!paging.is_clean(&page));

        let was_dirty = paging.clean(&page);
        assert!(was_dirty);
        assert!(paging.is_clean(&page));
        assert!(!paging.is_dirty(&page));
    }

    #[test]
    fn remove_forgets_the_page() {
        let paging = KernelPaging::new();
        let a = page_at(0);
        let b = page_at(8);
        paging.recent(&a);
        paging.recent(&b);
        paging.dirty(&a);

        paging.remove(&a);
        assert!(!paging.knows(&a));
        assert!(!paging.is_dirty(&a));
        assert_eq!(paging.len(), 1);
        assert_eq!(paging.least_recent().unwrap().id(), b.id());
    }

    #[test]
    fn dropped_pages_fall_out_of_least_recent() {
        let paging = KernelPaging::new();
        let a = page_at(0);
        let b = page_at(8);
        paging.recent(&a);
        paging.recent(&b);

        drop(a);
        assert_eq!(paging.least_recent().unwrap().id(), b.id());
    }

    #[test]
    fn empty_structure_has_no_least_recent() {
        let paging = KernelPaging::new();
        assert!(paging.least_recent().is_none());
        assert!(paging.is_empty());
    }
}
