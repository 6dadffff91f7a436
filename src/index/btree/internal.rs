//! Internal node - separator keys routing to child pages.

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

use super::Key;

/// A B+tree internal (non-leaf) node.
///
/// A separator `k` mapped to child `c` routes every key `>= k` (and below
/// the next separator) to `c`. Keys smaller than the first separator
/// route to the min child.
///
/// # Page Layout
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       4     entry_count
/// 4       4     min child
/// 8       4     parent (-1 = root)
/// 12      8×n   entries: [key: 4][child: 4]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalNode {
    min_child: PageId,
    entries: Vec<(Key, PageId)>,
    parent: PageId,
}

impl InternalNode {
    /// Size of the fixed header in bytes.
    pub const HEADER_SIZE: usize = 12;
    /// Size of one entry in bytes.
    pub const ENTRY_SIZE: usize = 8;
    /// Maximum number of separators an internal page holds.
    pub const ENTRY_LIMIT: usize = (PAGE_SIZE - Self::HEADER_SIZE) / Self::ENTRY_SIZE;

    const OFFSET_COUNT: usize = 0;
    const OFFSET_MIN_CHILD: usize = 4;
    const OFFSET_PARENT: usize = 8;

    /// Create an empty node with no children and no parent.
    pub fn new() -> Self {
        Self {
            min_child: PageId::INVALID,
            entries: Vec::new(),
            parent: PageId::INVALID,
        }
    }

    /// Decode an internal node from a page.
    ///
    /// # Errors
    /// Returns `Error::Corrupted` if the stored entry count is out of range.
    pub fn decode(pid: PageId, page: &Page) -> Result<Self> {
        let count = page.get_i32(Self::OFFSET_COUNT);
        if count < 0 || count as usize > Self::ENTRY_LIMIT {
            return Err(Error::Corrupted {
                pid,
                reason: format!("internal entry count {} out of range", count),
            });
        }

        let entries = (0..count as usize)
            .map(|i| {
                let offset = Self::HEADER_SIZE + i * Self::ENTRY_SIZE;
                (page.get_i32(offset), PageId(page.get_i32(offset + 4)))
            })
            .collect();

        Ok(Self {
            min_child: PageId(page.get_i32(Self::OFFSET_MIN_CHILD)),
            entries,
            parent: PageId(page.get_i32(Self::OFFSET_PARENT)),
        })
    }

    /// Encode this node into a freshly zeroed page.
    ///
    /// # Panics
    /// Panics if the node holds more than `ENTRY_LIMIT` entries.
    pub fn encode(&self) -> Page {
        assert!(
            self.entries.len() <= Self::ENTRY_LIMIT,
            "internal overflow: {} entries",
            self.entries.len()
        );

        let mut page = Page::new();
        page.put_i32(Self::OFFSET_COUNT, self.entries.len() as i32);
        page.put_i32(Self::OFFSET_MIN_CHILD, self.min_child.0);
        page.put_i32(Self::OFFSET_PARENT, self.parent.0);

        for (i, (key, child)) in self.entries.iter().enumerate() {
            let offset = Self::HEADER_SIZE + i * Self::ENTRY_SIZE;
            page.put_i32(offset, *key);
            page.put_i32(offset + 4, child.0);
        }
        page
    }

    /// Number of separator keys in the node.
    #[inline]
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && !self.min_child.is_valid()
    }

    /// Insert separator `key` routing to `child`.
    ///
    /// # Errors
    /// Returns `Error::NodeFull` without modifying the node if it already
    /// holds `ENTRY_LIMIT` separators.
    pub fn insert(&mut self, key: Key, child: PageId) -> Result<()> {
        if self.entries.len() >= Self::ENTRY_LIMIT {
            return Err(Error::NodeFull);
        }
        self.put(key, child);
        Ok(())
    }

    /// Insert `(key, child)` regardless of capacity, then split around the
    /// middle entry.
    ///
    /// Entries before the middle stay here and entries after it move into
    /// `sibling`. The middle entry is removed from both nodes and returned
    /// as `(promoted_key, promoted_child)`; the caller makes
    /// `promoted_child` the sibling's min child.
    ///
    /// # Panics
    /// Panics if `sibling` is not empty.
    pub fn insert_and_split(
        &mut self,
        key: Key,
        child: PageId,
        sibling: &mut InternalNode,
    ) -> (Key, PageId) {
        assert!(sibling.is_empty(), "split sibling must be empty");

        self.put(key, child);
        let mid = self.entries.len() / 2;
        let promoted = self.entries.remove(mid);
        sibling.entries = self.entries.split_off(mid);
        promoted
    }

    /// Child page to follow when searching for `search_key`.
    ///
    /// A key equal to a separator routes to that separator's child.
    pub fn locate_child_ptr(&self, search_key: Key) -> PageId {
        let idx = self.entries.partition_point(|(k, _)| *k <= search_key);
        if idx == 0 {
            self.min_child
        } else {
            self.entries[idx - 1].1
        }
    }

    /// Reset to a two-child root: `left` below `key`, `right` from `key` on.
    pub fn initialize_root(&mut self, left: PageId, key: Key, right: PageId) {
        self.clear();
        self.min_child = left;
        self.entries.push((key, right));
    }

    /// All child pages, min child first, in key order.
    pub fn children(&self) -> impl Iterator<Item = PageId> + '_ {
        std::iter::once(self.min_child)
            .filter(PageId::is_valid)
            .chain(self.entries.iter().map(|(_, child)| *child))
    }

    /// Iterate over separator entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (Key, PageId)> + '_ {
        self.entries.iter().copied()
    }

    #[inline]
    pub fn min_child(&self) -> PageId {
        self.min_child
    }

    #[inline]
    pub fn set_min_child(&mut self, pid: PageId) {
        self.min_child = pid;
    }

    #[inline]
    pub fn parent(&self) -> PageId {
        self.parent
    }

    #[inline]
    pub fn set_parent(&mut self, pid: PageId) {
        self.parent = pid;
    }

    /// Reset to the empty state.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.min_child = PageId::INVALID;
        self.parent = PageId::INVALID;
    }

    fn put(&mut self, key: Key, child: PageId) {
        match self.entries.binary_search_by_key(&key, |(k, _)| *k) {
            Ok(pos) => self.entries[pos].1 = child,
            Err(pos) => self.entries.insert(pos, (key, child)),
        }
    }
}

impl Default for InternalNode {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_node() -> InternalNode {
        let mut node = InternalNode::new();
        node.set_min_child(PageId::new(1000));
        for i in 0..InternalNode::ENTRY_LIMIT as i32 {
            node.insert(i * 10, PageId::new(i + 1)).unwrap();
        }
        node
    }

    #[test]
    fn test_entry_limit() {
        assert_eq!(InternalNode::ENTRY_LIMIT, 126);
    }

    #[test]
    fn test_insert_full_rejected_unchanged() {
        let mut node = full_node();
        let before = node.clone();

        assert!(matches!(node.insert(5, PageId::new(9)), Err(Error::NodeFull)));
        assert_eq!(node, before);
    }

    #[test]
    fn test_locate_child_ptr() {
        let mut node = InternalNode::new();
        node.initialize_root(PageId::new(1), 50, PageId::new(2));
        node.insert(100, PageId::new(3)).unwrap();

        assert_eq!(node.locate_child_ptr(i32::MIN), PageId::new(1));
        assert_eq!(node.locate_child_ptr(49), PageId::new(1));
        assert_eq!(node.locate_child_ptr(50), PageId::new(2));
        assert_eq!(node.locate_child_ptr(99), PageId::new(2));
        assert_eq!(node.locate_child_ptr(100), PageId::new(3));
        assert_eq!(node.locate_child_ptr(i32::MAX), PageId::new(3));
    }

    #[test]
    fn test_insert_and_split_promotes_middle() {
        let mut node = full_node();
        let mut sibling = InternalNode::new();

        // 126 + 1 entries: 63 stay, middle promoted, 63 move
        let (key, child) = node.insert_and_split(126 * 10, PageId::new(127), &mut sibling);

        assert_eq!(node.key_count(), 63);
        assert_eq!(sibling.key_count(), 63);
        assert_eq!(key, 63 * 10);
        assert_eq!(child, PageId::new(64));
        assert!(node.entries().all(|(k, _)| k < key));
        assert!(sibling.entries().all(|(k, _)| k > key));
        assert_eq!(node.min_child(), PageId::new(1000));
        assert!(!sibling.min_child().is_valid());
    }

    #[test]
    fn test_split_conserves_entries() {
        let mut node = full_node();
        let mut sibling = InternalNode::new();

        node.insert_and_split(-5, PageId::new(500), &mut sibling);

        assert_eq!(
            node.key_count() + sibling.key_count() + 1,
            InternalNode::ENTRY_LIMIT + 1
        );
        assert_eq!(node.entries().next().unwrap(), (-5, PageId::new(500)));
    }

    #[test]
    fn test_initialize_root() {
        let mut node = full_node();
        node.set_parent(PageId::new(8));

        node.initialize_root(PageId::new(3), 42, PageId::new(4));

        assert_eq!(node.min_child(), PageId::new(3));
        assert_eq!(node.key_count(), 1);
        assert_eq!(node.entries().next().unwrap(), (42, PageId::new(4)));
        assert!(!node.parent().is_valid());
    }

    #[test]
    fn test_children_order() {
        let mut node = InternalNode::new();
        node.initialize_root(PageId::new(7), 10, PageId::new(8));
        node.insert(5, PageId::new(9)).unwrap();

        let children: Vec<PageId> = node.children().collect();
        assert_eq!(children, vec![PageId::new(7), PageId::new(9), PageId::new(8)]);
    }

    #[test]
    fn test_clear() {
        let mut node = full_node();
        node.set_parent(PageId::new(2));
        node.clear();

        assert!(node.is_empty());
        assert_eq!(node, InternalNode::new());
    }

    #[test]
    fn test_codec_roundtrip() {
        let mut node = full_node();
        node.set_parent(PageId::new(12));

        let decoded = InternalNode::decode(PageId::new(5), &node.encode()).unwrap();
        assert_eq!(decoded, node);
    }

    #[test]
    fn test_codec_byte_layout() {
        let mut node = InternalNode::new();
        node.initialize_root(PageId::new(1), 77, PageId::new(2));

        let page = node.encode();
        assert_eq!(page.get_i32(0), 1); // entry count
        assert_eq!(page.get_i32(4), 1); // min child
        assert_eq!(page.get_i32(8), -1); // root has no parent
        assert_eq!(page.get_i32(12), 77);
        assert_eq!(page.get_i32(16), 2);
        assert!(page.as_slice()[20..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_decode_rejects_bad_count() {
        let mut page = Page::new();
        page.put_i32(0, -3);

        assert!(matches!(
            InternalNode::decode(PageId::new(1), &page),
            Err(Error::Corrupted { .. })
        ));
    }
}
