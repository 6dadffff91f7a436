//! Leaf node - sorted (key → record locator) entries plus sibling and
//! parent links.

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, RecordId, Result};
use crate::storage::page::Page;

use super::Key;

/// A B+tree leaf node.
///
/// # Page Layout
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       4     entry_count
/// 4       4     next leaf (-1 = none)
/// 8       4     parent (-1 = root)
/// 12      12×n  entries: [key: 4][rid.pid: 4][rid.sid: 4]
/// ```
/// Entries are sorted ascending by key; the rest of the page is zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafNode {
    entries: Vec<(Key, RecordId)>,
    next: PageId,
    parent: PageId,
}

impl LeafNode {
    /// Size of the fixed header in bytes.
    pub const HEADER_SIZE: usize = 12;
    /// Size of one entry in bytes.
    pub const ENTRY_SIZE: usize = 12;
    /// Maximum number of entries a leaf page holds.
    pub const ENTRY_LIMIT: usize = (PAGE_SIZE - Self::HEADER_SIZE) / Self::ENTRY_SIZE;

    const OFFSET_COUNT: usize = 0;
    const OFFSET_NEXT: usize = 4;
    const OFFSET_PARENT: usize = 8;

    /// Create an empty leaf with no sibling and no parent.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next: PageId::INVALID,
            parent: PageId::INVALID,
        }
    }

    /// Decode a leaf from a page.
    ///
    /// # Errors
    /// Returns `Error::Corrupted` if the stored entry count is out of range.
    pub fn decode(pid: PageId, page: &Page) -> Result<Self> {
        let count = page.get_i32(Self::OFFSET_COUNT);
        if count < 0 || count as usize > Self::ENTRY_LIMIT {
            return Err(Error::Corrupted {
                pid,
                reason: format!("leaf entry count {} out of range", count),
            });
        }

        let entries = (0..count as usize)
            .map(|i| {
                let offset = Self::HEADER_SIZE + i * Self::ENTRY_SIZE;
                let key = page.get_i32(offset);
                let rid = RecordId::new(PageId(page.get_i32(offset + 4)), page.get_i32(offset + 8));
                (key, rid)
            })
            .collect();

        Ok(Self {
            entries,
            next: PageId(page.get_i32(Self::OFFSET_NEXT)),
            parent: PageId(page.get_i32(Self::OFFSET_PARENT)),
        })
    }

    /// Encode this leaf into a freshly zeroed page.
    ///
    /// # Panics
    /// Panics if the leaf holds more than `ENTRY_LIMIT` entries, which only
    /// happens between an overflowing insert and its split.
    pub fn encode(&self) -> Page {
        assert!(
            self.entries.len() <= Self::ENTRY_LIMIT,
            "leaf overflow: {} entries",
            self.entries.len()
        );

        let mut page = Page::new();
        page.put_i32(Self::OFFSET_COUNT, self.entries.len() as i32);
        page.put_i32(Self::OFFSET_NEXT, self.next.0);
        page.put_i32(Self::OFFSET_PARENT, self.parent.0);

        for (i, (key, rid)) in self.entries.iter().enumerate() {
            let offset = Self::HEADER_SIZE + i * Self::ENTRY_SIZE;
            page.put_i32(offset, *key);
            page.put_i32(offset + 4, rid.pid.0);
            page.put_i32(offset + 8, rid.sid);
        }
        page
    }

    /// Number of entries in the node.
    #[inline]
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert `(key, rid)`, overwriting the locator of an existing key.
    ///
    /// # Errors
    /// Returns `Error::NodeFull` without modifying the node if it already
    /// holds `ENTRY_LIMIT` entries.
    pub fn insert(&mut self, key: Key, rid: RecordId) -> Result<()> {
        if self.entries.len() >= Self::ENTRY_LIMIT {
            return Err(Error::NodeFull);
        }
        self.put(key, rid);
        Ok(())
    }

    /// Insert `(key, rid)` regardless of capacity, then move the upper half
    /// of the entries into `sibling`.
    ///
    /// The lower `n / 2` entries stay here. Returns the first key of
    /// `sibling`, which the parent uses as the separator. Sibling and parent
    /// links are left for the caller to wire.
    ///
    /// # Panics
    /// Panics if `sibling` is not empty.
    pub fn insert_and_split(&mut self, key: Key, rid: RecordId, sibling: &mut LeafNode) -> Key {
        assert!(sibling.is_empty(), "split sibling must be empty");

        self.put(key, rid);
        let half = self.entries.len() / 2;
        sibling.entries = self.entries.split_off(half);
        sibling.entries[0].0
    }

    /// Offset of the first entry whose key is `>= search_key`.
    ///
    /// # Errors
    /// Returns `Error::NoSuchRecord` if every key is smaller.
    pub fn locate(&self, search_key: Key) -> Result<usize> {
        let eid = self.entries.partition_point(|(k, _)| *k < search_key);
        if eid == self.entries.len() {
            Err(Error::NoSuchRecord)
        } else {
            Ok(eid)
        }
    }

    /// Read the entry at `eid`.
    ///
    /// # Errors
    /// Returns `Error::NoSuchRecord` if `eid` is out of range.
    pub fn read_entry(&self, eid: usize) -> Result<(Key, RecordId)> {
        self.entries.get(eid).copied().ok_or(Error::NoSuchRecord)
    }

    /// Iterate over all entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (Key, RecordId)> + '_ {
        self.entries.iter().copied()
    }

    /// Page of the next leaf in key order.
    #[inline]
    pub fn next_leaf(&self) -> PageId {
        self.next
    }

    #[inline]
    pub fn set_next_leaf(&mut self, pid: PageId) {
        self.next = pid;
    }

    #[inline]
    pub fn parent(&self) -> PageId {
        self.parent
    }

    #[inline]
    pub fn set_parent(&mut self, pid: PageId) {
        self.parent = pid;
    }

    fn put(&mut self, key: Key, rid: RecordId) {
        match self.entries.binary_search_by_key(&key, |(k, _)| *k) {
            Ok(pos) => self.entries[pos].1 = rid,
            Err(pos) => self.entries.insert(pos, (key, rid)),
        }
    }
}

impl Default for LeafNode {
    fn default() -> Self {
        Self::new()
    }
}
