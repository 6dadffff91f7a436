//! B+tree index controller - descent, insertion with split propagation,
//! and forward scans over the leaf chain.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use crate::common::config::{HEADER_PAGE_ID, INDEX_FILE_SUFFIX};
use crate::common::{Error, PageId, RecordId, Result};
use crate::storage::{OpenMode, PageFile};

use super::{IndexCursor, InternalNode, Key, LeafNode, Scan, TreeMeta};

/// A disk-backed B+tree mapping `i32` keys to [`RecordId`]s.
///
/// # Architecture
/// ```text
///                 ┌──────────────┐
///  header page 0  │ root, height │
///                 │  next page   │
///                 └──────┬───────┘
///                        ▼
///                 ┌──────────────┐
///                 │   internal   │   height = 1
///                 └──┬────────┬──┘
///                    ▼        ▼
///              ┌────────┐  ┌────────┐
///              │  leaf  │─▶│  leaf  │─▶ none
///              └────────┘  └────────┘
/// ```
///
/// Nodes refer to each other by page id only. Nothing is cached: every
/// node access reads or writes its page through the [`PageFile`].
///
/// # Thread Safety
/// `BTreeIndex` is single-threaded; a single reader/writer is assumed for
/// the lifetime of the index file.
///
/// # Durability
/// Metadata is written on [`BTreeIndex::flush`] and [`BTreeIndex::close`],
/// and on a best-effort basis when an unclosed index is dropped. A failed
/// page write aborts the current call and leaves whatever pages were
/// already written in place.
///
/// # Example
/// ```no_run
/// use paged_bptree::{BTreeIndex, OpenMode, PageId, RecordId};
///
/// let mut index = BTreeIndex::open("movies", OpenMode::ReadWrite).unwrap();
/// index.insert(42, RecordId::new(PageId::new(3), 1)).unwrap();
///
/// let mut cursor = index.locate(40).unwrap();
/// let (key, rid) = index.read_forward(&mut cursor).unwrap();
/// assert_eq!(key, 42);
/// index.close().unwrap();
/// ```
pub struct BTreeIndex {
    file: PageFile,
    meta: TreeMeta,
    /// Set once `close` has persisted everything.
    closed: bool,
}

impl BTreeIndex {
    /// Open the index named `name`, stored in `name` + `.idx`.
    ///
    /// In [`OpenMode::ReadWrite`] the file is created if it does not exist,
    /// and a missing header page is written as an empty tree right away.
    /// A read-only file without a header page opens as an empty tree.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or its header page is
    /// corrupted.
    pub fn open<P: AsRef<Path>>(name: P, mode: OpenMode) -> Result<Self> {
        let mut file = PageFile::open(Self::index_path(name), mode)?;

        let meta = if file.end_pid() > HEADER_PAGE_ID {
            TreeMeta::decode(HEADER_PAGE_ID, &file.read_page(HEADER_PAGE_ID)?)?
        } else {
            let meta = TreeMeta::empty();
            if mode == OpenMode::ReadWrite {
                file.write_page(HEADER_PAGE_ID, &meta.encode())?;
            }
            meta
        };

        debug!(
            path = %file.path().display(),
            ?mode,
            root = meta.root.0,
            height = ?meta.height,
            next_page = meta.next_page.0,
            "opened index"
        );
        Ok(Self {
            file,
            meta,
            closed: false,
        })
    }

    /// File name of the index called `name`.
    pub fn index_path<P: AsRef<Path>>(name: P) -> PathBuf {
        let mut path = OsString::from(name.as_ref().as_os_str());
        path.push(INDEX_FILE_SUFFIX);
        PathBuf::from(path)
    }

    /// Persist metadata (read-write only) and release the file.
    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        self.closed = true;
        debug!(
            path = %self.file.path().display(),
            root = self.meta.root.0,
            height = ?self.meta.height,
            "closed index"
        );
        Ok(())
    }

    /// Persist metadata and sync without closing.
    pub fn flush(&mut self) -> Result<()> {
        self.write_meta()?;
        self.file.sync()
    }

    /// Current root page, or [`PageId::INVALID`] for an empty tree.
    #[inline]
    pub fn root_pid(&self) -> PageId {
        self.meta.root
    }

    /// Internal levels above the leaves; `None` for an empty tree.
    #[inline]
    pub fn height(&self) -> Option<u32> {
        self.meta.height
    }

    /// In-memory tree metadata, including the page allocation counter.
    #[inline]
    pub fn meta(&self) -> &TreeMeta {
        &self.meta
    }

    /// Mode the index was opened with.
    #[inline]
    pub fn mode(&self) -> OpenMode {
        self.file.mode()
    }

    /// Insert `(key, rid)`. An existing key has its locator replaced.
    ///
    /// A full leaf is split and the split propagates upward until a parent
    /// absorbs the new separator or a new root is created.
    ///
    /// # Errors
    /// Returns `Error::ReadOnly` for a read-only index, or the first page
    /// I/O error encountered.
    pub fn insert(&mut self, key: Key, rid: RecordId) -> Result<()> {
        if self.file.mode() == OpenMode::Read {
            return Err(Error::ReadOnly);
        }

        let Some(height) = self.meta.height else {
            let root = self.allocate_page();
            let mut leaf = LeafNode::new();
            leaf.insert(key, rid)?;
            self.write_leaf(root, &leaf)?;
            self.meta.root = root;
            self.meta.height = Some(0);
            debug!(root = root.0, "created root leaf");
            return Ok(());
        };

        let leaf_pid = self.find_leaf(key, height)?;
        let mut leaf = self.read_leaf(leaf_pid)?;
        match leaf.insert(key, rid) {
            Ok(()) => return self.write_leaf(leaf_pid, &leaf),
            Err(Error::NodeFull) => {}
            Err(e) => return Err(e),
        }

        let mut sibling = LeafNode::new();
        let separator = leaf.insert_and_split(key, rid, &mut sibling);
        let sibling_pid = self.allocate_page();
        sibling.set_next_leaf(leaf.next_leaf());
        leaf.set_next_leaf(sibling_pid);
        debug!(
            leaf = leaf_pid.0,
            sibling = sibling_pid.0,
            separator,
            "split leaf"
        );

        let parent_pid = leaf.parent();
        if !parent_pid.is_valid() {
            let root = self.allocate_page();
            leaf.set_parent(root);
            sibling.set_parent(root);
            self.write_leaf(leaf_pid, &leaf)?;
            self.write_leaf(sibling_pid, &sibling)?;
            return self.grow_root(root, leaf_pid, separator, sibling_pid);
        }

        sibling.set_parent(parent_pid);
        self.write_leaf(leaf_pid, &leaf)?;
        self.write_leaf(sibling_pid, &sibling)?;
        self.insert_into_parent(parent_pid, separator, sibling_pid)
    }

    /// Insert separator `key` → `child` into internal node `node_pid`,
    /// splitting upward for as long as nodes overflow.
    fn insert_into_parent(
        &mut self,
        mut node_pid: PageId,
        mut key: Key,
        mut child: PageId,
    ) -> Result<()> {
        // Levels above the leaves of the node being inserted into
        let mut level = 1u32;

        loop {
            let mut node = self.read_internal(node_pid)?;
            match node.insert(key, child) {
                Ok(()) => return self.write_internal(node_pid, &node),
                Err(Error::NodeFull) => {}
                Err(e) => return Err(e),
            }

            let mut sibling = InternalNode::new();
            let (promoted_key, promoted_child) = node.insert_and_split(key, child, &mut sibling);
            sibling.set_min_child(promoted_child);
            let sibling_pid = self.allocate_page();
            debug!(
                node = node_pid.0,
                sibling = sibling_pid.0,
                promoted_key,
                level,
                "split internal node"
            );

            let grandparent = node.parent();
            let new_root = if grandparent.is_valid() {
                None
            } else {
                let root = self.allocate_page();
                node.set_parent(root);
                Some(root)
            };
            sibling.set_parent(new_root.unwrap_or(grandparent));

            self.write_internal(node_pid, &node)?;
            self.write_internal(sibling_pid, &sibling)?;

            let moved: Vec<PageId> = sibling.children().collect();
            self.reparent(&moved, sibling_pid, level == 1)?;

            if let Some(root) = new_root {
                return self.grow_root(root, node_pid, promoted_key, sibling_pid);
            }

            node_pid = grandparent;
            key = promoted_key;
            child = sibling_pid;
            level += 1;
        }
    }

    /// Point every page in `children` at `parent`.
    fn reparent(&mut self, children: &[PageId], parent: PageId, leaves: bool) -> Result<()> {
        for &child in children {
            if leaves {
                let mut leaf = self.read_leaf(child)?;
                leaf.set_parent(parent);
                self.write_leaf(child, &leaf)?;
            } else {
                let mut node = self.read_internal(child)?;
                node.set_parent(parent);
                self.write_internal(child, &node)?;
            }
        }
        Ok(())
    }

    /// Write a two-child root at `root` and make it the tree's root.
    fn grow_root(&mut self, root: PageId, left: PageId, key: Key, right: PageId) -> Result<()> {
        let mut node = InternalNode::new();
        node.initialize_root(left, key, right);
        self.write_internal(root, &node)?;

        let height = self.meta.height.map_or(0, |h| h + 1);
        self.meta.root = root;
        self.meta.height = Some(height);
        debug!(root = root.0, left = left.0, right = right.0, key, height, "grew new root");
        Ok(())
    }

    /// Cursor at the first entry with key `>= search_key`.
    ///
    /// Returns the end cursor when every key in the index is smaller.
    ///
    /// # Errors
    /// Returns `Error::NoSuchRecord` if the tree is empty.
    pub fn locate(&mut self, search_key: Key) -> Result<IndexCursor> {
        let height = self.meta.height.ok_or(Error::NoSuchRecord)?;
        let leaf_pid = self.find_leaf(search_key, height)?;
        let leaf = self.read_leaf(leaf_pid)?;

        match leaf.locate(search_key) {
            Ok(eid) => Ok(IndexCursor::new(leaf_pid, eid)),
            // The first qualifying key, if any, opens the next leaf
            Err(Error::NoSuchRecord) => Ok(IndexCursor::new(leaf.next_leaf(), 0)),
            Err(e) => Err(e),
        }
    }

    /// Read the entry under `cursor` and advance it.
    ///
    /// After the last entry of a leaf the cursor moves to offset 0 of the
    /// next leaf, or to the end cursor after the last leaf.
    ///
    /// # Errors
    /// Returns `Error::NoSuchRecord` if the cursor is at the end or does not
    /// name an entry.
    pub fn read_forward(&mut self, cursor: &mut IndexCursor) -> Result<(Key, RecordId)> {
        if cursor.is_end() {
            return Err(Error::NoSuchRecord);
        }
        let leaf = self.read_leaf(cursor.pid)?;
        let entry = leaf.read_entry(cursor.eid)?;

        cursor.eid += 1;
        if let Err(Error::NoSuchRecord) = leaf.read_entry(cursor.eid) {
            *cursor = IndexCursor::new(leaf.next_leaf(), 0);
        }
        Ok(entry)
    }

    /// Iterate over all entries with key `>= from` in key order.
    pub fn scan(&mut self, from: Key) -> Result<Scan<'_>> {
        let cursor = match self.locate(from) {
            Ok(cursor) => cursor,
            Err(Error::NoSuchRecord) => IndexCursor::end(),
            Err(e) => return Err(e),
        };
        Ok(Scan::new(self, cursor))
    }

    /// Leaf page whose key range covers `key`.
    fn find_leaf(&mut self, key: Key, height: u32) -> Result<PageId> {
        let mut pid = self.meta.root;
        for _ in 0..height {
            pid = self.read_internal(pid)?.locate_child_ptr(key);
        }
        Ok(pid)
    }

    fn allocate_page(&mut self) -> PageId {
        let pid = self.meta.allocate();
        trace!(pid = pid.0, "allocated page");
        pid
    }

    fn write_meta(&mut self) -> Result<()> {
        if self.file.mode() == OpenMode::Read {
            return Ok(());
        }
        let page = self.meta.encode();
        self.file.write_page(HEADER_PAGE_ID, &page)
    }

    pub(crate) fn read_leaf(&mut self, pid: PageId) -> Result<LeafNode> {
        let page = self.file.read_page(pid)?;
        LeafNode::decode(pid, &page)
    }

    pub(crate) fn read_internal(&mut self, pid: PageId) -> Result<InternalNode> {
        let page = self.file.read_page(pid)?;
        InternalNode::decode(pid, &page)
    }

    fn write_leaf(&mut self, pid: PageId, leaf: &LeafNode) -> Result<()> {
        self.file.write_page(pid, &leaf.encode())
    }

    fn write_internal(&mut self, pid: PageId, node: &InternalNode) -> Result<()> {
        self.file.write_page(pid, &node.encode())
    }
}

impl Drop for BTreeIndex {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.flush() {
            warn!(
                path = %self.file.path().display(),
                error = %e,
                "failed to persist index metadata on drop"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn rid(key: Key) -> RecordId {
        RecordId::new(PageId::new(key / 16), key % 16)
    }

    fn create_index() -> (BTreeIndex, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let index = BTreeIndex::open(dir.path().join("test"), OpenMode::ReadWrite).unwrap();
        (index, dir)
    }

    fn collect(index: &mut BTreeIndex, from: Key) -> Vec<(Key, RecordId)> {
        index.scan(from).unwrap().map(|e| e.unwrap()).collect()
    }

    #[test]
    fn test_index_path_appends_suffix() {
        assert_eq!(
            BTreeIndex::index_path("data/movie"),
            PathBuf::from("data/movie.idx")
        );
    }

    #[test]
    fn test_empty_index() {
        let (mut index, _dir) = create_index();

        assert_eq!(index.height(), None);
        assert!(!index.root_pid().is_valid());
        assert!(matches!(index.locate(0), Err(Error::NoSuchRecord)));
        assert_eq!(collect(&mut index, i32::MIN), vec![]);
    }

    #[test]
    fn test_first_insert_creates_root_leaf_on_page_one() {
        let (mut index, _dir) = create_index();

        index.insert(5, rid(5)).unwrap();

        assert_eq!(index.height(), Some(0));
        assert_eq!(index.root_pid(), PageId::new(1));
        assert_eq!(index.meta().next_page, PageId::new(2));

        let mut cursor = index.locate(5).unwrap();
        assert_eq!(cursor, IndexCursor::new(PageId::new(1), 0));
        assert_eq!(index.read_forward(&mut cursor).unwrap(), (5, rid(5)));
        assert!(cursor.is_end());
        assert!(matches!(
            index.read_forward(&mut cursor),
            Err(Error::NoSuchRecord)
        ));
    }

    #[test]
    fn test_leaf_split_grows_height() {
        let (mut index, _dir) = create_index();
        let limit = LeafNode::ENTRY_LIMIT as Key;

        for key in 0..limit {
            index.insert(key, rid(key)).unwrap();
        }
        assert_eq!(index.height(), Some(0));

        index.insert(limit, rid(limit)).unwrap();
        assert_eq!(index.height(), Some(1));
        // leaf 1, sibling 2, root 3
        assert_eq!(index.root_pid(), PageId::new(3));

        let first = index.locate(0).unwrap();
        let last = index.locate(limit).unwrap();
        assert_ne!(first.pid, last.pid);

        let keys: Vec<Key> = collect(&mut index, 0).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, (0..=limit).collect::<Vec<_>>());
    }

    #[test]
    fn test_separator_routes_right() {
        let (mut index, _dir) = create_index();
        let limit = LeafNode::ENTRY_LIMIT as Key;
        for key in 0..=limit {
            index.insert(key, rid(key)).unwrap();
        }

        let root = index.read_internal(index.root_pid()).unwrap();
        let (separator, right) = root.entries().next().unwrap();
        assert_eq!(separator, limit / 2);

        let at = index.locate(separator).unwrap();
        assert_eq!(at, IndexCursor::new(right, 0));

        let below = index.locate(separator - 1).unwrap();
        assert_eq!(below.pid, root.min_child());
        assert_eq!(below.eid, (separator - 1) as usize);
    }

    #[test]
    fn test_locate_past_leaf_end_moves_to_next_leaf() {
        let (mut index, _dir) = create_index();
        let limit = LeafNode::ENTRY_LIMIT as Key;
        for key in 0..=limit {
            index.insert(key * 2, rid(key)).unwrap();
        }
        let root = index.read_internal(index.root_pid()).unwrap();
        let (separator, right) = root.entries().next().unwrap();

        // Odd key above the left leaf's last key and below the separator
        let mut cursor = index.locate(separator - 1).unwrap();
        assert_eq!(cursor, IndexCursor::new(right, 0));
        let (key, _) = index.read_forward(&mut cursor).unwrap();
        assert_eq!(key, separator);

        assert!(index.locate(limit * 2 + 1).unwrap().is_end());
    }

    #[test]
    fn test_open_read_write_writes_empty_header() {
        let (index, dir) = create_index();

        // Header is on disk before any insert, flush, or close
        let mut pf = PageFile::open(dir.path().join("test.idx"), OpenMode::Read).unwrap();
        assert_eq!(pf.end_pid(), PageId::new(1));
        let header = TreeMeta::decode(HEADER_PAGE_ID, &pf.read_page(HEADER_PAGE_ID).unwrap());
        assert_eq!(header.unwrap(), TreeMeta::empty());
        drop(index);
    }

    #[test]
    fn test_duplicate_key_last_writer_wins() {
        let (mut index, _dir) = create_index();
        index.insert(9, rid(1)).unwrap();
        index.insert(9, rid(2)).unwrap();

        assert_eq!(collect(&mut index, 0), vec![(9, rid(2))]);
    }

    #[test]
    fn test_read_only_rejects_insert() {
        let dir = tempdir().unwrap();
        let name = dir.path().join("ro");
        BTreeIndex::open(&name, OpenMode::ReadWrite)
            .unwrap()
            .close()
            .unwrap();

        let mut index = BTreeIndex::open(&name, OpenMode::Read).unwrap();
        assert_eq!(index.mode(), OpenMode::Read);
        assert!(matches!(index.insert(1, rid(1)), Err(Error::ReadOnly)));
        index.close().unwrap();
    }

    #[test]
    fn test_internal_split_reparents_children() {
        let (mut index, _dir) = create_index();
        // Ascending inserts leave half-full leaves, so this many keys
        // overflow the root internal node.
        let count = (LeafNode::ENTRY_LIMIT / 2 + 1) as Key * (InternalNode::ENTRY_LIMIT as Key + 2);
        for key in 0..count {
            index.insert(key, rid(key)).unwrap();
        }
        assert_eq!(index.height(), Some(2));

        let root_pid = index.root_pid();
        let root = index.read_internal(root_pid).unwrap();
        for child_pid in root.children() {
            let child = index.read_internal(child_pid).unwrap();
            assert_eq!(child.parent(), root_pid);
            for leaf_pid in child.children() {
                assert_eq!(index.read_leaf(leaf_pid).unwrap().parent(), child_pid);
            }
        }

        let keys: Vec<Key> = collect(&mut index, i32::MIN).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, (0..count).collect::<Vec<_>>());
    }
}
