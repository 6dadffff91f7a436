//! Cursor over leaf entries, and the scan iterator built on it.

use std::fmt;

use crate::common::{Error, PageId, RecordId, Result};

use super::{BTreeIndex, Key};

/// Position of one entry in a leaf: page plus entry offset.
///
/// A cursor whose page is [`PageId::INVALID`] sits past the last entry of
/// the index. Cursors stay meaningful only while the leaf is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexCursor {
    pub pid: PageId,
    pub eid: usize,
}

impl IndexCursor {
    #[inline]
    pub fn new(pid: PageId, eid: usize) -> Self {
        Self { pid, eid }
    }

    /// The past-the-end cursor.
    #[inline]
    pub fn end() -> Self {
        Self::new(PageId::INVALID, 0)
    }

    #[inline]
    pub fn is_end(&self) -> bool {
        !self.pid.is_valid()
    }
}

impl fmt::Display for IndexCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_end() {
            write!(f, "Cursor(END)")
        } else {
            write!(f, "Cursor({}, {})", self.pid.0, self.eid)
        }
    }
}

/// Ordered iterator over `(key, rid)` pairs, driven by
/// [`BTreeIndex::read_forward`].
///
/// Yields at most one error, after which it is exhausted.
pub struct Scan<'a> {
    index: &'a mut BTreeIndex,
    cursor: IndexCursor,
    failed: bool,
}

impl<'a> Scan<'a> {
    pub(crate) fn new(index: &'a mut BTreeIndex, cursor: IndexCursor) -> Self {
        Self {
            index,
            cursor,
            failed: false,
        }
    }
}

impl Iterator for Scan<'_> {
    type Item = Result<(Key, RecordId)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor.is_end() {
            return None;
        }
        match self.index.read_forward(&mut self.cursor) {
            Ok(entry) => Some(Ok(entry)),
            Err(Error::NoSuchRecord) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
