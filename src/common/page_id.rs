//! Page identifier type.

use std::fmt;

/// Identifies a page in an index file.
///
/// Stored on disk as a little-endian `i32`, with `-1` as the "none"
/// sentinel used for absent parent, sibling, and child links.
///
/// # Example
/// ```
/// use paged_bptree::PageId;
///
/// let page_id = PageId::new(42);
/// assert!(page_id.is_valid());
/// assert!(!PageId::INVALID.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub i32);

impl PageId {
    /// Invalid/sentinel page ID.
    pub const INVALID: PageId = PageId(-1);

    /// Create a new PageId.
    #[inline]
    pub fn new(id: i32) -> Self {
        PageId(id)
    }

    /// Check if this page ID names a real page.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.0 >= 0
    }

    /// Byte offset of this page within its file.
    ///
    /// Only meaningful for valid ids.
    #[inline]
    pub(crate) fn file_offset(&self, page_size: usize) -> u64 {
        (self.0 as u64) * (page_size as u64)
    }
}

impl Default for PageId {
    fn default() -> Self {
        PageId::INVALID
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "Page({})", self.0)
        } else {
            write!(f, "Page(INVALID)")
        }
    }
}
