//! Record locator type.

use std::fmt;

use super::PageId;

/// Locates a record in a table file: a page and a slot within it.
///
/// The index never interprets a `RecordId`; it only stores and returns it.
///
/// # Example
/// ```
/// use paged_bptree::{PageId, RecordId};
///
/// let rid = RecordId::new(PageId::new(3), 7);
/// assert_eq!(rid.pid, PageId::new(3));
/// assert_eq!(rid.sid, 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RecordId {
    /// Page holding the record.
    pub pid: PageId,
    /// Slot of the record within its page.
    pub sid: i32,
}

impl RecordId {
    /// Create a new RecordId.
    #[inline]
    pub fn new(pid: PageId, sid: i32) -> Self {
        RecordId { pid, sid }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record({}, {})", self.pid.0, self.sid)
    }
}
