//! Error types for the index.

use thiserror::Error;

use super::PageId;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors raised by the page file and the B+tree.
///
/// `NodeFull` and `NoSuchRecord` are status signals used by the tree
/// algorithms themselves; everything else aborts the current call.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the page file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested page lies beyond the end of the file.
    #[error("{0} not found")]
    PageNotFound(PageId),

    /// The page id is the "none" sentinel or otherwise negative.
    #[error("Invalid page ID: {0}")]
    InvalidPageId(PageId),

    /// A single-node insert would exceed the node's capacity.
    ///
    /// The index recovers from this by splitting; it is never returned
    /// from [`BTreeIndex::insert`](crate::index::btree::BTreeIndex::insert).
    #[error("Node is full")]
    NodeFull,

    /// No entry qualifies at the requested position.
    ///
    /// Also signals the end of a forward scan.
    #[error("No such record")]
    NoSuchRecord,

    /// A write was attempted through a read-only handle.
    #[error("Index is opened read-only")]
    ReadOnly,

    /// A page's contents violate the node layout or a tree invariant.
    #[error("Corrupted {pid}: {reason}")]
    Corrupted { pid: PageId, reason: String },
}
