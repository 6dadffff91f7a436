//! Configuration constants for the index.

use super::PageId;

/// Size of a page in bytes (1KB).
///
/// Every node of the tree occupies exactly one page, so this value fixes
/// the fan-out of both node kinds:
/// - Leaf: `(1024 - 12) / 12 = 84` entries
/// - Internal: `(1024 - 12) / 8 = 126` entries
///
/// # File Layout
/// Page N is located at file offset `N × PAGE_SIZE`.
pub const PAGE_SIZE: usize = 1024;

/// Page that holds the tree metadata (root, height, page counter).
///
/// This page is never handed out by the page allocator.
pub const HEADER_PAGE_ID: PageId = PageId(0);

/// First page id available for tree nodes.
pub const FIRST_NODE_PAGE_ID: PageId = PageId(1);

/// Suffix appended to an index base name to form its file name.
pub const INDEX_FILE_SUFFIX: &str = ".idx";
