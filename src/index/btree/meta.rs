//! Tree metadata persisted in the header page.

use crate::common::config::FIRST_NODE_PAGE_ID;
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

/// Root, height, and page allocator state of one index.
///
/// # Header Page Layout
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       4     root page (-1 = empty tree)
/// 4       4     height (-1 = empty tree, 0 = root is a leaf)
/// 8       4     next page id to allocate
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeMeta {
    /// Page of the root node.
    pub root: PageId,
    /// Internal levels above the leaves; `None` for an empty tree.
    pub height: Option<u32>,
    /// Next page id handed out by [`TreeMeta::allocate`].
    pub next_page: PageId,
}

impl TreeMeta {
    const OFFSET_ROOT: usize = 0;
    const OFFSET_HEIGHT: usize = 4;
    const OFFSET_NEXT_PAGE: usize = 8;

    /// Metadata of a tree with no nodes yet.
    pub fn empty() -> Self {
        Self {
            root: PageId::INVALID,
            height: None,
            next_page: FIRST_NODE_PAGE_ID,
        }
    }

    /// Hand out the next unused page id.
    pub fn allocate(&mut self) -> PageId {
        let pid = self.next_page;
        self.next_page = PageId::new(pid.0 + 1);
        pid
    }

    /// Decode metadata from the header page `pid`.
    ///
    /// # Errors
    /// Returns `Error::Corrupted` if a field holds an impossible value.
    pub fn decode(pid: PageId, page: &Page) -> Result<Self> {
        let root = PageId(page.get_i32(Self::OFFSET_ROOT));
        let height = page.get_i32(Self::OFFSET_HEIGHT);
        let next_page = PageId(page.get_i32(Self::OFFSET_NEXT_PAGE));

        let corrupted = |reason: String| Error::Corrupted { pid, reason };
        if next_page < FIRST_NODE_PAGE_ID {
            return Err(corrupted(format!("next page counter {}", next_page.0)));
        }
        let height = match height {
            -1 => None,
            h if h >= 0 => Some(h as u32),
            h => return Err(corrupted(format!("tree height {}", h))),
        };
        if height.is_some() && (root < FIRST_NODE_PAGE_ID || root >= next_page) {
            return Err(corrupted(format!("root {} outside allocated pages", root)));
        }

        Ok(Self {
            root,
            height,
            next_page,
        })
    }

    /// Encode metadata into a freshly zeroed page.
    pub fn encode(&self) -> Page {
        let mut page = Page::new();
        page.put_i32(Self::OFFSET_ROOT, self.root.0);
        page.put_i32(Self::OFFSET_HEIGHT, self.height.map_or(-1, |h| h as i32));
        page.put_i32(Self::OFFSET_NEXT_PAGE, self.next_page.0);
        page
    }
}

impl Default for TreeMeta {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::HEADER_PAGE_ID;

    #[test]
    fn test_empty_layout() {
        let page = TreeMeta::empty().encode();

        assert_eq!(page.get_i32(0), -1);
        assert_eq!(page.get_i32(4), -1);
        assert_eq!(page.get_i32(8), 1);
        assert!(page.as_slice()[12..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_allocate_skips_header() {
        let mut meta = TreeMeta::empty();

        assert_eq!(meta.allocate(), PageId::new(1));
        assert_eq!(meta.allocate(), PageId::new(2));
        assert_eq!(meta.next_page, PageId::new(3));
    }

    #[test]
    fn test_roundtrip() {
        let meta = TreeMeta {
            root: PageId::new(7),
            height: Some(2),
            next_page: PageId::new(12),
        };

        let decoded = TreeMeta::decode(HEADER_PAGE_ID, &meta.encode()).unwrap();
        assert_eq!(decoded, meta);
        assert_eq!(
            TreeMeta::decode(HEADER_PAGE_ID, &TreeMeta::empty().encode()).unwrap(),
            TreeMeta::empty()
        );
    }

    #[test]
    fn test_decode_rejects_zeroed_page() {
        // A zeroed header would hand out page 0 again
        assert!(matches!(
            TreeMeta::decode(HEADER_PAGE_ID, &Page::new()),
            Err(Error::Corrupted { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_root_outside_allocation() {
        let meta = TreeMeta {
            root: PageId::new(9),
            height: Some(0),
            next_page: PageId::new(3),
        };

        assert!(TreeMeta::decode(HEADER_PAGE_ID, &meta.encode()).is_err());
    }
}
