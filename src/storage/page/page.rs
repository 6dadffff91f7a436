//! Page - the fundamental fixed-size unit of storage.
//!
//! A [`Page`] is a raw byte array that serves as the unit of I/O between
//! the index file and memory. Node codecs encode into and decode out of
//! pages; the page itself knows nothing about nodes.

use crate::common::config::PAGE_SIZE;

/// A page of data ([`PAGE_SIZE`] bytes).
///
/// # Field Access
/// All on-disk integers are 4-byte little-endian `i32`s. [`Page::get_i32`]
/// and [`Page::put_i32`] read and write them at byte offsets.
///
/// # Clone Implementation
/// `Page` does NOT implement `Clone` in production code (copying a page
/// should be explicit). A `#[cfg(test)]` Clone is provided for tests.
///
/// # Example
/// ```
/// use paged_bptree::storage::page::Page;
///
/// let mut page = Page::new();
/// page.put_i32(8, -1);
/// assert_eq!(page.get_i32(8), -1);
/// assert_eq!(page.as_slice()[8], 0xFF);
/// ```
#[repr(align(8))]
pub struct Page {
    data: [u8; PAGE_SIZE],
}

impl Page {
    /// Create a new zeroed page.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
        }
    }

    /// Get immutable slice of page data.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get mutable slice of page data.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Zero out the entire page.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    /// Get the size of a page.
    #[inline]
    pub const fn size() -> usize {
        PAGE_SIZE
    }

    /// Read a little-endian `i32` at `offset`.
    ///
    /// # Panics
    /// Panics if `offset + 4 > PAGE_SIZE`.
    #[inline]
    pub fn get_i32(&self, offset: usize) -> i32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[offset..offset + 4]);
        i32::from_le_bytes(bytes)
    }

    /// Write a little-endian `i32` at `offset`.
    ///
    /// # Panics
    /// Panics if `offset + 4 > PAGE_SIZE`.
    #[inline]
    pub fn put_i32(&mut self, offset: usize, value: i32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

// Clone only available in tests - forces explicit copying in production
#[cfg(test)]
impl Clone for Page {
    fn clone(&self) -> Self {
        let mut new_page = Page::new();
        new_page.data.copy_from_slice(&self.data);
        new_page
    }
}

// ============================================================================
// TESTS
// ============================================================================
