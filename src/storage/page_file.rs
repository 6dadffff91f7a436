//! Page File - fixed-size page I/O on a single file.
//!
//! The [`PageFile`] handles all direct file operations of an index:
//! - Opening a file read-only or read-write
//! - Reading and writing whole pages by id
//! - Reporting where the file ends

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

/// How a [`PageFile`] (and the index on top of it) is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// The file must already exist; writes are rejected.
    Read,
    /// The file is created if it does not exist.
    ReadWrite,
}

/// Reads and writes fixed-size pages of a single file.
///
/// # File Layout
/// Pages are laid out sequentially:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ (1KB)   │ (1KB)   │ (1KB)   │         │ (1KB)   │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      1024     2048    ...    N×1024
/// ```
///
/// Writing a page at or past the end extends the file. Any skipped pages
/// read back as zeros.
///
/// # Durability
/// Writes are not synced individually. Call [`PageFile::sync`] or
/// [`PageFile::close`] to flush them.
pub struct PageFile {
    file: File,
    path: PathBuf,
    mode: OpenMode,
    /// One past the last page present in the file.
    end_pid: i32,
}

impl PageFile {
    /// Open a page file.
    ///
    /// # Errors
    /// In [`OpenMode::Read`], returns an error if the file doesn't exist.
    /// In [`OpenMode::ReadWrite`], returns an error if the file cannot be
    /// opened or created.
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = match mode {
            OpenMode::Read => OpenOptions::new().read(true).open(&path)?,
            OpenMode::ReadWrite => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&path)?,
        };

        // Calculate page count from file size
        let file_size = file.metadata()?.len();
        let end_pid = (file_size / PAGE_SIZE as u64) as i32;

        Ok(Self {
            file,
            path,
            mode,
            end_pid,
        })
    }

    /// Read a page.
    ///
    /// # Errors
    /// Returns `Error::InvalidPageId` for a negative id and
    /// `Error::PageNotFound` if the page lies beyond the end of the file.
    pub fn read_page(&mut self, page_id: PageId) -> Result<Page> {
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id));
        }
        if page_id.0 >= self.end_pid {
            return Err(Error::PageNotFound(page_id));
        }

        self.file
            .seek(SeekFrom::Start(page_id.file_offset(PAGE_SIZE)))?;

        let mut page = Page::new();
        self.file.read_exact(page.as_mut_slice())?;

        Ok(page)
    }

    /// Write a page, overwriting it entirely.
    ///
    /// # Errors
    /// Returns `Error::ReadOnly` in read mode and `Error::InvalidPageId`
    /// for a negative id.
    pub fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        if self.mode == OpenMode::Read {
            return Err(Error::ReadOnly);
        }
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id));
        }

        self.file
            .seek(SeekFrom::Start(page_id.file_offset(PAGE_SIZE)))?;
        self.file.write_all(page.as_slice())?;

        if page_id.0 >= self.end_pid {
            self.end_pid = page_id.0 + 1;
        }
        Ok(())
    }

    /// Flush written pages to disk.
    pub fn sync(&mut self) -> Result<()> {
        if self.mode == OpenMode::ReadWrite {
            self.file.sync_all()?;
        }
        Ok(())
    }

    /// Sync and release the file.
    pub fn close(mut self) -> Result<()> {
        self.sync()
    }

    /// One past the last page id present in the file.
    #[inline]
    pub fn end_pid(&self) -> PageId {
        PageId::new(self.end_pid)
    }

    /// Mode the file was opened with.
    #[inline]
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Path of the underlying file.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
