//! paged-bptree - A disk-backed B+tree index over fixed-size pages.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         paged-bptree                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Index Layer (index/btree/)                  │   │
//! │  │   BTreeIndex: descent, insert + split propagation,       │   │
//! │  │               cursor scans over the leaf chain           │   │
//! │  │   LeafNode / InternalNode: page codecs                   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Storage Layer (storage/)                       │   │
//! │  │            PageFile + Page (1KB, little-endian)          │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, RecordId, Error, config)
//! - [`storage`] - Page file I/O and the page type
//! - [`index`] - The B+tree index
//!
//! # Quick Start
//! ```no_run
//! use paged_bptree::{BTreeIndex, OpenMode, PageId, RecordId};
//!
//! // Creates "students.idx" if it does not exist
//! let mut index = BTreeIndex::open("students", OpenMode::ReadWrite).unwrap();
//! for key in 0..1000 {
//!     index.insert(key, RecordId::new(PageId::new(key / 50), key % 50)).unwrap();
//! }
//!
//! // Range scan from key 500
//! for entry in index.scan(500).unwrap().take(10) {
//!     let (key, rid) = entry.unwrap();
//!     println!("{} -> {}", key, rid);
//! }
//! index.close().unwrap();
//! ```

pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::PAGE_SIZE;
pub use common::{Error, PageId, RecordId, Result};

pub use index::btree::{BTreeIndex, IndexCursor, Key, Scan};
pub use storage::{OpenMode, PageFile};
