//! Storage layer - page file I/O and the page type.
//!
//! This module handles persistent storage:
//! - [`PageFile`] - Fixed-size page reads and writes on a single file
//! - [`page`] - The raw page type

mod page_file;
pub mod page;

pub use page_file::{OpenMode, PageFile};
