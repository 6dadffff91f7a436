//! Index structures.
//!
//! - [`btree`] - Disk-backed B+tree over `i32` keys

pub mod btree;
