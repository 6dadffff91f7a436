//! Disk-backed B+tree index.
//!
//! # Components
//! - [`LeafNode`] / [`InternalNode`] - Node codecs and single-node operations
//! - [`TreeMeta`] - Root, height, and page counter kept in header page 0
//! - [`BTreeIndex`] - Descent, insertion with split propagation, scans
//! - [`IndexCursor`] / [`Scan`] - Positions in the leaf chain
//! - [`inspect`] - Breadth-first dump and invariant checks

mod cursor;
mod index;
pub mod inspect;
mod internal;
mod leaf;
mod meta;

/// Key type stored in the index.
pub type Key = i32;

pub use cursor::{IndexCursor, Scan};
pub use index::BTreeIndex;
pub use internal::InternalNode;
pub use leaf::LeafNode;
pub use meta::TreeMeta;
