//! Page type.
//!
//! This module contains [`Page`], the raw fixed-size data container that
//! every node and the metadata header are encoded into.

#[allow(clippy::module_inception)]
mod page;

pub use page::Page;
