//! A concurrent, insert-only, multi-version skiplist backed by three fixed
//! arenas (byte storage, nodes, forward pointers), built for many concurrent
//! inserters and many concurrent readers with no reader-writer lock.
//!
//! See [`Skiplist`] for the public contract.

mod iter;
mod node_heights;
mod skiplist;

pub use iter::SkiplistIter;
pub use skiplist::Skiplist;
