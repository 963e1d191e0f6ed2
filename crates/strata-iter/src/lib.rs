//! The iterator contract that every component of this store presents rows
//! through, plus the combinators built on top of it: a slice-backed source
//! (mostly for tests), a one-row-lookahead wrapper, a k-way merge, and a
//! version-snapshot filter.
//!
//! Every combinator here is single-threaded and synchronous: there is no
//! `async`, and nothing here is `Send`/`Sync`-bound on purpose, since an
//! iterator is meant to be driven by one thread at a time.

mod merge;
mod peekable;
mod slice;
mod snapshot;

pub use merge::MergeIter;
pub use peekable::Peekable;
pub use slice::SliceIter;
pub use snapshot::SnapshotIter;

use strata_row::Row;

/// A forward cursor over rows in [total order][strata_row::total_order].
///
/// `next` advances and returns the next row, or `None` at the end. `seek`
/// repositions the cursor so that the next call to `next` returns the first
/// row whose key is greater than or equal to `key`; it may be called any
/// number of times and discards any previously peeked state.
///
/// This trait is object-safe on purpose: [`MergeIter`] holds a heterogeneous
/// collection of children behind `Box<dyn RowIter>`, since a merge over, say,
/// a skiplist iterator and several sstable readers has no single concrete
/// type to be generic over.
pub trait RowIter {
    fn next(&mut self) -> Option<Row>;

    fn seek(&mut self, key: &[u8]);
}

impl RowIter for Box<dyn RowIter + '_> {
    fn next(&mut self) -> Option<Row> {
        (**self).next()
    }

    fn seek(&mut self, key: &[u8]) {
        (**self).seek(key);
    }
}

/// Drains `iter` into a `Vec`, for tests and the worked example below.
#[must_use]
pub fn collect(mut iter: impl RowIter) -> Vec<Row> {
    let mut rows = Vec::new();
    while let Some(row) = iter.next() {
        rows.push(row);
    }
    rows
}

// A runnable version of the two-source-merge walkthrough from the original
// implementation's `main.go`, now as a doctest instead of a process entry
// point (a CLI/binary is out of scope for this crate).
/// ```
/// use strata_iter::{collect, MergeIter, RowIter, SliceIter};
/// use strata_row::Row;
///
/// let a = SliceIter::new(vec![
///     Row::new(*b"a", *b"1", 1),
///     Row::new(*b"a", *b"2", 2),
///     Row::new(*b"b", *b"3", 1),
///     Row::new(*b"b", *b"4", 2),
/// ]);
/// let b = SliceIter::new(vec![
///     Row::new(*b"a", *b"5", 3),
///     Row::new(*b"a", *b"6", 4),
///     Row::new(*b"b", *b"7", 3),
///     Row::new(*b"b", *b"8", 4),
/// ]);
///
/// let merged = collect(MergeIter::new(vec![Box::new(a) as Box<dyn RowIter>, Box::new(b)]));
/// let rendered: Vec<String> = merged.iter().map(Row::to_string).collect();
/// assert_eq!(
///     rendered,
///     vec!["a=1@1", "a=2@2", "a=5@3", "a=6@4", "b=3@1", "b=4@2", "b=7@3", "b=8@4"],
/// );
/// ```
#[allow(dead_code)]
struct MergeWalkthrough;
