use std::cmp::Ordering;

use strata_row::Row;

use crate::{Peekable, RowIter};

/// A k-way merge over heterogeneous child iterators, ordered by each child's
/// currently peeked row.
///
/// Internally this is a binary heap, keyed on the peeked row, stored as a
/// flat `Vec` with the usual `2i+1`/`2i+2` child indices. A child whose peek
/// is empty compares as greater than any row, so it sinks to the bottom of
/// the heap and naturally drops out of contention once every other child is
/// also empty.
///
/// `next` pops the root, takes one row from it, and sifts that same slot
/// down from the root using the child's new peek — the standard
/// sift-down-from-root used to build a heap bottom-up from `n/2 - 1`, not
/// the reference implementation's ad hoc per-call `down()` (see the crate's
/// design notes: that version can fail to restore the heap property after a
/// pop from a non-root child).
///
/// Two children that peek equal rows are returned in an unspecified but
/// deterministic order for a fixed set of children (whichever sits higher in
/// the heap at the time); callers that need exactly one row per `(key,
/// version)` should wrap this in [`SnapshotIter`](crate::SnapshotIter) or
/// their own dedup pass.
pub struct MergeIter<'a> {
    children: Vec<Peekable<Box<dyn RowIter + 'a>>>,
}

impl<'a> MergeIter<'a> {
    #[must_use]
    pub fn new(children: Vec<Box<dyn RowIter + 'a>>) -> Self {
        let mut merge = Self {
            children: children.into_iter().map(Peekable::new).collect(),
        };
        merge.heapify();
        merge
    }

    fn heapify(&mut self) {
        let n = self.children.len();
        for i in (0..n / 2).rev() {
            self.sift_down(i);
        }
    }

    /// Restores the heap property for the subtree rooted at `i`, assuming
    /// both children's subtrees already satisfy it.
    fn sift_down(&mut self, mut i: usize) {
        let n = self.children.len();
        loop {
            let left = 2 * i + 1;
            let right = 2 * i + 2;
            let mut smallest = i;

            if left < n && Self::peek_order(&mut self.children, left, smallest) == Ordering::Less {
                smallest = left;
            }
            if right < n && Self::peek_order(&mut self.children, right, smallest) == Ordering::Less
            {
                smallest = right;
            }
            if smallest == i {
                return;
            }
            self.children.swap(i, smallest);
            i = smallest;
        }
    }

    /// Compares the peeked rows at indices `a` and `b`, treating an empty
    /// peek as greater than any row.
    fn peek_order(children: &mut [Peekable<Box<dyn RowIter + 'a>>], a: usize, b: usize) -> Ordering {
        // Split so both peeks can be taken with a `&mut` each.
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let (left, right) = children.split_at_mut(hi);
        let (a_peek, b_peek) = if a < b {
            (left[lo].peek(), right[0].peek())
        } else {
            (right[0].peek(), left[lo].peek())
        };
        match (a_peek, b_peek) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

impl RowIter for MergeIter<'_> {
    fn next(&mut self) -> Option<Row> {
        if self.children.is_empty() {
            return None;
        }
        let row = self.children[0].next();
        if row.is_some() {
            self.sift_down(0);
        }
        row
    }

    fn seek(&mut self, key: &[u8]) {
        for child in &mut self.children {
            child.seek(key);
        }
        self.heapify();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{collect, SliceIter};

    fn boxed(rows: Vec<Row>) -> Box<dyn RowIter> {
        Box::new(SliceIter::new(rows))
    }

    #[test]
    fn two_source_merge_matches_scenario() {
        let a = boxed(vec![
            Row::new(*b"a", *b"1", 1),
            Row::new(*b"a", *b"2", 2),
            Row::new(*b"b", *b"3", 1),
            Row::new(*b"b", *b"4", 2),
        ]);
        let b = boxed(vec![
            Row::new(*b"a", *b"5", 3),
            Row::new(*b"a", *b"6", 4),
            Row::new(*b"b", *b"7", 3),
            Row::new(*b"b", *b"8", 4),
        ]);
        let merged = collect(MergeIter::new(vec![a, b]));
        let rendered: Vec<String> = merged.iter().map(Row::to_string).collect();
        assert_eq!(
            rendered,
            vec!["a=1@1", "a=2@2", "a=5@3", "a=6@4", "b=3@1", "b=4@2", "b=7@3", "b=8@4"],
        );
    }

    #[test]
    fn merges_many_sources_in_total_order() {
        let sources: Vec<Box<dyn RowIter>> = vec![
            boxed(vec![Row::new(*b"a", *b"1", 1), Row::new(*b"e", *b"2", 1)]),
            boxed(vec![Row::new(*b"b", *b"1", 1)]),
            boxed(Vec::new()),
            boxed(vec![Row::new(*b"c", *b"1", 1), Row::new(*b"d", *b"1", 1)]),
        ];
        let merged = collect(MergeIter::new(sources));
        let keys: Vec<u8> = merged.iter().map(|row| row.key[0]).collect();
        assert_eq!(keys, b"abcde".to_vec());
    }

    #[test]
    fn seek_forwards_to_every_child_and_rebuilds_heap() {
        let sources: Vec<Box<dyn RowIter>> = vec![
            boxed(vec![Row::new(*b"a", *b"1", 1), Row::new(*b"c", *b"1", 1)]),
            boxed(vec![Row::new(*b"b", *b"1", 1), Row::new(*b"d", *b"1", 1)]),
        ];
        let mut merged = MergeIter::new(sources);
        merged.seek(b"c");
        let rest = collect(merged);
        let keys: Vec<u8> = rest.iter().map(|row| row.key[0]).collect();
        assert_eq!(keys, b"cd".to_vec());
    }

    #[test]
    fn empty_children_yields_nothing() {
        let mut merged = MergeIter::new(Vec::new());
        assert!(merged.next().is_none());
    }
}
