use strata_iter::RowIter;
use strata_row::Row;

use crate::Skiplist;

/// A single-threaded cursor over a [`Skiplist`], reading the level-0 chain.
///
/// Reading is concurrent-safe with ongoing inserts: an iterator never
/// revisits a position and never skips a node that existed before it
/// started, but a single `SkiplistIter` is not itself safe to share across
/// threads.
pub struct SkiplistIter<'a> {
    list: &'a Skiplist,
    /// Node index of the next row to return, or the sentinel head's own
    /// index (`0`) once nothing is left, since the head never holds a row.
    next: u32,
}

impl<'a> SkiplistIter<'a> {
    pub(crate) fn new(list: &'a Skiplist) -> Self {
        Self { list, next: list.forward(0, 0) }
    }
}

impl RowIter for SkiplistIter<'_> {
    fn next(&mut self) -> Option<Row> {
        if self.next == 0 {
            return None;
        }
        let row = self.list.row_ref(self.next).to_owned_row();
        self.next = self.list.forward(self.next, 0);
        Some(row)
    }

    fn seek(&mut self, key: &[u8]) {
        let pred = self.list.seek_predecessor(key);
        self.next = self.list.forward(pred, 0);
    }
}
