use strata_row::Row;

use crate::RowIter;

/// Wraps an iterator with a one-row lookahead.
///
/// `peek` returns the next row without consuming it; a following call to
/// `next` returns that same row. `seek` forwards to the underlying iterator
/// and drops any cached peek, per the spec's contract that seeking discards
/// peeked state.
#[derive(Debug, Clone)]
pub struct Peekable<I> {
    inner: I,
    peeked: Option<Option<Row>>,
}

impl<I: RowIter> Peekable<I> {
    #[must_use]
    pub fn new(inner: I) -> Self {
        Self { inner, peeked: None }
    }

    #[must_use]
    pub fn peek(&mut self) -> Option<&Row> {
        let peeked = self.peeked.get_or_insert_with(|| self.inner.next());
        peeked.as_ref()
    }
}

impl<I: RowIter> RowIter for Peekable<I> {
    fn next(&mut self) -> Option<Row> {
        match self.peeked.take() {
            Some(row) => row,
            None => self.inner.next(),
        }
    }

    fn seek(&mut self, key: &[u8]) {
        self.inner.seek(key);
        self.peeked = None;
    }
}
