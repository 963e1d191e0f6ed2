use strata_row::Row;

use crate::RowIter;

/// Filters a sorted stream down to one row per key: the greatest version that
/// is less than or equal to `snapshot_version`. Keys whose every version
/// exceeds the snapshot are skipped entirely, not emitted as some sentinel.
///
/// The underlying iterator must yield rows in total order (key ascending,
/// version ascending within a key) — this is what lets the "last accepted
/// row per key wins" rule below be correct without looking ahead.
pub struct SnapshotIter<I> {
    inner: I,
    snapshot_version: u64,
    /// The next row pulled from `inner` that didn't belong to the key just
    /// emitted; it becomes the first candidate for the following key.
    pending: Option<Row>,
    exhausted: bool,
}

impl<I: RowIter> SnapshotIter<I> {
    #[must_use]
    pub fn new(inner: I, snapshot_version: u64) -> Self {
        Self {
            inner,
            snapshot_version,
            pending: None,
            exhausted: false,
        }
    }

    /// Pulls rows for one key, returning the accepted candidate (if any) for
    /// that key. Leaves `self.pending` holding the first row of the
    /// following key, or `None` if `inner` ran out.
    fn take_one_key(&mut self) -> Option<Row> {
        let mut current = self.pending.take().or_else(|| self.inner.next())?;
        let current_key = current.key.clone();

        // The candidate is only "set" once a version <= snapshot is seen;
        // until then we keep scanning within this key without emitting it.
        let mut candidate = (current.version <= self.snapshot_version).then(|| current.clone());

        loop {
            let Some(next) = self.inner.next() else {
                self.pending = None;
                return candidate;
            };
            if next.key != current_key {
                self.pending = Some(next);
                return candidate;
            }
            current = next;
            if current.version <= self.snapshot_version {
                candidate = Some(current.clone());
            }
        }
    }
}

impl<I: RowIter> RowIter for SnapshotIter<I> {
    fn next(&mut self) -> Option<Row> {
        if self.exhausted {
            return None;
        }
        loop {
            match self.take_one_key() {
                Some(row) => return Some(row),
                None if self.pending.is_none() => {
                    self.exhausted = true;
                    return None;
                }
                // Every version of that key exceeded the snapshot; move on
                // to the next key instead of emitting a sentinel.
                None => continue,
            }
        }
    }

    fn seek(&mut self, key: &[u8]) {
        self.inner.seek(key);
        self.pending = None;
        self.exhausted = false;
    }
}
