use std::io::Write;

use strata_row::Row;

use crate::block::{BlockBuilder, DEFAULT_BLOCK_SIZE};
use crate::error::SstableError;

/// Streams a pre-sorted sequence of rows into a fixed-block-size sorted file.
///
/// Rows must be delivered in total-order ([`strata_row::total_order`]); the writer does not
/// sort, and feeding it unsorted rows produces an invalid file. This is undefined behavior, not
/// checked.
#[derive(Debug)]
pub struct SstWriter<W> {
    sink:       W,
    block_size: usize,
    current:    BlockBuilder,
}

impl<W: Write> SstWriter<W> {
    #[must_use]
    pub fn new(sink: W, block_size: usize) -> Self {
        Self { sink, block_size, current: BlockBuilder::new(block_size) }
    }

    /// Convenience constructor using [`DEFAULT_BLOCK_SIZE`].
    #[must_use]
    pub fn with_default_block_size(sink: W) -> Self {
        Self::new(sink, DEFAULT_BLOCK_SIZE)
    }

    /// Appends one row, flushing the current block first if the row doesn't fit in it.
    ///
    /// # Errors
    /// Returns [`SstableError::RowTooLarge`] if the row cannot fit into even an empty block, or
    /// [`SstableError::Io`] if flushing a full block to the sink fails. The writer remains
    /// usable after a `RowTooLarge` error; only that row was rejected.
    pub fn add(&mut self, row: &Row) -> Result<(), SstableError> {
        if self.current.try_add(&row.key, &row.value, row.version) {
            return Ok(());
        }
        self.flush_current()?;
        if self.current.try_add(&row.key, &row.value, row.version) {
            return Ok(());
        }
        Err(SstableError::RowTooLarge {
            key_len:    row.key.len(),
            value_len:  row.value.len(),
            block_size: self.block_size,
        })
    }

    fn flush_current(&mut self) -> Result<(), SstableError> {
        if self.current.is_empty() {
            return Ok(());
        }
        let block = self.current.finish();
        self.sink.write_all(&block)?;
        log::debug!("flushed a {}-byte block", block.len());
        self.current.reset();
        Ok(())
    }

    /// Flushes any partial trailing block and returns the underlying sink.
    ///
    /// # Errors
    /// Returns [`SstableError::Io`] if the final flush fails.
    pub fn finish(mut self) -> Result<W, SstableError> {
        self.flush_current()?;
        Ok(self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_a_row_that_cannot_fit_in_an_empty_block() {
        let mut writer = SstWriter::new(Vec::new(), 32);
        let huge = Row::new(
            vec![b'k'; 100].into_boxed_slice(),
            vec![b'v'; 100].into_boxed_slice(),
            1,
        );
        assert!(matches!(writer.add(&huge), Err(SstableError::RowTooLarge { .. })));
    }

    #[test]
    fn finishing_with_nothing_added_writes_no_blocks() {
        let writer = SstWriter::new(Vec::new(), 64);
        let sink = writer.finish().unwrap();
        assert!(sink.is_empty());
    }

    #[test]
    fn a_flushed_block_is_exactly_block_size_bytes() {
        let mut writer = SstWriter::new(Vec::new(), 64);
        for i in 0..20u64 {
            let row = Row::new(
                format!("k{i}").into_bytes().into_boxed_slice(),
                format!("v{i}").into_bytes().into_boxed_slice(),
                1,
            );
            writer.add(&row).unwrap();
        }
        let sink = writer.finish().unwrap();
        assert_eq!(sink.len() % 64, 0);
        assert!(!sink.is_empty());
    }
}
