use std::io::Read;

use strata_iter::RowIter;
use strata_row::Row;

use crate::block::{COUNT_FIELD_LEN, RECORD_HEADER_LEN, VERSION_LEN};
use crate::error::SstableError;

/// Reads a sorted file written by [`crate::SstWriter`] one row at a time, loading blocks
/// sequentially as needed.
///
/// `block_size` must match the value the writer was constructed with; the file carries no
/// self-describing footer, and the core does no path handling of its own — block size is a
/// construction parameter the caller is responsible for keeping in sync, not part of the file
/// itself.
#[derive(Debug)]
pub struct SstReader<R> {
    source:       R,
    block_size:   usize,
    block:        Vec<u8>,
    record_count: u16,
    next_record:  u16,
    done:         bool,
}

impl<R: Read> SstReader<R> {
    #[must_use]
    pub fn new(source: R, block_size: usize) -> Self {
        Self {
            source,
            block_size,
            block: Vec::new(),
            record_count: 0,
            next_record: 0,
            done: false,
        }
    }

    /// Reads the next row in file order, transparently advancing across block boundaries.
    ///
    /// Returns `Ok(None)` at a clean end of file.
    ///
    /// # Errors
    /// Propagates I/O errors from the underlying source verbatim, and reports a truncated
    /// trailing block (fewer than `block_size` bytes remaining, but more than zero) as an error.
    pub fn read(&mut self) -> Result<Option<Row>, SstableError> {
        loop {
            if self.done {
                return Ok(None);
            }
            if self.next_record >= self.record_count && !self.load_next_block()? {
                self.done = true;
                return Ok(None);
            }
            let row = self.decode_record(self.next_record);
            self.next_record += 1;
            return Ok(Some(row));
        }
    }

    /// Loads the next fixed-size block, or reports `false` on a clean end of file.
    fn load_next_block(&mut self) -> Result<bool, SstableError> {
        self.block.resize(self.block_size, 0);
        if !fill_exactly(&mut self.source, &mut self.block)? {
            return Ok(false);
        }
        self.record_count = u16::from_le_bytes([self.block[0], self.block[1]]);
        self.next_record = 0;
        Ok(true)
    }

    fn decode_record(&self, index: u16) -> Row {
        let header_off = COUNT_FIELD_LEN + usize::from(index) * RECORD_HEADER_LEN;
        let header = &self.block[header_off..header_off + RECORD_HEADER_LEN];
        let data_off = usize::from(u16::from_le_bytes([header[0], header[1]]));
        let key_len = usize::from(u16::from_le_bytes([header[2], header[3]]));
        let value_len = usize::from(u16::from_le_bytes([header[4], header[5]]));

        let data_region = COUNT_FIELD_LEN + usize::from(self.record_count) * RECORD_HEADER_LEN;
        let start = data_region + data_off;
        let key = &self.block[start..start + key_len];
        let value = &self.block[start + key_len..start + key_len + value_len];
        let version_off = start + key_len + value_len;
        let version_bytes: [u8; VERSION_LEN] =
            self.block[version_off..version_off + VERSION_LEN].try_into().expect("fixed-size slice");
        Row::new(key.into(), value.into(), u64::from_le_bytes(version_bytes))
    }

    /// Wraps this reader as a [`RowIter`] so it can be merged alongside other row sources.
    ///
    /// This reader is sequential-only; seeking into the file is left to an external index
    /// component built on top of this core, so [`RowIter::seek`] on the returned iterator is a
    /// no-op.
    #[must_use]
    pub fn into_row_iter(self) -> SstRowIter<R> {
        SstRowIter { reader: self, error: None }
    }
}

/// Fills `buf` completely from `source`, or returns `Ok(false)` if the source was already
/// exhausted before any bytes were read. A source that yields fewer than `buf.len()` bytes but
/// more than zero before exhausting is reported as an I/O error (a truncated trailing block).
fn fill_exactly<R: Read>(source: &mut R, buf: &mut [u8]) -> Result<bool, SstableError> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    if filled == 0 {
        Ok(false)
    } else if filled == buf.len() {
        Ok(true)
    } else {
        Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated sstable block").into())
    }
}

/// A [`RowIter`] view over an [`SstReader`], for merging with other sources.
///
/// Since [`RowIter::next`] has no error channel, an I/O error encountered mid-stream is recorded
/// and the iterator then reports exhaustion; call [`SstRowIter::take_error`] after iteration to
/// distinguish a clean end from a failed one.
#[derive(Debug)]
pub struct SstRowIter<R> {
    reader: SstReader<R>,
    error:  Option<SstableError>,
}

impl<R> SstRowIter<R> {
    /// Takes the error that ended iteration early, if any.
    pub fn take_error(&mut self) -> Option<SstableError> {
        self.error.take()
    }
}

impl<R: Read> RowIter for SstRowIter<R> {
    fn next(&mut self) -> Option<Row> {
        if self.error.is_some() {
            return None;
        }
        match self.reader.read() {
            Ok(row) => row,
            Err(err) => {
                self.error = Some(err);
                None
            }
        }
    }

    fn seek(&mut self, _key: &[u8]) {
        // Sequential-only reader; not supported. See `SstReader::into_row_iter`.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::SstWriter;

    #[test]
    fn empty_file_reads_as_immediate_end() {
        let mut reader = SstReader::new(std::io::Cursor::new(Vec::<u8>::new()), 64);
        assert!(reader.read().unwrap().is_none());
    }

    #[test]
    fn round_trips_a_hundred_rows_as_a_multiset() {
        let mut writer = SstWriter::new(Vec::new(), 64);
        let mut expected = Vec::new();
        for i in 0..100u64 {
            let row = Row::new(
                format!("foo{i}").into_bytes().into_boxed_slice(),
                format!("bar{i}").into_bytes().into_boxed_slice(),
                1,
            );
            writer.add(&row).unwrap();
            expected.push(row);
        }
        let bytes = writer.finish().unwrap();
        assert_eq!(bytes.len() % 64, 0);

        let mut reader = SstReader::new(std::io::Cursor::new(bytes), 64);
        let mut read_back = Vec::new();
        while let Some(row) = reader.read().unwrap() {
            read_back.push(row);
        }
        expected.sort();
        read_back.sort();
        assert_eq!(read_back, expected);
    }

    #[test]
    fn a_truncated_trailing_block_is_reported_as_an_io_error() {
        let mut writer = SstWriter::new(Vec::new(), 64);
        let row = Row::new(b"k".to_vec().into_boxed_slice(), b"v".to_vec().into_boxed_slice(), 1);
        writer.add(&row).unwrap();
        let mut bytes = writer.finish().unwrap();
        bytes.truncate(bytes.len() - 1);
        let mut reader = SstReader::new(std::io::Cursor::new(bytes), 64);
        assert!(matches!(reader.read(), Err(SstableError::Io(_))));
    }
}
