//! The on-disk block layout (bit-exact, little-endian throughout):
//!
//! ```text
//! offset 0..2    : u16   record count N
//! offset 2..2+6N : N record headers, each {u16 data_off, u16 key_len, u16 value_len}
//! remainder      : packed records (key || value || u64 version), then zero padding
//! total          : exactly block_size bytes
//! ```
//!
//! `data_off` is measured from the start of the data region, i.e. byte `2 + 6*N` of the block.

/// Default fixed block size, used by [`crate::SstWriter::with_default_block_size`].
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

pub(crate) const COUNT_FIELD_LEN: usize = 2;
pub(crate) const RECORD_HEADER_LEN: usize = 6;
pub(crate) const VERSION_LEN: usize = 8;

/// Accumulates one block's worth of records, greedily, in the order they are added.
///
/// Does not validate that keys arrive in order; that is the writer's contract to uphold.
#[derive(Debug)]
pub(crate) struct BlockBuilder {
    block_size: usize,
    data:       Vec<u8>,
    headers:    Vec<(u16, u16, u16)>,
}

impl BlockBuilder {
    pub(crate) fn new(block_size: usize) -> Self {
        Self { block_size, data: Vec::new(), headers: Vec::new() }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    fn projected_len(&self, key_len: usize, value_len: usize) -> usize {
        COUNT_FIELD_LEN
            + (self.headers.len() + 1) * RECORD_HEADER_LEN
            + self.data.len()
            + key_len + value_len + VERSION_LEN
    }

    /// Attempts to append one record to the block being built. Returns `false` if the record's
    /// key or value length cannot be represented in a `u16` header field, if the block already
    /// holds `u16::MAX` records (the record-count header field would overflow), or if adding it
    /// would push the block's projected size past `block_size`; the caller should flush the
    /// current block and retry against a fresh one.
    pub(crate) fn try_add(&mut self, key: &[u8], value: &[u8], version: u64) -> bool {
        if key.len() > usize::from(u16::MAX) || value.len() > usize::from(u16::MAX) {
            return false;
        }
        if self.headers.len() == usize::from(u16::MAX) {
            return false;
        }
        if self.projected_len(key.len(), value.len()) > self.block_size {
            return false;
        }
        #[expect(clippy::cast_possible_truncation, reason = "bounds checked just above")]
        let data_off = self.data.len() as u16;
        #[expect(clippy::cast_possible_truncation, reason = "bounds checked just above")]
        self.headers.push((data_off, key.len() as u16, value.len() as u16));
        self.data.extend_from_slice(key);
        self.data.extend_from_slice(value);
        self.data.extend_from_slice(&version.to_le_bytes());
        true
    }

    pub(crate) fn reset(&mut self) {
        self.data.clear();
        self.headers.clear();
    }

    /// Serializes the accumulated records into one zero-padded block of exactly `block_size`
    /// bytes.
    pub(crate) fn finish(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.block_size);
        #[expect(clippy::cast_possible_truncation, reason = "fewer than u16::MAX records fit in a block")]
        buf.extend_from_slice(&(self.headers.len() as u16).to_le_bytes());
        for &(data_off, key_len, value_len) in &self.headers {
            buf.extend_from_slice(&data_off.to_le_bytes());
            buf.extend_from_slice(&key_len.to_le_bytes());
            buf.extend_from_slice(&value_len.to_le_bytes());
        }
        buf.extend_from_slice(&self.data);
        debug_assert!(buf.len() <= self.block_size, "block overflowed its own fixed size");
        buf.resize(self.block_size, 0);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_builder_finishes_to_an_all_zero_block_of_exact_size() {
        let builder = BlockBuilder::new(64);
        let block = builder.finish();
        assert_eq!(block.len(), 64);
        assert_eq!(&block[0..2], &[0, 0]);
    }

    #[test]
    fn try_add_rejects_once_the_block_would_overflow() {
        let mut builder = BlockBuilder::new(32);
        assert!(builder.try_add(b"k1", b"v1", 1));
        assert!(!builder.try_add(b"k2", b"v2345678901234567890", 2));
    }

    #[test]
    fn try_add_rejects_the_record_that_would_overflow_the_count_header() {
        let mut builder = BlockBuilder::new(usize::MAX);
        for _ in 0..usize::from(u16::MAX) {
            assert!(builder.try_add(b"k", b"", 1));
        }
        assert!(!builder.try_add(b"k", b"", 1));
    }

    #[test]
    fn finished_block_has_a_decodable_header_for_each_record() {
        let mut builder = BlockBuilder::new(128);
        assert!(builder.try_add(b"a", b"1", 1));
        assert!(builder.try_add(b"b", b"22", 2));
        let block = builder.finish();
        assert_eq!(u16::from_le_bytes([block[0], block[1]]), 2);
        let second_header = &block[2 + RECORD_HEADER_LEN..2 + 2 * RECORD_HEADER_LEN];
        assert_eq!(u16::from_le_bytes([second_header[2], second_header[3]]), 1);
        assert_eq!(u16::from_le_bytes([second_header[4], second_header[5]]), 2);
    }
}
