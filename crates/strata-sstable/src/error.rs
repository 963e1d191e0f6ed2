use std::io;

use thiserror::Error;

/// Failure modes of [`crate::SstWriter`] and [`crate::SstReader`]: a row too large to fit in a
/// block, and I/O errors from the underlying byte sink/source. Capacity-exhaustion is a
/// skiplist-only concept and has no analogue here.
#[derive(Error, Debug)]
pub enum SstableError {
    /// A single row's encoded size (6-byte record header + key + value + 8-byte version)
    /// exceeds `block_size`, so it cannot fit even in an otherwise-empty block.
    #[error(
        "row with a {key_len}-byte key and {value_len}-byte value does not fit in a \
         {block_size}-byte block"
    )]
    RowTooLarge {
        key_len: usize,
        value_len: usize,
        block_size: usize,
    },
    /// The byte sink or source returned an error. Propagated verbatim; the core never retries.
    #[error("sstable I/O error")]
    Io(#[from] io::Error),
}
