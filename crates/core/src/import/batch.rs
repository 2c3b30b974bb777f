//! Fixed-size partitioning of preview rows into save batches.

use super::preview::PreviewRow;

/// Rows per save request.
pub const BATCH_SIZE: usize = 10;

/// A contiguous slice of the session's rows, sent as one save request.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    /// Zero-based position in the run.
    pub index: usize,
    pub rows: &'a [PreviewRow],
}

impl Batch<'_> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Split `rows` into batches of `size` in original order.
///
/// Every batch except possibly the last holds exactly `size` rows. A `size`
/// of zero is treated as one.
pub fn partition(rows: &[PreviewRow], size: usize) -> Vec<Batch<'_>> {
    rows.chunks(size.max(1))
        .enumerate()
        .map(|(index, rows)| Batch { index, rows })
        .collect()
}

/// Number of batches `partition` yields for `len` rows.
pub fn batch_count(len: usize, size: usize) -> usize {
    len.div_ceil(size.max(1))
}
