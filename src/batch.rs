//! Splitting record sets into provider-sized upload batches

use std::num::NonZeroUsize;
use std::slice::Chunks;

/// Split `items` into contiguous chunks of `size`, the last one holding the remainder.
///
/// The returned iterator is lazy; call again to walk the same chunks from the start.
pub fn partition<T>(items: &[T], size: NonZeroUsize) -> Chunks<'_, T> {
    items.chunks(size.get())
}

/// Number of upload calls needed for `len` records at `size` per call
pub fn batch_count(len: usize, size: NonZeroUsize) -> usize {
    len.div_ceil(size.get())
}
