//! Fixed-size batching over any iterator.
//!
//! The ingest pipeline walks its chunk stream through [`Batched`] so the
//! upsert loop only ever sees whole batches, never index arithmetic.

/// Iterator adapter yielding `Vec<T>` batches of at most `size` items.
///
/// Every batch except possibly the last holds exactly `size` items.
pub struct Batched<I: Iterator> {
    inner: I,
    size: usize,
}

impl<I: Iterator> Iterator for Batched<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let batch: Vec<I::Item> = self.inner.by_ref().take(self.size).collect();
        if batch.is_empty() {
            None
        } else {
            Some(batch)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (lo, hi) = self.inner.size_hint();
        (lo.div_ceil(self.size), hi.map(|h| h.div_ceil(self.size)))
    }
}

/// Extension trait adding [`batched`](BatchExt::batched) to every iterator.
pub trait BatchExt: Iterator + Sized {
    /// Group items into batches of `size`. A `size` of 0 is treated as 1.
    fn batched(self, size: usize) -> Batched<Self> {
        Batched {
            inner: self,
            size: size.max(1),
        }
    }
}

impl<I: Iterator> BatchExt for I {}
