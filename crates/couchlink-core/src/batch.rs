//! Chunking of id lists into request-sized blocks.
//!
//! Blocks are produced lazily and in input order. Callers that issue one
//! request per block must await each request before pulling the next block.

use std::iter::FusedIterator;

use crate::error::ValidationError;
use crate::validation::require_at_least;

/// Default cap on ids per multi-document request.
pub const DEFAULT_MAX_DOCUMENTS_PER_REQUEST: usize = 500;

/// Split `items` into contiguous blocks of at most `size` elements.
///
/// Every block but the last holds exactly `size` elements. An empty input
/// yields no blocks. `size` must be at least 1.
pub fn split<I>(items: I, size: usize) -> Result<Blocks<I::IntoIter>, ValidationError>
where
    I: IntoIterator,
{
    require_at_least(size, 1, "size")?;
    Ok(Blocks {
        inner: items.into_iter(),
        size,
    })
}

/// Lazy iterator over blocks. See [`split`].
#[derive(Debug, Clone)]
pub struct Blocks<I> {
    inner: I,
    size: usize,
}

impl<I: Iterator> Iterator for Blocks<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let block: Vec<_> = self.inner.by_ref().take(self.size).collect();
        if block.is_empty() {
            None
        } else {
            Some(block)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (lower, upper) = self.inner.size_hint();
        (
            lower.div_ceil(self.size),
            upper.map(|upper| upper.div_ceil(self.size)),
        )
    }
}

impl<I: FusedIterator> FusedIterator for Blocks<I> {}
