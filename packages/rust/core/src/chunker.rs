//! Splits an ordered list into contiguous, non-overlapping chunks.

use outreach_shared::{OutreachError, Result};

/// One contiguous slice of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a, T> {
    /// Zero-based chunk number.
    pub index: usize,
    /// Position of `items[0]` in the full input.
    pub offset: usize,
    pub items: &'a [T],
}

impl<T> Chunk<'_, T> {
    /// Input positions covered by this chunk.
    pub fn positions(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.items.len()
    }
}

/// Lazy iterator over the chunks of a slice.
#[derive(Debug, Clone)]
pub struct Chunks<'a, T> {
    inner: std::iter::Enumerate<std::slice::Chunks<'a, T>>,
    size: usize,
}

impl<'a, T> Iterator for Chunks<'a, T> {
    type Item = Chunk<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, items) = self.inner.next()?;
        Some(Chunk {
            index,
            offset: index * self.size,
            items,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for Chunks<'_, T> {}

/// Chunk `items` into groups of `size`. Every chunk is full except possibly
/// the last; an empty input yields no chunks.
pub fn chunk<T>(items: &[T], size: usize) -> Result<Chunks<'_, T>> {
    if size == 0 {
        return Err(OutreachError::validation("chunk size must be greater than 0"));
    }
    Ok(Chunks {
        inner: items.chunks(size).enumerate(),
        size,
    })
}

/// Number of chunks `chunk(items, size)` yields.
pub fn chunk_count(len: usize, size: usize) -> usize {
    if size == 0 { 0 } else { len.div_ceil(size) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_size_is_rejected() {
        let err = chunk(&[1, 2, 3], 0).unwrap_err();
        assert!(matches!(err, OutreachError::Validation { .. }));
    }

    #[test]
    fn empty_input_yields_nothing() {
        let items: [u8; 0] = [];
        assert_eq!(chunk(&items, 5).unwrap().count(), 0);
        assert_eq!(chunk_count(0, 5), 0);
    }

    #[test]
    fn concatenation_reproduces_input() {
        let items: Vec<usize> = (0..23).collect();
        for size in 1..=25 {
            let chunks: Vec<_> = chunk(&items, size).unwrap().collect();
            assert_eq!(chunks.len(), chunk_count(items.len(), size), "size {size}");

            let joined: Vec<usize> = chunks.iter().flat_map(|c| c.items.iter().copied()).collect();
            assert_eq!(joined, items, "size {size}");

            let (last, full) = chunks.split_last().unwrap();
            assert!(full.iter().all(|c| c.items.len() == size));
            assert!(!last.items.is_empty() && last.items.len() <= size);
        }
    }

    #[test]
    fn offsets_and_indices() {
        let items = ["a", "b", "c", "d", "e", "f", "g"];
        let chunks: Vec<_> = chunk(&items, 3).unwrap().collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].index, 1);
        assert_eq!(chunks[1].offset, 3);
        assert_eq!(chunks[1].items, &["d", "e", "f"]);
        assert_eq!(chunks[2].positions(), 6..7);
    }

    #[test]
    fn iterator_reports_exact_length() {
        let items = [0u8; 11];
        let mut chunks = chunk(&items, 5).unwrap();
        assert_eq!(chunks.len(), 3);
        chunks.next();
        assert_eq!(chunks.len(), 2);
    }
}
