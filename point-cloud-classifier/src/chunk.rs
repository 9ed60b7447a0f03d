//! Chunk planning over a file's point index range.
use serde::Serialize;
use std::num::NonZeroU64;

/// Half-open index range `[start, end)` of one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkRange {
    pub index: usize,
    pub start: u64,
    pub end: u64,
}

impl ChunkRange {
    pub fn point_count(&self) -> u64 {
        self.end - self.start
    }
}

/// Partition `[0, total_points)` into consecutive ranges of at most `chunk_size`.
/// Only the last range may be shorter; zero points plan zero chunks.
pub fn plan(total_points: u64, chunk_size: NonZeroU64) -> Vec<ChunkRange> {
    let size = chunk_size.get();
    let num_chunks = total_points.div_ceil(size);

    (0..num_chunks)
        .map(|i| {
            let start = i * size;
            ChunkRange {
                index: i as usize,
                start,
                end: (start + size).min(total_points),
            }
        })
        .collect()
}
