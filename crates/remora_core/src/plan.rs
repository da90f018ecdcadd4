//! Stream planning: covering a requested range with cached and remote
//! segments.

use crate::ByteRange;
use serde::{Deserialize, Serialize};

/// The extent of one cached chunk, as listed by the chunk store's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[display("chunk[{}, {}]", start, end)]
pub struct ChunkSpan {
    /// First byte the chunk holds
    pub start: u64,
    /// Last byte the chunk holds
    pub end: u64,
}

impl ChunkSpan {
    /// Create a span. Invariant: `start <= end`.
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    /// Whether `offset` falls inside this chunk.
    pub fn contains(&self, offset: u64) -> bool {
        self.start <= offset && offset <= self.end
    }
}

/// Where the bytes of one plan segment come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentSource {
    /// Copy from this already-cached chunk
    Cached(ChunkSpan),
    /// Fetch from the provider over a ranged read
    Remote,
}

/// One contiguous piece of a stream plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct Segment {
    /// The byte range this segment delivers
    range: ByteRange,
    /// Cached or remote origin
    source: SegmentSource,
}

impl Segment {
    /// A segment served from a cached chunk.
    pub fn cached(range: ByteRange, chunk: ChunkSpan) -> Self {
        Self {
            range,
            source: SegmentSource::Cached(chunk),
        }
    }

    /// A segment fetched remotely.
    pub fn remote(range: ByteRange) -> Self {
        Self {
            range,
            source: SegmentSource::Remote,
        }
    }

    /// Whether this segment is served from cache.
    pub fn is_cached(&self) -> bool {
        matches!(self.source, SegmentSource::Cached(_))
    }
}

/// An ordered cached/remote segment cover of a requested byte range.
///
/// Invariants: segments are contiguous and non-overlapping, their union
/// equals the requested range, the first segment starts at the range start
/// and the last ends at the range end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct StreamPlan {
    /// The range this plan covers
    requested: ByteRange,
    /// Ordered covering segments
    segments: Vec<Segment>,
}

impl StreamPlan {
    /// Compute the covering plan for `requested` given the currently cached
    /// chunks of the file.
    ///
    /// Greedy left-to-right cover. At each position the furthest-reaching
    /// cached chunk containing it wins; preferring the furthest reach
    /// minimizes segment count and so remote round-trips. Every segment is
    /// clamped to `requested.end()`, which keeps overlapping chunk data
    /// safe to plan over.
    pub fn generate(chunks: &[ChunkSpan], requested: ByteRange) -> Self {
        let mut segments = Vec::new();
        let mut next = requested.start();

        while next <= requested.end() {
            if let Some(chunk) = chunks
                .iter()
                .filter(|c| c.contains(next))
                .max_by_key(|c| c.end)
            {
                let end = chunk.end.min(requested.end());
                segments.push(Segment::cached(ByteRange::new(next, end), *chunk));
                if end == requested.end() {
                    break;
                }
                next = end + 1;
            } else if let Some(chunk) = chunks
                .iter()
                .filter(|c| c.start > next)
                .min_by_key(|c| c.start)
            {
                let gap_end = (chunk.start - 1).min(requested.end());
                segments.push(Segment::remote(ByteRange::new(next, gap_end)));
                if gap_end == requested.end() {
                    break;
                }
                next = gap_end + 1;
            } else {
                segments.push(Segment::remote(ByteRange::new(next, requested.end())));
                break;
            }
        }

        Self {
            requested,
            segments,
        }
    }

    /// Total bytes served from cache under this plan.
    pub fn cached_bytes(&self) -> u64 {
        self.segments
            .iter()
            .filter(|s| s.is_cached())
            .map(|s| s.range().len())
            .sum()
    }

    /// Total bytes to be fetched remotely under this plan.
    pub fn remote_bytes(&self) -> u64 {
        self.requested.len() - self.cached_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(pairs: &[(u64, u64)]) -> Vec<ChunkSpan> {
        pairs.iter().map(|&(s, e)| ChunkSpan::new(s, e)).collect()
    }

    fn assert_invariants(plan: &StreamPlan) {
        let segments = plan.segments();
        assert!(!segments.is_empty());
        assert_eq!(segments[0].range().start(), plan.requested().start());
        assert_eq!(
            segments.last().unwrap().range().end(),
            plan.requested().end()
        );
        for pair in segments.windows(2) {
            assert_eq!(pair[0].range().end() + 1, pair[1].range().start());
        }
    }

    fn describe(plan: &StreamPlan) -> Vec<(bool, u64, u64)> {
        plan.segments()
            .iter()
            .map(|s| (s.is_cached(), s.range().start(), s.range().end()))
            .collect()
    }

    #[test]
    fn interleaves_gaps_and_chunks() {
        let chunks = spans(&[(10, 20), (30, 50), (70, 100)]);
        let plan = StreamPlan::generate(&chunks, ByteRange::new(0, 200));
        assert_invariants(&plan);
        assert_eq!(
            describe(&plan),
            vec![
                (false, 0, 9),
                (true, 10, 20),
                (false, 21, 29),
                (true, 30, 50),
                (false, 51, 69),
                (true, 70, 100),
                (false, 101, 200),
            ]
        );
    }

    #[test]
    fn clamps_chunks_to_requested_range() {
        let chunks = spans(&[(0, 100), (150, 300)]);
        let plan = StreamPlan::generate(&chunks, ByteRange::new(75, 200));
        assert_invariants(&plan);
        assert_eq!(
            describe(&plan),
            vec![(true, 75, 100), (false, 101, 149), (true, 150, 200)]
        );
    }

    #[test]
    fn no_chunks_yields_single_remote_segment() {
        let plan = StreamPlan::generate(&[], ByteRange::new(0, 200));
        assert_invariants(&plan);
        assert_eq!(describe(&plan), vec![(false, 0, 200)]);
    }

    #[test]
    fn prefers_furthest_reaching_overlapping_chunk() {
        // Both contain byte 10; the one reaching 90 wins.
        let chunks = spans(&[(5, 40), (10, 90)]);
        let plan = StreamPlan::generate(&chunks, ByteRange::new(10, 100));
        assert_invariants(&plan);
        assert_eq!(describe(&plan), vec![(true, 10, 90), (false, 91, 100)]);
    }

    #[test]
    fn chunk_covering_whole_range_yields_single_cached_segment() {
        let chunks = spans(&[(0, 1000)]);
        let plan = StreamPlan::generate(&chunks, ByteRange::new(100, 200));
        assert_invariants(&plan);
        assert_eq!(describe(&plan), vec![(true, 100, 200)]);
        assert_eq!(plan.cached_bytes(), 101);
        assert_eq!(plan.remote_bytes(), 0);
    }

    #[test]
    fn overlapping_chunk_tail_is_not_revisited() {
        // After consuming [0,50] the overlap of the second chunk is skipped
        // and only its uncovered tail is used.
        let chunks = spans(&[(0, 50), (40, 80)]);
        let plan = StreamPlan::generate(&chunks, ByteRange::new(0, 100));
        assert_invariants(&plan);
        assert_eq!(
            describe(&plan),
            vec![(true, 0, 50), (true, 51, 80), (false, 81, 100)]
        );
    }
}
