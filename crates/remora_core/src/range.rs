//! Inclusive byte ranges.

use serde::{Deserialize, Serialize};

/// An inclusive byte range `[start, end]` within a logical file.
///
/// Invariant: `start <= end`. A range always covers at least one byte.
///
/// # Examples
///
/// ```
/// use remora_core::ByteRange;
///
/// let r = ByteRange::new(10, 19);
/// assert_eq!(r.len(), 10);
/// assert!(r.contains(15));
/// assert!(!r.contains(20));
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
#[display("[{}, {}]", start, end)]
pub struct ByteRange {
    start: u64,
    end: u64,
}

impl ByteRange {
    /// Create a new inclusive range.
    ///
    /// # Panics
    ///
    /// Panics if `start > end`; callers construct ranges from already
    /// validated request bounds.
    pub fn new(start: u64, end: u64) -> Self {
        assert!(start <= end, "byte range start {start} exceeds end {end}");
        Self { start, end }
    }

    /// First byte offset covered.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Last byte offset covered.
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of bytes covered.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Inclusive ranges are never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether `offset` falls inside this range.
    pub fn contains(&self, offset: u64) -> bool {
        self.start <= offset && offset <= self.end
    }

    /// Value for an HTTP `Range` header requesting exactly this range.
    pub fn http_header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}
