//! Chunk-cache error types.

/// Kinds of chunk-cache errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum CacheErrorKind {
    /// Failed to create the cache directory
    #[display("Failed to create cache directory: {}", _0)]
    DirectoryCreation(String),
    /// Failed to write a chunk blob
    #[display("Failed to write chunk: {}", _0)]
    ChunkWrite(String),
    /// Failed to read a chunk blob
    #[display("Failed to read chunk: {}", _0)]
    ChunkRead(String),
    /// Byte length does not match the declared range
    #[display("Chunk length mismatch: {}", _0)]
    LengthMismatch(String),
}

/// Chunk-cache error with location tracking.
///
/// # Examples
///
/// ```
/// use remora_error::{CacheError, CacheErrorKind};
///
/// let err = CacheError::new(CacheErrorKind::ChunkRead("file:0-99".to_string()));
/// assert!(format!("{}", err).contains("Failed to read chunk"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Cache Error: {} at line {} in {}", kind, line, file)]
pub struct CacheError {
    /// The kind of error that occurred
    pub kind: CacheErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl CacheError {
    /// Create a new cache error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: CacheErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
