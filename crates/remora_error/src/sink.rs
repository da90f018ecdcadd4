//! Client-sink error types.

/// Kinds of sink write failures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum SinkErrorKind {
    /// The client went away mid-stream. Not treated as a failure by the
    /// streaming pipeline.
    #[display("Client disconnected")]
    Disconnected,
    /// Any other I/O failure while writing to the client
    #[display("Sink I/O failure: {}", _0)]
    Io(String),
}

/// Sink error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Sink Error: {} at line {} in {}", kind, line, file)]
pub struct SinkError {
    /// The kind of error that occurred
    pub kind: SinkErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl SinkError {
    /// Create a new sink error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: SinkErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Whether this error is a client disconnect.
    pub fn is_disconnect(&self) -> bool {
        matches!(self.kind, SinkErrorKind::Disconnected)
    }
}
