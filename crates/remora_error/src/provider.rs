//! Provider-backend error types.
//!
//! Provider clients surface every failed call as a `ProviderError`. The kind
//! carries enough structure for the resolver to classify the outcome into a
//! fault kind without string matching on messages.

/// Kinds of provider-backend errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ProviderErrorKind {
    /// The content key or file no longer exists at the provider
    #[display("Not found at provider: {}", _0)]
    NotFound(String),
    /// The provider rejected the call for quota reasons
    #[display("Rate limited by provider: {}", _0)]
    RateLimited(String),
    /// The provider returned a server-side failure
    #[display("Provider server error (status {}): {}", status, message)]
    Server {
        /// HTTP status code
        status: u16,
        /// Response body or summary
        message: String,
    },
    /// The provider rejected the request as malformed or unauthorized
    #[display("Provider rejected request (status {}): {}", status, message)]
    Client {
        /// HTTP status code
        status: u16,
        /// Response body or summary
        message: String,
    },
    /// The call never reached the provider (DNS, connect, timeout)
    #[display("Network failure: {}", _0)]
    Network(String),
    /// The provider answered but the response could not be decoded
    #[display("Failed to parse provider response: {}", _0)]
    Parse(String),
    /// Anything the client could not categorize
    #[display("Provider error: {}", _0)]
    Other(String),
}

/// Provider error with location tracking.
///
/// # Examples
///
/// ```
/// use remora_error::{ProviderError, ProviderErrorKind};
///
/// let err = ProviderError::new(ProviderErrorKind::NotFound("abc123".to_string()));
/// assert!(format!("{}", err).contains("Not found"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Provider Error: {} at line {} in {}", kind, line, file)]
pub struct ProviderError {
    /// The kind of error that occurred
    pub kind: ProviderErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ProviderError {
    /// Create a new provider error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ProviderErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
