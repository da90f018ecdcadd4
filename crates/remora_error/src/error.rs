//! Top-level error wrapper types.

use crate::{CacheError, ConfigError, HttpError, ProviderError, SinkError};

/// This is the foundation error enum. Each Remora crate contributes the
/// variants for its own failure domain.
///
/// # Examples
///
/// ```
/// use remora_error::{RemoraError, HttpError};
///
/// let http_err = HttpError::new("Connection failed");
/// let err: RemoraError = http_err.into();
/// assert!(format!("{}", err).contains("HTTP Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum RemoraErrorKind {
    /// HTTP error
    #[from(HttpError)]
    Http(HttpError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Provider backend error
    #[from(ProviderError)]
    Provider(ProviderError),
    /// Chunk cache error
    #[from(CacheError)]
    Cache(CacheError),
    /// Client sink error
    #[from(SinkError)]
    Sink(SinkError),
}

/// Remora error with kind discrimination.
///
/// # Examples
///
/// ```
/// use remora_error::{RemoraError, RemoraResult, ConfigError};
///
/// fn might_fail() -> RemoraResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// match might_fail() {
///     Ok(_) => println!("Success"),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Remora Error: {}", _0)]
pub struct RemoraError(Box<RemoraErrorKind>);

impl RemoraError {
    /// Create a new error from a kind.
    pub fn new(kind: RemoraErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &RemoraErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to RemoraErrorKind
impl<T> From<T> for RemoraError
where
    T: Into<RemoraErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Remora operations.
///
/// # Examples
///
/// ```
/// use remora_error::{RemoraResult, HttpError};
///
/// fn fetch_data() -> RemoraResult<String> {
///     Err(HttpError::new("404 Not Found"))?
/// }
/// ```
pub type RemoraResult<T> = std::result::Result<T, RemoraError>;
