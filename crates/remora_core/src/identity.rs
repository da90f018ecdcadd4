//! Logical file identity.

use serde::{Deserialize, Serialize};

/// Opaque identity of a logical file.
///
/// Used as the chunk-cache key and as a metrics label. The filesystem
/// collaborator owns the mapping from identity to its own entities.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
pub struct FileIdentity(String);

impl FileIdentity {
    /// Wrap an identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FileIdentity {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for FileIdentity {
    fn from(id: String) -> Self {
        Self(id)
    }
}
