//! Data carried across the provider-client seam.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One file a provider reports for a content key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct RemoteFile {
    /// Path or name of the file inside the release
    path: String,
    /// Size in bytes as reported by the provider
    size_bytes: u64,
    /// Opaque parameters that let `fresh_url` skip the full lookup
    params: HashMap<String, String>,
}

impl RemoteFile {
    /// Describe a remote file.
    pub fn new(
        path: impl Into<String>,
        size_bytes: u64,
        params: HashMap<String, String>,
    ) -> Self {
        Self {
            path: path.into(),
            size_bytes,
            params,
        }
    }

    /// File name component of the remote path.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// A freshly issued direct-download link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct ResolvedLink {
    /// Temporary direct-download URL
    url: String,
    /// Size in bytes, if the provider reports it
    size_bytes: Option<u64>,
    /// MIME type, if the provider reports it
    mime_type: Option<String>,
    /// Parameters to remember for cheap re-resolution
    params: HashMap<String, String>,
}

impl ResolvedLink {
    /// Describe a freshly issued link.
    pub fn new(
        url: impl Into<String>,
        size_bytes: Option<u64>,
        mime_type: Option<String>,
        params: HashMap<String, String>,
    ) -> Self {
        Self {
            url: url.into(),
            size_bytes,
            mime_type,
            params,
        }
    }
}
