//! Trait seams between the Remora core and its collaborators.

use crate::{RemoteFile, ResolvedLink};
use async_trait::async_trait;
use bytes::Bytes;
use remora_core::{ContentRecord, FileIdentity, Provider};
use remora_error::{RemoraResult, SinkError};
use std::collections::HashMap;

/// One configured content-hosting backend.
///
/// Implementations issue temporary direct-download URLs for opaque content
/// keys. Every call may fail with a `ProviderError` whose kind the resolver
/// classifies into the fault taxonomy. Admission control is not the
/// implementation's concern; calls are routed through the provider's
/// rate and fault gates by the registry.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Which provider this client talks to.
    fn provider(&self) -> Provider;

    /// Whether the content key is available at this provider.
    ///
    /// A cheap availability check, typically a single metadata call.
    async fn is_available(&self, content_key: &str) -> RemoraResult<bool>;

    /// List the files the provider holds for a content key.
    async fn list_files(&self, content_key: &str) -> RemoraResult<Vec<RemoteFile>>;

    /// Obtain a fresh direct-download URL.
    ///
    /// `params` are the remembered per-file parameters from an earlier
    /// lookup; providers use them to skip the full listing when possible.
    async fn fresh_url(
        &self,
        content_key: &str,
        params: &HashMap<String, String>,
    ) -> RemoraResult<ResolvedLink>;

    /// Whether a previously issued URL still answers.
    ///
    /// Implementations use a short fixed timeout; an expired or deleted link
    /// yields `Ok(false)`, transport trouble yields an error.
    async fn probe_alive(&self, url: &str) -> RemoraResult<bool>;
}

/// Persistence collaborator owning content records.
///
/// Durability technology is outside the Remora core; the resolver only
/// loads and saves. Concurrent saves of the same record are last-write-wins.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Load the record for a logical file.
    async fn load_content_record(&self, file: &FileIdentity) -> RemoraResult<ContentRecord>;

    /// Persist the record for a logical file.
    async fn save_content_record(
        &self,
        file: &FileIdentity,
        record: &ContentRecord,
    ) -> RemoraResult<()>;
}

/// Destination for streamed bytes, typically the protocol server's response
/// body.
///
/// `send` applies backpressure by suspending until the client consumes
/// earlier blocks. A disconnect surfaces as a `SinkError` whose
/// `is_disconnect` is true; the pipeline treats that as a normal end of
/// stream.
#[async_trait]
pub trait ByteSink: Send {
    /// Deliver one block to the client.
    async fn send(&mut self, block: Bytes) -> Result<(), SinkError>;
}
