//! Persisted description of a logical file's remote identity.

use crate::{LinkStatus, Provider};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The link-status slot for one configured provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct ProviderSlot {
    /// The provider this slot belongs to
    provider: Provider,
    /// Most recent status, if the provider was ever contacted
    status: Option<LinkStatus>,
}

impl ProviderSlot {
    /// An empty, never-checked slot.
    pub fn empty(provider: Provider) -> Self {
        Self {
            provider,
            status: None,
        }
    }
}

/// Persisted description of a logical file's remote identity and
/// per-provider link-status history.
///
/// Owned by the filesystem entity exposing the logical file; mutated only by
/// the link resolver. Durability is delegated to the external
/// `ContentStore` collaborator.
///
/// # Examples
///
/// ```
/// use remora_core::{ContentRecord, Provider};
///
/// let record = ContentRecord::builder()
///     .original_path("show/episode.mkv")
///     .size_bytes(1_000_000u64)
///     .content_key("dead-beef-cafe")
///     .providers(&[Provider::RealDebrid, Provider::AllDebrid])
///     .build();
/// assert!(record.status_for(Provider::RealDebrid).is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct ContentRecord {
    /// Path of the file as originally named by the release
    original_path: String,
    /// Logical file size in bytes
    size_bytes: u64,
    /// Last modification time reported by the source
    modified_at: DateTime<Utc>,
    /// Opaque content key identifying the underlying release, so a provider
    /// lookup is repeatable
    content_key: String,
    /// MIME type, if known
    mime_type: Option<String>,
    /// Ordered status slots aligned to the configured provider order
    slots: Vec<ProviderSlot>,
}

impl ContentRecord {
    /// Start building a record.
    pub fn builder() -> ContentRecordBuilder {
        ContentRecordBuilder::default()
    }

    /// File name component of the original path.
    pub fn file_name(&self) -> &str {
        self.original_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.original_path)
    }

    /// The remembered status for `provider`, if any.
    pub fn status_for(&self, provider: Provider) -> Option<&LinkStatus> {
        self.slots
            .iter()
            .find(|slot| *slot.provider() == provider)
            .and_then(|slot| slot.status().as_ref())
    }

    /// Record a new status for `provider`, appending a slot if the provider
    /// was added to the configuration after this record was created.
    pub fn set_status(&mut self, provider: Provider, status: LinkStatus) {
        match self
            .slots
            .iter_mut()
            .find(|slot| *slot.provider() == provider)
        {
            Some(slot) => slot.status = Some(status),
            None => self.slots.push(ProviderSlot {
                provider,
                status: Some(status),
            }),
        }
    }

    /// Realign slots to a changed provider order.
    ///
    /// Existing statuses are kept; providers no longer configured are
    /// dropped; new providers get an empty never-checked slot so they are
    /// queried on the next resolve.
    pub fn align_slots(&mut self, order: &[Provider]) {
        let mut old = std::mem::take(&mut self.slots);
        self.slots = order
            .iter()
            .map(|provider| {
                old.iter_mut()
                    .position(|slot| slot.provider() == provider)
                    .map(|idx| old.swap_remove(idx))
                    .unwrap_or_else(|| ProviderSlot::empty(*provider))
            })
            .collect();
    }
}

/// Builder for [`ContentRecord`].
#[derive(Debug, Default)]
pub struct ContentRecordBuilder {
    original_path: String,
    size_bytes: u64,
    modified_at: Option<DateTime<Utc>>,
    content_key: String,
    mime_type: Option<String>,
    providers: Vec<Provider>,
}

impl ContentRecordBuilder {
    /// Set the original release path.
    pub fn original_path(mut self, path: impl Into<String>) -> Self {
        self.original_path = path.into();
        self
    }

    /// Set the logical file size.
    pub fn size_bytes(mut self, size: u64) -> Self {
        self.size_bytes = size;
        self
    }

    /// Set the source modification time (defaults to now).
    pub fn modified_at(mut self, at: DateTime<Utc>) -> Self {
        self.modified_at = Some(at);
        self
    }

    /// Set the opaque content key.
    pub fn content_key(mut self, key: impl Into<String>) -> Self {
        self.content_key = key.into();
        self
    }

    /// Set the MIME type.
    pub fn mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    /// Set the configured provider order; one empty slot per provider.
    pub fn providers(mut self, order: &[Provider]) -> Self {
        self.providers = order.to_vec();
        self
    }

    /// Finish the record.
    pub fn build(self) -> ContentRecord {
        ContentRecord {
            original_path: self.original_path,
            size_bytes: self.size_bytes,
            modified_at: self.modified_at.unwrap_or_else(Utc::now),
            content_key: self.content_key,
            mime_type: self.mime_type,
            slots: self.providers.into_iter().map(ProviderSlot::empty).collect(),
        }
    }
}
