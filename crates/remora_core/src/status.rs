//! Per-provider link status model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Categorized non-working outcomes of a provider attempt.
///
/// `Network` is non-authoritative transport noise and is never persisted;
/// every other kind drives the staleness window for re-checking a provider.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FaultKind {
    /// Content key unavailable at the provider
    Missing,
    /// Provider overloaded, rate limited, or failing server-side
    Provider,
    /// Provider rejected the request as malformed or unauthorized
    Client,
    /// Transport failure before the provider could answer
    Network,
    /// Uncategorized failure
    Unknown,
}

/// A currently usable direct-download link remembered for a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct WorkingLink {
    /// Temporary direct-download URL
    url: String,
    /// Size reported by the provider, if any
    size_bytes: Option<u64>,
    /// MIME type reported by the provider, if any
    mime_type: Option<String>,
    /// Opaque provider parameters that make re-resolution cheap
    provider_params: HashMap<String, String>,
    /// When this link was last obtained or validated
    checked_at: DateTime<Utc>,
}

impl WorkingLink {
    /// Create a working link checked now.
    pub fn new(
        url: impl Into<String>,
        size_bytes: Option<u64>,
        mime_type: Option<String>,
        provider_params: HashMap<String, String>,
    ) -> Self {
        Self {
            url: url.into(),
            size_bytes,
            mime_type,
            provider_params,
            checked_at: Utc::now(),
        }
    }

    /// Refresh the validation timestamp after a successful liveness probe.
    pub fn touch(&mut self) {
        self.checked_at = Utc::now();
    }
}

/// Outcome of the most recent attempt to obtain or validate a provider link.
///
/// One status is kept per provider per [`crate::ContentRecord`]; `checked_at`
/// drives re-check eligibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LinkStatus {
    /// A link that worked when last checked
    Working(WorkingLink),
    /// Content key unavailable at this provider
    Missing {
        /// When the absence was observed
        checked_at: DateTime<Utc>,
    },
    /// Provider-side failure
    ProviderFault {
        /// When the fault was observed
        checked_at: DateTime<Utc>,
    },
    /// Request rejected by the provider
    ClientFault {
        /// When the fault was observed
        checked_at: DateTime<Utc>,
    },
    /// Transport failure; non-authoritative
    NetworkFault {
        /// When the fault was observed
        checked_at: DateTime<Utc>,
    },
    /// Uncategorized failure
    UnknownFault {
        /// When the fault was observed
        checked_at: DateTime<Utc>,
    },
}

impl LinkStatus {
    /// Build the status recording `kind` observed now.
    pub fn from_fault(kind: FaultKind) -> Self {
        let checked_at = Utc::now();
        match kind {
            FaultKind::Missing => Self::Missing { checked_at },
            FaultKind::Provider => Self::ProviderFault { checked_at },
            FaultKind::Client => Self::ClientFault { checked_at },
            FaultKind::Network => Self::NetworkFault { checked_at },
            FaultKind::Unknown => Self::UnknownFault { checked_at },
        }
    }

    /// When this status was last established.
    pub fn checked_at(&self) -> DateTime<Utc> {
        match self {
            Self::Working(link) => *link.checked_at(),
            Self::Missing { checked_at }
            | Self::ProviderFault { checked_at }
            | Self::ClientFault { checked_at }
            | Self::NetworkFault { checked_at }
            | Self::UnknownFault { checked_at } => *checked_at,
        }
    }

    /// Whether this status carries a usable link.
    pub fn is_working(&self) -> bool {
        matches!(self, Self::Working(_))
    }

    /// The fault kind for non-working statuses.
    pub fn fault_kind(&self) -> Option<FaultKind> {
        match self {
            Self::Working(_) => None,
            Self::Missing { .. } => Some(FaultKind::Missing),
            Self::ProviderFault { .. } => Some(FaultKind::Provider),
            Self::ClientFault { .. } => Some(FaultKind::Client),
            Self::NetworkFault { .. } => Some(FaultKind::Network),
            Self::UnknownFault { .. } => Some(FaultKind::Unknown),
        }
    }

    /// The remembered link, if working.
    pub fn working_link(&self) -> Option<&WorkingLink> {
        match self {
            Self::Working(link) => Some(link),
            _ => None,
        }
    }
}
