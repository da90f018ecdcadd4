//! Configured providers with their admission gates.

use crate::classify_fault;
use remora_core::{FaultKind, Provider};
use remora_error::RemoraError;
use remora_interface::ProviderClient;
use remora_rate_limit::{FaultGate, RateGate, RemoraConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// One provider client wired to its rate and fault gates.
pub struct RegisteredProvider {
    client: Arc<dyn ProviderClient>,
    rate: RateGate,
    faults: FaultGate,
    cooldown: Duration,
}

impl RegisteredProvider {
    /// Which provider this entry covers.
    pub fn provider(&self) -> Provider {
        self.client.provider()
    }

    /// The underlying client. Callers admit through [`Self::admit`] first.
    pub fn client(&self) -> &dyn ProviderClient {
        self.client.as_ref()
    }

    /// Wait out any active fault cooldown, then any rate-window wait, then
    /// record the admission. One admission covers one provider call.
    pub async fn admit(&self) {
        let key = self.provider().key();
        self.faults.guard(&key, self.rate.admit(&key)).await;
    }

    /// Note a failed call so provider-side faults open a cooldown.
    ///
    /// Only provider-side trouble (overload, 5xx, rate limiting) cools the
    /// provider down; absence and client mistakes do not.
    pub fn note_error(&self, error: &RemoraError) {
        if classify_fault(error) == FaultKind::Provider {
            let key = self.provider().key();
            debug!(provider = %key, cooldown = ?self.cooldown, "Opening fault cooldown");
            self.faults.open_fault(&key, self.cooldown);
        }
    }
}

/// The configured providers in priority order.
///
/// Order comes from `provider_order` in the configuration; a client without
/// a configured position, or a configured position without a client, is
/// dropped with a warning rather than guessed at.
pub struct ProviderRegistry {
    entries: Vec<RegisteredProvider>,
}

impl ProviderRegistry {
    /// Wire clients to gates in the configured priority order.
    pub fn new(config: &RemoraConfig, clients: Vec<Arc<dyn ProviderClient>>) -> Self {
        let mut clients: Vec<_> = clients.into_iter().collect();
        let mut entries = Vec::with_capacity(config.provider_order.len());

        for provider in &config.provider_order {
            let Some(idx) = clients.iter().position(|c| c.provider() == *provider) else {
                warn!(provider = %provider, "Configured provider has no client, skipping");
                continue;
            };
            let client = clients.swap_remove(idx);
            let limit = config.limit_for(*provider);
            entries.push(RegisteredProvider {
                client,
                rate: RateGate::new(limit.window(), limit.max_calls),
                faults: FaultGate::new(),
                cooldown: config.staleness.wait_for(FaultKind::Provider),
            });
        }

        for orphan in &clients {
            warn!(provider = %orphan.provider(), "Client provider absent from configured order, dropping");
        }

        Self { entries }
    }

    /// The registered providers, in priority order.
    pub fn providers(&self) -> impl Iterator<Item = &RegisteredProvider> {
        self.entries.iter()
    }

    /// The entry for one provider, if registered.
    pub fn get(&self, provider: Provider) -> Option<&RegisteredProvider> {
        self.entries.iter().find(|e| e.provider() == provider)
    }

    /// The priority order actually in effect.
    pub fn order(&self) -> Vec<Provider> {
        self.entries.iter().map(|e| e.provider()).collect()
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no provider is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
