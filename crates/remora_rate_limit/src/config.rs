//! Configuration structures for Remora.
//!
//! TOML-based configuration with a precedence system:
//! - Bundled defaults (include_str! from remora.toml)
//! - User overrides (./remora.toml or ~/.config/remora/remora.toml)
//! - Automatic merging with user values taking precedence

use config::{Config, File, FileFormat};
use remora_core::{FaultKind, Provider};
use remora_error::{ConfigError, RemoraError, RemoraResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

/// Rate-window budget for one provider.
///
/// # Example
///
/// ```toml
/// [providers.real_debrid]
/// window_secs = 60
/// max_calls = 60
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProviderLimitConfig {
    /// Length of the sliding admission window in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Maximum calls admitted per trailing window
    #[serde(default = "default_max_calls")]
    pub max_calls: usize,
}

fn default_window_secs() -> u64 {
    60
}

fn default_max_calls() -> usize {
    30
}

impl Default for ProviderLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            max_calls: default_max_calls(),
        }
    }
}

impl ProviderLimitConfig {
    /// The sliding window as a duration.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// How long a persisted non-working status suppresses re-querying a
/// provider, per fault kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct StalenessConfig {
    /// Wait after a `Missing` outcome
    #[serde(default = "default_missing_secs")]
    pub missing_secs: u64,
    /// Wait after a `ProviderFault` outcome
    #[serde(default = "default_provider_fault_secs")]
    pub provider_fault_secs: u64,
    /// Wait after a `ClientFault` outcome
    #[serde(default = "default_client_fault_secs")]
    pub client_fault_secs: u64,
    /// Wait after a `NetworkFault` outcome
    #[serde(default = "default_network_fault_secs")]
    pub network_fault_secs: u64,
    /// Wait after an `UnknownFault` outcome
    #[serde(default = "default_unknown_fault_secs")]
    pub unknown_fault_secs: u64,
}

fn default_missing_secs() -> u64 {
    3600
}

fn default_provider_fault_secs() -> u64 {
    300
}

fn default_client_fault_secs() -> u64 {
    1800
}

fn default_network_fault_secs() -> u64 {
    60
}

fn default_unknown_fault_secs() -> u64 {
    600
}

impl Default for StalenessConfig {
    fn default() -> Self {
        Self {
            missing_secs: default_missing_secs(),
            provider_fault_secs: default_provider_fault_secs(),
            client_fault_secs: default_client_fault_secs(),
            network_fault_secs: default_network_fault_secs(),
            unknown_fault_secs: default_unknown_fault_secs(),
        }
    }
}

impl StalenessConfig {
    /// The configured wait for a fault kind.
    pub fn wait_for(&self, kind: FaultKind) -> Duration {
        let secs = match kind {
            FaultKind::Missing => self.missing_secs,
            FaultKind::Provider => self.provider_fault_secs,
            FaultKind::Client => self.client_fault_secs,
            FaultKind::Network => self.network_fault_secs,
            FaultKind::Unknown => self.unknown_fault_secs,
        };
        Duration::from_secs(secs)
    }
}

/// Chunk-cache sizing and retention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Remote segments at or below this size are cached
    #[serde(default = "default_chunk_threshold_bytes")]
    pub chunk_threshold_bytes: u64,
    /// Chunks unread for this long are deleted by the sweep
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    /// Sweep cadence
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_chunk_threshold_bytes() -> u64 {
    8 * 1024 * 1024
}

fn default_retention_secs() -> u64 {
    7 * 24 * 3600
}

fn default_sweep_interval_secs() -> u64 {
    3600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            chunk_threshold_bytes: default_chunk_threshold_bytes(),
            retention_secs: default_retention_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl CacheConfig {
    /// Retention window as a duration.
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    /// Sweep cadence as a duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Stream-pipeline tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct StreamConfig {
    /// Fixed block size for the read-ahead pipeline
    #[serde(default = "default_block_size_bytes")]
    pub block_size_bytes: usize,
    /// Depth of the producer/consumer block queue
    #[serde(default = "default_read_ahead_blocks")]
    pub read_ahead_blocks: usize,
    /// Short fixed timeout for liveness and metadata calls, in seconds
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    /// Base transfer timeout in seconds
    #[serde(default = "default_transfer_base_timeout_secs")]
    pub transfer_base_timeout_secs: u64,
    /// Additional transfer timeout per MiB requested, in seconds
    #[serde(default = "default_transfer_secs_per_mib")]
    pub transfer_secs_per_mib: u64,
    /// Throughput sampling cadence in milliseconds
    #[serde(default = "default_throughput_sample_millis")]
    pub throughput_sample_millis: u64,
}

fn default_block_size_bytes() -> usize {
    256 * 1024
}

fn default_read_ahead_blocks() -> usize {
    2
}

fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_transfer_base_timeout_secs() -> u64 {
    30
}

fn default_transfer_secs_per_mib() -> u64 {
    2
}

fn default_throughput_sample_millis() -> u64 {
    1000
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            block_size_bytes: default_block_size_bytes(),
            read_ahead_blocks: default_read_ahead_blocks(),
            probe_timeout_secs: default_probe_timeout_secs(),
            transfer_base_timeout_secs: default_transfer_base_timeout_secs(),
            transfer_secs_per_mib: default_transfer_secs_per_mib(),
            throughput_sample_millis: default_throughput_sample_millis(),
        }
    }
}

impl StreamConfig {
    /// Short fixed timeout for liveness and metadata calls.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Transfer timeout proportional to the requested length.
    pub fn transfer_timeout(&self, len_bytes: u64) -> Duration {
        let mib = len_bytes.div_ceil(1024 * 1024);
        Duration::from_secs(self.transfer_base_timeout_secs + self.transfer_secs_per_mib * mib)
    }

    /// Throughput sampling cadence.
    pub fn throughput_sample_interval(&self) -> Duration {
        Duration::from_millis(self.throughput_sample_millis)
    }
}

/// Resolver retry bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Whole-resolution retry count for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Base backoff delay in milliseconds
    #[serde(default = "default_retry_base_delay_millis")]
    pub retry_base_delay_millis: u64,
}

fn default_max_retries() -> usize {
    2
}

fn default_retry_base_delay_millis() -> u64 {
    250
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_base_delay_millis: default_retry_base_delay_millis(),
        }
    }
}

/// Top-level Remora configuration.
///
/// Loads from TOML files with a precedence system:
/// 1. Bundled defaults (include_str! from remora.toml)
/// 2. User override (~/.config/remora/remora.toml, then ./remora.toml)
///
/// # Example
///
/// ```no_run
/// use remora_rate_limit::RemoraConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RemoraConfig::load()?;
/// println!("providers: {:?}", config.provider_order);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct RemoraConfig {
    /// Configured provider order; both preference and fallback order
    #[serde(default)]
    pub provider_order: Vec<Provider>,

    /// Per-provider rate windows, keyed by provider name
    #[serde(default)]
    pub providers: HashMap<String, ProviderLimitConfig>,

    /// Staleness windows per fault kind
    #[serde(default)]
    pub staleness: StalenessConfig,

    /// Chunk-cache sizing and retention
    #[serde(default)]
    pub cache: CacheConfig,

    /// Stream-pipeline tuning
    #[serde(default)]
    pub stream: StreamConfig,

    /// Resolver retry bounds
    #[serde(default)]
    pub resolver: ResolverConfig,
}

impl RemoraConfig {
    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> RemoraResult<Self> {
        debug!("Loading configuration from file");

        Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                RemoraError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                RemoraError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }

    /// Load configuration with precedence: user override > bundled default.
    ///
    /// Configuration sources in order of precedence (later sources override
    /// earlier):
    /// 1. Bundled defaults (remora.toml shipped with the library)
    /// 2. User config in home directory (~/.config/remora/remora.toml)
    /// 3. User config in current directory (./remora.toml)
    ///
    /// User config files are optional and silently skipped if not found.
    #[instrument]
    pub fn load() -> RemoraResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        // Bundled default configuration
        const DEFAULT_CONFIG: &str = include_str!("../../../remora.toml");

        let mut builder = Config::builder()
            // Start with bundled defaults
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        // Add user config from home directory (optional)
        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/remora/remora.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        // Add user config from current directory (optional, highest precedence)
        builder = builder.add_source(File::with_name("remora").required(false));

        builder
            .build()
            .map_err(|e| {
                RemoraError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                RemoraError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }

    /// Rate-window budget for a provider, falling back to defaults for
    /// providers without an explicit table.
    #[instrument(skip(self))]
    pub fn limit_for(&self, provider: Provider) -> ProviderLimitConfig {
        self.providers
            .get(&provider.key())
            .copied()
            .unwrap_or_default()
    }
}
