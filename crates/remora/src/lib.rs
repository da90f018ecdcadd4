//! Remora - working links and cached range streams over content hosts
//!
//! Remora resolves working direct-download URLs for logical files across a
//! prioritized list of content-hosting providers, and serves partial-content
//! byte-range reads by combining an on-disk chunk cache with ranged reads
//! against the resolved link.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use remora::{Remora, RemoraConfig};
//!
//! #[tokio::main]
//! async fn main() -> remora::RemoraResult<()> {
//!     let config = RemoraConfig::load()?;
//!     let remora = Remora::builder()
//!         .config(config)
//!         .clients(my_provider_clients())
//!         .store(my_content_store())
//!         .cache_root("/var/cache/remora")
//!         .build()
//!         .await?;
//!
//!     let mut record = remora.load_record(&file).await?;
//!     let status = remora.resolve_working_link(&file, &mut record).await?;
//!     // hand status.working_link() plus a ByteSink to stream_range
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! Remora is organized as a workspace with focused crates:
//!
//! - `remora_core` - data model (ranges, statuses, records, stream plans)
//! - `remora_interface` - provider client, content store, and sink traits
//! - `remora_error` - error types
//! - `remora_rate_limit` - sliding-window rate gates, fault cooldowns, config
//! - `remora_cache` - on-disk chunk cache
//! - `remora_resolver` - provider-ordered link resolution
//! - `remora_stream` - the partial-content streaming pipeline
//!
//! This crate (`remora`) re-exports everything and adds the [`Remora`]
//! service wiring the pieces together.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod service;

pub use service::{Remora, RemoraBuilder};

pub use remora_cache::{ChunkStore, ChunkWriteGuard};
pub use remora_core::{
    ByteRange, ChunkSpan, ContentRecord, ContentRecordBuilder, FaultKind, FileIdentity,
    LinkStatus, Provider, ProviderSlot, Segment, SegmentSource, StreamPlan, WorkingLink,
    init_telemetry, shutdown_telemetry,
};
pub use remora_error::{
    CacheError, CacheErrorKind, ConfigError, HttpError, ProviderError, ProviderErrorKind,
    RemoraError, RemoraErrorKind, RemoraResult, SinkError, SinkErrorKind,
};
pub use remora_interface::{ByteSink, ContentStore, ProviderClient, RemoteFile, ResolvedLink};
pub use remora_rate_limit::{
    CacheConfig, FaultGate, ProviderLimitConfig, RateGate, RemoraConfig, ResolverConfig,
    StalenessConfig, StreamConfig,
};
pub use remora_resolver::{LinkResolver, ProviderRegistry, RegisteredProvider, classify_fault};
pub use remora_stream::{StreamOutcome, StreamPipeline, probe_url_alive};
