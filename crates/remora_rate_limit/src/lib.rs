//! Admission control for provider calls.
//!
//! Every provider call in Remora passes two per-key gates:
//! - [`RateGate`] enforces a sliding-window call budget, suspending the
//!   caller until the oldest admission leaves the window.
//! - [`FaultGate`] is a cooldown-based circuit breaker; a failing provider
//!   is left alone until its cooldown expires.
//!
//! Gate state is in-memory and process-lifetime: it is an optimization
//! against hammering providers, not a correctness requirement, and is lost
//! on restart.
//!
//! The crate also owns [`RemoraConfig`], the layered TOML configuration for
//! provider limits, staleness windows, the chunk cache, and the stream
//! pipeline.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod fault;
mod gate;

pub use config::{
    CacheConfig, ProviderLimitConfig, RemoraConfig, ResolverConfig, StalenessConfig, StreamConfig,
};
pub use fault::FaultGate;
pub use gate::RateGate;
