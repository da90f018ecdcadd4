//! Link resolution for Remora.
//!
//! Tries the configured providers in priority order for each logical file,
//! honoring remembered per-provider statuses and their staleness windows,
//! liveness-probing remembered working links, and persisting each fresh
//! outcome through the external content store. Every provider call is
//! admitted through that provider's rate and fault gates.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod classify;
mod registry;
mod resolver;

pub use classify::classify_fault;
pub use registry::{ProviderRegistry, RegisteredProvider};
pub use resolver::LinkResolver;
