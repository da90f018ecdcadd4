//! Trait definitions for the Remora remote-range streaming library.
//!
//! The seams here separate the core from its collaborators: provider-client
//! implementations (one per configured backend), the filesystem entity that
//! persists content records, and the protocol server's byte sink.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod traits;
mod types;

pub use traits::{ByteSink, ContentStore, ProviderClient};
pub use types::{RemoteFile, ResolvedLink};
