//! Chunk cache for previously fetched byte ranges.
//!
//! Chunks are stored as flat blobs under a per-file directory named by a
//! hash of the file identity, with the inclusive byte range in the file
//! name. The in-memory index tracks `last_accessed_at` for retention
//! sweeping and is rebuilt from the directory layout at startup.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod store;

pub use store::{ChunkStore, ChunkWriteGuard};
