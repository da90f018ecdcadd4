//! Core data types for the Remora remote-range streaming library.
//!
//! This crate provides the foundation data model shared by every Remora
//! interface: providers, byte ranges, per-provider link statuses, content
//! records, and the cached/remote stream plan.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod identity;
mod plan;
mod provider;
mod range;
mod record;
mod status;
mod telemetry;

pub use identity::FileIdentity;
pub use plan::{ChunkSpan, Segment, SegmentSource, StreamPlan};
pub use provider::Provider;
pub use range::ByteRange;
pub use record::{ContentRecord, ContentRecordBuilder, ProviderSlot};
pub use status::{FaultKind, LinkStatus, WorkingLink};
pub use telemetry::{init_telemetry, shutdown_telemetry};
