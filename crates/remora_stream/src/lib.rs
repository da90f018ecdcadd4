//! The Remora streaming pipeline.
//!
//! Serves partial-content byte ranges by combining already-cached chunks
//! with ranged reads against a resolved direct-download link. Remote reads
//! flow through a small bounded block queue so network reads and sink
//! writes overlap without unbounded buffering, and remote segments small
//! enough to cache are written to the chunk store while they stream.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod metrics;
mod outcome;
mod pipeline;
mod probe;

pub use metrics::{StreamMetrics, ThroughputSampler, stream_labels, stream_metrics};
pub use outcome::StreamOutcome;
pub use pipeline::StreamPipeline;
pub use probe::probe_url_alive;
