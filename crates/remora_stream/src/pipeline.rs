//! Plan execution: cached copies and bounded-read-ahead remote reads.

use crate::metrics::{ThroughputSampler, stream_labels, stream_metrics};
use crate::outcome::StreamOutcome;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use remora_cache::ChunkStore;
use remora_core::{ByteRange, ChunkSpan, FileIdentity, Provider, SegmentSource, StreamPlan, WorkingLink};
use remora_error::{ProviderError, ProviderErrorKind};
use remora_interface::ByteSink;
use remora_rate_limit::{CacheConfig, RemoraConfig, StreamConfig};
use remora_resolver::ProviderRegistry;
use reqwest::header::RANGE;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Early-exit result while walking plan segments. `Err` carries the
/// terminal outcome, which is `Ok` for a client disconnect.
type SegmentResult = Result<(), StreamOutcome>;

/// Executes stream plans against a resolved link.
///
/// Cached segments are copied out of the [`ChunkStore`]; remote segments
/// are ranged GETs against the link URL, admitted through the provider's
/// rate and fault gates, read through a fixed-capacity block queue so the
/// network read and the sink write overlap. Remote segments at or below
/// the cache threshold are cached as they stream.
pub struct StreamPipeline {
    http: reqwest::Client,
    chunks: Arc<ChunkStore>,
    registry: Arc<ProviderRegistry>,
    stream: StreamConfig,
    cache: CacheConfig,
}

/// Per-stream measurement state, labeled by provider and file identity.
struct StreamGauges {
    started: Instant,
    first_byte_seen: bool,
    labels: Vec<opentelemetry::KeyValue>,
    inbound: ThroughputSampler,
    outbound: ThroughputSampler,
}

impl StreamGauges {
    fn start(config: &StreamConfig, provider: Provider, file: &FileIdentity) -> Self {
        let metrics = stream_metrics();
        let interval = config.throughput_sample_interval();
        let labels = stream_labels(provider, file);
        Self {
            started: Instant::now(),
            first_byte_seen: false,
            inbound: ThroughputSampler::spawn(
                metrics.inbound_bytes.clone(),
                "inbound",
                &labels,
                interval,
            ),
            outbound: ThroughputSampler::spawn(
                metrics.outbound_bytes.clone(),
                "outbound",
                &labels,
                interval,
            ),
            labels,
        }
    }

    fn received(&self, bytes: u64) {
        self.inbound.record(bytes);
    }

    fn delivered(&mut self, bytes: u64) {
        if !self.first_byte_seen {
            self.first_byte_seen = true;
            stream_metrics()
                .ttfb_seconds
                .record(self.started.elapsed().as_secs_f64(), &self.labels);
        }
        self.outbound.record(bytes);
    }
}

impl StreamPipeline {
    /// Wire a pipeline to its chunk store and provider gates.
    pub fn new(
        http: reqwest::Client,
        chunks: Arc<ChunkStore>,
        registry: Arc<ProviderRegistry>,
        config: &RemoraConfig,
    ) -> Self {
        Self {
            http,
            chunks,
            registry,
            stream: config.stream,
            cache: config.cache,
        }
    }

    /// Stream `range` of `file` to `sink`, serving what the chunk store
    /// holds and fetching the rest from `link`.
    ///
    /// Never returns an error: every way the stream can end is a
    /// [`StreamOutcome`], and a client disconnect is [`StreamOutcome::Ok`].
    #[instrument(skip(self, link, sink), fields(file = %file, provider = %provider, range = %range))]
    pub async fn stream_range(
        &self,
        provider: Provider,
        link: &WorkingLink,
        file: &FileIdentity,
        range: ByteRange,
        sink: &mut dyn ByteSink,
    ) -> StreamOutcome {
        let cached = self.chunks.list_chunks(file).await;
        let plan = StreamPlan::generate(&cached, range);
        debug!(
            segments = plan.segments().len(),
            cached_bytes = plan.cached_bytes(),
            remote_bytes = plan.remote_bytes(),
            "Executing stream plan"
        );

        let mut gauges = StreamGauges::start(&self.stream, provider, file);

        for segment in plan.segments() {
            let result = match segment.source() {
                SegmentSource::Cached(chunk) => {
                    self.send_cached(provider, link, file, *segment.range(), *chunk, sink, &mut gauges)
                        .await
                }
                SegmentSource::Remote => {
                    self.send_remote(provider, link, file, *segment.range(), sink, &mut gauges)
                        .await
                }
            };
            if let Err(outcome) = result {
                if outcome.is_ok() {
                    info!("Client disconnected mid-stream");
                }
                return outcome;
            }
        }

        StreamOutcome::Ok
    }

    /// Copy one cached chunk slice to the sink in block-sized pieces.
    ///
    /// A chunk the sweep deleted between planning and reading falls back to
    /// a remote fetch of the same segment.
    #[allow(clippy::too_many_arguments)]
    async fn send_cached(
        &self,
        provider: Provider,
        link: &WorkingLink,
        file: &FileIdentity,
        range: ByteRange,
        chunk: ChunkSpan,
        sink: &mut dyn ByteSink,
        gauges: &mut StreamGauges,
    ) -> SegmentResult {
        let Some(bytes) = self.chunks.cached_chunk(file, chunk.start, chunk.end).await else {
            warn!(%chunk, "Planned chunk vanished, fetching segment remotely");
            return self.send_remote(provider, link, file, range, sink, gauges).await;
        };

        let offset = (range.start() - chunk.start) as usize;
        let slice = bytes.slice(offset..offset + range.len() as usize);

        let mut sent = 0usize;
        while sent < slice.len() {
            let stop = (sent + self.stream.block_size_bytes.max(1)).min(slice.len());
            self.deliver(sink, slice.slice(sent..stop), gauges).await?;
            sent = stop;
        }
        Ok(())
    }

    /// Fetch one segment from the link and stream it to the sink.
    async fn send_remote(
        &self,
        provider: Provider,
        link: &WorkingLink,
        file: &FileIdentity,
        range: ByteRange,
        sink: &mut dyn ByteSink,
        gauges: &mut StreamGauges,
    ) -> SegmentResult {
        let Some(registered) = self.registry.get(provider) else {
            warn!(%provider, "Provider not registered, cannot fetch");
            return Err(StreamOutcome::UnknownFault);
        };
        registered.admit().await;

        let response = self
            .http
            .get(link.url())
            .header(RANGE, range.http_header_value())
            .timeout(self.stream.transfer_timeout(range.len()))
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Ranged GET failed to start");
                classify_transport(&e)
            })?;

        let status = response.status();
        if let Some(outcome) = StreamOutcome::from_status(status) {
            warn!(%status, ?outcome, "Ranged GET refused");
            if outcome == StreamOutcome::ProviderFault {
                registered.note_error(
                    &ProviderError::new(ProviderErrorKind::Server {
                        status: status.as_u16(),
                        message: "ranged read refused".to_string(),
                    })
                    .into(),
                );
            }
            return Err(outcome);
        }

        // A host that ignores the range request answers 200 with the whole
        // file from offset zero. For a mid-file segment those are the wrong
        // bytes, so refuse before anything reaches the sink.
        if status == reqwest::StatusCode::OK && range.start() > 0 {
            warn!(%status, "Host ignored the range request for a mid-file segment");
            return Err(StreamOutcome::UnknownFault);
        }

        // Reader task re-blocks the body into fixed-size blocks behind a
        // fixed-capacity queue; dropping the receiver stops it promptly.
        let (tx, mut rx) = mpsc::channel::<Result<Bytes, reqwest::Error>>(
            self.stream.read_ahead_blocks.max(1),
        );
        let block_size = self.stream.block_size_bytes.max(1);
        let reader = tokio::spawn(async move {
            let mut body = response.bytes_stream();
            let mut buf = BytesMut::with_capacity(block_size);
            while let Some(item) = body.next().await {
                match item {
                    Ok(bytes) => {
                        buf.extend_from_slice(&bytes);
                        while buf.len() >= block_size {
                            let block = buf.split_to(block_size).freeze();
                            if tx.send(Ok(block)).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                }
            }
            if !buf.is_empty() {
                let _ = tx.send(Ok(buf.freeze())).await;
            }
        });

        let qualifies = range.len() <= self.cache.chunk_threshold_bytes;
        let mut accumulated = qualifies.then(|| BytesMut::with_capacity(range.len() as usize));
        let mut received: u64 = 0;

        while received < range.len()
            && let Some(item) = rx.recv().await
        {
            let block = match item {
                Ok(block) => block,
                Err(e) => {
                    warn!(error = %e, "Body read failed mid-segment");
                    return Err(classify_transport(&e));
                }
            };
            // A 200 body from the whole file can overrun the segment; keep
            // only what the range asked for.
            let remaining = (range.len() - received) as usize;
            let block = if block.len() > remaining {
                block.slice(..remaining)
            } else {
                block
            };
            received += block.len() as u64;
            gauges.received(block.len() as u64);
            if let Some(accumulated) = &mut accumulated {
                accumulated.extend_from_slice(&block);
            }
            self.deliver(sink, block, gauges).await?;
        }
        drop(rx);
        reader.abort();

        if received != range.len() {
            warn!(received, expected = range.len(), "Segment body truncated");
            return Err(StreamOutcome::IoFault);
        }

        if let Some(accumulated) = accumulated {
            self.cache_segment(file, range, accumulated.freeze()).await;
        }
        Ok(())
    }

    /// Cache a fully received qualifying segment. Failures are logged, not
    /// surfaced: the client already has its bytes.
    async fn cache_segment(&self, file: &FileIdentity, range: ByteRange, bytes: Bytes) {
        let _guard = self
            .chunks
            .write_guard(file, range.start(), range.end())
            .await;
        if self
            .chunks
            .cached_chunk(file, range.start(), range.end())
            .await
            .is_some()
        {
            return;
        }
        if let Err(e) = self
            .chunks
            .cache_chunk(file, range.start(), range.end(), bytes)
            .await
        {
            warn!(error = %e, "Failed to cache streamed segment");
        }
    }

    async fn deliver(
        &self,
        sink: &mut dyn ByteSink,
        block: Bytes,
        gauges: &mut StreamGauges,
    ) -> SegmentResult {
        let len = block.len() as u64;
        match sink.send(block).await {
            Ok(()) => {
                gauges.delivered(len);
                Ok(())
            }
            Err(e) if e.is_disconnect() => Err(StreamOutcome::Ok),
            Err(e) => {
                warn!(error = %e, "Sink write failed");
                Err(StreamOutcome::IoFault)
            }
        }
    }
}

fn classify_transport(error: &reqwest::Error) -> StreamOutcome {
    if error.is_timeout() || error.is_connect() || error.is_body() || error.is_request() {
        StreamOutcome::IoFault
    } else {
        StreamOutcome::UnknownFault
    }
}
