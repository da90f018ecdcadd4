//! The assembled Remora service.

use remora_cache::ChunkStore;
use remora_core::{ByteRange, ContentRecord, FileIdentity, LinkStatus, Provider, WorkingLink};
use remora_error::{ConfigError, RemoraResult};
use remora_interface::{ByteSink, ContentStore, ProviderClient};
use remora_rate_limit::RemoraConfig;
use remora_resolver::{LinkResolver, ProviderRegistry};
use remora_stream::StreamPipeline;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};

/// Everything a protocol-server collaborator needs: link resolution, range
/// streaming, and cache maintenance, wired to one configuration.
///
/// The service is cheap to share behind an [`Arc`]; every operation takes
/// `&self`.
pub struct Remora {
    resolver: LinkResolver,
    pipeline: StreamPipeline,
    chunks: Arc<ChunkStore>,
    store: Arc<dyn ContentStore>,
    sweeper: tokio::task::JoinHandle<()>,
}

impl Remora {
    /// Start building a service.
    pub fn builder() -> RemoraBuilder {
        RemoraBuilder::default()
    }

    /// Resolve a working link for `record`, mutating and persisting its
    /// status slots.
    ///
    /// # Errors
    ///
    /// Returns an error if no provider is registered or persistence fails;
    /// per-provider failures surface as the returned [`LinkStatus`] instead.
    pub async fn resolve_working_link(
        &self,
        file: &FileIdentity,
        record: &mut ContentRecord,
    ) -> RemoraResult<LinkStatus> {
        self.resolver.resolve(file, record).await
    }

    /// Load the persisted record for a logical file.
    ///
    /// # Errors
    ///
    /// Returns the content store's error when the record cannot be loaded.
    pub async fn load_record(&self, file: &FileIdentity) -> RemoraResult<ContentRecord> {
        self.store.load_content_record(file).await
    }

    /// Stream `range` of `file` to `sink` using a resolved link.
    ///
    /// `provider` names the provider the link came from so the transfer is
    /// admitted through the right gates. A
    /// [`DeadLink`](remora_stream::StreamOutcome::DeadLink) outcome means
    /// the caller should re-resolve and try again.
    pub async fn stream_range(
        &self,
        provider: Provider,
        link: &WorkingLink,
        file: &FileIdentity,
        range: ByteRange,
        sink: &mut dyn ByteSink,
    ) -> remora_stream::StreamOutcome {
        self.pipeline
            .stream_range(provider, link, file, range, sink)
            .await
    }

    /// Delete every cached chunk. Operational action.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache root cannot be cleared.
    #[instrument(skip(self))]
    pub async fn purge_cache(&self) -> RemoraResult<usize> {
        self.chunks.purge().await
    }

    /// Delete the cached chunks of one file, for when the collaborator
    /// unlinks it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file's chunk directory cannot be removed.
    pub async fn drop_file_chunks(&self, file: &FileIdentity) -> RemoraResult<usize> {
        self.chunks.drop_file_chunks(file).await
    }

    /// The chunk store, for collaborators that plan their own reads.
    pub fn chunks(&self) -> &Arc<ChunkStore> {
        &self.chunks
    }
}

impl Drop for Remora {
    fn drop(&mut self) {
        self.sweeper.abort();
    }
}

/// Builder assembling a [`Remora`] service.
#[derive(Default)]
pub struct RemoraBuilder {
    config: Option<RemoraConfig>,
    clients: Vec<Arc<dyn ProviderClient>>,
    store: Option<Arc<dyn ContentStore>>,
    cache_root: Option<PathBuf>,
}

impl RemoraBuilder {
    /// Use this configuration instead of [`RemoraConfig::load`].
    pub fn config(mut self, config: RemoraConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// The provider clients to register; order comes from the
    /// configuration, not from this list.
    pub fn clients(mut self, clients: Vec<Arc<dyn ProviderClient>>) -> Self {
        self.clients = clients;
        self
    }

    /// The persistence collaborator owning content records.
    pub fn store(mut self, store: Arc<dyn ContentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Directory for the on-disk chunk cache.
    pub fn cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = Some(root.into());
        self
    }

    /// Open the chunk store, wire the resolver and pipeline, and start the
    /// retention sweeper.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading fails, no cache root or
    /// content store was given, or the chunk store cannot be opened.
    pub async fn build(self) -> RemoraResult<Remora> {
        let config = match self.config {
            Some(config) => config,
            None => RemoraConfig::load()?,
        };
        let store = self
            .store
            .ok_or_else(|| ConfigError::new("a content store is required"))?;
        let cache_root = self
            .cache_root
            .ok_or_else(|| ConfigError::new("a cache root directory is required"))?;

        let registry = Arc::new(ProviderRegistry::new(&config, self.clients));
        let chunks = Arc::new(ChunkStore::open(cache_root, config.cache).await?);
        let sweeper = chunks.spawn_sweeper();

        let resolver = LinkResolver::new(registry.clone(), store.clone(), &config);
        let pipeline = StreamPipeline::new(
            reqwest::Client::new(),
            chunks.clone(),
            registry.clone(),
            &config,
        );

        info!(
            providers = registry.len(),
            "Remora service assembled"
        );

        Ok(Remora {
            resolver,
            pipeline,
            chunks,
            store,
            sweeper,
        })
    }
}
