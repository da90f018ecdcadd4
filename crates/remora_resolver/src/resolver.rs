//! Provider-ordered resolution of working download links.

use crate::{ProviderRegistry, RegisteredProvider, classify_fault};
use chrono::Utc;
use remora_core::{ContentRecord, FaultKind, FileIdentity, LinkStatus, WorkingLink};
use remora_error::{ConfigError, RemoraErrorKind, RemoraResult};
use remora_interface::{ContentStore, RemoteFile, ResolvedLink};
use remora_rate_limit::{RemoraConfig, ResolverConfig, StalenessConfig};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_retry2::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, info, instrument, warn};

/// Resolves a working direct-download link for a logical file.
///
/// Providers are tried in the registry's priority order, one attempt each,
/// stopping at the first working link. Remembered statuses gate the work: a
/// working link is liveness-probed before reuse, and a non-working status
/// younger than its fault kind's staleness window suppresses re-querying
/// that provider entirely.
///
/// Concurrent resolutions of the same record race on persistence; the
/// content store is last-write-wins and both sides tolerate the lost
/// update.
pub struct LinkResolver {
    registry: Arc<ProviderRegistry>,
    store: Arc<dyn ContentStore>,
    staleness: StalenessConfig,
    retry: ResolverConfig,
}

impl LinkResolver {
    /// Wire a resolver to its registry and persistence collaborator.
    pub fn new(
        registry: Arc<ProviderRegistry>,
        store: Arc<dyn ContentStore>,
        config: &RemoraConfig,
    ) -> Self {
        Self {
            registry,
            store,
            staleness: config.staleness,
            retry: config.resolver,
        }
    }

    /// Resolve a working link for `record`, mutating its status slots.
    ///
    /// Returns the first working status found, or the last observed
    /// non-working status once every provider is exhausted. The whole pass
    /// is retried a bounded number of times when the outcome is transient
    /// (a network or provider-side fault, or an unexpected error).
    ///
    /// # Errors
    ///
    /// Returns an error if no provider is registered or persistence fails.
    #[instrument(skip(self, record), fields(file = %file, key = %record.content_key()))]
    pub async fn resolve(
        &self,
        file: &FileIdentity,
        record: &mut ContentRecord,
    ) -> RemoraResult<LinkStatus> {
        record.align_slots(&self.registry.order());

        let mut backoff = ExponentialBackoff::from_millis(2)
            .factor(self.retry.retry_base_delay_millis)
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.retry.max_retries);

        loop {
            let outcome = self.resolve_once(file, record).await;
            let transient = match &outcome {
                Ok(status) => matches!(
                    status.fault_kind(),
                    Some(FaultKind::Network | FaultKind::Provider)
                ),
                Err(e) => !matches!(e.kind(), RemoraErrorKind::Config(_)),
            };
            if transient && let Some(delay) = backoff.next() {
                debug!(delay = ?delay, "Resolution outcome transient, retrying");
                tokio::time::sleep(delay).await;
                continue;
            }
            return outcome;
        }
    }

    /// One pass over the providers in priority order.
    async fn resolve_once(
        &self,
        file: &FileIdentity,
        record: &mut ContentRecord,
    ) -> RemoraResult<LinkStatus> {
        if self.registry.is_empty() {
            return Err(ConfigError::new("no providers registered").into());
        }

        let mut last: Option<LinkStatus> = None;

        for registered in self.registry.providers() {
            let provider = registered.provider();
            let existing = record.status_for(provider).cloned();
            let mut hint = HashMap::new();

            match existing {
                Some(LinkStatus::Working(mut link)) => {
                    registered.admit().await;
                    match registered.client().probe_alive(link.url()).await {
                        Ok(true) => {
                            link.touch();
                            let status = LinkStatus::Working(link);
                            record.set_status(provider, status.clone());
                            self.store.save_content_record(file, record).await?;
                            info!(provider = %provider, "Remembered link still alive");
                            return Ok(status);
                        }
                        Ok(false) => {
                            debug!(provider = %provider, "Remembered link dead, refreshing");
                            hint = link.provider_params().clone();
                        }
                        Err(e) => {
                            registered.note_error(&e);
                            warn!(provider = %provider, error = %e, "Liveness probe failed, refreshing");
                            hint = link.provider_params().clone();
                        }
                    }
                }
                Some(status) => {
                    if let Some(kind) = status.fault_kind()
                        && !self.past_staleness(&status, kind)
                    {
                        debug!(provider = %provider, fault = %kind, "Fault still fresh, skipping provider");
                        last = Some(status);
                        continue;
                    }
                }
                None => {}
            }

            let status = match self.refresh(registered, record, &hint).await {
                Ok(status) => status,
                Err(e) => {
                    registered.note_error(&e);
                    let kind = classify_fault(&e);
                    warn!(provider = %provider, error = %e, fault = %kind, "Provider refresh failed");
                    LinkStatus::from_fault(kind)
                }
            };

            // Network outcomes are transport noise, not provider truth.
            if status.fault_kind() != Some(FaultKind::Network) {
                record.set_status(provider, status.clone());
                self.store.save_content_record(file, record).await?;
            }

            if status.is_working() {
                info!(provider = %provider, "Resolved working link");
                return Ok(status);
            }
            last = Some(status);
        }

        last.ok_or_else(|| ConfigError::new("no providers registered").into())
    }

    /// Ask one provider for a fresh link, hinted params first.
    async fn refresh(
        &self,
        registered: &RegisteredProvider,
        record: &ContentRecord,
        hint: &HashMap<String, String>,
    ) -> RemoraResult<LinkStatus> {
        let content_key = record.content_key();

        if !hint.is_empty() {
            registered.admit().await;
            match registered.client().fresh_url(content_key, hint).await {
                Ok(link) => return Ok(working(link)),
                Err(e) => {
                    registered.note_error(&e);
                    debug!(error = %e, "Hinted refresh failed, falling back to full lookup");
                }
            }
        }

        registered.admit().await;
        if !registered.client().is_available(content_key).await? {
            return Ok(LinkStatus::from_fault(FaultKind::Missing));
        }

        registered.admit().await;
        let files = registered.client().list_files(content_key).await?;
        let Some(target) = match_remote_file(record, &files) else {
            debug!(listed = files.len(), "No listed file matches the record");
            return Ok(LinkStatus::from_fault(FaultKind::Missing));
        };

        registered.admit().await;
        let link = registered
            .client()
            .fresh_url(content_key, target.params())
            .await?;
        Ok(working(link))
    }

    fn past_staleness(&self, status: &LinkStatus, kind: FaultKind) -> bool {
        let wait = chrono::Duration::from_std(self.staleness.wait_for(kind))
            .unwrap_or(chrono::Duration::MAX);
        Utc::now().signed_duration_since(status.checked_at()) >= wait
    }
}

fn working(link: ResolvedLink) -> LinkStatus {
    LinkStatus::Working(WorkingLink::new(
        link.url().clone(),
        *link.size_bytes(),
        link.mime_type().clone(),
        link.params().clone(),
    ))
}

/// Pick the listed file the record describes.
///
/// Tiers: exact trailing-path-segment match, then exact size match, then
/// name containment in either direction. Within a tier the first match in
/// listing order wins.
fn match_remote_file<'a>(record: &ContentRecord, files: &'a [RemoteFile]) -> Option<&'a RemoteFile> {
    let name = record.file_name();

    files
        .iter()
        .find(|f| f.file_name() == name)
        .or_else(|| files.iter().find(|f| f.size_bytes() == record.size_bytes()))
        .or_else(|| {
            files.iter().find(|f| {
                let other = f.file_name();
                other.contains(name) || name.contains(other)
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use remora_core::Provider;
    use remora_error::{ProviderError, ProviderErrorKind};
    use remora_interface::ProviderClient;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Calls {
        is_available: AtomicUsize,
        list_files: AtomicUsize,
        fresh_url: AtomicUsize,
        probe_alive: AtomicUsize,
    }

    /// Provider double driven by fixed responses.
    struct ScriptedProvider {
        provider: Provider,
        fail: Option<ProviderErrorKind>,
        available: bool,
        files: Vec<RemoteFile>,
        url: String,
        probe_alive: bool,
        calls: Calls,
    }

    impl ScriptedProvider {
        fn working(provider: Provider, url: &str, files: Vec<RemoteFile>) -> Arc<Self> {
            Arc::new(Self {
                provider,
                fail: None,
                available: true,
                files,
                url: url.to_string(),
                probe_alive: true,
                calls: Calls::default(),
            })
        }

        fn missing(provider: Provider) -> Arc<Self> {
            Arc::new(Self {
                provider,
                fail: None,
                available: false,
                files: Vec::new(),
                url: String::new(),
                probe_alive: false,
                calls: Calls::default(),
            })
        }

        fn failing(provider: Provider, kind: ProviderErrorKind) -> Arc<Self> {
            Arc::new(Self {
                provider,
                fail: Some(kind),
                available: false,
                files: Vec::new(),
                url: String::new(),
                probe_alive: false,
                calls: Calls::default(),
            })
        }

        fn erred(&self) -> RemoraResult<()> {
            match &self.fail {
                Some(kind) => Err(ProviderError::new(kind.clone()).into()),
                None => Ok(()),
            }
        }

        fn total_calls(&self) -> usize {
            self.calls.is_available.load(Ordering::SeqCst)
                + self.calls.list_files.load(Ordering::SeqCst)
                + self.calls.fresh_url.load(Ordering::SeqCst)
                + self.calls.probe_alive.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProviderClient for ScriptedProvider {
        fn provider(&self) -> Provider {
            self.provider
        }

        async fn is_available(&self, _content_key: &str) -> RemoraResult<bool> {
            self.calls.is_available.fetch_add(1, Ordering::SeqCst);
            self.erred()?;
            Ok(self.available)
        }

        async fn list_files(&self, _content_key: &str) -> RemoraResult<Vec<RemoteFile>> {
            self.calls.list_files.fetch_add(1, Ordering::SeqCst);
            self.erred()?;
            Ok(self.files.clone())
        }

        async fn fresh_url(
            &self,
            _content_key: &str,
            params: &HashMap<String, String>,
        ) -> RemoraResult<ResolvedLink> {
            self.calls.fresh_url.fetch_add(1, Ordering::SeqCst);
            self.erred()?;
            Ok(ResolvedLink::new(
                self.url.clone(),
                Some(1000),
                None,
                params.clone(),
            ))
        }

        async fn probe_alive(&self, _url: &str) -> RemoraResult<bool> {
            self.calls.probe_alive.fetch_add(1, Ordering::SeqCst);
            self.erred()?;
            Ok(self.probe_alive)
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        saved: StdMutex<Vec<ContentRecord>>,
    }

    impl MemoryStore {
        fn save_count(&self) -> usize {
            self.saved.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ContentStore for MemoryStore {
        async fn load_content_record(&self, _file: &FileIdentity) -> RemoraResult<ContentRecord> {
            let saved = self.saved.lock().unwrap();
            saved
                .last()
                .cloned()
                .ok_or_else(|| ConfigError::new("no record saved").into())
        }

        async fn save_content_record(
            &self,
            _file: &FileIdentity,
            record: &ContentRecord,
        ) -> RemoraResult<()> {
            self.saved.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn record() -> ContentRecord {
        ContentRecord::builder()
            .original_path("pack/episode.mkv")
            .size_bytes(1000u64)
            .content_key("cafe-babe")
            .providers(&[Provider::RealDebrid, Provider::AllDebrid])
            .build()
    }

    fn listing() -> Vec<RemoteFile> {
        vec![RemoteFile::new("pack/episode.mkv", 1000, HashMap::new())]
    }

    fn resolver(clients: Vec<Arc<ScriptedProvider>>, store: Arc<MemoryStore>) -> LinkResolver {
        let clients = clients
            .into_iter()
            .map(|c| c as Arc<dyn ProviderClient>)
            .collect();
        let config = RemoraConfig {
            provider_order: vec![Provider::RealDebrid, Provider::AllDebrid],
            ..RemoraConfig::default()
        };
        let registry = Arc::new(ProviderRegistry::new(&config, clients));
        LinkResolver::new(registry, store, &config)
    }

    #[tokio::test]
    async fn alive_remembered_link_short_circuits() {
        let a = ScriptedProvider::working(Provider::RealDebrid, "https://a/fresh", listing());
        let store = Arc::new(MemoryStore::default());
        let resolver = resolver(vec![a.clone()], store.clone());

        let mut record = record();
        record.set_status(
            Provider::RealDebrid,
            LinkStatus::Working(WorkingLink::new(
                "https://a/remembered",
                Some(1000),
                None,
                HashMap::new(),
            )),
        );

        let file = FileIdentity::new("f");
        let status = resolver.resolve(&file, &mut record).await.expect("resolve");

        assert_eq!(
            status.working_link().expect("working").url(),
            "https://a/remembered"
        );
        assert_eq!(a.calls.probe_alive.load(Ordering::SeqCst), 1);
        assert_eq!(a.calls.fresh_url.load(Ordering::SeqCst), 0);
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn fresh_fault_skips_provider_entirely() {
        let a = ScriptedProvider::missing(Provider::RealDebrid);
        let b = ScriptedProvider::working(Provider::AllDebrid, "https://b/fresh", listing());
        let store = Arc::new(MemoryStore::default());
        let resolver = resolver(vec![a.clone(), b.clone()], store.clone());

        let mut record = record();
        record.set_status(
            Provider::RealDebrid,
            LinkStatus::Missing {
                checked_at: Utc::now(),
            },
        );

        let file = FileIdentity::new("f");
        let status = resolver.resolve(&file, &mut record).await.expect("resolve");

        assert_eq!(status.working_link().expect("working").url(), "https://b/fresh");
        assert_eq!(a.total_calls(), 0, "fresh fault must suppress provider A");
    }

    #[tokio::test]
    async fn stale_fault_is_requeried() {
        let a = ScriptedProvider::working(Provider::RealDebrid, "https://a/fresh", listing());
        let store = Arc::new(MemoryStore::default());
        let resolver = resolver(vec![a.clone()], store.clone());

        let mut record = record();
        record.set_status(
            Provider::RealDebrid,
            LinkStatus::Missing {
                checked_at: Utc::now() - chrono::Duration::hours(2),
            },
        );

        let file = FileIdentity::new("f");
        let status = resolver.resolve(&file, &mut record).await.expect("resolve");

        assert!(status.is_working());
        assert_eq!(a.calls.is_available.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn network_fault_is_never_persisted() {
        let a = ScriptedProvider::failing(
            Provider::RealDebrid,
            ProviderErrorKind::Network("connect refused".into()),
        );
        let store = Arc::new(MemoryStore::default());
        let resolver = resolver(vec![a.clone()], store.clone());

        let mut record = record();
        let file = FileIdentity::new("f");
        let status = resolver.resolve(&file, &mut record).await.expect("resolve");

        assert_eq!(status.fault_kind(), Some(FaultKind::Network));
        assert_eq!(store.save_count(), 0);
        assert!(record.status_for(Provider::RealDebrid).is_none());
        // Transient outcome retries the whole pass up to the bound.
        assert_eq!(a.calls.is_available.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn first_working_provider_stops_the_pass() {
        let a = ScriptedProvider::working(Provider::RealDebrid, "https://a/fresh", listing());
        let b = ScriptedProvider::working(Provider::AllDebrid, "https://b/fresh", listing());
        let store = Arc::new(MemoryStore::default());
        let resolver = resolver(vec![a.clone(), b.clone()], store.clone());

        let mut record = record();
        let file = FileIdentity::new("f");
        let status = resolver.resolve(&file, &mut record).await.expect("resolve");

        assert_eq!(status.working_link().expect("working").url(), "https://a/fresh");
        assert_eq!(b.total_calls(), 0);
        assert_eq!(store.save_count(), 1);
        assert!(
            record
                .status_for(Provider::RealDebrid)
                .expect("status")
                .is_working()
        );
    }

    #[tokio::test]
    async fn exhausted_pass_returns_last_fault_and_persists_each_contact() {
        let a = ScriptedProvider::missing(Provider::RealDebrid);
        let b = ScriptedProvider::missing(Provider::AllDebrid);
        let store = Arc::new(MemoryStore::default());
        let resolver = resolver(vec![a, b], store.clone());

        let mut record = record();
        let file = FileIdentity::new("f");
        let status = resolver.resolve(&file, &mut record).await.expect("resolve");

        assert_eq!(status.fault_kind(), Some(FaultKind::Missing));
        assert_eq!(store.save_count(), 2);
        assert!(record.status_for(Provider::RealDebrid).is_some());
        assert!(record.status_for(Provider::AllDebrid).is_some());
    }

    #[tokio::test]
    async fn dead_link_refreshes_with_param_hint() {
        let a = ScriptedProvider::working(Provider::RealDebrid, "https://a/fresh", listing());
        let a = Arc::new(ScriptedProvider {
            probe_alive: false,
            ..Arc::try_unwrap(a).ok().expect("sole owner")
        });
        let store = Arc::new(MemoryStore::default());
        let resolver = resolver(vec![a.clone()], store.clone());

        let mut record = record();
        let mut params = HashMap::new();
        params.insert("link_id".to_string(), "7".to_string());
        record.set_status(
            Provider::RealDebrid,
            LinkStatus::Working(WorkingLink::new(
                "https://a/stale",
                Some(1000),
                None,
                params,
            )),
        );

        let file = FileIdentity::new("f");
        let status = resolver.resolve(&file, &mut record).await.expect("resolve");

        let link = status.working_link().expect("working");
        assert_eq!(link.url(), "https://a/fresh");
        assert_eq!(link.provider_params().get("link_id").map(String::as_str), Some("7"));
        // The hint skipped the full lookup.
        assert_eq!(a.calls.fresh_url.load(Ordering::SeqCst), 1);
        assert_eq!(a.calls.is_available.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn matching_prefers_trailing_segment_then_size_then_substring() {
        let record = record();

        let by_name = vec![
            RemoteFile::new("other/file.bin", 1000, HashMap::new()),
            RemoteFile::new("nested/dir/episode.mkv", 500, HashMap::new()),
        ];
        assert_eq!(
            match_remote_file(&record, &by_name).expect("match").path(),
            "nested/dir/episode.mkv"
        );

        let by_size = vec![
            RemoteFile::new("a.bin", 999, HashMap::new()),
            RemoteFile::new("b.bin", 1000, HashMap::new()),
        ];
        assert_eq!(match_remote_file(&record, &by_size).expect("match").path(), "b.bin");

        let by_substring = vec![
            RemoteFile::new("unrelated.bin", 1, HashMap::new()),
            RemoteFile::new("episode.mkv.part1", 2, HashMap::new()),
        ];
        assert_eq!(
            match_remote_file(&record, &by_substring).expect("match").path(),
            "episode.mkv.part1"
        );

        let nothing = vec![RemoteFile::new("unrelated.bin", 1, HashMap::new())];
        assert!(match_remote_file(&record, &nothing).is_none());
    }
}
