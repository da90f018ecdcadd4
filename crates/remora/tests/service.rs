//! End-to-end: resolve a working link, stream a range, hit the cache on
//! the repeat read.

use async_trait::async_trait;
use bytes::Bytes;
use remora::{
    ByteRange, ByteSink, ConfigError, ContentRecord, ContentStore, FileIdentity, Provider,
    ProviderClient, Remora, RemoraConfig, RemoraResult, RemoteFile, ResolvedLink, SinkError,
    StreamConfig, StreamOutcome,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

struct RangeResponder {
    body: Vec<u8>,
}

impl Respond for RangeResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let Some((start, end)) = request
            .headers
            .get("range")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("bytes="))
            .and_then(|v| v.split_once('-'))
            .and_then(|(a, b)| Some((a.parse::<usize>().ok()?, b.parse::<usize>().ok()?)))
        else {
            return ResponseTemplate::new(200).set_body_bytes(self.body.clone());
        };
        if start >= self.body.len() {
            return ResponseTemplate::new(416);
        }
        let end = end.min(self.body.len() - 1);
        ResponseTemplate::new(206).set_body_bytes(self.body[start..=end].to_vec())
    }
}

struct OneFileClient {
    url: String,
}

#[async_trait]
impl ProviderClient for OneFileClient {
    fn provider(&self) -> Provider {
        Provider::RealDebrid
    }

    async fn is_available(&self, _key: &str) -> RemoraResult<bool> {
        Ok(true)
    }

    async fn list_files(&self, _key: &str) -> RemoraResult<Vec<RemoteFile>> {
        Ok(vec![RemoteFile::new(
            "release/movie.mkv",
            500,
            HashMap::new(),
        )])
    }

    async fn fresh_url(
        &self,
        _key: &str,
        params: &HashMap<String, String>,
    ) -> RemoraResult<ResolvedLink> {
        Ok(ResolvedLink::new(
            self.url.clone(),
            Some(500),
            Some("video/x-matroska".to_string()),
            params.clone(),
        ))
    }

    async fn probe_alive(&self, _url: &str) -> RemoraResult<bool> {
        Ok(true)
    }
}

#[derive(Default)]
struct MemoryStore {
    records: Mutex<HashMap<FileIdentity, ContentRecord>>,
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn load_content_record(&self, file: &FileIdentity) -> RemoraResult<ContentRecord> {
        self.records
            .lock()
            .unwrap()
            .get(file)
            .cloned()
            .ok_or_else(|| ConfigError::new(format!("no record for {file}")).into())
    }

    async fn save_content_record(
        &self,
        file: &FileIdentity,
        record: &ContentRecord,
    ) -> RemoraResult<()> {
        self.records
            .lock()
            .unwrap()
            .insert(file.clone(), record.clone());
        Ok(())
    }
}

struct VecSink(Vec<Bytes>);

#[async_trait]
impl ByteSink for VecSink {
    async fn send(&mut self, block: Bytes) -> Result<(), SinkError> {
        self.0.push(block);
        Ok(())
    }
}

#[tokio::test]
async fn resolve_then_stream_then_repeat_from_cache() {
    let body: Vec<u8> = (0..500usize).map(|i| (i % 241) as u8).collect();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(RangeResponder { body: body.clone() })
        .mount(&server)
        .await;

    let config = RemoraConfig {
        provider_order: vec![Provider::RealDebrid],
        stream: StreamConfig {
            block_size_bytes: 64,
            ..StreamConfig::default()
        },
        ..RemoraConfig::default()
    };

    let cache_dir = tempfile::tempdir().expect("tempdir");
    let remora = Remora::builder()
        .config(config)
        .clients(vec![
            Arc::new(OneFileClient { url: server.uri() }) as Arc<dyn ProviderClient>
        ])
        .store(Arc::new(MemoryStore::default()))
        .cache_root(cache_dir.path())
        .build()
        .await
        .expect("build service");

    let file = FileIdentity::new("movie-1");
    let mut record = ContentRecord::builder()
        .original_path("release/movie.mkv")
        .size_bytes(500u64)
        .content_key("abc123")
        .providers(&[Provider::RealDebrid])
        .build();

    let status = remora
        .resolve_working_link(&file, &mut record)
        .await
        .expect("resolve");
    let link = status.working_link().expect("working link").clone();
    assert_eq!(link.url(), &server.uri());

    // The record survived the round trip through the store.
    let reloaded = remora.load_record(&file).await.expect("load record");
    assert!(
        reloaded
            .status_for(Provider::RealDebrid)
            .expect("status")
            .is_working()
    );

    let range = ByteRange::new(100, 299);
    let mut sink = VecSink(Vec::new());
    let outcome = remora
        .stream_range(Provider::RealDebrid, &link, &file, range, &mut sink)
        .await;
    assert_eq!(outcome, StreamOutcome::Ok);
    let delivered: Vec<u8> = sink.0.iter().flat_map(|b| b.iter().copied()).collect();
    assert_eq!(delivered, body[100..=299].to_vec());

    // The segment qualified for caching; the repeat read stays local.
    let before = server.received_requests().await.expect("requests").len();
    let mut sink = VecSink(Vec::new());
    let outcome = remora
        .stream_range(Provider::RealDebrid, &link, &file, range, &mut sink)
        .await;
    assert_eq!(outcome, StreamOutcome::Ok);
    let delivered: Vec<u8> = sink.0.iter().flat_map(|b| b.iter().copied()).collect();
    assert_eq!(delivered, body[100..=299].to_vec());
    let after = server.received_requests().await.expect("requests").len();
    assert_eq!(before, after);

    // Dropping the file's chunks forgets the cached range.
    let removed = remora.drop_file_chunks(&file).await.expect("drop");
    assert_eq!(removed, 1);
}
