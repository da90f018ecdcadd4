//! Content-addressed chunk store implementation.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use remora_core::{ChunkSpan, FileIdentity};
use remora_error::{CacheError, CacheErrorKind, RemoraResult};
use remora_rate_limit::CacheConfig;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, warn};

/// Chunk-write lock tables above this size are swept of released entries.
/// Chunk-key cardinality is unbounded, unlike provider keys.
const LOCK_TABLE_SOFT_CAP: usize = 4096;

/// Internal exact chunk key: hashed file token plus inclusive range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ChunkKey {
    file_token: String,
    start: u64,
    end: u64,
}

#[derive(Debug, Clone)]
struct ChunkEntry {
    path: PathBuf,
    last_accessed_at: DateTime<Utc>,
}

/// Exclusive guard for one fetch-and-cache of an exact chunk key.
///
/// Holding the guard gives at-most-one concurrent writer per key. Readers
/// of an already cached chunk never take it.
pub struct ChunkWriteGuard {
    _guard: OwnedMutexGuard<()>,
}

/// Filesystem-backed cache of previously fetched byte ranges.
///
/// Blob layout: `{root}/{sha256(file)[..16]}/{start}-{end}`. Writes are
/// atomic (temp file + rename); exact duplicate writes are idempotent
/// overwrites.
///
/// # Examples
///
/// ```no_run
/// use remora_cache::ChunkStore;
/// use remora_core::FileIdentity;
/// use remora_rate_limit::CacheConfig;
///
/// # async fn demo() -> remora_error::RemoraResult<()> {
/// let store = ChunkStore::open("/var/remora/chunks", CacheConfig::default()).await?;
/// let file = FileIdentity::new("file-1");
/// store.cache_chunk(&file, 0, 3, bytes::Bytes::from_static(b"abcd")).await?;
/// assert!(store.cached_chunk(&file, 0, 3).await.is_some());
/// # Ok(())
/// # }
/// ```
pub struct ChunkStore {
    root: PathBuf,
    config: CacheConfig,
    index: RwLock<HashMap<ChunkKey, ChunkEntry>>,
    write_locks: StdMutex<HashMap<ChunkKey, Arc<Mutex<()>>>>,
}

impl ChunkStore {
    /// Open a chunk store rooted at `root`, rebuilding the index from any
    /// blobs already on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be created or scanned.
    #[tracing::instrument(skip(root, config))]
    pub async fn open(root: impl Into<PathBuf>, config: CacheConfig) -> RemoraResult<Self> {
        let root = root.into();

        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            CacheError::new(CacheErrorKind::DirectoryCreation(format!(
                "{}: {}",
                root.display(),
                e
            )))
        })?;

        let store = Self {
            root,
            config,
            index: RwLock::new(HashMap::new()),
            write_locks: StdMutex::new(HashMap::new()),
        };
        let restored = store.rebuild_index().await?;
        info!(path = %store.root.display(), restored, "Opened chunk store");
        Ok(store)
    }

    /// Cache the bytes of an exact range.
    ///
    /// Callers gate on the configured size threshold before invoking this.
    /// Writing the same exact range again overwrites the blob in place.
    ///
    /// # Errors
    ///
    /// Returns an error if `bytes` does not match the declared range length
    /// or the blob cannot be written.
    #[tracing::instrument(skip(self, bytes), fields(file = %file, start, end, len = bytes.len()))]
    pub async fn cache_chunk(
        &self,
        file: &FileIdentity,
        start: u64,
        end: u64,
        bytes: Bytes,
    ) -> RemoraResult<()> {
        let expected = end - start + 1;
        if bytes.len() as u64 != expected {
            return Err(CacheError::new(CacheErrorKind::LengthMismatch(format!(
                "range [{start}, {end}] wants {expected} bytes, got {}",
                bytes.len()
            )))
            .into());
        }

        let key = self.key(file, start, end);
        let dir = self.root.join(&key.file_token);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            CacheError::new(CacheErrorKind::DirectoryCreation(format!(
                "{}: {}",
                dir.display(),
                e
            )))
        })?;

        // Write to temp file first, then rename for atomicity
        let path = dir.join(format!("{start}-{end}"));
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, &bytes).await.map_err(|e| {
            CacheError::new(CacheErrorKind::ChunkWrite(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;
        tokio::fs::rename(&temp_path, &path).await.map_err(|e| {
            CacheError::new(CacheErrorKind::ChunkWrite(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
        })?;

        self.index.write().await.insert(
            key,
            ChunkEntry {
                path: path.clone(),
                last_accessed_at: Utc::now(),
            },
        );

        debug!(path = %path.display(), "Cached chunk");
        Ok(())
    }

    /// Fetch the bytes cached for an exact range, bumping its access time.
    ///
    /// Exact-key lookup only; covering a request from sub-ranges is the
    /// stream planner's job. Returns `None` on a miss or an unreadable blob.
    #[tracing::instrument(skip(self), fields(file = %file, start, end))]
    pub async fn cached_chunk(&self, file: &FileIdentity, start: u64, end: u64) -> Option<Bytes> {
        let key = self.key(file, start, end);

        let path = {
            let mut index = self.index.write().await;
            let entry = index.get_mut(&key)?;
            entry.last_accessed_at = Utc::now();
            entry.path.clone()
        };

        match tokio::fs::read(&path).await {
            Ok(data) => {
                debug!(path = %path.display(), len = data.len(), "Chunk cache hit");
                Some(Bytes::from(data))
            }
            Err(e) => {
                // Index said yes but the blob is gone; drop the stale entry.
                warn!(path = %path.display(), error = %e, "Cached chunk unreadable, dropping index entry");
                self.index.write().await.remove(&key);
                None
            }
        }
    }

    /// The spans currently cached for a file, for stream planning.
    pub async fn list_chunks(&self, file: &FileIdentity) -> Vec<ChunkSpan> {
        let token = Self::file_token(file);
        let index = self.index.read().await;
        index
            .keys()
            .filter(|key| key.file_token == token)
            .map(|key| ChunkSpan::new(key.start, key.end))
            .collect()
    }

    /// Take the exclusive fetch-and-cache lock for an exact chunk key.
    pub async fn write_guard(&self, file: &FileIdentity, start: u64, end: u64) -> ChunkWriteGuard {
        let key = self.key(file, start, end);
        let lock = {
            let mut locks = self.write_locks.lock().unwrap_or_else(|e| e.into_inner());
            if locks.len() > LOCK_TABLE_SOFT_CAP {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks.entry(key).or_default().clone()
        };
        ChunkWriteGuard {
            _guard: lock.lock_owned().await,
        }
    }

    /// Delete chunks not accessed within the retention window.
    ///
    /// Returns the number of chunks removed.
    #[tracing::instrument(skip(self))]
    pub async fn sweep(&self) -> usize {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.config.retention()).unwrap_or(chrono::Duration::MAX);
        self.sweep_older_than(cutoff).await
    }

    async fn sweep_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let expired: Vec<(ChunkKey, PathBuf)> = {
            let index = self.index.read().await;
            index
                .iter()
                .filter(|(_, entry)| entry.last_accessed_at < cutoff)
                .map(|(key, entry)| (key.clone(), entry.path.clone()))
                .collect()
        };

        let mut removed = 0;
        for (key, path) in expired {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %e, "Failed to delete expired chunk");
            }
            self.index.write().await.remove(&key);
            removed += 1;
        }

        if removed > 0 {
            info!(removed, "Swept expired chunks");
        }
        removed
    }

    /// Run the retention sweep on the configured cadence until the store is
    /// dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let store = Arc::downgrade(self);
        let period = self.config.sweep_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick fires immediately; skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                store.sweep().await;
            }
        })
    }

    /// Delete every cached chunk. Operational action.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache root cannot be cleared.
    #[tracing::instrument(skip(self))]
    pub async fn purge(&self) -> RemoraResult<usize> {
        let mut index = self.index.write().await;
        let count = index.len();
        index.clear();

        tokio::fs::remove_dir_all(&self.root).await.map_err(|e| {
            CacheError::new(CacheErrorKind::ChunkWrite(format!(
                "purge {}: {}",
                self.root.display(),
                e
            )))
        })?;
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            CacheError::new(CacheErrorKind::DirectoryCreation(format!(
                "{}: {}",
                self.root.display(),
                e
            )))
        })?;

        info!(purged = count, "Purged chunk cache");
        Ok(count)
    }

    /// Delete every chunk of one file, for when the file is unlinked.
    ///
    /// # Errors
    ///
    /// Returns an error if the file's chunk directory cannot be removed.
    #[tracing::instrument(skip(self), fields(file = %file))]
    pub async fn drop_file_chunks(&self, file: &FileIdentity) -> RemoraResult<usize> {
        let token = Self::file_token(file);

        let mut index = self.index.write().await;
        let before = index.len();
        index.retain(|key, _| key.file_token != token);
        let removed = before - index.len();
        drop(index);

        let dir = self.root.join(&token);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(CacheError::new(CacheErrorKind::ChunkWrite(format!(
                    "drop {}: {}",
                    dir.display(),
                    e
                )))
                .into());
            }
        }

        debug!(removed, "Dropped file chunks");
        Ok(removed)
    }

    /// Number of chunks currently indexed.
    pub async fn len(&self) -> usize {
        self.index.read().await.len()
    }

    /// Whether the store holds no chunks.
    pub async fn is_empty(&self) -> bool {
        self.index.read().await.is_empty()
    }

    fn key(&self, file: &FileIdentity, start: u64, end: u64) -> ChunkKey {
        ChunkKey {
            file_token: Self::file_token(file),
            start,
            end,
        }
    }

    /// Stable directory token for a file identity.
    fn file_token(file: &FileIdentity) -> String {
        let mut hasher = Sha256::new();
        hasher.update(file.as_str().as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        digest[..16].to_string()
    }

    /// Scan `{root}/{token}/{start}-{end}` blobs back into the index,
    /// seeding access times from file modification times.
    async fn rebuild_index(&self) -> RemoraResult<usize> {
        let mut restored = 0;
        let mut dirs = tokio::fs::read_dir(&self.root).await.map_err(|e| {
            CacheError::new(CacheErrorKind::ChunkRead(format!(
                "{}: {}",
                self.root.display(),
                e
            )))
        })?;

        let mut index = self.index.write().await;
        while let Ok(Some(dir)) = dirs.next_entry().await.map_err(|e| {
            warn!(error = %e, "Skipping unreadable cache entry");
            e
        }) {
            let token = dir.file_name().to_string_lossy().to_string();
            let Ok(mut blobs) = tokio::fs::read_dir(dir.path()).await else {
                continue;
            };
            while let Ok(Some(blob)) = blobs.next_entry().await {
                let name = blob.file_name().to_string_lossy().to_string();
                let Some((start, end)) = parse_span(&name) else {
                    // Leftover temp file or foreign data; ignore.
                    continue;
                };
                let last_accessed_at = blob
                    .metadata()
                    .await
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(Utc::now);
                index.insert(
                    ChunkKey {
                        file_token: token.clone(),
                        start,
                        end,
                    },
                    ChunkEntry {
                        path: blob.path(),
                        last_accessed_at,
                    },
                );
                restored += 1;
            }
        }

        Ok(restored)
    }
}

fn parse_span(name: &str) -> Option<(u64, u64)> {
    let (start, end) = name.split_once('-')?;
    let start = start.parse().ok()?;
    let end: u64 = end.parse().ok()?;
    (start <= end).then_some((start, end))
}
