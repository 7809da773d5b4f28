//! In-memory [`ObjectStore`] used by tests and local demos.
//!
//! Objects live in a [`DashMap`] keyed by `(bucket, key)`. The store also
//! records every metadata probe in order, which lets tests assert exactly
//! which candidate keys a lookup tried, and can mark keys as unavailable to
//! simulate transport failures.

use std::collections::BTreeMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use tracing::trace;

use crate::error::{StoreError, StoreResult};
use crate::store::{DirEntry, ObjectMeta, ObjectStore, ObjectStream, StoreObject};

/// Size of the chunks yielded by [`MemoryObject::read_range`].
const CHUNK_SIZE: usize = 64 * 1024;

/// Composite key identifying a stored object: `(bucket, key)`.
type StorageKey = (String, String);

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: Option<String>,
    last_modified: DateTime<Utc>,
    etag: String,
}

#[derive(Debug, Default)]
struct Inner {
    objects: DashMap<StorageKey, StoredObject>,
    unavailable: DashSet<StorageKey>,
    probes: Mutex<Vec<String>>,
    reads: AtomicUsize,
}

/// Thread-safe in-memory object store.
///
/// Cloning is cheap; clones share the same objects.
///
/// # Examples
///
/// ```
/// use bucketsite_core::memory::MemoryStore;
///
/// let store = MemoryStore::new();
/// store.put_object("website", "index.html", "<h1>hi</h1>");
/// assert!(store.contains("website", "index.html"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object, replacing any previous version.
    pub fn put_object(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        self.insert(bucket, key, data.into(), None);
    }

    /// Store an object with an explicit content type.
    pub fn put_object_with_content_type(
        &self,
        bucket: &str,
        key: &str,
        data: impl Into<Bytes>,
        content_type: &str,
    ) {
        self.insert(bucket, key, data.into(), Some(content_type.to_owned()));
    }

    /// Override an object's modification time.
    pub fn set_last_modified(&self, bucket: &str, key: &str, last_modified: DateTime<Utc>) {
        if let Some(mut obj) = self.inner.objects.get_mut(&storage_key(bucket, key)) {
            obj.last_modified = last_modified;
        }
    }

    /// Remove an object.
    pub fn remove_object(&self, bucket: &str, key: &str) {
        self.inner.objects.remove(&storage_key(bucket, key));
    }

    /// Make every access to `key` fail as if the store were unreachable.
    ///
    /// Passing a directory prefix such as `docs/` makes listing it fail.
    pub fn set_unavailable(&self, bucket: &str, key: &str) {
        self.inner.unavailable.insert(storage_key(bucket, key));
    }

    /// Whether an object exists.
    #[must_use]
    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.inner.objects.contains_key(&storage_key(bucket, key))
    }

    /// Keys passed to [`StoreObject::stat`], in call order.
    #[must_use]
    pub fn probed_keys(&self) -> Vec<String> {
        self.inner.probes.lock().clone()
    }

    /// Number of [`StoreObject::read_range`] calls served.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.inner.reads.load(Ordering::Relaxed)
    }

    fn insert(&self, bucket: &str, key: &str, data: Bytes, content_type: Option<String>) {
        let last_modified =
            DateTime::from_timestamp(Utc::now().timestamp(), 0).unwrap_or_default();
        let etag = compute_etag(&data);
        self.inner.objects.insert(
            storage_key(bucket, key),
            StoredObject {
                data,
                content_type,
                last_modified,
                etag,
            },
        );
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    type Object = MemoryObject;

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<MemoryObject> {
        Ok(MemoryObject {
            inner: Arc::clone(&self.inner),
            bucket: bucket.to_owned(),
            key: key.to_owned(),
        })
    }

    async fn list_directory(&self, bucket: &str, prefix: &str) -> StoreResult<Vec<DirEntry>> {
        if self.inner.unavailable.contains(&storage_key(bucket, prefix)) {
            return Err(StoreError::unavailable(prefix, "simulated store outage"));
        }

        let mut children = BTreeMap::new();

        for entry in &self.inner.objects {
            let (obj_bucket, key) = entry.key();
            if obj_bucket != bucket {
                continue;
            }
            let Some(rest) = key.strip_prefix(prefix) else {
                continue;
            };
            if rest.is_empty() {
                continue;
            }

            match rest.split_once('/') {
                Some((dir, _)) => {
                    children.entry(dir.to_owned()).or_insert_with(|| DirEntry {
                        name: dir.to_owned(),
                        is_dir: true,
                        size: 0,
                        last_modified: None,
                    });
                }
                None => {
                    let obj = entry.value();
                    children.insert(
                        rest.to_owned(),
                        DirEntry {
                            name: rest.to_owned(),
                            is_dir: false,
                            size: obj.data.len() as u64,
                            last_modified: Some(obj.last_modified),
                        },
                    );
                }
            }
        }

        Ok(children.into_values().collect())
    }
}

/// Lazy handle into a [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryObject {
    inner: Arc<Inner>,
    bucket: String,
    key: String,
}

impl MemoryObject {
    fn load(&self) -> StoreResult<StoredObject> {
        let id = storage_key(&self.bucket, &self.key);
        if self.inner.unavailable.contains(&id) {
            return Err(StoreError::unavailable(
                self.key.clone(),
                "simulated store outage",
            ));
        }
        self.inner
            .objects
            .get(&id)
            .map(|obj| obj.value().clone())
            .ok_or_else(|| StoreError::not_found(self.key.clone()))
    }
}

#[async_trait]
impl StoreObject for MemoryObject {
    fn key(&self) -> &str {
        &self.key
    }

    async fn stat(&self) -> StoreResult<ObjectMeta> {
        self.inner.probes.lock().push(self.key.clone());
        let obj = self.load()?;
        trace!(bucket = %self.bucket, key = %self.key, size = obj.data.len(), "memory stat");
        Ok(ObjectMeta {
            key: self.key.clone(),
            size: obj.data.len() as u64,
            last_modified: Some(obj.last_modified),
            content_type: obj.content_type,
            etag: Some(obj.etag),
        })
    }

    async fn read_range(&self, offset: u64, len: u64) -> StoreResult<ObjectStream> {
        self.inner.reads.fetch_add(1, Ordering::Relaxed);
        let data = self.load()?.data;

        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
        let end = usize::try_from(offset.saturating_add(len))
            .unwrap_or(usize::MAX)
            .min(data.len());
        let window = data.slice(start..end);

        let chunks: Vec<std::io::Result<Bytes>> = (0..window.len())
            .step_by(CHUNK_SIZE)
            .map(|at| Ok(window.slice(at..(at + CHUNK_SIZE).min(window.len()))))
            .collect();

        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

fn storage_key(bucket: &str, key: &str) -> StorageKey {
    (bucket.to_owned(), key.to_owned())
}

fn compute_etag(data: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    data.hash(&mut hasher);
    format!("\"{:016x}\"", hasher.finish())
}
