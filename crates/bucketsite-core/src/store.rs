//! The narrow object-store capability the filesystem adapter depends on.
//!
//! A full S3 client can do far more than bucketsite needs. The adapter only
//! opens lazy object handles, probes them for metadata, reads byte windows
//! and (for pseudo-directories) enumerates a prefix. [`ObjectStore`] and
//! [`StoreObject`] capture exactly that, so the adapter can be exercised
//! against [`MemoryStore`](crate::memory::MemoryStore) in tests and against
//! [`S3ObjectStore`](crate::s3::S3ObjectStore) in production.

use std::io;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;

use crate::error::StoreResult;

/// A stream of object bytes. Dropping it aborts the underlying read.
pub type ObjectStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Object metadata returned by the existence probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// The object key.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time, if the store reports one.
    pub last_modified: Option<DateTime<Utc>>,
    /// Content type recorded with the object.
    pub content_type: Option<String>,
    /// Entity tag (quoted, as returned by S3).
    pub etag: Option<String>,
}

/// One child of a pseudo-directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Name relative to the listed prefix, without a trailing slash.
    pub name: String,
    /// Whether this child is itself a common prefix.
    pub is_dir: bool,
    /// Size in bytes (zero for directories).
    pub size: u64,
    /// Last modification time, if known.
    pub last_modified: Option<DateTime<Utc>>,
}

/// A client able to open objects in a bucket.
///
/// Implementations must be safe for concurrent use: every in-flight request
/// shares one store behind an `Arc`.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// The handle type returned by [`ObjectStore::get_object`].
    type Object: StoreObject;

    /// Open a handle to `key` in `bucket`.
    ///
    /// The handle is lazy: success does not imply the object exists. Call
    /// [`StoreObject::stat`] to confirm.
    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<Self::Object>;

    /// List the immediate children of `prefix` (which is empty or ends with `/`).
    ///
    /// Stores without directory semantics may keep the default, an empty listing.
    async fn list_directory(&self, bucket: &str, prefix: &str) -> StoreResult<Vec<DirEntry>> {
        let _ = (bucket, prefix);
        Ok(Vec::new())
    }
}

/// A lazily fetched object.
#[async_trait]
pub trait StoreObject: Send + Sync + 'static {
    /// The key this handle is bound to.
    fn key(&self) -> &str;

    /// Fetch the object's metadata, confirming it exists.
    async fn stat(&self) -> StoreResult<ObjectMeta>;

    /// Read `len` bytes starting at `offset`.
    ///
    /// Callers keep the window inside the size reported by [`StoreObject::stat`].
    async fn read_range(&self, offset: u64, len: u64) -> StoreResult<ObjectStream>;
}
