//! Virtual filesystem over a bucket.
//!
//! [`BucketFileSystem::open`] maps a rooted, slash-delimited request path to
//! an object:
//!
//! 1. A path ending in `/` is a pseudo-directory. It always opens, without
//!    touching the store; enumeration is deferred to [`VirtualFile::read_dir`].
//! 2. Any other path `p` (leading slash stripped) is resolved against the
//!    candidate keys `p`, `p/index.html`, `p/index.htm`, in that order. The
//!    first candidate whose metadata probe succeeds wins.
//! 3. When nothing resolves and a fallback key is configured, the fallback is
//!    resolved the same way and returned *together with* the not-found signal
//!    as [`Lookup::NotFoundWithFallback`], so the caller can serve its body
//!    under a 404 status.
//!
//! Every `open` produces an independent [`VirtualFile`] with its own read
//! cursor; handles are never shared between requests.

use std::fmt;
use std::io::SeekFrom;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use tracing::{debug, warn};

use crate::config::SiteConfig;
use crate::error::{FsError, FsResult, StoreError};
use crate::store::{DirEntry, ObjectMeta, ObjectStore, ObjectStream, StoreObject};

/// Separator between path segments.
pub const PATH_SEPARATOR: char = '/';

/// Index documents tried, in order, after the bare key.
pub const INDEX_DOCUMENTS: [&str; 2] = ["index.html", "index.htm"];

/// The candidate keys for a (non-directory) name, in resolution order.
///
/// # Examples
///
/// ```
/// use bucketsite_core::fs::candidate_keys;
///
/// assert_eq!(
///     candidate_keys("docs"),
///     ["docs", "docs/index.html", "docs/index.htm"],
/// );
/// ```
#[must_use]
pub fn candidate_keys(name: &str) -> [String; 3] {
    [
        name.to_owned(),
        format!("{name}{PATH_SEPARATOR}{}", INDEX_DOCUMENTS[0]),
        format!("{name}{PATH_SEPARATOR}{}", INDEX_DOCUMENTS[1]),
    ]
}

/// Immutable settings for a [`BucketFileSystem`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsConfig {
    /// Bucket holding the site.
    pub bucket: String,
    /// Key served when a lookup misses.
    pub fallback: Option<String>,
}

impl FsConfig {
    /// Settings without a fallback page.
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            fallback: None,
        }
    }

    /// Set the fallback key. An empty key disables the fallback.
    #[must_use]
    pub fn with_fallback(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.fallback = (!key.is_empty()).then_some(key);
        self
    }
}

impl From<&SiteConfig> for FsConfig {
    fn from(config: &SiteConfig) -> Self {
        Self::new(config.bucket.trim()).with_fallback(config.not_found_page.clone())
    }
}

/// The bare outcome tag of [`BucketFileSystem::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A candidate resolved (or the path is a directory).
    Found,
    /// Nothing resolved; the fallback handle is available.
    NotFoundWithFallback,
    /// Nothing resolved and there is no usable fallback.
    NotFoundNoFallback,
}

impl Outcome {
    /// Short name used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Found => "found",
            Self::NotFoundWithFallback => "not_found_with_fallback",
            Self::NotFoundNoFallback => "not_found",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`BucketFileSystem::open`]: an optional handle plus the outcome.
pub enum Lookup<S: ObjectStore> {
    /// The path resolved.
    Found(VirtualFile<S>),
    /// The path did not resolve; the handle reads the fallback object but
    /// carries the originally requested name.
    NotFoundWithFallback(VirtualFile<S>),
    /// The path did not resolve and no fallback body is available.
    NotFoundNoFallback,
}

impl<S: ObjectStore> Lookup<S> {
    /// The outcome tag.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Found(_) => Outcome::Found,
            Self::NotFoundWithFallback(_) => Outcome::NotFoundWithFallback,
            Self::NotFoundNoFallback => Outcome::NotFoundNoFallback,
        }
    }

    /// Whether the original lookup missed, regardless of any fallback body.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        !matches!(self, Self::Found(_))
    }

    /// Borrow the handle, if any.
    #[must_use]
    pub fn file(&self) -> Option<&VirtualFile<S>> {
        match self {
            Self::Found(file) | Self::NotFoundWithFallback(file) => Some(file),
            Self::NotFoundNoFallback => None,
        }
    }

    /// Take the handle, if any.
    #[must_use]
    pub fn into_file(self) -> Option<VirtualFile<S>> {
        match self {
            Self::Found(file) | Self::NotFoundWithFallback(file) => Some(file),
            Self::NotFoundNoFallback => None,
        }
    }

    /// Take the handle only when the path itself resolved.
    #[must_use]
    pub fn into_found(self) -> Option<VirtualFile<S>> {
        match self {
            Self::Found(file) => Some(file),
            _ => None,
        }
    }
}

impl<S: ObjectStore> fmt::Debug for Lookup<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found(file) => f.debug_tuple("Found").field(file).finish(),
            Self::NotFoundWithFallback(file) => {
                f.debug_tuple("NotFoundWithFallback").field(file).finish()
            }
            Self::NotFoundNoFallback => f.write_str("NotFoundNoFallback"),
        }
    }
}

/// A bucket exposed as a read-only filesystem.
///
/// Cloning is cheap; clones share the store and configuration.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use bucketsite_core::fs::{BucketFileSystem, FsConfig, Outcome};
/// use bucketsite_core::memory::MemoryStore;
///
/// # tokio_test::block_on(async {
/// let store = MemoryStore::new();
/// store.put_object("website", "404.html", "not here");
/// let fs = BucketFileSystem::new(
///     Arc::new(store),
///     FsConfig::new("website").with_fallback("404.html"),
/// );
///
/// let lookup = fs.open("/missing.txt").await;
/// assert_eq!(lookup.outcome(), Outcome::NotFoundWithFallback);
/// assert_eq!(lookup.file().and_then(|f| f.key()), Some("404.html"));
/// # });
/// ```
pub struct BucketFileSystem<S: ObjectStore> {
    store: Arc<S>,
    config: Arc<FsConfig>,
}

impl<S: ObjectStore> Clone for BucketFileSystem<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S: ObjectStore> fmt::Debug for BucketFileSystem<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BucketFileSystem")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: ObjectStore> BucketFileSystem<S> {
    /// Create a filesystem over `store`.
    #[must_use]
    pub fn new(store: Arc<S>, config: FsConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// The bucket being served.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    /// The configured fallback key.
    #[must_use]
    pub fn fallback_key(&self) -> Option<&str> {
        self.config.fallback.as_deref()
    }

    /// Open `path`.
    ///
    /// A candidate whose fetch or probe fails for any reason counts as a
    /// miss, so opening never fails outright.
    pub async fn open(&self, path: &str) -> Lookup<S> {
        if path.ends_with(PATH_SEPARATOR) {
            debug!(path, "opened directory marker");
            return Lookup::Found(VirtualFile::directory(
                Arc::clone(&self.store),
                self.bucket(),
                path,
            ));
        }

        let name = path.strip_prefix(PATH_SEPARATOR).unwrap_or(path);
        if let Some((object, meta)) = self.resolve(name).await {
            return Lookup::Found(self.bind(name, object, meta));
        }

        let Some(fallback) = self.fallback_key() else {
            debug!(path, "no candidate resolved");
            return Lookup::NotFoundNoFallback;
        };

        let fallback = fallback.strip_prefix(PATH_SEPARATOR).unwrap_or(fallback);
        if let Some((object, meta)) = self.resolve(fallback).await {
            debug!(path, fallback = %meta.key, "no candidate resolved, using fallback");
            Lookup::NotFoundWithFallback(self.bind(name, object, meta))
        } else {
            warn!(path, fallback, "fallback page could not be resolved");
            Lookup::NotFoundNoFallback
        }
    }

    /// Try each candidate key of `name` in order; the first probe that
    /// succeeds wins. `None` when no candidate resolved.
    async fn resolve(&self, name: &str) -> Option<(S::Object, ObjectMeta)> {
        for key in candidate_keys(name) {
            let probe = match self.store.get_object(self.bucket(), &key).await {
                Ok(object) => object.stat().await.map(|meta| (object, meta)),
                Err(err) => Err(err),
            };

            match probe {
                Ok((object, meta)) => {
                    debug!(name, key = %key, size = meta.size, "resolved candidate");
                    return Some((object, meta));
                }
                Err(StoreError::NotFound { .. }) => {
                    debug!(name, key = %key, "candidate missing");
                }
                Err(err) => {
                    warn!(name, key = %key, error = %err, "candidate probe failed, treating as missing");
                }
            }
        }

        None
    }

    fn bind(&self, name: &str, object: S::Object, meta: ObjectMeta) -> VirtualFile<S> {
        VirtualFile {
            store: Arc::clone(&self.store),
            bucket: self.bucket().to_owned(),
            name: name.to_owned(),
            kind: Kind::Object { object, meta },
            cursor: 0,
        }
    }
}

enum Kind<O> {
    Directory { prefix: String },
    Object { object: O, meta: ObjectMeta },
}

/// A file-like handle produced by [`BucketFileSystem::open`].
///
/// Either a directory marker (no backing object) or an object bound to a
/// resolved key with its own read cursor.
pub struct VirtualFile<S: ObjectStore> {
    store: Arc<S>,
    bucket: String,
    name: String,
    kind: Kind<S::Object>,
    cursor: u64,
}

impl<S: ObjectStore> fmt::Debug for VirtualFile<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("VirtualFile");
        d.field("bucket", &self.bucket).field("name", &self.name);
        match &self.kind {
            Kind::Directory { prefix } => d.field("prefix", prefix),
            Kind::Object { meta, .. } => d.field("meta", meta).field("cursor", &self.cursor),
        };
        d.finish()
    }
}

impl<S: ObjectStore> VirtualFile<S> {
    fn directory(store: Arc<S>, bucket: &str, path: &str) -> Self {
        Self {
            store,
            bucket: bucket.to_owned(),
            name: path.to_owned(),
            kind: Kind::Directory {
                prefix: path.trim_start_matches(PATH_SEPARATOR).to_owned(),
            },
            cursor: 0,
        }
    }

    /// The requested name (for a fallback handle, the name that missed).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bucket this handle reads from.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The resolved object key; `None` for directories.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.meta().map(|m| m.key.as_str())
    }

    /// Whether this is a directory marker.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        matches!(self.kind, Kind::Directory { .. })
    }

    /// The listing prefix of a directory marker (empty for the root).
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        match &self.kind {
            Kind::Directory { prefix } => Some(prefix),
            Kind::Object { .. } => None,
        }
    }

    /// Object metadata captured by the resolution probe.
    #[must_use]
    pub fn meta(&self) -> Option<&ObjectMeta> {
        match &self.kind {
            Kind::Object { meta, .. } => Some(meta),
            Kind::Directory { .. } => None,
        }
    }

    /// Size in bytes (zero for directories).
    #[must_use]
    pub fn size(&self) -> u64 {
        self.meta().map_or(0, |m| m.size)
    }

    /// Last modification time.
    #[must_use]
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.meta().and_then(|m| m.last_modified)
    }

    /// Content type stored with the object.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.meta().and_then(|m| m.content_type.as_deref())
    }

    /// Entity tag of the object.
    #[must_use]
    pub fn etag(&self) -> Option<&str> {
        self.meta().and_then(|m| m.etag.as_deref())
    }

    /// Current cursor position.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.cursor
    }

    /// Move the cursor. Seeking past the end is allowed; reads there are empty.
    pub fn seek(&mut self, pos: SeekFrom) -> FsResult<u64> {
        let size = match &self.kind {
            Kind::Object { meta, .. } => meta.size,
            Kind::Directory { .. } => {
                return Err(FsError::IsADirectory {
                    path: self.name.clone(),
                });
            }
        };

        let target = match pos {
            SeekFrom::Start(n) => i128::from(n),
            SeekFrom::Current(delta) => i128::from(self.cursor) + i128::from(delta),
            SeekFrom::End(delta) => i128::from(size) + i128::from(delta),
        };
        self.cursor = u64::try_from(target).map_err(|_| FsError::InvalidSeek { offset: target })?;
        Ok(self.cursor)
    }

    /// Read up to `max` bytes at the cursor and advance it.
    ///
    /// Returns an empty buffer at end of file.
    pub async fn read(&mut self, max: usize) -> FsResult<Bytes> {
        let len = self.remaining().min(max as u64);
        let stream = self.open_window(len).await?;
        let buf = stream
            .try_fold(BytesMut::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
            .map_err(|e| StoreError::unavailable(self.key().unwrap_or_default(), e))?;
        self.cursor += buf.len() as u64;
        Ok(buf.freeze())
    }

    /// Consume the handle, streaming up to `len` bytes from the cursor.
    ///
    /// Dropping the stream (for instance when the client disconnects) ends
    /// the store read.
    pub async fn into_stream(self, len: u64) -> FsResult<ObjectStream> {
        let len = self.remaining().min(len);
        self.open_window(len).await
    }

    /// Enumerate a directory marker.
    pub async fn read_dir(&self) -> FsResult<Vec<DirEntry>> {
        match &self.kind {
            Kind::Directory { prefix } => {
                let mut entries = self.store.list_directory(&self.bucket, prefix).await?;
                entries.sort_by(|a, b| a.name.cmp(&b.name));
                Ok(entries)
            }
            Kind::Object { .. } => Err(FsError::NotADirectory {
                path: self.name.clone(),
            }),
        }
    }

    fn remaining(&self) -> u64 {
        self.size().saturating_sub(self.cursor)
    }

    async fn open_window(&self, len: u64) -> FsResult<ObjectStream> {
        match &self.kind {
            Kind::Object { object, .. } => {
                if len == 0 {
                    return Ok(Box::pin(futures::stream::empty::<std::io::Result<Bytes>>()));
                }
                Ok(object.read_range(self.cursor, len).await?)
            }
            Kind::Directory { .. } => Err(FsError::IsADirectory {
                path: self.name.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    const BUCKET: &str = "website";

    fn fs_with(store: &MemoryStore, fallback: Option<&str>) -> BucketFileSystem<MemoryStore> {
        let mut config = FsConfig::new(BUCKET);
        if let Some(key) = fallback {
            config = config.with_fallback(key);
        }
        BucketFileSystem::new(Arc::new(store.clone()), config)
    }

    async fn read_to_end(file: VirtualFile<MemoryStore>) -> Vec<u8> {
        let chunks: Vec<Bytes> = file
            .into_stream(u64::MAX)
            .await
            .expect("into_stream")
            .try_collect()
            .await
            .expect("collect stream");
        chunks.concat()
    }

    #[test]
    fn test_should_build_candidates_in_order() {
        assert_eq!(
            candidate_keys("a/b"),
            ["a/b", "a/b/index.html", "a/b/index.htm"]
        );
    }

    #[test]
    fn test_should_treat_empty_fallback_as_disabled() {
        let config = FsConfig::new(BUCKET).with_fallback("");
        assert_eq!(config.fallback, None);

        let site = SiteConfig::builder()
            .bucket(" website ".into())
            .not_found_page("404.html".into())
            .build();
        let config = FsConfig::from(&site);
        assert_eq!(config.bucket, "website");
        assert_eq!(config.fallback.as_deref(), Some("404.html"));
    }

    #[tokio::test]
    async fn test_should_resolve_exact_key_first() {
        let store = MemoryStore::new();
        store.put_object(BUCKET, "a.txt", "hello");
        store.put_object(BUCKET, "a.txt/index.html", "shadowed");
        let fs = fs_with(&store, None);

        let lookup = fs.open("/a.txt").await;
        assert_eq!(lookup.outcome(), Outcome::Found);
        let file = lookup.into_found().expect("handle");
        assert_eq!(file.key(), Some("a.txt"));
        assert_eq!(file.name(), "a.txt");
        assert_eq!(file.size(), 5);
        assert_eq!(store.probed_keys(), vec!["a.txt"]);
        assert_eq!(read_to_end(file).await, b"hello");
    }

    #[tokio::test]
    async fn test_should_try_index_documents_in_order() {
        let store = MemoryStore::new();
        store.put_object(BUCKET, "about/index.htm", "legacy");
        let fs = fs_with(&store, None);

        let file = fs
            .open("/about")
            .await
            .into_found()
            .expect("handle");
        assert_eq!(file.key(), Some("about/index.htm"));
        assert_eq!(
            store.probed_keys(),
            vec!["about", "about/index.html", "about/index.htm"]
        );
    }

    #[tokio::test]
    async fn test_should_stop_at_first_existing_candidate() {
        let store = MemoryStore::new();
        store.put_object(BUCKET, "about/index.html", "modern");
        store.put_object(BUCKET, "about/index.htm", "legacy");
        let fs = fs_with(&store, None);

        let file = fs
            .open("/about")
            .await
            .into_found()
            .expect("handle");
        assert_eq!(file.key(), Some("about/index.html"));
        assert_eq!(store.probed_keys(), vec!["about", "about/index.html"]);
    }

    #[tokio::test]
    async fn test_should_open_trailing_slash_as_directory_without_probing() {
        let store = MemoryStore::new();
        let fs = fs_with(&store, Some("404.html"));

        let lookup = fs.open("/nothing/here/").await;
        assert_eq!(lookup.outcome(), Outcome::Found);
        let dir = lookup.into_found().expect("handle");
        assert!(dir.is_dir());
        assert_eq!(dir.prefix(), Some("nothing/here/"));
        assert_eq!(dir.key(), None);
        assert!(store.probed_keys().is_empty());
        assert!(dir.read_dir().await.expect("read_dir").is_empty());
    }

    #[tokio::test]
    async fn test_should_list_directory_marker() {
        let store = MemoryStore::new();
        store.put_object(BUCKET, "about/index.html", "x");
        store.put_object(BUCKET, "about/team/alice.html", "y");
        let fs = fs_with(&store, None);

        let dir = fs
            .open("/about/")
            .await
            .into_found()
            .expect("handle");
        let names: Vec<String> = dir
            .read_dir()
            .await
            .expect("read_dir")
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["index.html", "team"]);
    }

    #[tokio::test]
    async fn test_should_report_not_found_without_fallback_lookup() {
        let store = MemoryStore::new();
        store.put_object(BUCKET, "404.html", "not here");
        let fs = fs_with(&store, None);

        let lookup = fs.open("/missing.txt").await;
        assert_eq!(lookup.outcome(), Outcome::NotFoundNoFallback);
        assert!(lookup.is_not_found());
        assert!(lookup.file().is_none());
        assert_eq!(
            store.probed_keys(),
            vec![
                "missing.txt",
                "missing.txt/index.html",
                "missing.txt/index.htm"
            ]
        );
    }

    #[tokio::test]
    async fn test_should_return_fallback_handle_with_not_found_signal() {
        let store = MemoryStore::new();
        store.put_object(BUCKET, "404.html", "custom not found");
        let fs = fs_with(&store, Some("404.html"));

        let lookup = fs.open("/missing.txt").await;
        assert_eq!(lookup.outcome(), Outcome::NotFoundWithFallback);
        assert!(lookup.is_not_found());

        let file = lookup.into_file().expect("fallback handle");
        assert_eq!(file.name(), "missing.txt");
        assert_eq!(file.key(), Some("404.html"));
        assert_eq!(read_to_end(file).await, b"custom not found");
    }

    #[tokio::test]
    async fn test_should_resolve_fallback_through_candidates() {
        let store = MemoryStore::new();
        store.put_object(BUCKET, "errors/index.html", "error index");
        let fs = fs_with(&store, Some("/errors"));

        let file = fs
            .open("/missing")
            .await
            .into_file()
            .expect("fallback handle");
        assert_eq!(file.key(), Some("errors/index.html"));
    }

    #[tokio::test]
    async fn test_should_degrade_to_plain_not_found_when_fallback_missing() {
        let store = MemoryStore::new();
        let fs = fs_with(&store, Some("404.html"));

        let lookup = fs.open("/missing.txt").await;
        assert_eq!(lookup.outcome(), Outcome::NotFoundNoFallback);
    }

    #[tokio::test]
    async fn test_should_treat_empty_path_as_ordinary_key() {
        let store = MemoryStore::new();
        store.put_object(BUCKET, "/index.html", "odd key");
        let fs = fs_with(&store, None);

        let file = fs
            .open("")
            .await
            .into_found()
            .expect("handle");
        assert_eq!(file.key(), Some("/index.html"));
        assert_eq!(store.probed_keys(), vec!["", "/index.html"]);
    }

    #[tokio::test]
    async fn test_should_treat_store_failure_as_miss() {
        let store = MemoryStore::new();
        store.put_object(BUCKET, "a.txt", "hello");
        store.set_unavailable(BUCKET, "a.txt");
        let fs = fs_with(&store, None);

        let lookup = fs.open("/a.txt").await;
        assert_eq!(lookup.outcome(), Outcome::NotFoundNoFallback);
        assert_eq!(
            store.probed_keys(),
            vec!["a.txt", "a.txt/index.html", "a.txt/index.htm"]
        );
    }

    #[tokio::test]
    async fn test_should_serve_fallback_when_candidates_are_unavailable() {
        let store = MemoryStore::new();
        store.put_object(BUCKET, "404.html", "custom");
        store.set_unavailable(BUCKET, "missing.txt");
        let fs = fs_with(&store, Some("404.html"));

        let lookup = fs.open("/missing.txt").await;
        assert_eq!(lookup.outcome(), Outcome::NotFoundWithFallback);
        let file = lookup.into_file().expect("fallback handle");
        assert_eq!(read_to_end(file).await, b"custom");
    }

    #[tokio::test]
    async fn test_should_degrade_when_fallback_is_unavailable() {
        let store = MemoryStore::new();
        store.put_object(BUCKET, "404.html", "custom");
        store.set_unavailable(BUCKET, "404.html");
        let fs = fs_with(&store, Some("404.html"));

        let lookup = fs.open("/missing.txt").await;
        assert_eq!(lookup.outcome(), Outcome::NotFoundNoFallback);
    }

    #[tokio::test]
    async fn test_should_keep_trying_candidates_after_store_failure() {
        let store = MemoryStore::new();
        store.set_unavailable(BUCKET, "docs");
        store.put_object(BUCKET, "docs/index.html", "docs");
        let fs = fs_with(&store, None);

        let lookup = fs.open("/docs").await;
        assert_eq!(lookup.outcome(), Outcome::Found);
    }

    #[tokio::test]
    async fn test_should_resolve_idempotently() {
        let store = MemoryStore::new();
        store.put_object(BUCKET, "a.txt", "hello");
        let fs = fs_with(&store, Some("404.html"));

        for path in ["/a.txt", "/missing", "/dir/"] {
            let first = fs.open(path).await.outcome();
            let second = fs.open(path).await.outcome();
            assert_eq!(first, second, "outcome for {path} should be stable");
        }
    }

    #[tokio::test]
    async fn test_should_seek_and_read_with_cursor() {
        let store = MemoryStore::new();
        store.put_object(BUCKET, "digits", "0123456789");
        let fs = fs_with(&store, None);
        let mut file = fs
            .open("/digits")
            .await
            .into_found()
            .expect("handle");

        assert_eq!(file.read(3).await.expect("read").as_ref(), b"012");
        assert_eq!(file.position(), 3);
        assert_eq!(file.seek(SeekFrom::Current(2)).expect("seek"), 5);
        assert_eq!(file.read(2).await.expect("read").as_ref(), b"56");
        assert_eq!(file.seek(SeekFrom::End(-2)).expect("seek"), 8);
        assert_eq!(file.read(100).await.expect("read").as_ref(), b"89");
        assert!(file.read(100).await.expect("read at eof").is_empty());

        assert!(matches!(
            file.seek(SeekFrom::Current(-20)),
            Err(FsError::InvalidSeek { .. })
        ));

        file.seek(SeekFrom::Start(4)).expect("seek");
        let chunks: Vec<Bytes> = file
            .into_stream(3)
            .await
            .expect("into_stream")
            .try_collect()
            .await
            .expect("collect stream");
        assert_eq!(chunks.concat(), b"456");
    }

    #[tokio::test]
    async fn test_should_reject_byte_operations_on_directories() {
        let store = MemoryStore::new();
        let fs = fs_with(&store, None);
        let mut dir = fs
            .open("/")
            .await
            .into_found()
            .expect("handle");

        assert!(matches!(
            dir.seek(SeekFrom::Start(0)),
            Err(FsError::IsADirectory { .. })
        ));
        assert!(matches!(
            dir.read(10).await,
            Err(FsError::IsADirectory { .. })
        ));
    }

    #[tokio::test]
    async fn test_should_reject_listing_an_object() {
        let store = MemoryStore::new();
        store.put_object(BUCKET, "a.txt", "hello");
        let fs = fs_with(&store, None);
        let file = fs
            .open("/a.txt")
            .await
            .into_found()
            .expect("handle");

        assert!(matches!(
            file.read_dir().await,
            Err(FsError::NotADirectory { .. })
        ));
    }

    #[tokio::test]
    async fn test_should_give_each_open_an_independent_cursor() {
        let store = MemoryStore::new();
        store.put_object(BUCKET, "shared.txt", "abcdefghij");
        let fs = fs_with(&store, None);

        let mut tasks = Vec::new();
        for offset in 0..10u64 {
            let fs = fs.clone();
            tasks.push(tokio::spawn(async move {
                let mut file = fs
                    .open("/shared.txt")
                    .await
                    .into_found()
                    .expect("handle");
                file.seek(SeekFrom::Start(offset)).expect("seek");
                let byte = file.read(1).await.expect("read");
                (offset, byte, file.position())
            }));
        }

        for task in tasks {
            let (offset, byte, position) = task.await.expect("task");
            assert_eq!(byte.as_ref(), &[b'a' + u8::try_from(offset).expect("small offset")]);
            assert_eq!(position, offset + 1);
        }
    }
}
