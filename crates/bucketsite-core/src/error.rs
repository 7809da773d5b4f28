//! Error types for bucketsite.
//!
//! Three layers fail in different ways and get their own enum:
//!
//! - [`StoreError`]: the object-store client (missing key, transport failure).
//! - [`FsError`]: the virtual filesystem built on top of the store.
//! - [`ConfigError`]: startup configuration, never seen mid-request.

/// Boxed error used as the source of store transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by an [`ObjectStore`](crate::store::ObjectStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The key does not exist in the bucket.
    #[error("no such object: {key}")]
    NotFound {
        /// The key that was probed.
        key: String,
    },

    /// The store could not be reached or refused the request.
    #[error("object store unavailable while accessing {key}: {source}")]
    Unavailable {
        /// The key being accessed when the failure happened.
        key: String,
        /// The underlying transport or service error.
        #[source]
        source: BoxError,
    },
}

impl StoreError {
    /// Create a [`StoreError::NotFound`] for the given key.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a [`StoreError::Unavailable`] for the given key.
    #[must_use]
    pub fn unavailable(key: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Unavailable {
            key: key.into(),
            source: source.into(),
        }
    }

    /// Whether this error means the object is absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Convenience result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors produced by the virtual filesystem adapter.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A directory operation was attempted on an object handle.
    #[error("not a directory: {path}")]
    NotADirectory {
        /// The handle's path.
        path: String,
    },

    /// A byte operation was attempted on a directory handle.
    #[error("is a directory: {path}")]
    IsADirectory {
        /// The handle's path.
        path: String,
    },

    /// A seek landed before the start of the object.
    #[error("invalid seek to offset {offset}")]
    InvalidSeek {
        /// The resulting (negative or overflowing) offset.
        offset: i128,
    },
}

/// Convenience result type for filesystem operations.
pub type FsResult<T> = Result<T, FsError>;

/// Fatal configuration errors detected at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `BUCKET` was empty or blank.
    #[error("bucket name cannot be empty, please provide BUCKET environment variable")]
    MissingBucket,

    /// `ENDPOINT` could not be parsed into an `http`/`https` URL.
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint {
        /// The raw endpoint value.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },
}
