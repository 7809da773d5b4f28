//! Core of bucketsite: serve a bucket as a read-only filesystem.
//!
//! The crate turns an S3-compatible bucket into something a generic file
//! server can walk:
//!
//! - **Configuration** ([`config`]): [`SiteConfig`] read from the environment.
//! - **Store capability** ([`store`]): the narrow [`ObjectStore`] trait the
//!   adapter depends on, with an S3 implementation ([`s3`]) and an in-memory
//!   one for tests ([`memory`]).
//! - **Credentials** ([`credentials`]): static keys or the provider chain.
//! - **Virtual filesystem** ([`fs`]): [`BucketFileSystem`] resolves request
//!   paths to objects, index documents, pseudo-directories and the optional
//!   fallback page.
//!
//! # Architecture
//!
//! ```text
//! request path
//!        |
//!        v
//! BucketFileSystem::open (candidates, directories, fallback)
//!        |
//!        v
//! ObjectStore (S3ObjectStore | MemoryStore)
//!        |
//!        v
//! VirtualFile (metadata, cursor, ranged streaming reads)
//! ```

pub mod config;
pub mod credentials;
pub mod error;
pub mod fs;
pub mod memory;
pub mod s3;
pub mod store;

pub use config::SiteConfig;
pub use error::{ConfigError, FsError, StoreError};
pub use fs::{BucketFileSystem, FsConfig, Lookup, Outcome, VirtualFile};
pub use memory::MemoryStore;
pub use s3::S3ObjectStore;
pub use store::{DirEntry, ObjectMeta, ObjectStore, ObjectStream, StoreObject};
