//! HTTP layer of bucketsite.
//!
//! This crate serves a [`BucketFileSystem`](bucketsite_core::fs::BucketFileSystem)
//! over HTTP. It handles:
//!
//! - **Service** ([`service`]): [`SiteService`], the hyper `Service`. It probes
//!   each request path and serves the configured fallback page with a `404`
//!   status when the path does not resolve.
//!
//! - **File server** ([`file_server`]): [`FileServer`], a generic static-file
//!   server. It handles directories, redirects, validators, byte ranges and
//!   content types.
//!
//! - **Helpers**: path cleaning ([`path`]), content-type detection
//!   ([`content_type`]), range and conditional request evaluation
//!   ([`conditional`]) and directory listings ([`listing`]).
//!
//! - **Body** ([`body`]): [`ResponseBody`], with buffered, streaming and
//!   empty modes.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request
//!   -> SiteService (hyper Service)
//!     -> probe BucketFileSystem::open(clean(path))
//!     -> miss + fallback: FileServer(fallback path), status forced to 404
//!     -> miss, no fallback: 404 page not found
//!     -> hit: FileServer(original request)
//!   <- HTTP Response (object bytes streamed from the store)
//! ```

pub mod body;
pub mod conditional;
pub mod content_type;
pub mod file_server;
pub mod listing;
pub mod path;
pub mod service;

pub use body::ResponseBody;
pub use file_server::FileServer;
pub use service::SiteService;
