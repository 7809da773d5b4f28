//! The fallback-aware request handler implementing hyper's `Service` trait.
//!
//! [`SiteService`] wraps a [`FileServer`] and special-cases misses:
//!
//! 1. Probe the filesystem with the cleaned request path.
//! 2. On a miss with a fallback page configured, serve the fallback page
//!    through the file server with a `404` status.
//! 3. On a miss without a fallback page, answer the standard `404`.
//! 4. Otherwise hand the request to the file server unchanged, which
//!    resolves the path again on its own.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use bucketsite_core::fs::{BucketFileSystem, Outcome};
use bucketsite_core::store::ObjectStore;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::{Method, Request, Response, StatusCode, request};
use hyper::body::Incoming;
use hyper::service::Service;
use percent_encoding::percent_decode_str;
use tracing::{debug, info};
use uuid::Uuid;

use crate::body::ResponseBody;
use crate::file_server::{FileServer, not_found};
use crate::path::{clean, rooted};

/// Header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request headers dropped before serving the fallback page, which is
/// always sent whole.
const FALLBACK_STRIPPED_HEADERS: [HeaderName; 6] = [
    header::RANGE,
    header::IF_RANGE,
    header::IF_MATCH,
    header::IF_NONE_MATCH,
    header::IF_MODIFIED_SINCE,
    header::IF_UNMODIFIED_SINCE,
];

/// The site's HTTP service.
///
/// Cheap to clone: clones share the filesystem and its store client.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use bucketsite_core::fs::{BucketFileSystem, FsConfig};
/// use bucketsite_core::memory::MemoryStore;
/// use bucketsite_http::SiteService;
///
/// # tokio_test::block_on(async {
/// let store = MemoryStore::new();
/// store.put_object("website", "index.html", "<h1>home</h1>");
/// let fs = BucketFileSystem::new(Arc::new(store), FsConfig::new("website"));
/// let service = SiteService::new(fs);
///
/// let req = http::Request::get("/missing").body(()).unwrap();
/// let resp = service.handle(req).await;
/// assert_eq!(resp.status(), http::StatusCode::NOT_FOUND);
/// # });
/// ```
pub struct SiteService<S: ObjectStore> {
    fs: BucketFileSystem<S>,
    files: FileServer<S>,
}

impl<S: ObjectStore> Clone for SiteService<S> {
    fn clone(&self) -> Self {
        Self {
            fs: self.fs.clone(),
            files: self.files.clone(),
        }
    }
}

impl<S: ObjectStore> std::fmt::Debug for SiteService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteService").field("fs", &self.fs).finish()
    }
}

impl<S: ObjectStore> SiteService<S> {
    /// Create the service over `fs`.
    #[must_use]
    pub fn new(fs: BucketFileSystem<S>) -> Self {
        Self {
            files: FileServer::new(fs.clone()),
            fs,
        }
    }

    /// Handle one request. The request body is ignored.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<ResponseBody> {
        let (parts, body) = req.into_parts();
        drop(body);

        let request_id = Uuid::new_v4().to_string();
        let started = Instant::now();

        let (mut response, outcome) = self.dispatch(&parts, &request_id).await;

        if let Ok(v) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, v);
        }

        info!(
            request_id = %request_id,
            method = %parts.method,
            path = parts.uri.path(),
            status = response.status().as_u16(),
            outcome = outcome.map_or("-", Outcome::as_str),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "served request"
        );
        response
    }

    async fn dispatch(
        &self,
        parts: &request::Parts,
        request_id: &str,
    ) -> (Response<ResponseBody>, Option<Outcome>) {
        if parts.method != Method::GET && parts.method != Method::HEAD {
            return (self.files.serve(parts).await, None);
        }
        let Ok(decoded) = percent_decode_str(parts.uri.path()).decode_utf8() else {
            return (self.files.serve(parts).await, None);
        };

        let probe_path = clean(&rooted(&decoded));
        let outcome = self.fs.open(&probe_path).await.outcome();
        debug!(request_id, path = %probe_path, %outcome, "probed path");

        if outcome == Outcome::Found {
            return (self.files.serve(parts).await, Some(outcome));
        }

        let Some(fallback) = self.fs.fallback_key() else {
            return (not_found(), Some(outcome));
        };

        let fallback_path = clean(&rooted(fallback));
        debug!(request_id, fallback = %fallback_path, "serving fallback page");
        let headers = strip_fallback_headers(&parts.headers);
        let mut response = self
            .files
            .serve_decoded(&parts.method, &headers, &fallback_path, None, false)
            .await;
        if response.status().is_success() {
            *response.status_mut() = StatusCode::NOT_FOUND;
        }
        (response, Some(outcome))
    }
}

fn strip_fallback_headers(headers: &HeaderMap) -> HeaderMap {
    let mut headers = headers.clone();
    for name in &FALLBACK_STRIPPED_HEADERS {
        headers.remove(name);
    }
    headers
}

impl<S: ObjectStore> Service<Request<Incoming>> for SiteService<S> {
    type Response = Response<ResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}
