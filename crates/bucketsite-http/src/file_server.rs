//! Generic static-file server over a [`BucketFileSystem`].
//!
//! [`FileServer`] answers `GET`/`HEAD` requests the way a conventional static
//! file server does:
//!
//! 1. Decode and clean the request path (a trailing slash is kept).
//! 2. Redirect `.../index.html` to `./`.
//! 3. Open the path through the filesystem adapter.
//! 4. Directories serve their `index.html`, or an HTML listing.
//! 5. Files get validators, conditional `304`s, single byte ranges and a
//!    content type, and their bytes are streamed from the store.

use std::io::SeekFrom;

use bucketsite_core::error::FsResult;
use bucketsite_core::fs::{BucketFileSystem, INDEX_DOCUMENTS, Lookup, VirtualFile};
use bucketsite_core::store::ObjectStore;
use http::header::{self, HeaderMap, HeaderValue};
use http::{Method, Response, StatusCode, request};
use percent_encoding::percent_decode_str;
use tracing::{debug, warn};

use crate::body::ResponseBody;
use crate::conditional::{RangeRequest, format_http_date, is_not_modified, parse_range, range_applies};
use crate::content_type::{SNIFF_LEN, by_extension, is_generic, sniff};
use crate::listing;
use crate::path::clean_request_path;

/// Request paths with this suffix are redirected to their directory.
const INDEX_SUFFIX: &str = "/index.html";

/// Static-file server reading from a bucket.
pub struct FileServer<S: ObjectStore> {
    fs: BucketFileSystem<S>,
}

impl<S: ObjectStore> Clone for FileServer<S> {
    fn clone(&self) -> Self {
        Self {
            fs: self.fs.clone(),
        }
    }
}

impl<S: ObjectStore> std::fmt::Debug for FileServer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileServer").field("fs", &self.fs).finish()
    }
}

impl<S: ObjectStore> FileServer<S> {
    /// Create a file server over `fs`.
    #[must_use]
    pub fn new(fs: BucketFileSystem<S>) -> Self {
        Self { fs }
    }

    /// Serve a request as received.
    pub async fn serve(&self, parts: &request::Parts) -> Response<ResponseBody> {
        self.serve_path(
            &parts.method,
            &parts.headers,
            parts.uri.path(),
            parts.uri.query(),
            true,
        )
        .await
    }

    /// Serve `raw_path` (still percent-encoded).
    ///
    /// With `redirect` unset, `.../index.html` is served in place instead of
    /// being redirected to its directory.
    pub async fn serve_path(
        &self,
        method: &Method,
        headers: &HeaderMap,
        raw_path: &str,
        query: Option<&str>,
        redirect: bool,
    ) -> Response<ResponseBody> {
        if !is_servable(method) {
            return method_not_allowed();
        }

        let Ok(decoded) = percent_decode_str(raw_path).decode_utf8() else {
            debug!(raw_path, "request path is not valid UTF-8");
            return plain_text(StatusCode::BAD_REQUEST, "400 Bad Request\n");
        };
        self.serve_decoded(method, headers, &decoded, query, redirect)
            .await
    }

    /// Serve `path`, which is already decoded and is used as written.
    pub async fn serve_decoded(
        &self,
        method: &Method,
        headers: &HeaderMap,
        path: &str,
        query: Option<&str>,
        redirect: bool,
    ) -> Response<ResponseBody> {
        if !is_servable(method) {
            return method_not_allowed();
        }

        let path = clean_request_path(path);
        if redirect && path.ends_with(INDEX_SUFFIX) {
            return local_redirect("./", query);
        }

        let head = method == Method::HEAD;
        match self.fs.open(&path).await {
            Lookup::NotFoundNoFallback => not_found(),
            // The object vanished between the handler's probe and this open.
            Lookup::NotFoundWithFallback(file) => {
                serve_file(file, StatusCode::NOT_FOUND, headers, head).await
            }
            Lookup::Found(dir) if dir.is_dir() => self.serve_directory(&dir, &path, headers, head).await,
            Lookup::Found(file) => serve_file(file, StatusCode::OK, headers, head).await,
        }
    }

    async fn serve_directory(
        &self,
        dir: &VirtualFile<S>,
        path: &str,
        headers: &HeaderMap,
        head: bool,
    ) -> Response<ResponseBody> {
        let index = format!("{path}{}", INDEX_DOCUMENTS[0]);
        if let Lookup::Found(file) = self.fs.open(&index).await {
            return serve_file(file, StatusCode::OK, headers, head).await;
        }

        let entries = match dir.read_dir().await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(path, error = %err, "failed to list directory");
                return internal_error();
            }
        };
        debug!(path, entries = entries.len(), "rendering directory listing");

        let html = listing::render(&entries);
        let mut resp = Response::new(if head {
            ResponseBody::empty()
        } else {
            ResponseBody::from_string(html.clone())
        });
        let h = resp.headers_mut();
        h.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
        h.insert(header::CONTENT_LENGTH, HeaderValue::from(html.len()));
        resp
    }
}

/// Serve an object handle with `status` (`200`, or `404` for a fallback body).
///
/// Validators and ranges are only evaluated for `200` responses.
async fn serve_file<S: ObjectStore>(
    mut file: VirtualFile<S>,
    status: StatusCode,
    headers: &HeaderMap,
    head: bool,
) -> Response<ResponseBody> {
    let size = file.size();
    let etag = file.etag().map(ToOwned::to_owned);
    let modified = file.modified();
    let conditional = status == StatusCode::OK;

    let mut validators = HeaderMap::new();
    if let Some(modified) = modified {
        if let Ok(v) = HeaderValue::from_str(&format_http_date(&modified)) {
            validators.insert(header::LAST_MODIFIED, v);
        }
    }
    if let Some(v) = etag.as_deref().and_then(|e| HeaderValue::from_str(e).ok()) {
        validators.insert(header::ETAG, v);
    }

    if conditional && is_not_modified(headers, etag.as_deref(), modified) {
        debug!(key = file.key(), "not modified");
        let mut resp = Response::new(ResponseBody::empty());
        *resp.status_mut() = StatusCode::NOT_MODIFIED;
        resp.headers_mut().extend(validators);
        return resp;
    }

    let content_type = match detect_content_type(&mut file).await {
        Ok(ct) => ct,
        Err(err) => {
            warn!(key = file.key(), error = %err, "failed to sniff content type");
            return internal_error();
        }
    };

    let mut range = RangeRequest::Full;
    if conditional && range_applies(headers, etag.as_deref(), modified) {
        let raw = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
        range = parse_range(raw, size);
    }

    let (status, offset, len) = match range {
        RangeRequest::Full => (status, 0, size),
        RangeRequest::Partial(r) => (StatusCode::PARTIAL_CONTENT, r.start, r.len()),
        RangeRequest::Unsatisfiable => {
            let mut resp = plain_text(
                StatusCode::RANGE_NOT_SATISFIABLE,
                "416 Requested Range Not Satisfiable\n",
            );
            if let Ok(v) = HeaderValue::from_str(&format!("bytes */{size}")) {
                resp.headers_mut().insert(header::CONTENT_RANGE, v);
            }
            return resp;
        }
    };

    let mut resp_headers = validators;
    if let Ok(v) = HeaderValue::from_str(&content_type) {
        resp_headers.insert(header::CONTENT_TYPE, v);
    }
    resp_headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    resp_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    if let RangeRequest::Partial(r) = range {
        if let Ok(v) = HeaderValue::from_str(&r.content_range(size)) {
            resp_headers.insert(header::CONTENT_RANGE, v);
        }
    }

    debug!(
        name = file.name(),
        key = file.key(),
        status = status.as_u16(),
        offset,
        len,
        "serving object"
    );

    let body = if head {
        ResponseBody::empty()
    } else {
        match open_body(file, offset, len).await {
            Ok(body) => body,
            Err(err) => {
                warn!(error = %err, "failed to read object");
                return internal_error();
            }
        }
    };

    let mut resp = Response::new(body);
    *resp.status_mut() = status;
    *resp.headers_mut() = resp_headers;
    resp
}

async fn open_body<S: ObjectStore>(
    mut file: VirtualFile<S>,
    offset: u64,
    len: u64,
) -> FsResult<ResponseBody> {
    file.seek(SeekFrom::Start(offset))?;
    let stream = file.into_stream(len).await?;
    Ok(ResponseBody::from_stream(stream, len))
}

/// Pick the content type by extension, stored type, then sniffing.
///
/// Sniffing reads the first bytes and rewinds the cursor.
async fn detect_content_type<S: ObjectStore>(file: &mut VirtualFile<S>) -> FsResult<String> {
    let name = file.key().unwrap_or(file.name());
    if let Some(mime) = by_extension(name) {
        return Ok(mime.to_string());
    }
    if let Some(stored) = file.content_type().filter(|ct| !is_generic(ct)) {
        return Ok(stored.to_owned());
    }

    let prefix = file.read(SNIFF_LEN).await?;
    file.seek(SeekFrom::Start(0))?;
    Ok(sniff(&prefix).to_owned())
}

fn is_servable(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD
}

fn method_not_allowed() -> Response<ResponseBody> {
    let mut resp = plain_text(StatusCode::METHOD_NOT_ALLOWED, "405 method not allowed\n");
    resp.headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static("GET, HEAD"));
    resp
}

/// A `text/plain` response with the `nosniff` guard.
fn plain_text(status: StatusCode, message: &'static str) -> Response<ResponseBody> {
    let mut resp = Response::new(ResponseBody::from_string(message));
    *resp.status_mut() = status;
    let h = resp.headers_mut();
    h.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    h.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    resp
}

/// The standard `404` response.
#[must_use]
pub fn not_found() -> Response<ResponseBody> {
    plain_text(StatusCode::NOT_FOUND, "404 page not found\n")
}

/// The standard `500` response.
#[must_use]
pub fn internal_error() -> Response<ResponseBody> {
    plain_text(StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error\n")
}

fn local_redirect(target: &str, query: Option<&str>) -> Response<ResponseBody> {
    let location = match query {
        Some(q) if !q.is_empty() => format!("{target}?{q}"),
        _ => target.to_owned(),
    };
    let mut resp = Response::new(ResponseBody::empty());
    *resp.status_mut() = StatusCode::MOVED_PERMANENTLY;
    if let Ok(v) = HeaderValue::from_str(&location) {
        resp.headers_mut().insert(header::LOCATION, v);
    }
    resp
}
