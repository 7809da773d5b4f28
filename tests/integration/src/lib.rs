//! Integration tests for the bucketsite server.
//!
//! These tests require an S3-compatible object store and a bucketsite server
//! serving one of its buckets with `404PAGE=404.html`. They are marked
//! `#[ignore]` so they don't run during normal `cargo test`.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `S3_ENDPOINT_URL` | `http://localhost:9000` |
//! | `S3_ACCESS_KEY` | `minioadmin` |
//! | `S3_SECRET_KEY` | `minioadmin` |
//! | `BUCKETSITE_BUCKET` | `website` |
//! | `BUCKETSITE_URL` | `http://127.0.0.1:8080` |
//!
//! Run them with:
//! ```text
//! cargo test -p bucketsite-integration -- --ignored
//! ```

use std::sync::Once;

use aws_credential_types::Credentials;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::primitives::ByteStream;

/// Key of the not-found page the server under test is configured with.
pub const NOT_FOUND_PAGE: &str = "404.html";

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_owned())
}

/// Bucket served by the server under test.
#[must_use]
pub fn site_bucket() -> String {
    env_or("BUCKETSITE_BUCKET", "website")
}

/// Absolute URL of `path` on the server under test.
#[must_use]
pub fn site_url(path: &str) -> String {
    let base = env_or("BUCKETSITE_URL", "http://127.0.0.1:8080");
    format!("{}{path}", base.trim_end_matches('/'))
}

/// Create a configured S3 client pointing at the object store.
#[must_use]
pub fn s3_client() -> aws_sdk_s3::Client {
    init_tracing();

    let creds = Credentials::new(
        env_or("S3_ACCESS_KEY", "minioadmin"),
        env_or("S3_SECRET_KEY", "minioadmin"),
        None,
        None,
        "integration-test",
    );

    let config = aws_sdk_s3::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(creds)
        .endpoint_url(env_or("S3_ENDPOINT_URL", "http://localhost:9000"))
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(config)
}

/// HTTP client that does not follow redirects.
#[must_use]
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap_or_else(|e| panic!("failed to build http client: {e}"))
}

/// Generate a unique key prefix for a test.
#[must_use]
pub fn test_prefix(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// Upload `body` under `key` in the served bucket.
pub async fn put_object(client: &aws_sdk_s3::Client, key: &str, body: &'static [u8]) {
    client
        .put_object()
        .bucket(site_bucket())
        .key(key)
        .body(ByteStream::from_static(body))
        .send()
        .await
        .unwrap_or_else(|e| panic!("failed to put object {key}: {e}"));
}

/// Delete every object under `prefix` in the served bucket.
pub async fn cleanup_prefix(client: &aws_sdk_s3::Client, prefix: &str) {
    let bucket = site_bucket();
    let Ok(resp) = client
        .list_objects_v2()
        .bucket(&bucket)
        .prefix(prefix)
        .send()
        .await
    else {
        return;
    };

    for obj in resp.contents() {
        if let Some(key) = obj.key() {
            let _ = client.delete_object().bucket(&bucket).key(key).send().await;
        }
    }
}

mod test_fallback;
mod test_site;
