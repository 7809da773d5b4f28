//! [`ObjectStore`] backed by `aws-sdk-s3`.
//!
//! - `stat` issues `HeadObject`.
//! - `read_range` issues a ranged `GetObject` and streams the body.
//! - `list_directory` pages through `ListObjectsV2` with a `/` delimiter.
//!
//! A `NotFound`/`NoSuchKey` answer maps to [`StoreError::NotFound`];
//! every other failure (network, auth, malformed response) maps to
//! [`StoreError::Unavailable`].

use std::time::Duration;

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::{DEFAULT_REGION, Endpoint, SiteConfig};
use crate::credentials::credentials_provider;
use crate::error::{ConfigError, StoreError, StoreResult};
use crate::store::{DirEntry, ObjectMeta, ObjectStore, ObjectStream, StoreObject};

/// Timeout for establishing a connection to the store.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Object store talking to S3 or any S3-compatible service.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Wrap an existing client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the site configuration.
    ///
    /// Validates the configuration, resolves the region (endpoint host, then
    /// the default region chain, then `us-east-1`) and the credential chain.
    pub async fn connect(config: &SiteConfig) -> Result<Self, ConfigError> {
        let endpoint = config.validate()?;
        let region = resolve_region(endpoint.as_ref()).await;

        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(region.clone())
            .credentials_provider(credentials_provider(config))
            .timeout_config(
                TimeoutConfig::builder()
                    .connect_timeout(CONNECT_TIMEOUT)
                    .build(),
            );

        if let Some(endpoint) = &endpoint {
            builder = builder
                .endpoint_url(&endpoint.url)
                .force_path_style(endpoint.path_style());
        }

        info!(
            endpoint = endpoint.as_ref().map_or("default", |e| e.url.as_str()),
            region = %region,
            secure = endpoint.as_ref().is_none_or(|e| e.secure),
            "configured object store client"
        );

        Ok(Self::new(Client::from_conf(builder.build())))
    }
}

async fn resolve_region(endpoint: Option<&Endpoint>) -> Region {
    if let Some(region) = endpoint.and_then(|e| e.region.clone()) {
        return Region::new(region);
    }
    RegionProviderChain::default_provider()
        .or_else(DEFAULT_REGION)
        .region()
        .await
        .unwrap_or_else(|| Region::new(DEFAULT_REGION))
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    type Object = S3Object;

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<S3Object> {
        Ok(S3Object {
            client: self.client.clone(),
            bucket: bucket.to_owned(),
            key: key.to_owned(),
        })
    }

    async fn list_directory(&self, bucket: &str, prefix: &str) -> StoreResult<Vec<DirEntry>> {
        let mut entries = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let resp = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .delimiter("/")
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| StoreError::unavailable(prefix, e))?;

            for obj in resp.contents() {
                let Some(name) = obj.key().and_then(|k| k.strip_prefix(prefix)) else {
                    continue;
                };
                if name.is_empty() {
                    continue;
                }
                entries.push(DirEntry {
                    name: name.to_owned(),
                    is_dir: false,
                    size: obj.size().and_then(|s| u64::try_from(s).ok()).unwrap_or(0),
                    last_modified: obj.last_modified().and_then(to_chrono),
                });
            }

            for common in resp.common_prefixes() {
                let Some(name) = common
                    .prefix()
                    .and_then(|p| p.strip_prefix(prefix))
                    .map(|p| p.trim_end_matches('/'))
                else {
                    continue;
                };
                if name.is_empty() {
                    continue;
                }
                entries.push(DirEntry {
                    name: name.to_owned(),
                    is_dir: true,
                    size: 0,
                    last_modified: None,
                });
            }

            if resp.is_truncated() == Some(true) {
                continuation_token = resp.next_continuation_token().map(ToOwned::to_owned);
            }
            if continuation_token.is_none() {
                break;
            }
        }

        debug!(bucket, prefix, entries = entries.len(), "listed prefix");
        Ok(entries)
    }
}

/// Lazy handle to one S3 object. No request is made until it is used.
#[derive(Debug, Clone)]
pub struct S3Object {
    client: Client,
    bucket: String,
    key: String,
}

#[async_trait]
impl StoreObject for S3Object {
    fn key(&self) -> &str {
        &self.key
    }

    async fn stat(&self) -> StoreResult<ObjectMeta> {
        // S3 rejects empty keys before the request is even sent.
        if self.key.is_empty() {
            return Err(StoreError::not_found(""));
        }

        let resp = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .send()
            .await
            .map_err(|err| {
                let missing = err.as_service_error().is_some_and(|e| e.is_not_found())
                    || err.raw_response().is_some_and(|r| r.status().as_u16() == 404);
                if missing {
                    StoreError::not_found(self.key.clone())
                } else {
                    debug!(key = %self.key, error = %DisplayErrorContext(&err), "head_object failed");
                    StoreError::unavailable(self.key.clone(), err)
                }
            })?;

        Ok(ObjectMeta {
            key: self.key.clone(),
            size: resp
                .content_length()
                .and_then(|n| u64::try_from(n).ok())
                .unwrap_or(0),
            last_modified: resp.last_modified().and_then(to_chrono),
            content_type: resp.content_type().map(ToOwned::to_owned),
            etag: resp.e_tag().map(ToOwned::to_owned),
        })
    }

    async fn read_range(&self, offset: u64, len: u64) -> StoreResult<ObjectStream> {
        if len == 0 {
            return Ok(Box::pin(futures::stream::empty::<std::io::Result<Bytes>>()));
        }

        let last = offset.saturating_add(len - 1);
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .range(format!("bytes={offset}-{last}"))
            .send()
            .await
            .map_err(|err| {
                if err.as_service_error().is_some_and(|e| e.is_no_such_key()) {
                    StoreError::not_found(self.key.clone())
                } else {
                    StoreError::unavailable(self.key.clone(), err)
                }
            })?;

        let stream = futures::stream::unfold(resp.body, |mut body| async move {
            match body.next().await {
                Some(Ok(chunk)) => Some((Ok(chunk), body)),
                Some(Err(e)) => Some((Err(std::io::Error::other(e)), body)),
                None => None,
            }
        });

        Ok(Box::pin(stream))
    }
}

fn to_chrono(dt: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}
