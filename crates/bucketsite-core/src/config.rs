//! Process configuration.
//!
//! Provides [`SiteConfig`], read once at startup from environment variables
//! and then shared immutably by the store client, the filesystem adapter and
//! the HTTP layer.

use std::fmt;

use serde::Serialize;
use typed_builder::TypedBuilder;

use crate::error::ConfigError;

/// Default listen address.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:8080";

/// Region used when neither the endpoint nor the environment names one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// bucketsite configuration.
///
/// # Examples
///
/// ```
/// use bucketsite_core::config::SiteConfig;
///
/// let config = SiteConfig::builder().bucket("website".into()).build();
/// assert_eq!(config.address, "127.0.0.1:8080");
/// assert!(config.fallback_key().is_none());
/// ```
#[derive(Clone, Serialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    /// Object store URL (e.g. `https://s3.us-west-2.amazonaws.com`). Empty
    /// selects the default AWS endpoint.
    #[builder(default)]
    pub endpoint: String,

    /// Static access key. Only used together with [`Self::secret_key`].
    #[builder(default)]
    pub access_key: String,

    /// Static secret key.
    #[serde(skip)]
    #[builder(default)]
    pub secret_key: String,

    /// Bucket whose objects are served.
    #[builder(default)]
    pub bucket: String,

    /// Listen address for the HTTP server.
    #[builder(default = String::from(DEFAULT_ADDRESS))]
    pub address: String,

    /// Key served with a 404 status when a request misses. Empty disables it.
    #[builder(default)]
    pub not_found_page: String,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl fmt::Debug for SiteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field(
                "secret_key",
                &if self.secret_key.is_empty() { "" } else { "..." },
            )
            .field("bucket", &self.bucket)
            .field("address", &self.address)
            .field("not_found_page", &self.not_found_page)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SiteConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `ENDPOINT` | *(empty)* |
    /// | `ACCESSKEY` | *(empty)* |
    /// | `SECRETKEY` | *(empty)* |
    /// | `BUCKET` | *(empty)* |
    /// | `ADDRESS` | `127.0.0.1:8080` |
    /// | `404PAGE` | *(empty)* |
    /// | `LOG_LEVEL` | `info` |
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// A variable that is present but empty overrides the default.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("ENDPOINT") {
            config.endpoint = v;
        }
        if let Some(v) = lookup("ACCESSKEY") {
            config.access_key = v;
        }
        if let Some(v) = lookup("SECRETKEY") {
            config.secret_key = v;
        }
        if let Some(v) = lookup("BUCKET") {
            config.bucket = v;
        }
        if let Some(v) = lookup("ADDRESS") {
            config.address = v;
        }
        if let Some(v) = lookup("404PAGE") {
            config.not_found_page = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// Check the fields that must be valid before the server can start.
    ///
    /// Returns the parsed endpoint, or `None` when the default AWS endpoint
    /// should be used.
    pub fn validate(&self) -> Result<Option<Endpoint>, ConfigError> {
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::MissingBucket);
        }
        Endpoint::parse(&self.endpoint)
    }

    /// The fallback page key, if one is configured.
    #[must_use]
    pub fn fallback_key(&self) -> Option<&str> {
        if self.not_found_page.is_empty() {
            None
        } else {
            Some(&self.not_found_page)
        }
    }

    /// Whether both static keys are present.
    #[must_use]
    pub fn has_static_credentials(&self) -> bool {
        !self.access_key.is_empty() && !self.secret_key.is_empty()
    }

    /// The address to bind. A bare `:port` listens on all interfaces.
    ///
    /// ```
    /// use bucketsite_core::config::SiteConfig;
    ///
    /// let config = SiteConfig::builder().address(":8080".into()).build();
    /// assert_eq!(config.listen_address(), "0.0.0.0:8080");
    /// ```
    #[must_use]
    pub fn listen_address(&self) -> String {
        let address = self.address.trim();
        if address.starts_with(':') {
            format!("0.0.0.0{address}")
        } else {
            address.to_owned()
        }
    }
}

/// A parsed object store endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// `scheme://host[:port]`, any path dropped.
    pub url: String,
    /// Host name without port.
    pub host: String,
    /// Whether the scheme is `https`.
    pub secure: bool,
    /// Region implied by an AWS host name.
    pub region: Option<String>,
}

impl Endpoint {
    /// Parse an endpoint URL. An empty string yields `None`.
    pub fn parse(raw: &str) -> Result<Option<Self>, ConfigError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }

        let invalid = |reason: &str| ConfigError::InvalidEndpoint {
            endpoint: raw.to_owned(),
            reason: reason.to_owned(),
        };

        let uri: http::Uri = raw.parse().map_err(|e: http::uri::InvalidUri| invalid(&e.to_string()))?;
        let secure = match uri.scheme_str() {
            Some("https") => true,
            Some("http") => false,
            Some(_) => return Err(invalid("scheme must be http or https")),
            None => return Err(invalid("missing scheme")),
        };
        let authority = uri.authority().ok_or_else(|| invalid("missing host"))?;
        if authority.host().is_empty() {
            return Err(invalid("missing host"));
        }

        let scheme = if secure { "https" } else { "http" };
        Ok(Some(Self {
            url: format!("{scheme}://{authority}"),
            host: authority.host().to_owned(),
            secure,
            region: region_from_host(authority.host()),
        }))
    }

    /// Whether the endpoint is an AWS S3 host.
    #[must_use]
    pub fn is_amazon(&self) -> bool {
        amazon_host_labels(&self.host).is_some()
    }

    /// Whether requests should use path-style addressing.
    ///
    /// AWS hosts support virtual-hosted buckets; other S3-compatible stores
    /// generally only answer path-style requests.
    #[must_use]
    pub fn path_style(&self) -> bool {
        !self.is_amazon()
    }
}

/// Strip the AWS domain suffix, returning the leading labels.
fn amazon_host_labels(host: &str) -> Option<&str> {
    host.strip_suffix(".amazonaws.com")
        .or_else(|| host.strip_suffix(".amazonaws.com.cn"))
}

/// Derive the signing region from an AWS S3 host name.
///
/// # Examples
///
/// ```
/// use bucketsite_core::config::region_from_host;
///
/// assert_eq!(region_from_host("s3.eu-west-1.amazonaws.com").as_deref(), Some("eu-west-1"));
/// assert_eq!(region_from_host("s3-us-west-2.amazonaws.com").as_deref(), Some("us-west-2"));
/// assert_eq!(region_from_host("s3.amazonaws.com"), None);
/// assert_eq!(region_from_host("minio.local"), None);
/// ```
#[must_use]
pub fn region_from_host(host: &str) -> Option<String> {
    let labels = amazon_host_labels(host)?;
    let last = labels.rsplit('.').next()?;

    if labels.contains('.') {
        // s3.<region>, s3.dualstack.<region>, <bucket>.s3.<region>
        return match last {
            "s3" | "dualstack" | "s3-external-1" => None,
            region => Some(region.to_owned()),
        };
    }

    match last.strip_prefix("s3-") {
        Some("external-1") => Some(DEFAULT_REGION.to_owned()),
        Some(region) if !region.is_empty() && region != "fips" => Some(region.to_owned()),
        _ => None,
    }
}
