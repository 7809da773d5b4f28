//! Credential resolution for the object store client.
//!
//! Explicit `ACCESSKEY`/`SECRETKEY` values collapse everything to a single
//! static provider. Otherwise the providers below are tried in order:
//!
//! 1. AWS environment variables (`AWS_ACCESS_KEY_ID`, ...)
//! 2. The shared credentials/profile file (`~/.aws/credentials`)
//! 3. EC2 instance metadata (rotating IAM role credentials)
//! 4. MinIO environment variables (`MINIO_ROOT_USER`, `MINIO_ACCESS_KEY`, ...)

use aws_config::environment::credentials::EnvironmentVariableCredentialsProvider;
use aws_config::imds::credentials::ImdsCredentialsProvider;
use aws_config::meta::credentials::CredentialsProviderChain;
use aws_config::profile::ProfileFileCredentialsProvider;
use aws_credential_types::Credentials;
use aws_credential_types::provider::error::CredentialsError;
use aws_credential_types::provider::{self, ProvideCredentials, SharedCredentialsProvider, future};
use tracing::info;

use crate::config::SiteConfig;

/// Provider name reported for static credentials.
const STATIC_PROVIDER: &str = "bucketsite-static";

/// Provider name reported for MinIO environment credentials.
const MINIO_ENV_PROVIDER: &str = "MinioEnvironment";

/// Build the credential provider for the given configuration.
#[must_use]
pub fn credentials_provider(config: &SiteConfig) -> SharedCredentialsProvider {
    if config.has_static_credentials() {
        info!(access_key = %config.access_key, "using static credentials");
        return SharedCredentialsProvider::new(Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            STATIC_PROVIDER,
        ));
    }

    info!("using default credential chain (env, profile, imds, minio env)");
    SharedCredentialsProvider::new(default_chain())
}

/// The credential chain used when no static keys are configured.
#[must_use]
pub fn default_chain() -> CredentialsProviderChain {
    CredentialsProviderChain::first_try("Environment", EnvironmentVariableCredentialsProvider::new())
        .or_else("Profile", ProfileFileCredentialsProvider::builder().build())
        .or_else("Imds", ImdsCredentialsProvider::builder().build())
        .or_else(MINIO_ENV_PROVIDER, MinioEnvCredentialsProvider)
}

/// Reads credentials from the MinIO server environment convention.
///
/// `MINIO_ROOT_USER`/`MINIO_ROOT_PASSWORD` take precedence over the legacy
/// `MINIO_ACCESS_KEY`/`MINIO_SECRET_KEY` pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinioEnvCredentialsProvider;

impl MinioEnvCredentialsProvider {
    fn load(&self) -> provider::Result {
        minio_credentials(|name| std::env::var(name).ok())
    }
}

impl ProvideCredentials for MinioEnvCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::ready(self.load())
    }
}

/// Resolve MinIO credentials through an arbitrary variable lookup.
fn minio_credentials(lookup: impl Fn(&str) -> Option<String>) -> provider::Result {
    let pairs = [
        ("MINIO_ROOT_USER", "MINIO_ROOT_PASSWORD"),
        ("MINIO_ACCESS_KEY", "MINIO_SECRET_KEY"),
    ];

    for (user_var, password_var) in pairs {
        let user = lookup(user_var).filter(|v| !v.is_empty());
        let password = lookup(password_var).filter(|v| !v.is_empty());
        if let (Some(user), Some(password)) = (user, password) {
            return Ok(Credentials::new(
                user,
                password,
                None,
                None,
                MINIO_ENV_PROVIDER,
            ));
        }
    }

    Err(CredentialsError::not_loaded(
        "no MinIO credentials in environment",
    ))
}
