//! bucketsite server - serve the objects of one bucket as a static website.
//!
//! The bucket is exposed as a read-only filesystem: `/a.txt` serves the
//! object `a.txt`, `/docs` serves `docs`, `docs/index.html` or
//! `docs/index.htm`, and a missing path optionally serves a custom not-found
//! page with a `404` status.
//!
//! # Usage
//!
//! ```text
//! ENDPOINT=http://localhost:9000 ACCESSKEY=minio SECRETKEY=minio123 \
//!   BUCKET=website 404PAGE=404.html bucketsite-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `ENDPOINT` | *(AWS S3)* | Object store URL; `https` enables TLS |
//! | `ACCESSKEY` | *(unset)* | Static access key |
//! | `SECRETKEY` | *(unset)* | Static secret key |
//! | `BUCKET` | *(required)* | Bucket to serve |
//! | `ADDRESS` | `127.0.0.1:8080` | Listen address; a bare `:port` binds all interfaces |
//! | `404PAGE` | *(unset)* | Key served with `404` for missing paths |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::sync::Arc;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use bucketsite_core::fs::{BucketFileSystem, FsConfig};
use bucketsite_core::s3::S3ObjectStore;
use bucketsite_core::store::ObjectStore;
use bucketsite_core::SiteConfig;
use bucketsite_http::SiteService;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Connect to the object store and build the HTTP service.
async fn build_service(config: &SiteConfig) -> Result<SiteService<S3ObjectStore>> {
    let store = S3ObjectStore::connect(config)
        .await
        .context("failed to configure object store client")?;
    let fs = BucketFileSystem::new(Arc::new(store), FsConfig::from(config));
    Ok(SiteService::new(fs))
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve<S: ObjectStore>(listener: TcpListener, service: SiteService<S>) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    // Wait for in-flight requests to complete.
    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Validate the configuration, bind the listener and serve until shutdown.
async fn run(config: SiteConfig) -> Result<()> {
    config.validate().context("invalid configuration")?;

    info!(
        address = %config.address,
        endpoint = %config.endpoint,
        bucket = %config.bucket,
        not_found_page = %config.not_found_page,
        version = VERSION,
        "starting bucketsite server",
    );

    let service = build_service(&config).await?;

    let address = config.listen_address();
    let listener = TcpListener::bind(address.as_str())
        .await
        .with_context(|| format!("failed to bind to {address}"))?;
    let addr = listener
        .local_addr()
        .context("failed to read listener address")?;

    info!(%addr, "started listening on http://{addr}");

    serve(listener, service).await
}

#[tokio::main]
async fn main() {
    let config = SiteConfig::from_env();

    if let Err(e) = init_tracing(&config.log_level) {
        eprintln!("{e:#}");
        std::process::exit(1);
    }

    if let Err(e) = run(config).await {
        error!(error = %format!("{e:#}"), "fatal error");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use bucketsite_core::memory::MemoryStore;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use super::*;

    #[tokio::test]
    async fn test_should_fail_fast_on_empty_bucket() {
        let config = SiteConfig::builder().bucket("  ".into()).build();
        let err = run(config).await.unwrap_err();
        assert!(format!("{err:#}").contains("bucket name cannot be empty"));
    }

    #[tokio::test]
    async fn test_should_fail_fast_on_invalid_endpoint() {
        let config = SiteConfig::builder()
            .bucket("website".into())
            .endpoint("ftp://example.com".into())
            .build();
        assert!(build_service(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_should_serve_requests_over_tcp() {
        let store = MemoryStore::new();
        store.put_object("website", "a.txt", "hello");
        let fs = BucketFileSystem::new(Arc::new(store), FsConfig::new("website"));
        let service = SiteService::new(fs);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind listener");
        let addr = listener.local_addr().expect("listener address");
        let server = tokio::spawn(serve(listener, service));

        let mut stream = TcpStream::connect(addr).await.expect("connect");
        stream
            .write_all(b"GET /a.txt HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .expect("write request");
        let mut response = String::new();
        stream
            .read_to_string(&mut response)
            .await
            .expect("read response");

        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.to_ascii_lowercase().contains("content-length: 5"));
        assert!(response.ends_with("hello"));

        server.abort();
    }
}
