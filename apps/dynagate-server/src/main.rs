//! Dynagate Server - DynamoDB-compatible request gateway.
//!
//! Verifies AWS SigV4 signatures, parses request bodies with a parser whose
//! nesting depth is bounded only by configuration, and serves a small set of
//! DynamoDB operations from memory.
//!
//! # Usage
//!
//! ```text
//! DYNAGATE_CREDENTIALS=alternator:secret_pass dynagate-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:8000` | HTTP bind address |
//! | `HTTPS_LISTEN` | *(unset)* | HTTPS bind address |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | *(unset)* | PEM certificate chain and private key |
//! | `DYNAGATE_ENFORCE_AUTHORIZATION` | `true` | Verify SigV4 signatures |
//! | `DYNAGATE_CREDENTIALS` | *(unset)* | `akid:secret[,akid:secret...]` |
//! | `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` | *(unset)* | Single credential fallback |
//! | `DYNAGATE_CREDENTIAL_CACHE_TTL_SECS` | `0` | Cache resolved secrets, 0 disables |
//! | `DYNAGATE_MAX_CLOCK_SKEW_SECS` | `900` | Allowed `X-Amz-Date` skew, 0 disables |
//! | `DYNAGATE_JSON_MAX_DEPTH` | `524288` | Parser depth limit |
//! | `DYNAGATE_MAX_BODY_BYTES` | `16777216` | Request body limit |
//! | `DYNAGATE_ENDPOINT_ADDRESS` | *(unset)* | Address returned by `DescribeEndpoints` |
//! | `DEFAULT_REGION` | `us-east-1` | Region for table ARNs and credential scopes |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod tls;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dynagate_core::{DynagateConfig, DynagateHandler, DynagateProvider};
use dynagate_http::DynamoDBHttpService;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::server::TlsStream;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Completed TLS handshakes waiting to be served.
const TLS_HANDOFF_CAPACITY: usize = 64;

/// How long a client gets to finish the TLS handshake.
const TLS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

type DynagateService = DynamoDBHttpService<DynagateHandler>;

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

/// Serve one connection on its own task, tracked for graceful shutdown.
fn spawn_connection<I>(
    http: &HttpConnBuilder<TokioExecutor>,
    graceful: &GracefulShutdown,
    io: I,
    service: DynagateService,
    peer_addr: SocketAddr,
) where
    I: hyper::rt::Read + hyper::rt::Write + Unpin + Send + 'static,
{
    let conn = http.serve_connection(io, service);
    let conn = graceful.watch(conn.into_owned());

    tokio::spawn(async move {
        if let Err(e) = conn.await {
            error!(peer_addr = %peer_addr, error = %e, "connection error");
        }
    });
}

/// Accept from the HTTPS listener, or never resolve when HTTPS is off.
async fn accept_tls(listener: Option<&TcpListener>) -> std::io::Result<(TcpStream, SocketAddr)> {
    match listener {
        Some(listener) => listener.accept().await,
        None => std::future::pending().await,
    }
}

/// Run the accept loops, serving connections until a shutdown signal is received.
///
/// TLS handshakes run on their own tasks so a slow client cannot stall the
/// accept loop; finished handshakes are handed back over a channel.
async fn serve(
    listener: TcpListener,
    https: Option<(TcpListener, TlsAcceptor)>,
    service: DynagateService,
) -> Result<()> {
    let graceful = GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());
    let (tls_listener, acceptor) = https.unzip();
    let (tls_tx, mut tls_rx) =
        mpsc::channel::<(TlsStream<TcpStream>, SocketAddr)>(TLS_HANDOFF_CAPACITY);

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
                spawn_connection(&http, &graceful, TokioIo::new(stream), service.clone(), peer_addr);
            }

            result = accept_tls(tls_listener.as_ref()) => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept TLS connection");
                        continue;
                    }
                };
                let Some(acceptor) = acceptor.clone() else {
                    continue;
                };
                let tls_tx = tls_tx.clone();
                tokio::spawn(async move {
                    match tls::accept(&acceptor, stream, TLS_HANDSHAKE_TIMEOUT).await {
                        Ok(tls_stream) => {
                            // The receiver only goes away at shutdown.
                            let _ = tls_tx.send((tls_stream, peer_addr)).await;
                        }
                        Err(e) => {
                            warn!(peer_addr = %peer_addr, error = %format!("{e:#}"), "TLS handshake failed");
                        }
                    }
                });
            }

            Some((tls_stream, peer_addr)) = tls_rx.recv() => {
                spawn_connection(&http, &graceful, TokioIo::new(tls_stream), service.clone(), peer_addr);
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

/// Address the health check connects to for a given bind address.
fn health_check_addr(listen_addr: &str) -> String {
    listen_addr.replace("0.0.0.0", "127.0.0.1")
}

/// Perform a health check by connecting to the gateway and requesting the health endpoint.
///
/// Exits with code 0 if the response is 200 OK and reports the service as
/// running, 1 otherwise.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request = format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.contains("200 OK") && response.contains("\"running\"") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

/// Wire the in-memory provider behind the HTTP service.
fn build_service(config: &DynagateConfig) -> DynagateService {
    let provider = DynagateProvider::new(config);
    let handler = DynagateHandler::new(Arc::new(provider));
    DynamoDBHttpService::new(Arc::new(handler), config.http_config())
}

async fn bind(addr: &str) -> Result<TcpListener> {
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("invalid bind address: {addr}"))?;
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = DynagateConfig::from_env().context("invalid configuration")?;

    // Handle --health-check flag for Docker HEALTHCHECK.
    if std::env::args().any(|a| a == "--health-check") {
        let healthy = run_health_check(&health_check_addr(&config.gateway_listen))
            .await
            .is_ok();
        std::process::exit(i32::from(!healthy));
    }

    init_tracing(&config.log_level)?;
    config.validate().context("invalid configuration")?;

    if !config.enforce_authorization {
        warn!("signature verification is disabled, every request is accepted");
    }

    let service = build_service(&config);

    let listener = bind(&config.gateway_listen).await?;

    let https = match (&config.https_listen, &config.tls_cert_path, &config.tls_key_path) {
        (Some(addr), Some(cert), Some(key)) => {
            let acceptor = tls::load_acceptor(Path::new(cert), Path::new(key))?;
            let listener = bind(addr).await?;
            info!(addr = %addr, "HTTPS listener enabled");
            Some((listener, acceptor))
        }
        _ => None,
    };

    info!(
        addr = %config.gateway_listen,
        enforce_authorization = config.enforce_authorization,
        access_keys = config.credentials.len(),
        json_max_depth = config.json_max_depth,
        max_body_bytes = config.max_body_bytes,
        version = VERSION,
        "starting Dynagate Server",
    );

    serve(listener, https, service).await
}
