//! RedirectorServer struct and main accept loop.
//!
//! The server owns the validated configuration and the shared outbound
//! client, accepts connections (optionally terminating TLS), and serves
//! HTTP/1.1 with one spawned task per connection. Every path and method is
//! accepted; routing is catch-all by design.

use super::client::{build_client, HttpClient};
use super::handler::{handle_request, ProxyContext};
use super::network::create_listener;
use super::resolve::resolve;
use super::tls::create_tls_acceptor;
use crate::config::Config;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio_rustls::TlsAcceptor;
use tracing::{error, info};

/// The redirector server: immutable configuration plus the shared client.
pub struct RedirectorServer {
    config: Arc<Config>,
    client: HttpClient,
}

impl RedirectorServer {
    /// Build the server from a validated configuration.
    ///
    /// The outbound TLS posture is fixed here, once, before any request.
    pub fn new(config: Config) -> Result<Self, anyhow::Error> {
        let policy = config.tls_policy()?;
        let client = build_client(
            &policy,
            Duration::from_secs(config.upstream_timeout_secs),
        )?;
        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    /// Run the server, accepting connections until the process exits.
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let ip: IpAddr = self.config.bind_address.parse().map_err(|e| {
            anyhow::anyhow!(
                "Invalid bind address '{}': {e}",
                self.config.bind_address
            )
        })?;
        let addr = SocketAddr::new(ip, self.config.listen_port);
        let listener = create_listener(addr)?;

        // TLS material loads before the first accept; failure is fatal
        let tls_acceptor: Option<TlsAcceptor> = if self.config.listen_tls {
            let cert = self
                .config
                .cert_path
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("TLS listener requires a certificate path"))?;
            let key = self
                .config
                .key_path
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("TLS listener requires a key path"))?;
            Some(create_tls_acceptor(cert, key)?)
        } else {
            None
        };

        let targets = resolve(&self.config, "/");
        info!(
            "Listening on {}://{}",
            self.config.listen_scheme(),
            addr
        );
        info!("Redirecting to {}", targets.primary.host_header());
        if let Some(cloak) = targets.cloak {
            info!(
                "Cloaking non-success responses with {}",
                cloak.host_header()
            );
        }

        let ctx = Arc::new(ProxyContext {
            config: Arc::clone(&self.config),
            client: self.client,
        });

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let ctx = Arc::clone(&ctx);
            let tls_acceptor = tls_acceptor.clone();

            tokio::spawn(async move {
                match tls_acceptor {
                    Some(acceptor) => match acceptor.accept(stream).await {
                        Ok(tls_stream) => {
                            serve_connection(ctx, TokioIo::new(tls_stream), remote_addr).await;
                        }
                        Err(err) => {
                            error!("TLS handshake failed from {remote_addr}: {err}");
                        }
                    },
                    None => {
                        serve_connection(ctx, TokioIo::new(stream), remote_addr).await;
                    }
                }
            });
        }
    }
}

/// Serve HTTP/1.1 on one accepted (possibly TLS-wrapped) connection.
async fn serve_connection<I>(ctx: Arc<ProxyContext>, io: I, remote_addr: SocketAddr)
where
    I: hyper::rt::Read + hyper::rt::Write + Unpin,
{
    let service = service_fn(move |req| {
        let ctx = Arc::clone(&ctx);
        async move { handle_request(&ctx, req, remote_addr).await }
    });

    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
        error!("Error serving connection from {remote_addr}: {err}");
    }
}
