//! Outbound HTTP client construction.
//!
//! One shared client serves every request task; the per-request Host
//! override lives on the request itself, so pooled connections never leak
//! another target's headers.

use super::tls::{load_ca_bundle, InsecureServerVerifier};
use crate::config::TlsPolicy;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Type alias for the HTTP client used for outbound fetches.
pub type HttpClient = Client<
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>,
    Full<Bytes>,
>;

/// Build the shared outbound client for the given trust posture.
///
/// The connector can always speak both http and https; the policy only
/// decides how an https peer's certificate is judged.
pub fn build_client(
    policy: &TlsPolicy,
    connect_timeout: Duration,
) -> Result<HttpClient, anyhow::Error> {
    let mut http_connector = hyper_util::client::legacy::connect::HttpConnector::new();
    http_connector.set_connect_timeout(Some(connect_timeout));
    http_connector.enforce_http(false); // Allow both HTTP and HTTPS

    let https_connector = match policy {
        TlsPolicy::InsecureSkipVerify => {
            warn!("Upstream TLS certificate verification DISABLED (lab/test targets only)");
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_tls_config(
                    rustls::ClientConfig::builder()
                        .dangerous()
                        .with_custom_certificate_verifier(Arc::new(InsecureServerVerifier))
                        .with_no_client_auth(),
                )
                .https_or_http()
                .enable_http1()
                .wrap_connector(http_connector)
        }
        TlsPolicy::CaBundle(path) => {
            let roots = load_ca_bundle(path)?;
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_tls_config(
                    rustls::ClientConfig::builder()
                        .with_root_certificates(roots)
                        .with_no_client_auth(),
                )
                .https_or_http()
                .enable_http1()
                .wrap_connector(http_connector)
        }
        TlsPolicy::Plaintext => hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|e| anyhow::anyhow!("Failed to load native root certificates: {e}"))?
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector),
    };

    Ok(Client::builder(TokioExecutor::new()).build(https_connector))
}
