//! Outbound fetch: header relay, Host override, and transport errors.
//!
//! One fetch sends the inbound method, path+query, headers and body to a
//! single target and collects the full response. The cloaking decision on
//! top of these fetches lives in `handler`.

use super::client::HttpClient;
use super::resolve::OutboundTarget;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{self, HeaderMap, HeaderValue};
use hyper::{Method, Request, Response, StatusCode, Uri};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Transport-level failure of an outbound fetch.
///
/// These are hard failures of the request: they never trigger the cloaking
/// fallback and surface to the client as a generic server error.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid outbound target: {0}")]
    InvalidTarget(#[from] hyper::http::uri::InvalidUri),
    #[error("failed to build upstream request: {0}")]
    Request(#[from] hyper::http::Error),
    #[error("upstream fetch failed: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),
    #[error("failed to read upstream response body: {0}")]
    Body(#[from] hyper::Error),
    #[error("upstream fetch timed out after {0:?}")]
    Timeout(Duration),
}

/// Fully collected response from one outbound fetch.
///
/// Ephemeral: consumed immediately by the fallback decision and the
/// response composer, never retained across requests.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Relay the inbound header set towards a target, overriding Host.
///
/// Duplicates and ordering are preserved. A header that cannot be relayed
/// is logged and skipped rather than failing the whole request.
pub fn relay_headers(inbound: &HeaderMap, target: &OutboundTarget) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(inbound.len() + 1);
    for (name, value) in inbound {
        if name == header::HOST {
            continue;
        }
        out.append(name.clone(), value.clone());
    }

    // The origin must see its own virtual host, not the redirector's
    match HeaderValue::from_str(&target.host_header()) {
        Ok(host) => {
            out.insert(header::HOST, host);
        }
        Err(e) => {
            warn!(
                host = %target.host_header(),
                "Skipping unrepresentable Host override: {e}"
            );
        }
    }

    out
}

/// Perform one outbound fetch and collect the full response.
///
/// The body passes through byte-for-byte in both directions; content
/// encodings are never touched, the original client decompresses.
pub async fn fetch(
    client: &HttpClient,
    method: &Method,
    target: &OutboundTarget,
    inbound_headers: &HeaderMap,
    body: Bytes,
    timeout: Duration,
) -> Result<UpstreamResponse, ForwardError> {
    let uri: Uri = target.uri().parse()?;
    debug!(uri = %uri, "Forwarding request");

    let mut upstream_req = Request::builder()
        .method(method.clone())
        .uri(uri)
        .body(Full::new(body))?;
    *upstream_req.headers_mut() = relay_headers(inbound_headers, target);

    let response = tokio::time::timeout(timeout, client.request(upstream_req))
        .await
        .map_err(|_| ForwardError::Timeout(timeout))??;

    let (parts, body) = response.into_parts();
    let body = tokio::time::timeout(timeout, body.collect())
        .await
        .map_err(|_| ForwardError::Timeout(timeout))??
        .to_bytes();

    Ok(UpstreamResponse {
        status: parts.status,
        headers: parts.headers,
        body,
    })
}

/// Generic error response returned when an outbound fetch fails.
pub fn error_response(status: u16, message: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Full::new(Bytes::from(message.to_string())))
        .unwrap()
}
