//! Request handling: the forwarding engine and the cloaking fallback.
//!
//! One inbound HTTP transaction maps to one fetch against the concealed
//! origin and, when the origin answers anything but 200 and a cloak host is
//! configured, exactly one more fetch against the decoy. The client only
//! ever sees one of the two responses.

use super::client::HttpClient;
use super::compose::compose;
use super::forwarding::{error_response, fetch};
use super::resolve::resolve;
use crate::config::Config;
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::{Request, Response, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Shared state for request handling: the immutable configuration and the
/// pooled outbound client. Everything else is request-scoped.
pub struct ProxyContext {
    pub config: Arc<Config>,
    pub client: HttpClient,
}

/// The fallback decision.
///
/// Keyed purely on the received status code: transport failures never reach
/// this point and never trigger the cloak. Without a cloak host the primary
/// response stands whatever its status.
pub fn should_cloak(primary_status: StatusCode, cloak_configured: bool) -> bool {
    cloak_configured && primary_status != StatusCode::OK
}

/// Handle one inbound request end to end.
///
/// Transport failures on either fetch surface as a generic 502 to this one
/// client; they are hard failures, not cloak triggers.
pub async fn handle_request<B>(
    ctx: &ProxyContext,
    req: Request<B>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let method = req.method().clone();
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| "/".to_owned());
    let headers = req.headers().clone();

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            error!(client = %remote_addr, "Failed to read request body: {e}");
            return Ok(error_response(400, "Bad Request"));
        }
    };

    let targets = resolve(&ctx.config, &path_and_query);
    let timeout = Duration::from_secs(ctx.config.upstream_timeout_secs);

    info!(
        target = %targets.primary.host_header(),
        path = %path_and_query,
        client = %remote_addr,
        "Redirecting request"
    );
    debug!(method = %method, headers = ?headers, "Redirecting headers");

    let primary = match fetch(
        &ctx.client,
        &method,
        &targets.primary,
        &headers,
        body.clone(),
        timeout,
    )
    .await
    {
        Ok(response) => response,
        Err(e) => {
            error!(target = %targets.primary.host_header(), "Primary fetch failed: {e}");
            return Ok(error_response(502, "Bad Gateway"));
        }
    };

    let mut outcome = primary;
    if let Some(ref cloak) = targets.cloak {
        if should_cloak(outcome.status, true) {
            info!(
                primary_status = %outcome.status,
                cloak = %cloak.host_header(),
                "Primary answered non-success, serving cloak response"
            );
            outcome = match fetch(&ctx.client, &method, cloak, &headers, body, timeout).await {
                Ok(response) => {
                    info!(cloak_status = %response.status, "Cloak response substituted");
                    response
                }
                Err(e) => {
                    error!(cloak = %cloak.host_header(), "Cloak fetch failed: {e}");
                    return Ok(error_response(502, "Bad Gateway"));
                }
            };
        }
    }

    Ok(compose(outcome))
}
