//! Destination resolution.
//!
//! Pure computation from the validated configuration and the inbound
//! path+query to the primary (and optional cloak) outbound target. No
//! network activity happens here; malformed hosts and ports were already
//! rejected at configuration time.

use crate::config::{Config, Scheme};

/// A single outbound destination derived for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundTarget {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    pub path_and_query: String,
}

impl OutboundTarget {
    /// Full request URI for this target.
    pub fn uri(&self) -> String {
        format!(
            "{}://{}:{}{}",
            self.scheme, self.host, self.port, self.path_and_query
        )
    }

    /// Value for the Host header sent to this target.
    pub fn host_header(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The primary destination and, when cloaking is configured, the decoy.
#[derive(Debug, Clone)]
pub struct ResolvedTargets {
    pub primary: OutboundTarget,
    pub cloak: Option<OutboundTarget>,
}

/// Compute the outbound targets for one inbound request.
///
/// The cloak target receives the byte-identical path and query string so
/// the decoy sees the exact request line the origin saw.
pub fn resolve(config: &Config, path_and_query: &str) -> ResolvedTargets {
    let primary = OutboundTarget {
        scheme: config.upstream_scheme(),
        host: config.destination_host.clone(),
        port: config.destination_port,
        path_and_query: path_and_query.to_string(),
    };

    // Built identically to the primary, host and port substituted: the
    // decoy fetch follows the same TLS mode as the origin fetch.
    let cloak = config.cloak_host.as_ref().map(|host| OutboundTarget {
        scheme: config.upstream_scheme(),
        host: host.clone(),
        port: config.cloak_port,
        path_and_query: path_and_query.to_string(),
    });

    ResolvedTargets { primary, cloak }
}
