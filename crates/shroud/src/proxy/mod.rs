//! Redirector proxy module.
//!
//! One inbound HTTP transaction becomes one fetch against the concealed
//! origin, plus at most one fetch against the cloaking decoy when the
//! origin answers anything but 200.
//!
//! # Module Structure
//!
//! - `server` - RedirectorServer struct and accept loop
//! - `handler` - Forwarding engine and the cloaking fallback decision
//! - `forwarding` - Single outbound fetch, header relay, Host override
//! - `compose` - Mapping the chosen response back onto the client
//! - `resolve` - Pure computation of primary/cloak targets
//! - `client` - Shared outbound HTTP client per TLS trust posture
//! - `tls` - Certificate, key and CA loading; inbound TLS acceptor
//! - `network` - Listener construction

mod client;
mod compose;
mod forwarding;
mod handler;
mod network;
mod resolve;
mod server;
mod tls;


// Re-export public API types
#[allow(unused_imports)]
pub use client::{build_client, HttpClient};
#[allow(unused_imports)]
pub use compose::{compose, is_chunked};
#[allow(unused_imports)]
pub use forwarding::{error_response, fetch, relay_headers, ForwardError, UpstreamResponse};
#[allow(unused_imports)]
pub use handler::{handle_request, should_cloak, ProxyContext};
#[allow(unused_imports)]
pub use resolve::{resolve, OutboundTarget, ResolvedTargets};
#[allow(unused_imports)]
pub use server::RedirectorServer;
#[allow(unused_imports)]
pub use tls::{create_tls_acceptor, load_ca_bundle, InsecureServerVerifier};
