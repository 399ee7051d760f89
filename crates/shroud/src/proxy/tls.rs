//! TLS utilities: inbound server identity and outbound trust material.
//!
//! Certificate, key and CA loading all happen once at startup and fail
//! fast; the listener never starts with unusable TLS material.

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, RootCertStore};
use std::path::Path;
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;

/// Certificate verifier that accepts any server certificate.
///
/// # Warning
/// This disables all TLS security checks. It backs the explicit
/// insecure-upstream posture and nothing else.
#[derive(Debug)]
pub struct InsecureServerVerifier;

impl ServerCertVerifier for InsecureServerVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ED25519,
            rustls::SignatureScheme::RSA_PSS_SHA256,
        ]
    }
}

/// Create the inbound TLS acceptor from a certificate/key pair on disk.
pub fn create_tls_acceptor(cert_path: &Path, key_path: &Path) -> Result<TlsAcceptor, anyhow::Error> {
    // Load certificate chain
    let cert_file = std::fs::File::open(cert_path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to open certificate file '{}': {e}",
            cert_path.display()
        )
    })?;
    let mut cert_reader = std::io::BufReader::new(cert_file);
    let certs: Vec<CertificateDer> = rustls_pemfile::certs(&mut cert_reader)
        .collect::<Result<_, _>>()
        .map_err(|e| anyhow::anyhow!("Failed to parse certificate file: {e}"))?;

    if certs.is_empty() {
        anyhow::bail!(
            "No certificates found in certificate file: {}",
            cert_path.display()
        );
    }

    // Load private key (PKCS8, RSA or EC)
    let key_file = std::fs::File::open(key_path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to open private key file '{}': {e}",
            key_path.display()
        )
    })?;
    let mut key_reader = std::io::BufReader::new(key_file);
    let key = rustls_pemfile::private_key(&mut key_reader)
        .map_err(|e| anyhow::anyhow!("Failed to parse private key file: {e}"))?
        .ok_or_else(|| {
            anyhow::anyhow!("No private key found in key file: {}", key_path.display())
        })?;

    let config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| anyhow::anyhow!("Failed to build TLS configuration: {e}"))?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}

/// Load every certificate from a PEM bundle into a root store for
/// upstream validation.
pub fn load_ca_bundle(path: &Path) -> Result<RootCertStore, anyhow::Error> {
    let file = std::fs::File::open(path)
        .map_err(|e| anyhow::anyhow!("Failed to open CA bundle '{}': {e}", path.display()))?;
    let mut reader = std::io::BufReader::new(file);

    let mut roots = RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut reader) {
        let cert = cert.map_err(|e| anyhow::anyhow!("Failed to parse CA bundle: {e}"))?;
        roots
            .add(cert)
            .map_err(|e| anyhow::anyhow!("Invalid certificate in CA bundle: {e}"))?;
    }

    if roots.is_empty() {
        anyhow::bail!("No certificates found in CA bundle: {}", path.display());
    }

    Ok(roots)
}
