//! Configuration types for the redirector.
//!
//! The configuration is assembled once at startup (from CLI flags or a YAML
//! file), validated eagerly, and shared read-only across all request tasks.
//! Nothing mutates it after the listener starts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Wire scheme for a listener or an outbound target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound TLS trust posture, derived from the configuration once at startup.
///
/// Modeled as a closed set of variants rather than boolean flags so the
/// security-relevant choice is visible at every call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsPolicy {
    /// Plain HTTP upstream, no TLS involved.
    Plaintext,
    /// TLS with server certificates validated against the given CA bundle.
    CaBundle(PathBuf),
    /// TLS with all certificate and hostname checks disabled.
    /// Only meaningful against lab/test targets.
    InsecureSkipVerify,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Address the listener binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port the listener accepts connections on.
    pub listen_port: u16,

    /// Hostname of the concealed origin requests are relayed to.
    pub destination_host: String,

    /// Port of the concealed origin.
    pub destination_port: u16,

    /// Use HTTPS for the upstream fetch and terminate TLS on the listener.
    #[serde(default)]
    pub tls_upstream: bool,

    /// Skip upstream certificate and hostname validation.
    #[serde(default)]
    pub insecure_upstream: bool,

    /// CA bundle used to validate the upstream certificate.
    /// Required when `tls_upstream` is set without `insecure_upstream`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_file: Option<PathBuf>,

    /// Terminate TLS for inbound connections.
    #[serde(default)]
    pub listen_tls: bool,

    /// Server certificate chain, required when `listen_tls` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_path: Option<PathBuf>,

    /// Server private key, required when `listen_tls` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_path: Option<PathBuf>,

    /// Decoy origin substituted whenever the primary answers non-200.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloak_host: Option<String>,

    /// Port of the decoy origin (plain HTTP).
    #[serde(default = "default_cloak_port")]
    pub cloak_port: u16,

    /// Bound applied to each outbound fetch; expiry is a transport failure.
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_cloak_port() -> u16 {
    80
}

fn default_upstream_timeout_secs() -> u64 {
    30
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(&path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read config file '{}': {e}",
                path.as_ref().display()
            )
        })?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration. Runs once before the listener starts;
    /// any failure here aborts the process.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.listen_port == 0 {
            anyhow::bail!("Listening port must be in range 1-65535");
        }
        if self.destination_port == 0 {
            anyhow::bail!("Destination port must be in range 1-65535");
        }
        if self.destination_host.is_empty() {
            anyhow::bail!("Destination host must not be empty");
        }
        if self.cloak_host.is_some() && self.cloak_port == 0 {
            anyhow::bail!("Cloak port must be in range 1-65535");
        }

        if self.listen_tls {
            let cert = self.cert_path.as_ref().ok_or_else(|| {
                anyhow::anyhow!("A certificate path is required when TLS mode is enabled")
            })?;
            let key = self.key_path.as_ref().ok_or_else(|| {
                anyhow::anyhow!("A key path is required when TLS mode is enabled")
            })?;
            if !cert.is_file() {
                anyhow::bail!("Certificate file not found: {}", cert.display());
            }
            if !key.is_file() {
                anyhow::bail!("Key file not found: {}", key.display());
            }
        }

        if self.tls_upstream && !self.insecure_upstream {
            let ca = self.ca_file.as_ref().ok_or_else(|| {
                anyhow::anyhow!(
                    "A CA bundle is required to validate the upstream certificate \
                     (pass --ca-file, or --insecure to skip validation)"
                )
            })?;
            if !ca.is_file() {
                anyhow::bail!("CA bundle not found: {}", ca.display());
            }
        }

        Ok(())
    }

    /// Scheme used for the primary outbound fetch.
    pub fn upstream_scheme(&self) -> Scheme {
        if self.tls_upstream {
            Scheme::Https
        } else {
            Scheme::Http
        }
    }

    /// Scheme the listener speaks.
    pub fn listen_scheme(&self) -> Scheme {
        if self.listen_tls {
            Scheme::Https
        } else {
            Scheme::Http
        }
    }

    /// Derive the outbound trust posture from the configuration.
    ///
    /// The strict posture without a CA bundle is not representable: it is
    /// rejected here as well as in `validate()`, so a caller that skipped
    /// validation can never end up with verification silently disabled.
    pub fn tls_policy(&self) -> Result<TlsPolicy, anyhow::Error> {
        if !self.tls_upstream {
            Ok(TlsPolicy::Plaintext)
        } else if self.insecure_upstream {
            Ok(TlsPolicy::InsecureSkipVerify)
        } else {
            match &self.ca_file {
                Some(path) => Ok(TlsPolicy::CaBundle(path.clone())),
                None => anyhow::bail!(
                    "A CA bundle is required to validate the upstream certificate \
                     (pass --ca-file, or --insecure to skip validation)"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn base_config() -> Config {
        Config {
            bind_address: default_bind_address(),
            listen_port: 8443,
            destination_host: "backend.local".to_string(),
            destination_port: 8080,
            tls_upstream: false,
            insecure_upstream: false,
            ca_file: None,
            listen_tls: false,
            cert_path: None,
            key_path: None,
            cloak_host: None,
            cloak_port: default_cloak_port(),
            upstream_timeout_secs: default_upstream_timeout_secs(),
        }
    }

    #[test]
    fn test_valid_plaintext_config() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_zero_listen_port_rejected() {
        let mut config = base_config();
        config.listen_port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_destination_port_rejected() {
        let mut config = base_config();
        config.destination_port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_destination_host_rejected() {
        let mut config = base_config();
        config.destination_host = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_listen_tls_requires_cert_and_key() {
        let mut config = base_config();
        config.listen_tls = true;
        assert!(config.validate().is_err());

        let cert = NamedTempFile::new().unwrap();
        config.cert_path = Some(cert.path().to_path_buf());
        assert!(config.validate().is_err());

        let key = NamedTempFile::new().unwrap();
        config.key_path = Some(key.path().to_path_buf());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_cert_file_rejected() {
        let mut config = base_config();
        config.listen_tls = true;
        config.cert_path = Some(PathBuf::from("/nonexistent/cert.pem"));
        config.key_path = Some(PathBuf::from("/nonexistent/key.pem"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_strict_upstream_tls_requires_ca_file() {
        let mut config = base_config();
        config.tls_upstream = true;
        assert!(config.validate().is_err());

        let ca = NamedTempFile::new().unwrap();
        config.ca_file = Some(ca.path().to_path_buf());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_insecure_upstream_tls_needs_no_ca_file() {
        let mut config = base_config();
        config.tls_upstream = true;
        config.insecure_upstream = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tls_policy_plaintext() {
        assert_eq!(base_config().tls_policy().unwrap(), TlsPolicy::Plaintext);
    }

    #[test]
    fn test_tls_policy_insecure() {
        let mut config = base_config();
        config.tls_upstream = true;
        config.insecure_upstream = true;
        assert_eq!(
            config.tls_policy().unwrap(),
            TlsPolicy::InsecureSkipVerify
        );
    }

    #[test]
    fn test_tls_policy_ca_bundle() {
        let mut config = base_config();
        config.tls_upstream = true;
        config.ca_file = Some(PathBuf::from("/etc/ssl/team.pem"));
        assert_eq!(
            config.tls_policy().unwrap(),
            TlsPolicy::CaBundle(PathBuf::from("/etc/ssl/team.pem"))
        );
    }

    #[test]
    fn test_tls_policy_strict_without_ca_rejected() {
        // the strict posture must never degrade to skipped verification,
        // even when validate() was bypassed
        let mut config = base_config();
        config.tls_upstream = true;
        assert!(config.tls_policy().is_err());
    }

    #[test]
    fn test_upstream_scheme_follows_tls_flag() {
        let mut config = base_config();
        assert_eq!(config.upstream_scheme(), Scheme::Http);
        config.tls_upstream = true;
        assert_eq!(config.upstream_scheme(), Scheme::Https);
    }

    #[test]
    fn test_from_file_applies_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "listen_port: 8080\ndestination_host: backend.local\ndestination_port: 9000\ncloak_host: decoy.local"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.cloak_port, 80);
        assert_eq!(config.upstream_timeout_secs, 30);
        assert_eq!(config.cloak_host.as_deref(), Some("decoy.local"));
        assert!(!config.tls_upstream);
    }

    #[test]
    fn test_from_file_invalid_config_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "listen_port: 0\ndestination_host: backend.local\ndestination_port: 9000"
        )
        .unwrap();
        assert!(Config::from_file(file.path()).is_err());
    }
}
