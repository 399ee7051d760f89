//! Command-line surface and startup validation.
//!
//! Flags mirror the classic redirector options (`-l/-d/-p/-s/-c/-k/-i`),
//! with the same settings also loadable from a YAML file via `--config`.
//! All values are resolved and validated here, before the listener starts;
//! a bad combination never serves a single request.

use crate::config::Config;
use clap::Parser;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "shroud",
    about = "Transparent HTTP/HTTPS redirector with a cloaking fallback origin",
    version
)]
pub struct Args {
    /// Address to bind the listener to
    #[arg(short, long, default_value = "0.0.0.0")]
    pub bind: String,

    /// Port the redirector listens on (1-65535)
    #[arg(short, long)]
    pub listen: Option<u16>,

    /// Hostname of the server to redirect requests to
    #[arg(short, long)]
    pub destination: Option<String>,

    /// Port to redirect requests to (1-65535)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Use HTTP (0) or HTTPS (1) for the listener and the upstream fetch
    #[arg(short, long, default_value_t = 0)]
    pub secure: u8,

    /// Path to the server certificate, required with --secure 1
    #[arg(short, long)]
    pub certificate: Option<PathBuf>,

    /// Path to the server private key, required with --secure 1
    #[arg(short, long)]
    pub key: Option<PathBuf>,

    /// Accept upstream TLS certificates without validation
    #[arg(short, long)]
    pub insecure: bool,

    /// CA bundle used to validate the upstream certificate
    #[arg(long)]
    pub ca_file: Option<PathBuf>,

    /// Decoy host whose response is served when the origin answers non-200
    #[arg(long)]
    pub cloak_host: Option<String>,

    /// Port of the decoy host
    #[arg(long, default_value_t = 80)]
    pub cloak_port: u16,

    /// Timeout in seconds applied to each outbound fetch
    #[arg(long, default_value_t = 30)]
    pub upstream_timeout_secs: u64,

    /// Append logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Load settings from a YAML file instead of individual flags
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Resolve the CLI surface into a validated [`Config`].
    ///
    /// When `--config` is given the YAML file is authoritative and the
    /// per-setting flags are ignored.
    pub fn into_config(self) -> Result<Config, anyhow::Error> {
        if let Some(path) = self.config {
            return Config::from_file(path);
        }

        let listen_port = self
            .listen
            .ok_or_else(|| anyhow::anyhow!("You must specify a listening port (--listen)"))?;
        let destination_host = self
            .destination
            .ok_or_else(|| anyhow::anyhow!("You must specify a destination host (--destination)"))?;
        let destination_port = self
            .port
            .ok_or_else(|| anyhow::anyhow!("You must specify a destination port (--port)"))?;

        let secure = match self.secure {
            0 => false,
            1 => true,
            other => anyhow::bail!("--secure must be 0 or 1, got {other}"),
        };

        let config = Config {
            bind_address: self.bind,
            listen_port,
            destination_host,
            destination_port,
            tls_upstream: secure,
            insecure_upstream: self.insecure,
            ca_file: self.ca_file,
            listen_tls: secure,
            cert_path: self.certificate,
            key_path: self.key,
            cloak_host: self.cloak_host,
            cloak_port: self.cloak_port,
            upstream_timeout_secs: self.upstream_timeout_secs,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Resolve the log destination.
///
/// A directory gets a timestamped `YYYYmmddHHMMSS-redirection.log` file
/// inside it, matching the classic redirector's per-run log naming; any
/// other path is used as given.
pub fn log_file_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
        path.join(format!("{stamp}-redirection.log"))
    } else {
        path.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("shroud").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_minimal_flags_build_config() {
        let args = parse(&["-l", "8080", "-d", "backend.local", "-p", "9000"]);
        let config = args.into_config().unwrap();
        assert_eq!(config.listen_port, 8080);
        assert_eq!(config.destination_host, "backend.local");
        assert_eq!(config.destination_port, 9000);
        assert!(!config.tls_upstream);
        assert!(!config.listen_tls);
    }

    #[test]
    fn test_missing_listen_port_rejected() {
        let args = parse(&["-d", "backend.local", "-p", "9000"]);
        assert!(args.into_config().is_err());
    }

    #[test]
    fn test_missing_destination_rejected() {
        let args = parse(&["-l", "8080", "-p", "9000"]);
        assert!(args.into_config().is_err());
    }

    #[test]
    fn test_secure_out_of_range_rejected() {
        let args = parse(&["-l", "8080", "-d", "backend.local", "-p", "9000", "-s", "2"]);
        assert!(args.into_config().is_err());
    }

    #[test]
    fn test_secure_without_cert_rejected() {
        let args = parse(&["-l", "8080", "-d", "backend.local", "-p", "9000", "-s", "1"]);
        // secure mode needs cert/key (and a CA or --insecure for the upstream)
        assert!(args.into_config().is_err());
    }

    #[test]
    fn test_log_file_directory_gets_timestamped_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = log_file_path(dir.path());
        assert_eq!(path.parent().unwrap(), dir.path());
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with("-redirection.log"));
        assert_eq!(name.len(), "YYYYmmddHHMMSS-redirection.log".len());
    }

    #[test]
    fn test_log_file_plain_path_used_as_given() {
        let path = log_file_path(Path::new("/var/log/shroud.log"));
        assert_eq!(path, PathBuf::from("/var/log/shroud.log"));
    }

    #[test]
    fn test_cloak_defaults() {
        let args = parse(&[
            "-l",
            "8080",
            "-d",
            "backend.local",
            "-p",
            "9000",
            "--cloak-host",
            "decoy.local",
        ]);
        let config = args.into_config().unwrap();
        assert_eq!(config.cloak_host.as_deref(), Some("decoy.local"));
        assert_eq!(config.cloak_port, 80);
    }
}
