use clap::Parser;
use shroud::cli::{log_file_path, Args};
use shroud::proxy::RedirectorServer;
use std::path::Path;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn init_tracing(log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .unwrap_or_else(|e| {
                    eprintln!("Failed to open log file '{}': {e}", path.display());
                    std::process::exit(2);
                });
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let log_file = args.log_file.as_deref().map(log_file_path);
    init_tracing(log_file.as_deref());

    // Validation happens once, before any request is served
    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            eprintln!("Run with --help for usage.");
            std::process::exit(2);
        }
    };

    let server = match RedirectorServer::new(config) {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to start redirector: {e:#}");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        error!("Redirector terminated: {e:#}");
        std::process::exit(1);
    }
}
