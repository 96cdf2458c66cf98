//! hostbounce: hostname-based bouncing reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌───────────────────────────────────────────────┐
//!                      │                  HOSTBOUNCE                   │
//!                      │                                               │
//!   Client ────────────┼─▶ TLS (SNI) ──▶ http server ──▶ dispatch ─────┼──▶ backend :port
//!                      │        │                          │           │
//!                      │        ▼                          ▼           │
//!                      │  ┌──────────────── ConfigSnapshot ─────────┐  │
//!                      │  │ CertificateStore        RoutingTable    │  │
//!                      │  └─────────────────────▲───────────────────┘  │
//!                      │                        │ atomic swap          │
//!                      │   hosts file ──▶ watcher ──▶ reload controller│
//!                      └───────────────────────────────────────────────┘
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;

use hostbounce::lifecycle::{self, Settings};
use hostbounce::observability::logging;

#[derive(Debug, Parser)]
#[command(name = "hostbounce")]
#[command(about = "Bounce connections to local ports by requested hostname", long_about = None)]
struct Cli {
    /// Port to listen on.
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Address to bind.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Hosts file (JSON), watched for changes.
    #[arg(long, env = "HOSTS_FILE", default_value = "config.json")]
    hosts_file: PathBuf,

    /// JSON schema the hosts file must satisfy.
    #[arg(long, env = "CONFIG_SCHEMA", default_value = "config.schema.json")]
    schema_file: PathBuf,

    /// Host that bounced requests are sent to.
    #[arg(long, env = "UPSTREAM_HOST", default_value = "127.0.0.1")]
    upstream_host: String,

    /// Prometheus scrape address; metrics are not exported when unset.
    #[arg(long, env = "METRICS_ADDR")]
    metrics_address: Option<SocketAddr>,

    /// Emit logs as JSON lines.
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(cli.log_json);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cli.port,
        hosts_file = ?cli.hosts_file,
        schema_file = ?cli.schema_file,
        "hostbounce starting"
    );

    lifecycle::run(Settings {
        bind_ip: cli.bind,
        port: cli.port,
        hosts_file: cli.hosts_file,
        schema_file: cli.schema_file,
        upstream_host: cli.upstream_host,
        metrics_address: cli.metrics_address,
    })
    .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
