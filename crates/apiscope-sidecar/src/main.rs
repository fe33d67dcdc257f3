//! apiscope sidecar entry point.

use std::path::PathBuf;

use anyhow::Context;
use apiscope_sidecar::{config, SidecarServer};
use apiscope_telemetry::{init_telemetry, TelemetryConfig};
use tracing::info;

/// Command-line arguments.
struct Args {
    /// Path to configuration file.
    config: Option<PathBuf>,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut config = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    config = args.next().map(PathBuf::from);
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("apiscope-sidecar {}", apiscope_sidecar::VERSION);
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {other}");
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
            }
        }

        Self { config }
    }
}

fn print_help() {
    println!(
        r"apiscope sidecar - API descriptor server and validating proxy

USAGE:
    apiscope-sidecar [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file (TOML or JSON)
    -h, --help             Print help information
    -v, --version          Print version information

ENVIRONMENT VARIABLES:
    APISCOPE__SERVER__HTTP_ADDR             Listen address (default: 0.0.0.0:8080)
    APISCOPE__APPLICATION__NAME             Application host name (default: localhost)
    APISCOPE__APPLICATION__PORT             Application port (default: 8081)
    APISCOPE__APPLICATION__UPSTREAM_URL     Upstream URL (default: http://NAME:PORT)
    APISCOPE__DESCRIPTOR__PATH              Descriptor file (default: api/openapi.yml)
    APISCOPE__DESCRIPTOR__SERVE_PATH        Descriptor path (default: /__api)
    APISCOPE__VALIDATION__ENABLED           Validate requests (default: true)
    APISCOPE__TELEMETRY__LOGGING__LEVEL     Log filter (default: info)
    APISCOPE__TELEMETRY__METRICS__ENABLED   Prometheus exporter (default: false)
    RUST_LOG                                Overrides the log filter

EXAMPLES:
    apiscope-sidecar --config /etc/apiscope/sidecar.toml

    APISCOPE__APPLICATION__NAME=people-api apiscope-sidecar
"
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = config::load(args.config.as_deref()).context("failed to load configuration")?;

    init_telemetry(&TelemetryConfig::from(&config.telemetry))
        .context("failed to initialize telemetry")?;

    info!(
        version = apiscope_sidecar::VERSION,
        config = ?args.config,
        "starting apiscope sidecar"
    );

    let server = SidecarServer::new(config).context("failed to create server")?;
    server.run().await.context("server error")?;

    info!("apiscope sidecar stopped");
    Ok(())
}
