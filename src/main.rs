use std::sync::Arc;

use clap::Parser;
use scimgate::{AppState, build_app, config::ScimGateConfig, db::MemoryUserStore, observability};

/// CLI arguments for the SCIM gateway
#[derive(Parser, Debug)]
#[command(version, about = "SCIM 2.0 user provisioning gateway", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file (built-in defaults are used when omitted)
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Start the SCIM server (default)
    Serve,
    /// Validate the configuration file and exit
    Check,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    match args.command {
        Some(Command::Check) => {
            println!("Configuration is valid");
        }
        Some(Command::Serve) | None => run_server(config).await,
    }
}

fn load_config(path: Option<&str>) -> Result<ScimGateConfig, scimgate::config::ConfigError> {
    match path {
        Some(path) => ScimGateConfig::from_file(path),
        None => Ok(ScimGateConfig::default()),
    }
}

async fn run_server(config: ScimGateConfig) {
    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let bind_addr = config.server.socket_addr();
    let state = AppState::new(config, Arc::new(MemoryUserStore::new()));
    let app = build_app(state);

    let listener = match tokio::net::TcpListener::bind(bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, address = %bind_addr, "Failed to bind to address");
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on http://{}", bind_addr);

    // Graceful shutdown: wait for SIGINT/SIGTERM, then drain in-flight requests
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
