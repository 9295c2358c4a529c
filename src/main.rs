use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::http::header::HeaderName;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tollgate::config::TollgateConfig;
use tollgate::http::{rate_limit_by_client_ip, AdmissionLayer, ClientIp, Header};
use tollgate::policy::{CombinedPolicy, Dimension, ACCOUNT, ADDRESS};

#[derive(Parser, Debug)]
#[command(name = "tollgate")]
#[command(about = "HTTP server guarded by per-address and per-account quotas")]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured listen address
    #[arg(short, long)]
    listen_addr: Option<SocketAddr>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);
    if args.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!("Starting Tollgate");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = TollgateConfig::load(args.config.as_deref())?;
    if let Some(addr) = args.listen_addr {
        config.server.listen_addr = addr;
    }
    info!(
        listen_addr = %config.server.listen_addr,
        trust_forwarded_headers = config.server.trust_forwarded_headers,
        address_capacity = config.limits.address.capacity,
        address_window_secs = config.limits.address.window_secs,
        brute_force_capacity = config.limits.brute_force.capacity,
        brute_force_window_secs = config.limits.brute_force.window_secs,
        "Configuration loaded"
    );

    let app = router(&config)?;

    let listener = TcpListener::bind(config.server.listen_addr).await?;
    info!("Listening on {}", config.server.listen_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Tollgate stopped");
    Ok(())
}

fn router(config: &TollgateConfig) -> anyhow::Result<Router> {
    let address_tracker = Arc::new(config.limits.address.build_tracker()?);
    let brute_force_tracker = Arc::new(config.limits.brute_force.build_tracker()?);
    let account_header = HeaderName::try_from(config.limits.account_header.as_str())?;
    let client_ip = if config.server.trust_forwarded_headers {
        ClientIp::behind_proxy()
    } else {
        ClientIp::peer()
    };

    let login_policy = CombinedPolicy::new(
        Dimension::new(ADDRESS, brute_force_tracker.clone(), client_ip),
        Dimension::new(ACCOUNT, brute_force_tracker, Header::new(account_header)),
    )?;

    let limited = Router::new()
        .route("/ping", get(ping))
        .layer(rate_limit_by_client_ip(address_tracker, client_ip));

    let login = Router::new()
        .route("/login", post(login))
        .layer(AdmissionLayer::new(login_policy));

    Ok(Router::new()
        .route("/health", get(health))
        .merge(limited)
        .merge(login))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

async fn ping() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "pong" }))
}

async fn login() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "accepted" }))
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
