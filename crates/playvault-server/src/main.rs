//! PlayVault Server
//!
//! HTTP/WebSocket backend for escrow deals, transaction recording, and
//! multiplayer word-game sessions.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use playvault_core::cache::TtlCache;
use playvault_core::tracing_init::init_tracing;

use playvault_server::auth::JwtManager;
use playvault_server::auth::jwt::DEFAULT_TOKEN_TTL_SECS;
use playvault_server::mailer::Mailer;
use playvault_server::rate_limit::RateLimitConfig;
use playvault_server::realtime::DeviceRegistry;
use playvault_server::routes::{AppState, build_router};
use playvault_server::storage::Database;

#[derive(Parser, Debug)]
#[command(name = "playvault-server")]
#[command(
    version,
    about = "PlayVault backend - escrow deals, transactions, and multiplayer games"
)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8080")]
    addr: SocketAddr,

    /// Path to SQLite database file.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// JWT secret key. Startup fails when neither the flag nor the
    /// environment variable is set.
    #[arg(long, env = "PLAYVAULT_JWT_SECRET")]
    jwt_secret: String,

    /// Session token TTL in seconds.
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL_SECS)]
    token_ttl: i64,

    /// HTTP endpoint of the transactional mail API.
    #[arg(long, env = "PLAYVAULT_MAIL_API_URL")]
    mail_api_url: Option<String>,

    /// Bearer token for the mail API.
    #[arg(long, env = "PLAYVAULT_MAIL_API_TOKEN")]
    mail_api_token: Option<String>,

    /// From address for outbound mail.
    #[arg(long, default_value = "noreply@playvault.dev")]
    mail_from: String,

    /// Max requests per IP per rate-limit window.
    #[arg(long, default_value_t = 20)]
    rate_limit: u64,

    /// Rate-limit window in seconds.
    #[arg(long, default_value_t = 60)]
    rate_window: u64,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing("playvault_server=info", args.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %args.addr,
        "Starting playvault-server"
    );

    let db = match &args.db_path {
        Some(path) => {
            info!(path = %path.display(), "Opening database");
            Database::open(path).await?
        }
        None => {
            let default_path = default_db_path()?;
            info!(path = %default_path.display(), "Opening database (default path)");
            Database::open(&default_path).await?
        }
    };

    let state = AppState {
        db,
        cache: TtlCache::new(),
        jwt: JwtManager::new(args.jwt_secret.as_bytes(), args.token_ttl),
        registry: DeviceRegistry::new(),
        mailer: Mailer::new(args.mail_api_url, args.mail_api_token, args.mail_from),
        rate_limit: RateLimitConfig {
            max_requests: args.rate_limit,
            window: Duration::from_secs(args.rate_window),
        },
    };

    let app = build_router(state).into_make_service_with_connect_info::<SocketAddr>();

    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    info!(addr = %args.addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
    }
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let dir = dirs::data_dir()
        .ok_or_else(|| anyhow::anyhow!("Cannot determine data directory"))?
        .join("playvault");
    Ok(dir.join("playvault.db"))
}
