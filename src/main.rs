use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use codigo_lookup::rate_limit::RateLimitLayer;
use codigo_lookup::{router, AppState, Roster};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_ROSTER: &str = "dados_exportados.csv";
const DEFAULT_RATE_LIMIT_RPS: u32 = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = load_config();
    info!("binding to {}:{}", config.host, config.port);
    info!("using roster at {}", config.roster_path.display());

    let start = Instant::now();
    // A missing or malformed roster degrades every search to "no match"
    // instead of refusing to start.
    let roster = match Roster::load_from_file(&config.roster_path) {
        Ok(roster) => roster,
        Err(err) => {
            warn!("roster unavailable, serving empty record set: {err}");
            Arc::new(Roster::empty())
        }
    };
    info!(
        "roster ready in {} ms ({} records)",
        start.elapsed().as_millis(),
        roster.len()
    );

    let state = AppState {
        roster: Arc::clone(&roster),
    };

    let app = router(state)
        .layer(RateLimitLayer::new(config.rate_limit_rps))
        .layer(TraceLayer::new_for_http());
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("invalid listen address");
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Clone)]
struct Config {
    host: String,
    port: u16,
    roster_path: PathBuf,
    rate_limit_rps: u32,
}

fn load_config() -> Config {
    let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let roster_path = env::var("ROSTER_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_ROSTER));
    let rate_limit_rps = env::var("RATE_LIMIT_RPS")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_RATE_LIMIT_RPS);

    Config {
        host,
        port,
        roster_path,
        rate_limit_rps,
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .with_max_level(Level::INFO)
        .init();
}
