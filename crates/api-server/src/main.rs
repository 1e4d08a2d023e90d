use std::net::SocketAddr;
use std::sync::Arc;

use api_server::http::{self, AppState, SessionRegistry};
use shared::config::{ApiConfig, load_dotenv};
use shared::llm::{OpenAiGateway, OpenAiGatewayConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(err) = load_dotenv() {
        eprintln!("{err}");
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "api_server=info,shared=info,tower_http=info".to_string()),
        )
        .json()
        .init();

    let config = match ApiConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to read config: {err}");
            std::process::exit(1);
        }
    };

    let gateway = match OpenAiGatewayConfig::from_env().and_then(OpenAiGateway::new) {
        Ok(gateway) => gateway,
        Err(err) => {
            error!("failed to configure completion client: {err}");
            std::process::exit(1);
        }
    };
    info!(model = gateway.model(), "completion client ready");

    let app = http::build_router(AppState {
        sessions: SessionRegistry::new(config.max_sessions, config.session_idle_ttl()),
        gateway: Arc::new(gateway),
        session_config: config.session,
        max_dataset_bytes: config.max_dataset_bytes,
    });

    let addr: SocketAddr = match config.bind_addr.parse() {
        Ok(addr) => addr,
        Err(err) => {
            error!("invalid API_BIND_ADDR {}: {err}", config.bind_addr);
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind {addr}: {err}");
            std::process::exit(1);
        }
    };

    info!(
        "api server listening on {}",
        listener.local_addr().unwrap_or(addr)
    );
    if let Err(err) = axum::serve(listener, app).await {
        error!("server stopped: {err}");
        std::process::exit(1);
    }
}
