use std::{env, net::SocketAddr};

use axum::Router;
use common::utils::logging::init_logging_default;
use dotenvy::dotenv;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::routes::{self, ServerState};
use service::{file::pin_store::PinStore, runtime};

fn init_logging() {
    init_logging_default();
}

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Bind address from config.toml, falling back to SERVER_HOST/SERVER_PORT
/// env vars and finally to 127.0.0.1:5000
fn load_bind_addr() -> anyhow::Result<SocketAddr> {
    let (host, port) = match configs::load_default() {
        Ok(cfg) => {
            let s = cfg.server;
            (s.host, s.port)
        }
        Err(_) => {
            let host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
            let port = env::var("SERVER_PORT")
                .ok()
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(5000);
            (host, port)
        }
    };
    Ok(format!("{}:{}", host, port).parse()?)
}

/// Resolve the pins data file from configs or env, defaulting to data/pins.json
fn load_data_file() -> String {
    match configs::load_default() {
        Ok(cfg) => {
            let mut s = cfg.storage;
            s.normalize_from_env();
            s.data_file
        }
        Err(_) => env::var("PINS_DATA_FILE").unwrap_or_else(|_| "data/pins.json".to_string()),
    }
}

/// Entry point used by the binary: wire state and routes, then serve
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging();

    let data_file = load_data_file();
    let data_dir = std::path::Path::new(&data_file)
        .parent()
        .and_then(|p| p.to_str())
        .unwrap_or("");
    runtime::ensure_env(data_dir).await?;

    // 图钉存储（单个 JSON 文件，整块读写）
    let pins = PinStore::new(&data_file).await?;
    let state = ServerState { pins };

    // Build router
    let cors = build_cors();
    let app: Router = routes::build_router(state, cors);

    // Bind and serve
    let addr = load_bind_addr()?;
    info!(%addr, %data_file, "starting pin board server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
