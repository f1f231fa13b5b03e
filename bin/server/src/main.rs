// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

use quiverdb_server::{router, ServerState};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Process launch configuration, read once at startup from the
/// environment rather than CLI flags.
struct ServerConfig {
    root: PathBuf,
    port: u16,
}

impl ServerConfig {
    fn from_env() -> Self {
        let root = env::var("QUIVERDB_ROOT").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("./QUIVERDB_DB"));
        let port = env::var("QUIVERDB_PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(8000);
        if let Ok(raw) = env::var("QUIVERDB_RAW") {
            if matches!(raw.as_str(), "0" | "false" | "no") {
                tracing::warn!(QUIVERDB_RAW = %raw, "server-hosted databases are always opened raw-mode; ignoring request to disable it");
            }
        }
        ServerConfig { root, port }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = ServerConfig::from_env();
    std::fs::create_dir_all(&config.root).expect("failed to create database root directory");

    let state = Arc::new(ServerState::new(config.root.clone()));
    let app = router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await.expect("failed to bind server socket");
    tracing::info!(%addr, root = %config.root.display(), "quiverdb server listening");
    axum::serve(listener, app).await.expect("server loop exited with an error");
}
