// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;
use std::sync::Arc;

use chainpay_server::api::router;
use chainpay_server::auth::{SessionTokenManager, TokenConfig};
use chainpay_server::config::{AppConfig, LOG_FORMAT_ENV};
use chainpay_server::ledger::LedgerClient;
use chainpay_server::state::AppState;
use chainpay_server::storage::Store;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let format = std::env::var(LOG_FORMAT_ENV).unwrap_or_else(|_| "pretty".to_string());
    if format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received, draining connections");
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    let store = match Store::open(&config.db_path()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("failed to open store at {}: {e}", config.db_path().display());
            std::process::exit(1);
        }
    };

    let ledger = match LedgerClient::new(&config.rpc_url, config.ledger_timeout) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("failed to create ledger client: {e}");
            std::process::exit(1);
        }
    };

    let sessions = SessionTokenManager::new(
        store.clone(),
        TokenConfig {
            secret: config.jwt_secret.clone(),
            access_ttl: chrono::Duration::minutes(config.access_ttl_minutes),
            refresh_ttl: chrono::Duration::days(config.refresh_ttl_days),
        },
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("failed to parse bind address");

    let state = AppState::new(config, store, ledger, sessions);
    let app = router(state);

    tracing::info!(%addr, "chainpay server listening (docs at /docs)");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind listener");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");
}
