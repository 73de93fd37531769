// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::SessionTokenManager;
use crate::config::AppConfig;
use crate::ledger::LedgerClient;
use crate::storage::Store;

/// Shared application state.
///
/// Every component is immutable once constructed; handlers coordinate
/// exclusively through the store's transactions.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<Store>,
    pub ledger: Arc<LedgerClient>,
    pub sessions: Arc<SessionTokenManager>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<Store>,
        ledger: LedgerClient,
        sessions: SessionTokenManager,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            ledger: Arc::new(ledger),
            sessions: Arc::new(sessions),
        }
    }

    /// State over a temporary store and an unroutable ledger endpoint.
    #[cfg(test)]
    pub fn for_tests() -> (Self, tempfile::TempDir) {
        use crate::auth::TokenConfig;
        use std::time::Duration;

        let dir = tempfile::tempdir().expect("temp dir");
        let config = AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            data_dir: dir.path().to_path_buf(),
            rpc_url: "http://127.0.0.1:9".to_string(),
            ledger_timeout: Duration::from_millis(250),
            min_confirmations: 1,
            jwt_secret: "test-secret-key-for-unit-tests".to_string(),
            access_ttl_minutes: 15,
            refresh_ttl_days: 30,
        };
        let store = Arc::new(Store::open(&config.db_path()).expect("open store"));
        let ledger =
            LedgerClient::new(&config.rpc_url, config.ledger_timeout).expect("ledger client");
        let sessions = SessionTokenManager::new(
            store.clone(),
            TokenConfig {
                secret: config.jwt_secret.clone(),
                access_ttl: chrono::Duration::minutes(config.access_ttl_minutes),
                refresh_ttl: chrono::Duration::days(config.refresh_ttl_days),
            },
        );
        (Self::new(config, store, ledger, sessions), dir)
    }
}
