// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup into an
//! explicit [`AppConfig`] value that is passed into each component at
//! construction time; nothing here is package-level mutable state.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding the embedded database | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LEDGER_RPC_URL` | Ledger node JSON-RPC endpoint | Required |
//! | `LEDGER_TIMEOUT_SECS` | Per-call ledger timeout | `10` |
//! | `MIN_CONFIRMATIONS` | Receipt depth required to confirm | `1` |
//! | `JWT_SECRET_KEY` | HMAC secret for access tokens | Required |
//! | `ACCESS_TOKEN_TTL_MINUTES` | Access-token lifetime | `15` |
//! | `REFRESH_TOKEN_TTL_DAYS` | Refresh-token lifetime | `30` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable name for the data directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable name for the ledger RPC endpoint.
pub const LEDGER_RPC_URL_ENV: &str = "LEDGER_RPC_URL";

/// Environment variable name for the access-token signing secret.
pub const JWT_SECRET_KEY_ENV: &str = "JWT_SECRET_KEY";

/// Environment variable name for the log format switch.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Configuration load failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: {value}")]
    InvalidVar { var: &'static str, value: String },
}

/// Application configuration, assembled once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server bind address.
    pub host: String,
    /// Server bind port.
    pub port: u16,
    /// Directory holding the embedded database file.
    pub data_dir: PathBuf,
    /// Ledger node JSON-RPC endpoint.
    pub rpc_url: String,
    /// Per-call timeout for ledger queries.
    pub ledger_timeout: Duration,
    /// Receipt depth required before a payment is confirmed.
    pub min_confirmations: u64,
    /// HMAC secret for access-token signatures.
    pub jwt_secret: String,
    /// Access-token lifetime in minutes.
    pub access_ttl_minutes: i64,
    /// Refresh-token lifetime in days.
    pub refresh_ttl_days: i64,
}

impl AppConfig {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let rpc_url = env::var(LEDGER_RPC_URL_ENV)
            .map_err(|_| ConfigError::MissingVar(LEDGER_RPC_URL_ENV))?;
        let jwt_secret = env::var(JWT_SECRET_KEY_ENV)
            .map_err(|_| ConfigError::MissingVar(JWT_SECRET_KEY_ENV))?;

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("PORT", 8080)?,
            data_dir: env::var(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/data")),
            rpc_url,
            ledger_timeout: Duration::from_secs(parse_var("LEDGER_TIMEOUT_SECS", 10)?),
            min_confirmations: parse_var("MIN_CONFIRMATIONS", 1)?,
            jwt_secret,
            access_ttl_minutes: parse_var("ACCESS_TOKEN_TTL_MINUTES", 15)?,
            refresh_ttl_days: parse_var("REFRESH_TOKEN_TTL_DAYS", 30)?,
        })
    }

    /// Path of the embedded database file inside the data directory.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("chainpay.redb")
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidVar { var, value: raw }),
        Err(_) => Ok(default),
    }
}
