//! Runtime configuration.
//!
//! Values come from the process environment (after `.env` is loaded by
//! `dotenvy` in `main`). Command-line flags override them via [`Config::apply_overrides`].
//!
//!   DATABASE_URL: SQLite URL (default: sqlite://./expense_tracker.db)
//!   JWT_SECRET: HMAC secret shared with the identity provider
//!   BIND_ADDR: server listen address (default: 127.0.0.1:3000)
//!   RUST_LOG: tracing filter (default: info,expense_tracker=debug)
//!   LOG_FILE: TUI log file (default: expense-tracker.log)
//!   EXPENSE_TRACKER_TOKEN: identity token used by the TUI

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

const DEFAULT_DATABASE_URL: &str = "sqlite://./expense_tracker.db";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_LOG_FILTER: &str = "info,expense_tracker=debug";
const DEFAULT_LOG_FILE: &str = "expense-tracker.log";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: Option<String>,
    pub bind_addr: SocketAddr,
    pub log_filter: String,
    pub log_file: PathBuf,
    pub token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse()
            .with_context(|| format!("BIND_ADDR is not a socket address: {bind_addr}"))?;

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            jwt_secret: non_empty_var("JWT_SECRET"),
            bind_addr,
            log_filter: env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
            log_file: env::var("LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_FILE)),
            token: non_empty_var("EXPENSE_TRACKER_TOKEN"),
        })
    }

    pub fn apply_overrides(&mut self, database_url: Option<String>, bind_addr: Option<SocketAddr>) {
        if let Some(url) = database_url {
            self.database_url = url;
        }
        if let Some(addr) = bind_addr {
            self.bind_addr = addr;
        }
    }

    pub fn jwt_secret(&self) -> Result<&str> {
        self.jwt_secret
            .as_deref()
            .ok_or_else(|| anyhow!("JWT_SECRET must be set"))
    }

    pub fn token(&self) -> Result<&str> {
        self.token.as_deref().ok_or_else(|| {
            anyhow!("EXPENSE_TRACKER_TOKEN must be set (mint one with `expense-tracker token`)")
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            database_url: DEFAULT_DATABASE_URL.into(),
            jwt_secret: None,
            bind_addr: DEFAULT_BIND_ADDR.parse().unwrap(),
            log_filter: DEFAULT_LOG_FILTER.into(),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            token: None,
        }
    }

    #[test]
    fn overrides_replace_only_given_values() {
        let mut cfg = config();
        cfg.apply_overrides(Some("sqlite::memory:".into()), None);
        assert_eq!(cfg.database_url, "sqlite::memory:");
        assert_eq!(cfg.bind_addr.to_string(), DEFAULT_BIND_ADDR);
    }

    #[test]
    fn missing_secret_is_an_error() {
        let cfg = config();
        assert!(cfg.jwt_secret().is_err());
        assert!(cfg.token().is_err());
    }
}
