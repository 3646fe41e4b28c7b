//! Environment configuration

use std::time::Duration;

use crate::error::{EnsError, Result};
use crate::networks::Network;
use crate::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub network: Network,
    pub rpc_url: String,
    /// Only needed for commands that send transactions
    pub private_key: Option<String>,
    pub confirmations: usize,
    pub retry: RetryPolicy,
    pub database_url: Option<String>,
}

impl Config {
    /// Load `.env` (if any) and read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let network = match var("ENS_NETWORK") {
            Some(value) => Network::from_input(value.trim())
                .ok_or_else(|| EnsError::Config(format!("unknown ENS_NETWORK: {}", value)))?,
            None => Network::Mainnet,
        };

        let rpc_url = var("RPC_URL").unwrap_or_else(|| network.rpc_url().to_string());

        let defaults = RetryPolicy::default();
        // Retries come on top of the first attempt.
        let retries: u32 = parse_or(
            var("RPC_MAX_RETRIES"),
            "RPC_MAX_RETRIES",
            defaults.max_attempts.saturating_sub(1),
        )?;
        let base_ms = parse_or(
            var("RPC_RETRY_BASE_MS"),
            "RPC_RETRY_BASE_MS",
            defaults.base_delay.as_millis() as u64,
        )?;

        Ok(Self {
            network,
            rpc_url,
            private_key: var("PRIVATE_KEY"),
            confirmations: parse_or(var("CONFIRMATIONS"), "CONFIRMATIONS", 1)?,
            retry: RetryPolicy {
                max_attempts: retries.saturating_add(1),
                base_delay: Duration::from_millis(base_ms),
                ..defaults
            },
            database_url: var("DATABASE_URL"),
        })
    }

    /// The signing key, or a config error naming what is missing.
    pub fn require_private_key(&self) -> Result<&str> {
        self.private_key
            .as_deref()
            .ok_or_else(|| EnsError::Config("PRIVATE_KEY is required to send transactions".to_string()))
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| EnsError::Config(format!("invalid {}: {}", key, raw))),
        None => Ok(default),
    }
}
